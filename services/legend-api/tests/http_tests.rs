//! HTTP surface tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot` against a
//! tenant registry on disk and a fake backend.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use legend_api::router;
use legend_api::state::{AppState, ServiceSettings};
use legend_api::tenants::TenantRegistry;
use test_utils::{
    colors, image_dimensions, pixel_at, public_permissions_yaml, sample_tenant_config_yaml,
    temp_test_dir, write_test_file, COUNTRIES_SIZE, SAMPLE_LAYERS,
};

use common::{sample_tenant_with, Behavior, FakeBackend};

fn write_tenant(root: &Path, tenant: &str, images: &Path, extra_config: &str, layers: &[&str]) {
    let config = sample_tenant_config_yaml("http://backend/ows/", images.to_str().unwrap())
        .replacen("config:\n", &format!("config:\n{}", extra_config), 1);
    write_test_file(root, format!("{}/legendConfig.yaml", tenant), config.as_bytes());
    write_test_file(
        root,
        format!("{}/permissions.yaml", tenant),
        public_permissions_yaml(layers).as_bytes(),
    );
}

fn app(config_dir: &Path, settings: ServiceSettings) -> axum::Router {
    let settings = ServiceSettings {
        config_dir: config_dir.to_path_buf(),
        ..settings
    };
    let state = AppState::with_parts(
        &settings,
        TenantRegistry::new(config_dir),
        FakeBackend::new(Behavior::Image),
        reqwest::Client::new(),
        None,
    );
    router(Arc::new(state))
}

async fn get(app: axum::Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

// ============================================================================
// Legend endpoint
// ============================================================================

#[tokio::test]
async fn test_legend_png_response() {
    let dir = temp_test_dir();
    write_tenant(dir.path(), "default", dir.path(), "", SAMPLE_LAYERS);

    let response = get(
        app(dir.path(), ServiceSettings::default()),
        "/qwc_demo?SERVICE=WMS&layer=countries",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let body = body_bytes(response).await;
    assert_eq!(image_dimensions(&body), COUNTRIES_SIZE);
    assert_eq!(pixel_at(&body, 0, 0), colors::COUNTRIES);
}

#[tokio::test]
async fn test_missing_layer_parameter_is_bad_request() {
    let dir = temp_test_dir();
    write_tenant(dir.path(), "default", dir.path(), "", SAMPLE_LAYERS);

    let response = get(app(dir.path(), ServiceSettings::default()), "/qwc_demo").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("MissingParameterValue"), "{}", body);
}

#[tokio::test]
async fn test_oversized_dpi_is_bad_request() {
    let dir = temp_test_dir();
    write_tenant(dir.path(), "default", dir.path(), "", SAMPLE_LAYERS);

    let response = get(
        app(dir.path(), ServiceSettings::default()),
        "/qwc_demo?LAYER=countries&DPI=9000000",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("InvalidParameterValue"), "{}", body);
}

#[tokio::test]
async fn test_unknown_service_is_map_not_defined() {
    let dir = temp_test_dir();
    write_tenant(dir.path(), "default", dir.path(), "", SAMPLE_LAYERS);

    let response = get(
        app(dir.path(), ServiceSettings::default()),
        "/other_map?LAYER=countries",
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("MapNotDefined"), "{}", body);
}

#[tokio::test]
async fn test_denied_looks_like_not_found_by_default() {
    let dir = temp_test_dir();
    write_tenant(dir.path(), "default", dir.path(), "", &["countries"]);
    let app = app(dir.path(), ServiceSettings::default());

    let denied = get(app.clone(), "/qwc_demo?LAYER=geographic_lines").await;
    let unknown = get(app, "/qwc_demo?LAYER=geographic_lines_nope").await;

    assert_eq!(denied.status(), StatusCode::NOT_FOUND);
    assert_eq!(denied.status(), unknown.status());
    let body = String::from_utf8(body_bytes(denied).await).unwrap();
    assert!(body.contains("LayerNotDefined"), "{}", body);
}

#[tokio::test]
async fn test_denied_is_forbidden_when_tenant_exposes_it() {
    let dir = temp_test_dir();
    write_tenant(
        dir.path(),
        "default",
        dir.path(),
        "  expose_denied: true\n",
        &["countries"],
    );

    let response = get(
        app(dir.path(), ServiceSettings::default()),
        "/qwc_demo?LAYER=geographic_lines",
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("LayerNotPermitted"), "{}", body);
}

#[tokio::test]
async fn test_tenant_header_selects_tenant() {
    let dir = temp_test_dir();
    write_tenant(dir.path(), "default", dir.path(), "", &[]);
    write_tenant(dir.path(), "acme", dir.path(), "", &["countries"]);
    let settings = ServiceSettings {
        tenant_header: Some("x-tenant".to_string()),
        ..Default::default()
    };
    let app = app(dir.path(), settings);

    let request = Request::builder()
        .uri("/qwc_demo?LAYER=countries")
        .header("x-tenant", "acme")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app, "/qwc_demo?LAYER=countries").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_identity_header_grants_user_roles() {
    let dir = temp_test_dir();
    write_tenant(dir.path(), "default", dir.path(), "", &["countries"]);
    let permissions = public_permissions_yaml(&["countries"])
        + "  - role: editors\n    permissions:\n      wms_services:\n        - name: qwc_demo\n          layers:\n            - name: geographic_lines\nusers:\n  - name: alice\n    roles: [editors]\n";
    write_test_file(dir.path(), "default/permissions.yaml", permissions.as_bytes());
    let settings = ServiceSettings {
        identity_header: Some("x-auth-user".to_string()),
        ..Default::default()
    };
    let app = app(dir.path(), settings);

    let anonymous = get(app.clone(), "/qwc_demo?LAYER=geographic_lines").await;
    assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

    let request = Request::builder()
        .uri("/qwc_demo?LAYER=geographic_lines")
        .header("x-auth-user", "alice")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Operational endpoints
// ============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let dir = temp_test_dir();
    let app = app(dir.path(), ServiceSettings::default());

    for uri in ["/health", "/ready"] {
        let response = get(app.clone(), uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "OK");
    }
}

#[tokio::test]
async fn test_config_reload_picks_up_new_permissions() {
    let dir = temp_test_dir();
    write_tenant(dir.path(), "default", dir.path(), "", &["countries"]);
    let app = app(dir.path(), ServiceSettings::default());

    let before = get(app.clone(), "/qwc_demo?LAYER=geographic_lines").await;
    assert_eq!(before.status(), StatusCode::NOT_FOUND);

    write_tenant(dir.path(), "default", dir.path(), "", SAMPLE_LAYERS);
    let reload = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/config/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(reload.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(reload).await).unwrap();
    assert_eq!(body["tenants"], serde_json::json!(["default"]));

    let after = get(app, "/qwc_demo?LAYER=geographic_lines").await;
    assert_eq!(after.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_preloaded_snapshot_registry_serves_requests() {
    let images = temp_test_dir();
    let tenant = sample_tenant_with(images.path(), &public_permissions_yaml(&["countries"]), |_| {});
    let settings = ServiceSettings::default();
    let state = AppState::with_parts(
        &settings,
        TenantRegistry::from_snapshots([tenant]),
        FakeBackend::new(Behavior::Image),
        reqwest::Client::new(),
        None,
    );

    let response = get(router(Arc::new(state)), "/qwc_demo?LAYER=countries").await;
    assert_eq!(response.status(), StatusCode::OK);
}
