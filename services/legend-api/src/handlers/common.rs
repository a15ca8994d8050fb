//! Common utilities shared across handlers.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use quick_xml::escape::escape;
use tracing::{debug, error};

use legend_common::LegendError;

// ============================================================================
// Exception Helpers
// ============================================================================

/// Generate a WMS-formatted exception response
pub fn service_exception(code: &str, msg: &str, status: StatusCode) -> Response {
    let xml = format!(
        r#"<?xml version="1.0"?><ServiceExceptionReport version="1.3.0"><ServiceException code="{}">{}</ServiceException></ServiceExceptionReport>"#,
        escape(code),
        escape(msg)
    );
    (status, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

/// Map a legend error to its exception response.
///
/// Unless the tenant exposes denials, a denied layer is reported exactly like
/// an unknown one so callers cannot discover layers they may not see.
pub fn error_response(err: LegendError, expose_denied: bool) -> Response {
    let err = match err {
        LegendError::Denied(layers) if !expose_denied => LegendError::LayerNotFound(layers),
        other => other,
    };

    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %err, kind = err.kind(), "Legend request failed");
    } else {
        debug!(error = %err, kind = err.kind(), "Legend request rejected");
    }

    service_exception(err.exception_code(), &err.to_string(), status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_is_hidden_by_default() {
        let hidden = error_response(LegendError::Denied("secret".into()), false);
        let unknown = error_response(LegendError::LayerNotFound("secret".into()), false);
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
        assert_eq!(hidden.status(), unknown.status());
    }

    #[test]
    fn test_denied_is_forbidden_when_exposed() {
        let response = error_response(LegendError::Denied("secret".into()), true);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_backend_errors_are_bad_gateway() {
        let response = error_response(
            LegendError::BackendUnavailable {
                layer: "a".into(),
                message: "refused".into(),
            },
            false,
        );
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/xml"
        );
    }
}
