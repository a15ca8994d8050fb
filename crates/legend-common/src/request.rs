//! Request-level legend parameters.

use std::collections::{BTreeMap, HashMap};

use crate::error::{LegendError, LegendResult};

/// GetLegendGraphic parameters forwarded verbatim to the backend WMS.
pub const PASSTHROUGH_PARAMS: &[&str] = &[
    "bbox",
    "crs",
    "scale",
    "width",
    "height",
    "dpi",
    "boxspace",
    "layerspace",
    "layertitlespace",
    "symbolspace",
    "iconlabelspace",
    "symbolwidth",
    "symbolheight",
    "layerfontfamily",
    "itemfontfamily",
    "layerfontbold",
    "itemfontbold",
    "layerfontsize",
    "itemfontsize",
    "layerfontitalic",
    "itemfontitalic",
    "layerfontcolor",
    "itemfontcolor",
    "layertitle",
    "rulelabel",
    "transparent",
];

/// DPI at which pre-supplied legend images are assumed to be drawn.
pub const BASE_DPI: f64 = 90.0;

/// Highest accepted `DPI`; pre-supplied images are scaled by at most
/// `MAX_DPI / BASE_DPI`.
pub const MAX_DPI: f64 = 1200.0;

/// Which flavour of legend image the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendType {
    #[default]
    Default,
    Thumbnail,
    Tooltip,
}

impl LegendType {
    /// Parse the TYPE parameter (case-insensitive, unknown values mean default).
    pub fn from_param(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "thumbnail" => Self::Thumbnail,
            "tooltip" => Self::Tooltip,
            _ => Self::Default,
        }
    }

    /// File name suffix used for type-specific legend images.
    pub fn file_suffix(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Thumbnail => Some("thumbnail"),
            Self::Tooltip => Some("tooltip"),
        }
    }
}

/// One requested layer with its style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedLayer {
    pub name: String,
    pub style: String,
}

impl RequestedLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: String::new(),
        }
    }

    /// Split the LAYER and STYLES parameters into layer/style pairs.
    ///
    /// Missing styles are padded with empty strings; surplus styles are
    /// ignored.
    pub fn parse_list(layers: &str, styles: &str) -> LegendResult<Vec<RequestedLayer>> {
        let names: Vec<&str> = layers
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            return Err(LegendError::MissingParameter("LAYER".to_string()));
        }

        let mut styles = styles.split(',').map(str::trim);
        Ok(names
            .into_iter()
            .map(|name| RequestedLayer {
                name: name.to_string(),
                style: styles.next().unwrap_or_default().to_string(),
            })
            .collect())
    }
}

/// Pass-through parameters of a legend request, keyed by lowercase name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendParams {
    params: BTreeMap<String, String>,
}

impl LegendParams {
    /// Pick the known pass-through parameters out of a raw query map.
    ///
    /// Keys are matched case-insensitively; empty values are dropped.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let params = query
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim()))
            .filter(|(k, v)| !v.is_empty() && PASSTHROUGH_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.params.insert(key.to_lowercase(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Requested DPI, if any. Must lie in `(0, MAX_DPI]`.
    pub fn dpi(&self) -> LegendResult<Option<f64>> {
        let Some(raw) = self.get("dpi") else {
            return Ok(None);
        };
        let invalid = |message: String| LegendError::InvalidParameter {
            param: "DPI".to_string(),
            message,
        };

        let dpi = raw
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| invalid(format!("'{}' is not a positive number", raw)))?;
        if dpi > MAX_DPI {
            return Err(invalid(format!("{} exceeds the maximum of {}", raw, MAX_DPI)));
        }
        Ok(Some(dpi))
    }

    /// Scale factor to apply to pre-supplied images, `None` when unscaled.
    pub fn image_scale(&self) -> LegendResult<Option<f64>> {
        Ok(self
            .dpi()?
            .filter(|dpi| (*dpi - BASE_DPI).abs() > f64::EPSILON)
            .map(|dpi| dpi / BASE_DPI))
    }

    pub fn transparent(&self) -> bool {
        self.get("transparent")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}
