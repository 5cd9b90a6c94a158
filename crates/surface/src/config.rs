//! Viewer configuration.
//!
//! Defaults describe the Pará de Minas deployment. The only value without a
//! usable default is the MapTiler API key, which must be supplied by the
//! host (page bootstrap JSON or environment).

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://api.maptiler.com";
pub const DEFAULT_STYLE_ID: &str = "0198c90f-3b4c-7b60-ac28-d71632db167c";
pub const DEFAULT_DATASET_ID: &str = "0198cc6d-4785-73df-a953-ead9851afbb0";
pub const DEFAULT_DATA_CRS: &str = "EPSG:31983";
pub const DEFAULT_DATA_PROJ: &str = "+proj=utm +zone=23 +south +datum=WGS84 +units=m +no_defs";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const MAPTILER_ATTRIBUTION: &str =
    r#"<a href="https://www.maptiler.com/copyright/" target="_blank">&copy; MapTiler</a>"#;

/// Town center, geographic lon/lat.
pub const DEFAULT_CENTER: [f64; 2] = [-44.611_09, -19.853_29];
/// Web mercator bounds the view may not leave.
pub const DEFAULT_EXTENT: [f64; 4] = [-4_989_000.0, -2_271_000.0, -4_948_000.0, -2_235_000.0];

pub const DEFAULT_FETCH_TIMEOUT_MS: f64 = 15_000.0;

/// Env vars checked, in order, for the MapTiler key.
pub const API_KEY_VARS: [&str; 2] = ["MAPTILER_KEY", "VITE_MAPTILER_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeocoderSettings {
    pub language: String,
    pub country: String,
    /// Results near this lon/lat rank higher.
    pub proximity: [f64; 2],
    /// `[min_lon, min_lat, max_lon, max_lat]`.
    pub bbox: [f64; 4],
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            language: "pt".to_string(),
            country: "br".to_string(),
            proximity: DEFAULT_CENTER,
            bbox: [-44.65, -19.89, -44.57, -19.82],
        }
    }
}

/// Where the manual search box looks addresses up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSettings {
    pub endpoint: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub country_codes: String,
    pub limit: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            city: "Pará de Minas".to_string(),
            state: "Minas Gerais".to_string(),
            country: "Brasil".to_string(),
            country_codes: "br".to_string(),
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub api_key: String,
    pub api_base: String,
    pub style_id: String,
    pub dataset_id: String,
    /// Code and proj-string of the system the overlay data is authored in.
    pub data_crs: String,
    pub data_proj: String,
    /// Initial center, geographic lon/lat.
    pub center: [f64; 2],
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub extent: [f64; 4],
    /// Snap to whole zoom levels once an animation settles.
    pub constrain_resolution: bool,
    /// Remote requests still pending after this long fail as timeouts.
    pub fetch_timeout_ms: f64,
    pub tooltip_enabled: bool,
    pub marker_icon: String,
    /// Canvas size used until the host reports the real one.
    pub canvas_size: [f64; 2],
    pub geocoder: GeocoderSettings,
    pub search: SearchSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            style_id: DEFAULT_STYLE_ID.to_string(),
            dataset_id: DEFAULT_DATASET_ID.to_string(),
            data_crs: DEFAULT_DATA_CRS.to_string(),
            data_proj: DEFAULT_DATA_PROJ.to_string(),
            center: DEFAULT_CENTER,
            zoom: 14.0,
            min_zoom: 13.0,
            max_zoom: 18.0,
            extent: DEFAULT_EXTENT,
            constrain_resolution: true,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            tooltip_enabled: false,
            marker_icon: layers::markers::DEFAULT_MARKER_ICON.to_string(),
            canvas_size: [1280.0, 720.0],
            geocoder: GeocoderSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingApiKey,
    InvalidApiKey,
    InvalidZoomRange { min: f64, max: f64, initial: f64 },
    InvalidExtent([f64; 4]),
    InvalidTimeout(f64),
    InvalidNumber { key: String, value: String },
    Json(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingApiKey => write!(
                f,
                "MapTiler API key is missing (set {} or {})",
                API_KEY_VARS[0], API_KEY_VARS[1]
            ),
            ConfigError::InvalidApiKey => {
                write!(f, "MapTiler API key contains unexpected characters")
            }
            ConfigError::InvalidZoomRange { min, max, initial } => {
                write!(f, "invalid zoom range: min={min} max={max} initial={initial}")
            }
            ConfigError::InvalidExtent(e) => write!(f, "invalid view extent: {e:?}"),
            ConfigError::InvalidTimeout(ms) => {
                write!(f, "fetch timeout must be a positive number of ms, got {ms}")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a number, got {value:?}")
            }
            ConfigError::Json(e) => write!(f, "config JSON error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ViewerConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(payload).map_err(|e| ConfigError::Json(e.to_string()))
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an environment-like lookup. Unset keys keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(key) = API_KEY_VARS.iter().find_map(|&k| lookup(k)) {
            config.api_key = key;
        }

        let text = |key: &str, target: &mut String| {
            if let Some(v) = lookup(key) {
                *target = v;
            }
        };
        text("VIEWER_API_BASE", &mut config.api_base);
        text("VIEWER_STYLE_ID", &mut config.style_id);
        text("VIEWER_DATASET_ID", &mut config.dataset_id);
        text("VIEWER_SEARCH_ENDPOINT", &mut config.search.endpoint);

        let number = |key: &str, target: &mut f64| -> Result<(), ConfigError> {
            if let Some(v) = lookup(key) {
                *target = v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                    key: key.to_string(),
                    value: v.clone(),
                })?;
            }
            Ok(())
        };
        number("VIEWER_ZOOM", &mut config.zoom)?;
        number("VIEWER_MIN_ZOOM", &mut config.min_zoom)?;
        number("VIEWER_MAX_ZOOM", &mut config.max_zoom)?;
        number("VIEWER_FETCH_TIMEOUT_MS", &mut config.fetch_timeout_ms)?;

        if let Some(v) = lookup("VIEWER_TOOLTIP") {
            config.tooltip_enabled = matches!(v.trim(), "1" | "true" | "yes" | "on");
        }

        Ok(config)
    }

    /// Checks everything that can be checked without a projection registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidApiKey);
        }

        let zooms_ok = [self.min_zoom, self.max_zoom, self.zoom]
            .iter()
            .all(|z| z.is_finite() && (0.0..=28.0).contains(z))
            && self.min_zoom <= self.max_zoom;
        if !zooms_ok {
            return Err(ConfigError::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
                initial: self.zoom,
            });
        }

        if !foundation::Extent::from_array(self.extent).is_valid() {
            return Err(ConfigError::InvalidExtent(self.extent));
        }
        if !(self.fetch_timeout_ms.is_finite() && self.fetch_timeout_ms > 0.0) {
            return Err(ConfigError::InvalidTimeout(self.fetch_timeout_ms));
        }
        Ok(())
    }

    fn key_param(&self) -> String {
        urlencoding::encode(self.api_key.trim()).into_owned()
    }

    /// Basemap style document.
    pub fn style_url(&self) -> String {
        format!(
            "{}/maps/{}/style.json?key={}",
            self.api_base.trim_end_matches('/'),
            self.style_id,
            self.key_param()
        )
    }

    /// Overlay feature collection.
    pub fn features_url(&self) -> String {
        format!(
            "{}/data/{}/features.json?key={}",
            self.api_base.trim_end_matches('/'),
            self.dataset_id,
            self.key_param()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ViewerConfig};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn missing_key_fails_validation() {
        let config = ViewerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));
        assert_eq!(
            ViewerConfig::with_api_key("   ").validate(),
            Err(ConfigError::MissingApiKey)
        );
    }

    #[test]
    fn key_falls_back_to_vite_variable() {
        let config = ViewerConfig::from_lookup(lookup(&[("VITE_MAPTILER_KEY", "abc123")])).unwrap();
        assert_eq!(config.api_key, "abc123");
        config.validate().unwrap();
    }

    #[test]
    fn urls_carry_the_key() {
        let config = ViewerConfig::with_api_key("k3y");
        assert_eq!(
            config.style_url(),
            "https://api.maptiler.com/maps/0198c90f-3b4c-7b60-ac28-d71632db167c/style.json?key=k3y"
        );
        assert_eq!(
            config.features_url(),
            "https://api.maptiler.com/data/0198cc6d-4785-73df-a953-ead9851afbb0/features.json?key=k3y"
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            ViewerConfig::with_api_key("a b").validate(),
            Err(ConfigError::InvalidApiKey)
        );

        let mut config = ViewerConfig::with_api_key("k");
        config.min_zoom = 19.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidZoomRange { .. })
        ));

        let err = ViewerConfig::from_lookup(lookup(&[("VIEWER_ZOOM", "close")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: "VIEWER_ZOOM".to_string(),
                value: "close".to_string()
            }
        );
    }

    #[test]
    fn json_uses_defaults_for_missing_fields() {
        let config =
            ViewerConfig::from_json_str(r#"{"apiKey": "k", "tooltipEnabled": true}"#).unwrap();
        assert_eq!(config.api_key, "k");
        assert!(config.tooltip_enabled);
        assert_eq!(config.max_zoom, 18.0);
        assert_eq!(config.geocoder.language, "pt");
        assert_eq!(config.fetch_timeout_ms, 15_000.0);
    }

    #[test]
    fn fetch_timeout_is_configurable_and_positive() {
        let config = ViewerConfig::from_lookup(lookup(&[
            ("MAPTILER_KEY", "k"),
            ("VIEWER_FETCH_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(config.fetch_timeout_ms, 2500.0);
        config.validate().unwrap();

        let mut config = ViewerConfig::with_api_key("k");
        config.fetch_timeout_ms = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout(0.0)));
        config.fetch_timeout_ms = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout(_))));
    }
}
