use serde::Serialize;
use surface::config::ViewerConfig;

/// Options for the geocoding control embedded in the page, biased towards
/// the town.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocoderControlOptions {
    pub api_key: String,
    pub language: String,
    pub country: String,
    pub proximity: [f64; 2],
    pub bbox: [f64; 4],
}

impl GeocoderControlOptions {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            api_key: config.api_key.trim().to_string(),
            language: config.geocoder.language.clone(),
            country: config.geocoder.country.clone(),
            proximity: config.geocoder.proximity,
            bbox: config.geocoder.bbox,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::GeocoderControlOptions;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use surface::config::ViewerConfig;

    #[test]
    fn serializes_for_the_control() {
        let options = GeocoderControlOptions::from_config(&ViewerConfig::with_api_key("k"));
        let value: serde_json::Value = serde_json::from_str(&options.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "apiKey": "k",
                "language": "pt",
                "country": "br",
                "proximity": [-44.61109, -19.85329],
                "bbox": [-44.65, -19.89, -44.57, -19.82]
            })
        );
    }
}
