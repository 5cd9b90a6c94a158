//! Data contract for the geocoding control's `select` event.
//!
//! The control hands over loosely shaped JSON:
//! `{feature?: {geometry: {coordinates: [lon, lat]}, center?: [lon, lat], properties: {...}}}`.
//! Everything is validated here, once, before the selection handler sees it.

use std::collections::BTreeMap;

use foundation::math::Coord;
use serde_json::{Map, Value};

use crate::feature_collection::parse_coord;

/// Structured address fields of a geocoded feature. Empty strings are
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressProperties {
    pub street: Option<String>,
    pub housenumber: Option<String>,
    pub neighborhood: Option<String>,
    /// Full display string from the geocoding service.
    pub formatted: Option<String>,
    /// Locale-specific context entries, kept verbatim.
    pub extra: BTreeMap<String, Value>,
}

const STREET: &str = "street";
const HOUSENUMBER: &str = "housenumber";
const NEIGHBORHOOD: &str = "neighborhood";
const FORMATTED: &str = "formatted";

impl AddressProperties {
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let street = map.remove(STREET).and_then(text_value);
        let housenumber = map.remove(HOUSENUMBER).and_then(text_value);
        let neighborhood = map.remove(NEIGHBORHOOD).and_then(text_value);
        let formatted = map.remove(FORMATTED).and_then(text_value);
        Self {
            street,
            housenumber,
            neighborhood,
            formatted,
            extra: map.into_iter().collect(),
        }
    }
}

fn text_value(v: Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A validated geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedFeature {
    /// Geographic lon/lat (EPSG:4326).
    pub coordinates: Coord,
    pub properties: AddressProperties,
}

impl GeocodedFeature {
    pub fn new(coordinates: Coord, properties: AddressProperties) -> Self {
        Self {
            coordinates,
            properties,
        }
    }
}

/// A validated `select` event. `feature` is `None` when the control emitted
/// an empty selection (e.g. the input was cleared).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectEvent {
    pub feature: Option<GeocodedFeature>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventContractError {
    Json(String),
    NotAnObject,
    InvalidFeature(String),
}

impl std::fmt::Display for EventContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventContractError::Json(e) => write!(f, "select event is not valid JSON: {e}"),
            EventContractError::NotAnObject => write!(f, "select event must be an object"),
            EventContractError::InvalidFeature(reason) => {
                write!(f, "select event feature is malformed: {reason}")
            }
        }
    }
}

impl std::error::Error for EventContractError {}

impl SelectEvent {
    pub fn empty() -> Self {
        Self { feature: None }
    }

    pub fn with_feature(feature: GeocodedFeature) -> Self {
        Self {
            feature: Some(feature),
        }
    }

    pub fn from_json_str(payload: &str) -> Result<Self, EventContractError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| EventContractError::Json(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EventContractError> {
        let Value::Object(mut obj) = value else {
            return Err(EventContractError::NotAnObject);
        };
        match obj.remove("feature") {
            None | Some(Value::Null) => Ok(Self::empty()),
            Some(feature) => parse_feature(feature).map(Self::with_feature),
        }
    }
}

fn parse_feature(value: Value) -> Result<GeocodedFeature, EventContractError> {
    let invalid = |reason: &str| EventContractError::InvalidFeature(reason.to_string());

    let Value::Object(mut obj) = value else {
        return Err(invalid("feature must be an object"));
    };

    let coordinates = feature_position(&obj).map_err(EventContractError::InvalidFeature)?;
    if !coordinates.is_finite()
        || coordinates.x.abs() > 180.0
        || coordinates.y.abs() > 90.0
    {
        return Err(invalid("coordinates are not a valid longitude/latitude"));
    }

    let properties = match obj.remove("properties") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(invalid("properties must be an object")),
    };

    Ok(GeocodedFeature::new(
        coordinates,
        AddressProperties::from_map(properties),
    ))
}

/// Point geometries carry the position directly. Areal results (a whole
/// street or district) fall back to the feature's `center`.
fn feature_position(obj: &Map<String, Value>) -> Result<Coord, String> {
    let geometry = obj.get("geometry").and_then(Value::as_object);
    let geometry_type = geometry.and_then(|g| g.get("type")).and_then(Value::as_str);
    let point = geometry
        .filter(|_| geometry_type.is_none_or(|t| t == "Point"))
        .and_then(|g| g.get("coordinates"));

    match (point, obj.get("center")) {
        (Some(coords), _) => parse_coord(coords),
        (None, Some(center)) => parse_coord(center),
        (None, None) => Err("feature has neither point coordinates nor a center".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressProperties, EventContractError, SelectEvent};
    use foundation::math::Coord;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn absent_or_null_feature_is_an_empty_selection() {
        assert_eq!(SelectEvent::from_value(json!({})).unwrap(), SelectEvent::empty());
        assert_eq!(
            SelectEvent::from_value(json!({"feature": null})).unwrap(),
            SelectEvent::empty()
        );
    }

    #[test]
    fn point_feature_with_address_fields() {
        let event = SelectEvent::from_value(json!({
            "feature": {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-44.6111, -19.8533]},
                "properties": {
                    "street": "Rua A",
                    "housenumber": 10,
                    "neighborhood": "",
                    "formatted": "Rua A, 10, Pará de Minas - MG",
                    "context": [{"text": "Pará de Minas"}]
                }
            }
        }))
        .unwrap();

        let feature = event.feature.expect("feature");
        assert_eq!(feature.coordinates, Coord::new(-44.6111, -19.8533));
        assert_eq!(feature.properties.street.as_deref(), Some("Rua A"));
        assert_eq!(feature.properties.housenumber.as_deref(), Some("10"));
        assert_eq!(feature.properties.neighborhood, None);
        assert_eq!(
            feature.properties.formatted.as_deref(),
            Some("Rua A, 10, Pará de Minas - MG")
        );
        assert!(feature.properties.extra.contains_key("context"));
    }

    #[test]
    fn areal_feature_uses_center() {
        let event = SelectEvent::from_value(json!({
            "feature": {
                "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]},
                "center": [-44.6, -19.85]
            }
        }))
        .unwrap();
        let feature = event.feature.unwrap();
        assert_eq!(feature.coordinates, Coord::new(-44.6, -19.85));
        assert_eq!(feature.properties, AddressProperties::default());
    }

    #[test]
    fn malformed_features_are_contract_errors() {
        for bad in [
            json!({"feature": 3}),
            json!({"feature": {"geometry": {"coordinates": ["a", "b"]}}}),
            json!({"feature": {"geometry": {"coordinates": [200.0, 0.0]}}}),
            json!({"feature": {"properties": {}}}),
            json!({"feature": {"geometry": {"coordinates": [1.0, 2.0]}, "properties": []}}),
        ] {
            assert!(
                matches!(
                    SelectEvent::from_value(bad.clone()),
                    Err(EventContractError::InvalidFeature(_))
                ),
                "expected {bad} to be rejected"
            );
        }
        assert_eq!(
            SelectEvent::from_value(json!([1, 2])),
            Err(EventContractError::NotAnObject)
        );
    }
}
