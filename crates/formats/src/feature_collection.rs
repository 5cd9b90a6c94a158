use foundation::math::Coord;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    Polygon(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Applies a fallible transform to every coordinate, in place.
    pub fn try_map_coords<E>(
        &mut self,
        mut f: impl FnMut(Coord) -> Result<Coord, E>,
    ) -> Result<(), E> {
        let mut apply = |points: &mut Vec<Coord>| -> Result<(), E> {
            for p in points.iter_mut() {
                *p = f(*p)?;
            }
            Ok(())
        };
        match self {
            Geometry::Point(p) => {
                let mut one = vec![*p];
                apply(&mut one)?;
                *p = one[0];
            }
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => apply(ps)?,
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                for line in lines.iter_mut() {
                    apply(line)?;
                }
            }
            Geometry::MultiPolygon(polys) => {
                for poly in polys.iter_mut() {
                    for ring in poly.iter_mut() {
                        apply(ring)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Every coordinate of the geometry, in document order.
    pub fn coords(&self) -> Vec<Coord> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.clone(),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().collect(),
        }
    }

    /// Polygons as ring lists (outer ring first). Empty for non-areal geometry.
    pub fn polygons(&self) -> Vec<&[Vec<Coord>]> {
        match self {
            Geometry::Polygon(rings) => vec![rings.as_slice()],
            Geometry::MultiPolygon(polys) => polys.iter().map(Vec::as_slice).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// GeoJSON allows `"geometry": null` for unlocated features.
    pub geometry: Option<Geometry>,
}

impl Feature {
    /// String property, ignoring non-string and empty values.
    pub fn string_property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureCollectionError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for FeatureCollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureCollectionError::Json(e) => write!(f, "JSON parse error: {e}"),
            FeatureCollectionError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            FeatureCollectionError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for FeatureCollectionError {}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, FeatureCollectionError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| FeatureCollectionError::Json(e.to_string()))?;
        Self::from_geojson_value(value)
    }

    pub fn from_geojson_value(value: Value) -> Result<Self, FeatureCollectionError> {
        let obj = value
            .as_object()
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(FeatureCollectionError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(FeatureCollectionError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: String| FeatureCollectionError::InvalidFeature { index, reason };

            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object".to_string()))?;

            let feat_type = feat_obj
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or_else(|| invalid("feature missing type".to_string()))?;
            if feat_type != "Feature" {
                return Err(invalid(format!("unexpected feature type: {feat_type}")));
            }

            let id = match feat_obj.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };

            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();

            let geometry = match feat_obj.get("geometry") {
                None => return Err(invalid("feature missing geometry".to_string())),
                Some(Value::Null) => None,
                Some(g) => Some(parse_geometry(g).map_err(invalid)?),
            };

            features.push(Feature {
                id,
                properties,
                geometry,
            });
        }

        Ok(Self { features })
    }

    /// Emits a GeoJSON FeatureCollection. Property order may differ from the input.
    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );

        let features: Vec<Value> = self
            .features
            .iter()
            .map(|feat| {
                let mut fobj = Map::new();
                fobj.insert("type".to_string(), Value::String("Feature".to_string()));
                if let Some(id) = &feat.id {
                    fobj.insert("id".to_string(), Value::String(id.clone()));
                }
                fobj.insert(
                    "properties".to_string(),
                    Value::Object(feat.properties.clone()),
                );
                fobj.insert(
                    "geometry".to_string(),
                    feat.geometry
                        .as_ref()
                        .map(geometry_to_geojson_value)
                        .unwrap_or(Value::Null),
                );
                Value::Object(fobj)
            })
            .collect();

        root.insert("features".to_string(), Value::Array(features));
        Value::Object(root)
    }
}

fn geometry_to_geojson_value(geom: &Geometry) -> Value {
    let coords = match geom {
        Geometry::Point(p) => coord_value(p),
        Geometry::MultiPoint(ps) | Geometry::LineString(ps) => coords_value(ps),
        Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
            Value::Array(lines.iter().map(|l| coords_value(l)).collect())
        }
        Geometry::MultiPolygon(polys) => Value::Array(
            polys
                .iter()
                .map(|poly| Value::Array(poly.iter().map(|r| coords_value(r)).collect()))
                .collect(),
        ),
    };

    let mut obj = Map::new();
    obj.insert(
        "type".to_string(),
        Value::String(geom.type_name().to_string()),
    );
    obj.insert("coordinates".to_string(), coords);
    Value::Object(obj)
}

fn coord_value(p: &Coord) -> Value {
    Value::Array(vec![Value::from(p.x), Value::from(p.y)])
}

fn coords_value(ps: &[Coord]) -> Value {
    Value::Array(ps.iter().map(coord_value).collect())
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_coord(coords)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_coords(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_coords(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut out = Vec::with_capacity(polys.len());
            for poly in polys {
                out.push(parse_rings(poly)?);
            }
            Ok(Geometry::MultiPolygon(out))
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

/// Parses `[x, y]` or `[x, y, z]`; any third ordinate is dropped.
pub fn parse_coord(coords: &Value) -> Result<Coord, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have at least two numbers".to_string());
    }
    let x = arr[0].as_f64().ok_or("position x must be a number".to_string())?;
    let y = arr[1].as_f64().ok_or("position y must be a number".to_string())?;
    Ok(Coord::new(x, y))
}

fn parse_coords(coords: &Value) -> Result<Vec<Coord>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_coord).collect()
}

fn parse_rings(coords: &Value) -> Result<Vec<Vec<Coord>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of rings".to_string())?;
    arr.iter().map(parse_coords).collect()
}
