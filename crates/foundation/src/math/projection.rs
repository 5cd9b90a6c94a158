//! Coordinate reference system registry.
//!
//! Codes are registered explicitly on a `ProjectionRegistry` owned by the
//! application context. Every transform goes through geographic WGS84
//! lon/lat, and any code that was never registered is an error.

use std::collections::BTreeMap;

use super::{
    Coord, Ellipsoid, TransverseMercator, lon_lat_to_web_mercator, web_mercator_to_lon_lat,
};

/// Geographic lon/lat on WGS84.
pub const EPSG_4326: &str = "EPSG:4326";
/// Spherical (web) mercator, the display system of the map surface.
pub const EPSG_3857: &str = "EPSG:3857";

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    UnknownCrs(String),
    InvalidDefinition { code: String, reason: String },
    ConflictingDefinition(String),
    OutOfDomain { code: String, coord: Coord },
}

impl std::fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::UnknownCrs(code) => {
                write!(f, "coordinate system {code} is not registered")
            }
            ProjectionError::InvalidDefinition { code, reason } => {
                write!(f, "invalid definition for {code}: {reason}")
            }
            ProjectionError::ConflictingDefinition(code) => {
                write!(f, "{code} is already registered with a different definition")
            }
            ProjectionError::OutOfDomain { code, coord } => {
                write!(f, "({}, {}) is outside the domain of {code}", coord.x, coord.y)
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

/// A parsed projection definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjDefinition {
    Geographic,
    WebMercator,
    TransverseMercator(TransverseMercator),
}

impl ProjDefinition {
    /// Parses a proj-string such as
    /// `+proj=utm +zone=23 +south +datum=WGS84 +units=m +no_defs`.
    ///
    /// Supported: `longlat`, `merc` (spherical, `+a=+b=6378137`), `utm` and
    /// `tmerc` with `lat_0=0`. Datum shifts are not supported.
    pub fn parse(code: &str, proj_string: &str) -> Result<Self, ProjectionError> {
        let invalid = |reason: String| ProjectionError::InvalidDefinition {
            code: code.to_string(),
            reason,
        };

        let mut params: BTreeMap<String, Option<String>> = BTreeMap::new();
        for token in proj_string.split_whitespace() {
            let Some(token) = token.strip_prefix('+') else {
                return Err(invalid(format!("expected +param, got {token:?}")));
            };
            match token.split_once('=') {
                Some((k, v)) => params.insert(k.to_ascii_lowercase(), Some(v.to_string())),
                None => params.insert(token.to_ascii_lowercase(), None),
            };
        }

        let value = |key: &str| params.get(key).and_then(|v| v.as_deref());
        let number = |key: &str, default: f64| -> Result<f64, ProjectionError> {
            match value(key) {
                None => Ok(default),
                Some(raw) => raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| invalid(format!("+{key} is not a number: {raw:?}"))),
            }
        };

        let ellipsoid = match (value("datum"), value("ellps")) {
            (Some(datum), _) if datum.eq_ignore_ascii_case("WGS84") => Ellipsoid::WGS84,
            (Some(datum), _) => return Err(invalid(format!("unsupported datum {datum}"))),
            (None, Some(ellps)) => Ellipsoid::by_name(ellps)
                .ok_or_else(|| invalid(format!("unsupported ellipsoid {ellps}")))?,
            (None, None) => Ellipsoid::WGS84,
        };
        if params.contains_key("towgs84") {
            return Err(invalid("datum shifts (+towgs84) are not supported".to_string()));
        }
        if let Some(units) = value("units")
            && units != "m"
        {
            return Err(invalid(format!("unsupported units {units}")));
        }

        let proj = value("proj").ok_or_else(|| invalid("missing +proj".to_string()))?;
        match proj {
            "longlat" | "latlong" | "lonlat" | "latlon" => Ok(ProjDefinition::Geographic),
            "merc" => {
                let a = number("a", ellipsoid.a)?;
                let b = number("b", a)?;
                if a != b || a != super::WGS84_A {
                    return Err(invalid(
                        "only the spherical web mercator (+a=+b=6378137) is supported".to_string(),
                    ));
                }
                Ok(ProjDefinition::WebMercator)
            }
            "utm" => {
                let raw = value("zone").ok_or_else(|| invalid("utm requires +zone".to_string()))?;
                let zone: u8 = raw
                    .parse()
                    .ok()
                    .filter(|z| (1..=60).contains(z))
                    .ok_or_else(|| invalid(format!("utm zone must be 1..=60, got {raw:?}")))?;
                let south = params.contains_key("south");
                Ok(ProjDefinition::TransverseMercator(TransverseMercator::utm(
                    zone, south, ellipsoid,
                )))
            }
            "tmerc" => {
                if number("lat_0", 0.0)? != 0.0 {
                    return Err(invalid("tmerc with a non-zero +lat_0 is not supported".to_string()));
                }
                let k0 = match value("k_0") {
                    Some(_) => number("k_0", 1.0)?,
                    None => number("k", 1.0)?,
                };
                Ok(ProjDefinition::TransverseMercator(TransverseMercator {
                    ellipsoid,
                    lon0_deg: number("lon_0", 0.0)?,
                    k0,
                    false_easting: number("x_0", 0.0)?,
                    false_northing: number("y_0", 0.0)?,
                }))
            }
            other => Err(invalid(format!("unsupported projection {other}"))),
        }
    }

    fn to_lon_lat(&self, coord: Coord) -> Coord {
        match self {
            ProjDefinition::Geographic => coord,
            ProjDefinition::WebMercator => web_mercator_to_lon_lat(coord),
            ProjDefinition::TransverseMercator(tm) => tm.inverse(coord),
        }
    }

    fn from_lon_lat(&self, lon_lat: Coord) -> Coord {
        match self {
            ProjDefinition::Geographic => lon_lat,
            ProjDefinition::WebMercator => lon_lat_to_web_mercator(lon_lat),
            ProjDefinition::TransverseMercator(tm) => tm.forward(lon_lat),
        }
    }
}

/// Registry of named coordinate systems.
///
/// Starts with `EPSG:4326` and `EPSG:3857`. Codes compare case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRegistry {
    definitions: BTreeMap<String, ProjDefinition>,
}

impl Default for ProjectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionRegistry {
    pub fn new() -> Self {
        let mut definitions = BTreeMap::new();
        definitions.insert(EPSG_4326.to_string(), ProjDefinition::Geographic);
        definitions.insert(EPSG_3857.to_string(), ProjDefinition::WebMercator);
        Self { definitions }
    }

    /// Registers `code` from a proj-string.
    ///
    /// Registering an equivalent definition again is a no-op. A different
    /// definition under an existing code is rejected.
    pub fn register(&mut self, code: &str, proj_string: &str) -> Result<(), ProjectionError> {
        let definition = ProjDefinition::parse(code, proj_string)?;
        self.register_definition(code, definition)
    }

    pub fn register_definition(
        &mut self,
        code: &str,
        definition: ProjDefinition,
    ) -> Result<(), ProjectionError> {
        let key = normalize_code(code);
        match self.definitions.get(&key) {
            Some(existing) if *existing == definition => Ok(()),
            Some(_) => Err(ProjectionError::ConflictingDefinition(key)),
            None => {
                self.definitions.insert(key, definition);
                Ok(())
            }
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.definitions.contains_key(&normalize_code(code))
    }

    pub fn get(&self, code: &str) -> Result<&ProjDefinition, ProjectionError> {
        let key = normalize_code(code);
        self.definitions
            .get(&key)
            .ok_or(ProjectionError::UnknownCrs(key))
    }

    /// Registered codes in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Reprojects `coord` from `from` into `to`.
    pub fn transform(&self, from: &str, to: &str, coord: Coord) -> Result<Coord, ProjectionError> {
        let src = self.get(from)?;
        let dst = self.get(to)?;
        if !coord.is_finite() {
            return Err(ProjectionError::OutOfDomain {
                code: normalize_code(from),
                coord,
            });
        }
        if src == dst {
            return Ok(coord);
        }

        let lon_lat = src.to_lon_lat(coord);
        if !lon_lat.is_finite() || lon_lat.y.abs() > 90.0 {
            return Err(ProjectionError::OutOfDomain {
                code: normalize_code(from),
                coord,
            });
        }
        let out = dst.from_lon_lat(lon_lat);
        if !out.is_finite() {
            return Err(ProjectionError::OutOfDomain {
                code: normalize_code(to),
                coord: lon_lat,
            });
        }
        Ok(out)
    }

    /// Reprojects every coordinate in place, stopping at the first failure.
    pub fn transform_all(
        &self,
        from: &str,
        to: &str,
        coords: &mut [Coord],
    ) -> Result<(), ProjectionError> {
        for c in coords.iter_mut() {
            *c = self.transform(from, to, *c)?;
        }
        Ok(())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
