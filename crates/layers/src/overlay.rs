//! Polygon overlay loaded once from a remote feature collection.
//!
//! The payload is authored in a local projected system and reprojected into
//! the display system on arrival. A failed load leaves the layer empty and
//! degraded; it never takes the map surface down with it.

use formats::{Feature, FeatureCollection, FeatureCollectionError};
use foundation::math::{Coord, ProjectionError, ProjectionRegistry};
use tracing::{debug, info, warn};

use crate::fetch::FetchError;
use crate::layer::{Layer, LayerId, LayerKind, LayerStatus};
use crate::symbology::{Color, Fill, LayerStyle, Stroke};

/// Identifies one fetch of the overlay payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayError {
    Fetch(FetchError),
    Decode(FeatureCollectionError),
    Reproject {
        feature_index: usize,
        source: ProjectionError,
    },
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayError::Fetch(e) => write!(f, "overlay fetch failed: {e}"),
            OverlayError::Decode(e) => write!(f, "overlay payload rejected: {e}"),
            OverlayError::Reproject {
                feature_index,
                source,
            } => write!(f, "could not reproject feature {feature_index}: {source}"),
        }
    }
}

impl std::error::Error for OverlayError {}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOverlayLayer {
    id: LayerId,
    pub source_url: String,
    pub data_crs: String,
    pub display_crs: String,
    pub style: LayerStyle,
    /// Features in the display system.
    features: FeatureCollection,
    status: LayerStatus,
    issued: u64,
    applied: Option<FetchTicket>,
}

impl FeatureOverlayLayer {
    pub const Z_INDEX: i32 = 1;

    pub fn new(
        id: u64,
        source_url: impl Into<String>,
        data_crs: impl Into<String>,
        display_crs: impl Into<String>,
    ) -> Self {
        Self {
            id: LayerId(id),
            source_url: source_url.into(),
            data_crs: data_crs.into(),
            display_crs: display_crs.into(),
            style: Self::default_style(),
            features: FeatureCollection::default(),
            status: LayerStatus::Pending,
            issued: 0,
            applied: None,
        }
    }

    /// Black hairline outline over a translucent blue fill.
    pub fn default_style() -> LayerStyle {
        LayerStyle::area(
            Stroke {
                color: Color::BLACK,
                width: 1.0,
            },
            Fill {
                color: Color::rgba(0, 0, 255, 0.67),
            },
        )
    }

    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }

    pub fn applied_ticket(&self) -> Option<FetchTicket> {
        self.applied
    }

    /// Issues a ticket for a new fetch of `source_url`.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        debug!(layer = self.id.0, ticket = self.issued, url = %self.source_url, "overlay fetch started");
        FetchTicket(self.issued)
    }

    /// Applies the outcome of a fetch.
    ///
    /// Completions are applied in arrival order, so when several fetches are
    /// in flight the last one to complete wins, regardless of issue order.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<String, FetchError>,
        registry: &ProjectionRegistry,
    ) -> Result<usize, OverlayError> {
        if let Some(applied) = self.applied
            && ticket < applied
        {
            debug!(
                layer = self.id.0,
                ticket = ticket.0,
                superseding = applied.0,
                "older overlay fetch completed last; applying it"
            );
        }
        self.applied = Some(ticket);

        let outcome = result
            .map_err(OverlayError::Fetch)
            .and_then(|body| self.decode(&body, registry));

        match outcome {
            Ok(features) => {
                let count = features.len();
                info!(layer = self.id.0, count, "overlay features loaded");
                self.features = features;
                self.status = LayerStatus::Ready;
                Ok(count)
            }
            Err(err) => {
                warn!(layer = self.id.0, error = %err, "overlay degraded; rendering empty");
                self.features = FeatureCollection::default();
                self.status = LayerStatus::Degraded(err.to_string());
                Err(err)
            }
        }
    }

    fn decode(
        &self,
        body: &str,
        registry: &ProjectionRegistry,
    ) -> Result<FeatureCollection, OverlayError> {
        let mut collection =
            FeatureCollection::from_geojson_str(body).map_err(OverlayError::Decode)?;
        for (feature_index, feature) in collection.features.iter_mut().enumerate() {
            let Some(geometry) = feature.geometry.as_mut() else {
                continue;
            };
            geometry
                .try_map_coords(|c| registry.transform(&self.data_crs, &self.display_crs, c))
                .map_err(|source| OverlayError::Reproject {
                    feature_index,
                    source,
                })?;
        }
        Ok(collection)
    }

    /// Top-most polygon feature containing `coord` (display system).
    pub fn feature_at(&self, coord: Coord) -> Option<&Feature> {
        self.features.features.iter().rev().find(|feature| {
            feature.geometry.as_ref().is_some_and(|g| {
                g.polygons()
                    .into_iter()
                    .any(|rings| polygon_contains(rings, coord))
            })
        })
    }
}

impl Layer for FeatureOverlayLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::FeatureOverlay
    }

    fn z_index(&self) -> i32 {
        Self::Z_INDEX
    }

    fn status(&self) -> LayerStatus {
        self.status.clone()
    }
}

/// Even-odd test against the outer ring, excluding holes.
fn polygon_contains(rings: &[Vec<Coord>], p: Coord) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    ring_contains(outer, p) && !rings[1..].iter().any(|hole| ring_contains(hole, p))
}

fn ring_contains(ring: &[Coord], p: Coord) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::{FeatureOverlayLayer, OverlayError};
    use crate::fetch::FetchError;
    use crate::layer::{Layer, LayerStatus};
    use foundation::math::{Coord, EPSG_3857, EPSG_4326, ProjectionError, ProjectionRegistry};
    use serde_json::json;

    const UTM_23S: &str = "EPSG:31983";

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn registry() -> ProjectionRegistry {
        let mut r = ProjectionRegistry::new();
        r.register(UTM_23S, "+proj=utm +zone=23 +south +datum=WGS84 +units=m +no_defs")
            .unwrap();
        r
    }

    fn layer() -> FeatureOverlayLayer {
        FeatureOverlayLayer::new(2, "https://example.test/features.json", UTM_23S, EPSG_3857)
    }

    fn square_payload() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"name": "Residencial Sul"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [540000.0, 7804000.0],
                        [541000.0, 7804000.0],
                        [541000.0, 7805000.0],
                        [540000.0, 7805000.0],
                        [540000.0, 7804000.0]
                    ]]
                }
            }]
        })
        .to_string()
    }

    #[test]
    fn loads_and_reprojects_into_display_system() {
        let registry = registry();
        let mut overlay = layer();
        assert_eq!(overlay.status(), LayerStatus::Pending);

        let ticket = overlay.begin_fetch();
        let count = overlay
            .complete_fetch(ticket, Ok(square_payload()), &registry)
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(overlay.status(), LayerStatus::Ready);

        let first = overlay.features().features[0].geometry.as_ref().unwrap().coords()[0];
        let expected = registry
            .transform(UTM_23S, EPSG_3857, Coord::new(540000.0, 7804000.0))
            .unwrap();
        assert_close(first.x, expected.x, 1e-6);
        assert_close(first.y, expected.y, 1e-6);

        let lon_lat = registry.transform(EPSG_3857, EPSG_4326, first).unwrap();
        assert!(lon_lat.x > -44.7 && lon_lat.x < -44.5, "lon {}", lon_lat.x);
        assert!(lon_lat.y > -19.9 && lon_lat.y < -19.8, "lat {}", lon_lat.y);
    }

    #[test]
    fn fetch_failure_renders_empty_and_degrades() {
        let registry = registry();
        let mut overlay = layer();
        let t1 = overlay.begin_fetch();
        overlay
            .complete_fetch(t1, Ok(square_payload()), &registry)
            .unwrap();

        let t2 = overlay.begin_fetch();
        let err = overlay
            .complete_fetch(t2, Err(FetchError::Status(503)), &registry)
            .unwrap_err();
        assert_eq!(err, OverlayError::Fetch(FetchError::Status(503)));
        assert!(overlay.features().is_empty());
        assert!(overlay.status().is_degraded());
    }

    #[test]
    fn unregistered_data_system_is_reported() {
        let registry = ProjectionRegistry::new();
        let mut overlay = layer();
        let t = overlay.begin_fetch();
        let err = overlay
            .complete_fetch(t, Ok(square_payload()), &registry)
            .unwrap_err();
        assert_eq!(
            err,
            OverlayError::Reproject {
                feature_index: 0,
                source: ProjectionError::UnknownCrs(UTM_23S.to_string()),
            }
        );
        assert!(overlay.features().is_empty());
    }

    #[test]
    fn last_completed_fetch_wins() {
        let registry = registry();
        let mut overlay = layer();
        let early = overlay.begin_fetch();
        let late = overlay.begin_fetch();

        overlay
            .complete_fetch(late, Ok(square_payload()), &registry)
            .unwrap();
        let empty = json!({"type": "FeatureCollection", "features": []}).to_string();
        overlay.complete_fetch(early, Ok(empty), &registry).unwrap();

        assert!(overlay.features().is_empty());
        assert_eq!(overlay.applied_ticket(), Some(early));
    }

    #[test]
    fn hit_test_inside_polygon() {
        let registry = registry();
        let mut overlay = layer();
        let t = overlay.begin_fetch();
        overlay
            .complete_fetch(t, Ok(square_payload()), &registry)
            .unwrap();

        let inside = registry
            .transform(UTM_23S, EPSG_3857, Coord::new(540500.0, 7804500.0))
            .unwrap();
        let outside = registry
            .transform(UTM_23S, EPSG_3857, Coord::new(542500.0, 7804500.0))
            .unwrap();
        let hit = overlay.feature_at(inside).expect("hit");
        assert_eq!(hit.string_property("name"), Some("Residencial Sul"));
        assert!(overlay.feature_at(outside).is_none());
    }
}
