use formats::{Feature, Geometry};
use foundation::math::Coord;
use serde_json::{Map, Value};

use crate::layer::{Layer, LayerId, LayerKind};
use crate::symbology::{IconStyle, LayerStyle};

pub const DEFAULT_MARKER_ICON: &str =
    "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-2x-blue.png";

/// Pixel size of the marker image before scaling.
pub const MARKER_ICON_SIZE_PX: [f64; 2] = [50.0, 82.0];

/// The marker placed for the most recent search result.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    /// Display-system position.
    pub position: Coord,
    pub label: String,
    pub full_address: Option<String>,
}

impl MapMarker {
    /// GeoJSON-shaped feature with `name` and `fullAddress` properties, the
    /// attributes the tooltip reads.
    pub fn to_feature(&self) -> Feature {
        let mut properties = Map::new();
        properties.insert("name".to_string(), Value::String(self.label.clone()));
        if let Some(full) = &self.full_address {
            properties.insert("fullAddress".to_string(), Value::String(full.clone()));
        }
        Feature {
            id: None,
            properties,
            geometry: Some(Geometry::Point(self.position)),
        }
    }
}

/// Data source of the search marker layer. Holds zero or one marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSource {
    marker: Option<MapMarker>,
    revision: u64,
}

impl MarkerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        if self.marker.take().is_some() {
            self.revision += 1;
        }
    }

    /// Stores `marker`, returning any marker it displaced.
    pub fn add(&mut self, marker: MapMarker) -> Option<MapMarker> {
        self.revision += 1;
        self.marker.replace(marker)
    }

    pub fn marker(&self) -> Option<&MapMarker> {
        self.marker.as_ref()
    }

    pub fn len(&self) -> usize {
        usize::from(self.marker.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.marker.is_none()
    }

    /// Bumped on every change; lets renderers skip redundant redraws.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn iter(&self) -> impl Iterator<Item = &MapMarker> {
        self.marker.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchMarkerLayer {
    id: LayerId,
    pub style: LayerStyle,
    pub source: MarkerSource,
}

impl SearchMarkerLayer {
    pub const Z_INDEX: i32 = 3;

    pub fn new(id: u64, icon_src: impl Into<String>) -> Self {
        Self {
            id: LayerId(id),
            style: LayerStyle::icon(IconStyle {
                src: icon_src.into(),
                anchor: [0.5, 1.0],
                scale: 0.5,
            }),
            source: MarkerSource::new(),
        }
    }

    /// The marker whose drawn icon covers `coord`, given the current
    /// resolution in display units per pixel.
    pub fn marker_at(&self, coord: Coord, resolution: f64) -> Option<&MapMarker> {
        let scale = self.style.icon.as_ref().map_or(1.0, |i| f64::from(i.scale));
        let half_width = MARKER_ICON_SIZE_PX[0] * scale * 0.5 * resolution;
        let height = MARKER_ICON_SIZE_PX[1] * scale * resolution;
        self.source.marker().filter(|m| {
            let d = coord - m.position;
            d.x.abs() <= half_width && d.y >= 0.0 && d.y <= height
        })
    }
}

impl Layer for SearchMarkerLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn kind(&self) -> LayerKind {
        LayerKind::SearchMarkers
    }

    fn z_index(&self) -> i32 {
        Self::Z_INDEX
    }
}
