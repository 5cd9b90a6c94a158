use formats::Feature;
use foundation::math::{Coord, EPSG_3857};
use foundation::{Extent, Millis};
use layers::basemap::BasemapLayer;
use layers::markers::SearchMarkerLayer;
use layers::overlay::FeatureOverlayLayer;
use layers::tooltip::TooltipOverlay;
use layers::{Layer, LayerStatus};

use crate::config::{MAPTILER_ATTRIBUTION, ViewerConfig};
use crate::viewport::{ViewConstraints, Viewport, ViewportState};

/// The system every layer renders in.
pub const DISPLAY_CRS: &str = EPSG_3857;

const BASEMAP_ID: u64 = 1;
const OVERLAY_ID: u64 = 2;
const MARKERS_ID: u64 = 3;

/// The map: a viewport over a fixed stack of layers plus the hover tooltip.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSurface {
    viewport: Viewport,
    pub basemap: BasemapLayer,
    pub overlay: FeatureOverlayLayer,
    pub markers: SearchMarkerLayer,
    pub tooltip: TooltipOverlay,
    tooltip_enabled: bool,
}

impl MapSurface {
    /// `center` must already be in the display system.
    pub fn new(config: &ViewerConfig, center: Coord) -> Self {
        let constraints = ViewConstraints {
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            extent: Extent::from_array(config.extent),
            constrain_resolution: config.constrain_resolution,
        };
        Self {
            viewport: Viewport::new(constraints, config.canvas_size, center, config.zoom),
            basemap: BasemapLayer::new(BASEMAP_ID, config.style_url(), MAPTILER_ATTRIBUTION),
            overlay: FeatureOverlayLayer::new(
                OVERLAY_ID,
                config.features_url(),
                config.data_crs.clone(),
                DISPLAY_CRS,
            ),
            markers: SearchMarkerLayer::new(MARKERS_ID, config.marker_icon.clone()),
            tooltip: TooltipOverlay::new(),
            tooltip_enabled: config.tooltip_enabled,
        }
    }

    pub fn display_crs(&self) -> &'static str {
        DISPLAY_CRS
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport.state()
    }

    pub fn view(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(
        &mut self,
        center: Coord,
        zoom: f64,
        duration_ms: Option<f64>,
        now: Millis,
    ) -> ViewportState {
        self.viewport.set(center, zoom, duration_ms, now)
    }

    pub fn resize(&mut self, size_px: [f64; 2]) {
        self.viewport.set_size(size_px);
    }

    /// Advances the viewport animation; true when a redraw is due.
    pub fn tick(&mut self, now: Millis) -> bool {
        self.viewport.tick(now)
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> Vec<&dyn Layer> {
        let mut stack: [&dyn Layer; 3] = [&self.basemap, &self.overlay, &self.markers];
        stack.sort_by_key(|l| l.z_index());
        stack.to_vec()
    }

    pub fn degraded_layers(&self) -> Vec<(&'static str, String)> {
        self.layers()
            .into_iter()
            .filter_map(|layer| match layer.status() {
                LayerStatus::Degraded(reason) => Some((layer_name(layer), reason)),
                _ => None,
            })
            .collect()
    }

    /// Top-most feature drawn at `coord`: the search marker wins over the
    /// overlay polygons beneath it.
    pub fn hit_test(&self, coord: Coord) -> Option<Feature> {
        if let Some(marker) = self.markers.marker_at(coord, self.viewport.resolution()) {
            return Some(marker.to_feature());
        }
        self.overlay.feature_at(coord).cloned()
    }

    pub fn tooltip_enabled(&self) -> bool {
        self.tooltip_enabled
    }

    pub fn set_tooltip_enabled(&mut self, enabled: bool) {
        self.tooltip_enabled = enabled;
        if !enabled {
            self.tooltip.hide();
        }
    }

    /// Pointer moved over the canvas. Returns true when the tooltip changed.
    pub fn on_pointer_move(&mut self, pixel: [f64; 2]) -> bool {
        if !self.tooltip_enabled {
            return false;
        }
        let coord = self.viewport.pixel_to_coord(pixel);
        let hovered = self.hit_test(coord);
        self.tooltip.on_pointer_move(hovered.as_ref(), coord)
    }

    pub fn on_pointer_leave(&mut self) -> bool {
        self.tooltip.hide()
    }
}

fn layer_name(layer: &dyn Layer) -> &'static str {
    match layer.kind() {
        layers::LayerKind::Basemap => "basemap",
        layers::LayerKind::FeatureOverlay => "overlay",
        layers::LayerKind::SearchMarkers => "markers",
    }
}
