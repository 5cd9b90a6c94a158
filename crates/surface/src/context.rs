//! Application context: everything the viewer owns, built once at startup
//! and handed to event callbacks by reference.

use formats::{EventContractError, SelectEvent};
use foundation::math::{Coord, EPSG_4326, ProjectionError, ProjectionRegistry};
use foundation::{Extent, Millis};
use layers::fetch::FetchError;
use layers::overlay::{FetchTicket, OverlayError};
use tracing::info;

use crate::config::{ConfigError, ViewerConfig};
use crate::diagnostics::{Diagnostics, Severity};
use crate::map::{DISPLAY_CRS, MapSurface};
use crate::selection::{AddressSelectionHandler, SelectionError, SelectionOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum ContextError {
    Config(ConfigError),
    Projection(ProjectionError),
    CenterOutsideExtent { center: Coord, extent: [f64; 4] },
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::Config(e) => write!(f, "{e}"),
            ContextError::Projection(e) => write!(f, "projection setup failed: {e}"),
            ContextError::CenterOutsideExtent { center, extent } => write!(
                f,
                "initial center ({}, {}) lies outside the view extent {extent:?}",
                center.x, center.y
            ),
        }
    }
}

impl std::error::Error for ContextError {}

impl From<ConfigError> for ContextError {
    fn from(value: ConfigError) -> Self {
        ContextError::Config(value)
    }
}

impl From<ProjectionError> for ContextError {
    fn from(value: ProjectionError) -> Self {
        ContextError::Projection(value)
    }
}

/// A select payload that could not be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    Contract(EventContractError),
    Selection(SelectionError),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Contract(e) => write!(f, "rejected select event: {e}"),
            DispatchError::Selection(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DispatchError {}

#[derive(Debug)]
pub struct MapContext {
    config: ViewerConfig,
    registry: ProjectionRegistry,
    surface: MapSurface,
    handler: AddressSelectionHandler,
    diagnostics: Diagnostics,
}

impl MapContext {
    /// Validates the config and registers the data projection before any
    /// layer can reproject with it.
    pub fn new(config: ViewerConfig) -> Result<Self, ContextError> {
        config.validate()?;

        let mut registry = ProjectionRegistry::new();
        registry.register(&config.data_crs, &config.data_proj)?;

        let center = registry.transform(EPSG_4326, DISPLAY_CRS, Coord::from(config.center))?;
        if !Extent::from_array(config.extent).contains(center) {
            return Err(ContextError::CenterOutsideExtent {
                center,
                extent: config.extent,
            });
        }

        let surface = MapSurface::new(&config, center);
        let handler = AddressSelectionHandler::default();
        info!(
            data_crs = %config.data_crs,
            zoom = surface.viewport().zoom,
            tooltip = config.tooltip_enabled,
            "map context ready"
        );

        Ok(Self {
            config,
            registry,
            surface,
            handler,
            diagnostics: Diagnostics::new(),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProjectionRegistry {
        &self.registry
    }

    pub fn surface(&self) -> &MapSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut MapSurface {
        &mut self.surface
    }

    pub fn handler(&self) -> &AddressSelectionHandler {
        &self.handler
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn select_address(
        &mut self,
        event: &SelectEvent,
        now: Millis,
    ) -> Result<SelectionOutcome, SelectionError> {
        let result =
            self.handler
                .on_address_selected(&self.registry, &mut self.surface, event, now);
        if let Err(err) = &result {
            self.diagnostics
                .report(now, "selection", Severity::Error, err.to_string());
        }
        result
    }

    /// Validates a raw select payload and applies it. Malformed payloads are
    /// reported and never reach the handler.
    pub fn dispatch_select(
        &mut self,
        payload: &str,
        now: Millis,
    ) -> Result<SelectionOutcome, DispatchError> {
        let event = match SelectEvent::from_json_str(payload) {
            Ok(event) => event,
            Err(err) => {
                self.diagnostics
                    .report(now, "geocoder", Severity::Warning, err.to_string());
                return Err(DispatchError::Contract(err));
            }
        };
        self.select_address(&event, now)
            .map_err(DispatchError::Selection)
    }

    /// Starts an overlay load; the caller fetches the returned URL.
    pub fn begin_overlay_fetch(&mut self) -> (FetchTicket, String) {
        let ticket = self.surface.overlay.begin_fetch();
        (ticket, self.surface.overlay.source_url.clone())
    }

    pub fn complete_overlay_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<String, FetchError>,
        now: Millis,
    ) -> Result<usize, OverlayError> {
        let outcome = self
            .surface
            .overlay
            .complete_fetch(ticket, result, &self.registry);
        if let Err(err) = &outcome {
            self.diagnostics
                .report(now, "overlay", Severity::Warning, err.to_string());
        }
        outcome
    }

    pub fn basemap_loaded(&mut self) {
        self.surface.basemap.mark_loaded();
    }

    pub fn basemap_failed(&mut self, reason: &str, now: Millis) {
        self.surface.basemap.mark_failed(reason);
        self.diagnostics.report(
            now,
            "basemap",
            Severity::Warning,
            format!("basemap style unavailable: {reason}"),
        );
    }

    /// The geocoder is the main way in, so losing it is shown to the user.
    pub fn geocoder_unavailable(&mut self, reason: &str, now: Millis) {
        self.diagnostics.report(
            now,
            "geocoder",
            Severity::Notice,
            format!("A busca de endereços está indisponível no momento ({reason})."),
        );
    }

    pub fn notify(&mut self, component: &'static str, message: impl Into<String>, now: Millis) {
        self.diagnostics
            .report(now, component, Severity::Notice, message);
    }

    pub fn tick(&mut self, now: Millis) -> bool {
        self.surface.tick(now)
    }

    pub fn pointer_move(&mut self, pixel: [f64; 2]) -> bool {
        self.surface.on_pointer_move(pixel)
    }

    pub fn resize(&mut self, size_px: [f64; 2]) {
        self.surface.resize(size_px);
    }
}

#[cfg(test)]
mod tests {
    use super::{ContextError, DispatchError, MapContext};
    use crate::config::{ConfigError, ViewerConfig};
    use crate::diagnostics::Severity;
    use crate::selection::{SELECT_DURATION_MS, SELECT_ZOOM, SelectionOutcome};
    use foundation::Millis;
    use layers::fetch::FetchError;
    use layers::{Layer, LayerStatus};
    use serde_json::json;

    fn context() -> MapContext {
        MapContext::new(ViewerConfig::with_api_key("k")).unwrap()
    }

    #[test]
    fn refuses_to_start_without_a_key() {
        let err = MapContext::new(ViewerConfig::default()).unwrap_err();
        assert_eq!(err, ContextError::Config(ConfigError::MissingApiKey));
    }

    #[test]
    fn registers_the_data_projection() {
        let ctx = context();
        assert!(ctx.registry().contains("EPSG:31983"));
    }

    #[test]
    fn bad_projection_definition_is_fatal() {
        let mut config = ViewerConfig::with_api_key("k");
        config.data_proj = "+proj=lcc +lat_1=10".to_string();
        assert!(matches!(
            MapContext::new(config),
            Err(ContextError::Projection(_))
        ));
    }

    #[test]
    fn center_must_fall_inside_extent() {
        let mut config = ViewerConfig::with_api_key("k");
        config.center = [-43.0, -19.85];
        assert!(matches!(
            MapContext::new(config),
            Err(ContextError::CenterOutsideExtent { .. })
        ));
    }

    #[test]
    fn overlay_failure_is_recorded_and_contained() {
        let mut ctx = context();
        let (ticket, url) = ctx.begin_overlay_fetch();
        assert!(url.ends_with("/features.json?key=k"));
        ctx.complete_overlay_fetch(ticket, Err(FetchError::Timeout), Millis(10.0))
            .unwrap_err();

        assert!(ctx.surface().overlay.features().is_empty());
        assert!(ctx.surface().overlay.status().is_degraded());
        assert_eq!(ctx.surface().basemap.status(), LayerStatus::Pending);
        let record = &ctx.diagnostics().records()[0];
        assert_eq!(record.component, "overlay");
        assert_eq!(record.severity, Severity::Warning);
    }

    #[test]
    fn dispatches_raw_select_payloads() {
        let mut ctx = context();
        let payload = json!({
            "feature": {
                "geometry": {"type": "Point", "coordinates": [-44.61, -19.85]},
                "properties": {"street": "Rua A", "housenumber": "10", "neighborhood": "Centro"}
            }
        });
        let outcome = ctx
            .dispatch_select(&payload.to_string(), Millis(0.0))
            .unwrap();
        let SelectionOutcome::Placed(marker) = outcome else {
            panic!("expected a marker");
        };
        assert_eq!(marker.label, "Rua A, 10 - Centro");

        assert_eq!(
            ctx.dispatch_select(r#"{"feature": null}"#, Millis(1.0)),
            Ok(SelectionOutcome::Ignored)
        );
        assert_eq!(ctx.surface().markers.source.len(), 1);

        let err = ctx
            .dispatch_select(r#"{"feature": {"properties": {}}}"#, Millis(2.0))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Contract(_)));
        assert_eq!(ctx.surface().markers.source.len(), 1);
        assert_eq!(ctx.diagnostics().records().len(), 1);
    }

    #[test]
    fn selection_zoom_and_duration_are_fixed() {
        let config = ViewerConfig::from_json_str(
            r#"{"apiKey": "k", "selectZoom": 12, "selectDurationMs": 5}"#,
        )
        .unwrap();
        let mut ctx = MapContext::new(config).unwrap();
        let payload = json!({
            "feature": {
                "geometry": {"type": "Point", "coordinates": [-44.61, -19.85]},
                "properties": {"street": "Rua A"}
            }
        });
        ctx.dispatch_select(&payload.to_string(), Millis(0.0))
            .unwrap();
        assert_eq!(ctx.surface().view().target().zoom, SELECT_ZOOM);

        ctx.tick(Millis(SELECT_DURATION_MS / 2.0));
        assert!(ctx.surface().view().is_animating());
        ctx.tick(Millis(SELECT_DURATION_MS));
        assert!(!ctx.surface().view().is_animating());
        assert_eq!(ctx.surface().viewport().zoom, SELECT_ZOOM);
    }

    #[test]
    fn geocoder_outage_is_a_notice() {
        let mut ctx = context();
        ctx.geocoder_unavailable("HTTP 403", Millis(0.0));
        assert_eq!(ctx.diagnostics().notices().count(), 1);
    }
}
