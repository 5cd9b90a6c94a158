//! Reacting to an address picked in the geocoder.
//!
//! One selection is one atomic sequence: drop the old marker, compose the
//! label, place the new marker, fly the view there. The only fallible step
//! (reprojection) runs first, so a failure leaves the map exactly as it was.

use formats::{AddressProperties, SelectEvent};
use foundation::Millis;
use foundation::math::{Coord, EPSG_4326, ProjectionError, ProjectionRegistry};
use layers::markers::MapMarker;
use tracing::{debug, info};

use crate::map::MapSurface;

/// Zoom level the view settles at after a selection.
pub const SELECT_ZOOM: f64 = 18.0;
pub const SELECT_DURATION_MS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// The event carried no feature; nothing changed.
    Ignored,
    Placed(MapMarker),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    Reproject(ProjectionError),
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionError::Reproject(e) => write!(f, "cannot place selected address: {e}"),
        }
    }
}

impl std::error::Error for SelectionError {}

impl From<ProjectionError> for SelectionError {
    fn from(value: ProjectionError) -> Self {
        SelectionError::Reproject(value)
    }
}

/// Stateless between calls apart from a counter; each selection completes
/// before `on_address_selected` returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressSelectionHandler {
    placed: u64,
}

impl AddressSelectionHandler {
    /// Number of markers placed so far.
    pub fn placed(&self) -> u64 {
        self.placed
    }

    pub fn on_address_selected(
        &mut self,
        registry: &ProjectionRegistry,
        surface: &mut MapSurface,
        event: &SelectEvent,
        now: Millis,
    ) -> Result<SelectionOutcome, SelectionError> {
        let Some(feature) = &event.feature else {
            debug!("select event without a feature; ignoring");
            return Ok(SelectionOutcome::Ignored);
        };

        let position: Coord =
            registry.transform(EPSG_4326, surface.display_crs(), feature.coordinates)?;

        surface.markers.source.clear();

        let marker = MapMarker {
            position,
            label: compose_label(&feature.properties),
            full_address: feature.properties.formatted.clone(),
        };
        surface.markers.source.add(marker.clone());
        surface.set_viewport(position, SELECT_ZOOM, Some(SELECT_DURATION_MS), now);

        self.placed += 1;
        info!(
            label = %marker.label,
            lon = feature.coordinates.x,
            lat = feature.coordinates.y,
            "address selected"
        );
        Ok(SelectionOutcome::Placed(marker))
    }
}

/// `street[, housenumber][ - neighborhood]`, each part only when present.
pub fn compose_label(properties: &AddressProperties) -> String {
    let mut label = properties.street.clone().unwrap_or_default();
    if let Some(number) = &properties.housenumber {
        label.push_str(", ");
        label.push_str(number);
    }
    if let Some(neighborhood) = &properties.neighborhood {
        label.push_str(" - ");
        label.push_str(neighborhood);
    }
    label
}

#[cfg(test)]
mod tests {
    use super::{AddressSelectionHandler, SelectionError, SelectionOutcome, compose_label};
    use crate::config::ViewerConfig;
    use crate::map::MapSurface;
    use formats::{AddressProperties, GeocodedFeature, SelectEvent};
    use foundation::Millis;
    use foundation::math::{
        Coord, EPSG_3857, EPSG_4326, ProjectionError, ProjectionRegistry, lon_lat_to_web_mercator,
    };
    use pretty_assertions::assert_eq;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn surface() -> MapSurface {
        let config = ViewerConfig::with_api_key("k");
        MapSurface::new(&config, lon_lat_to_web_mercator(Coord::from(config.center)))
    }

    fn props(street: Option<&str>, number: Option<&str>, hood: Option<&str>) -> AddressProperties {
        AddressProperties {
            street: street.map(str::to_string),
            housenumber: number.map(str::to_string),
            neighborhood: hood.map(str::to_string),
            formatted: Some("Rua A, 10, Centro, Pará de Minas - MG".to_string()),
            ..AddressProperties::default()
        }
    }

    fn event(lon: f64, lat: f64, properties: AddressProperties) -> SelectEvent {
        SelectEvent::with_feature(GeocodedFeature::new(Coord::new(lon, lat), properties))
    }

    #[test]
    fn label_joins_present_fields_in_order() {
        assert_eq!(
            compose_label(&props(Some("Rua A"), Some("10"), Some("Centro"))),
            "Rua A, 10 - Centro"
        );
        assert_eq!(
            compose_label(&props(Some("Rua A"), None, Some("Centro"))),
            "Rua A - Centro"
        );
        assert_eq!(compose_label(&props(Some("Rua A"), None, None)), "Rua A");
        assert_eq!(compose_label(&props(None, Some("10"), None)), ", 10");
    }

    #[test]
    fn empty_address_yields_empty_label_not_formatted() {
        let mut surface = surface();
        let mut handler = AddressSelectionHandler::default();
        let outcome = handler
            .on_address_selected(
                &ProjectionRegistry::new(),
                &mut surface,
                &event(-44.61, -19.85, props(None, None, None)),
                Millis(0.0),
            )
            .unwrap();
        let SelectionOutcome::Placed(marker) = outcome else {
            panic!("expected a marker");
        };
        assert_eq!(marker.label, "");
        assert_eq!(
            marker.full_address.as_deref(),
            Some("Rua A, 10, Centro, Pará de Minas - MG")
        );
    }

    #[test]
    fn second_selection_replaces_the_first() {
        let registry = ProjectionRegistry::new();
        let mut surface = surface();
        let mut handler = AddressSelectionHandler::default();
        let a = event(-44.60, -19.86, props(Some("Rua A"), None, None));
        let b = event(-44.62, -19.84, props(Some("Rua B"), None, None));

        handler
            .on_address_selected(&registry, &mut surface, &a, Millis(0.0))
            .unwrap();
        handler
            .on_address_selected(&registry, &mut surface, &b, Millis(200.0))
            .unwrap();

        assert_eq!(surface.markers.source.len(), 1);
        let marker = surface.markers.source.marker().unwrap();
        assert_eq!(marker.label, "Rua B");
        let expected = registry
            .transform(EPSG_4326, EPSG_3857, Coord::new(-44.62, -19.84))
            .unwrap();
        assert_eq!(marker.position, expected);
        assert_eq!(handler.placed(), 2);
    }

    #[test]
    fn event_without_feature_changes_nothing() {
        let registry = ProjectionRegistry::new();
        let mut surface = surface();
        let mut handler = AddressSelectionHandler::default();
        handler
            .on_address_selected(
                &registry,
                &mut surface,
                &event(-44.60, -19.86, props(Some("Rua A"), None, None)),
                Millis(0.0),
            )
            .unwrap();
        surface.tick(Millis(5000.0));
        let before = surface.clone();

        let outcome = handler
            .on_address_selected(&registry, &mut surface, &SelectEvent::empty(), Millis(6000.0))
            .unwrap();
        assert_eq!(outcome, SelectionOutcome::Ignored);
        assert_eq!(surface, before);
        assert_eq!(handler.placed(), 1);
    }

    #[test]
    fn view_flies_to_selection_at_zoom_18() {
        let registry = ProjectionRegistry::new();
        let mut surface = surface();
        surface.set_viewport(surface.viewport().center, 13.0, None, Millis(0.0));
        let mut handler = AddressSelectionHandler::default();
        handler
            .on_address_selected(
                &registry,
                &mut surface,
                &event(-44.615, -19.858, props(Some("Rua A"), Some("10"), Some("Centro"))),
                Millis(100.0),
            )
            .unwrap();
        assert!(surface.view().is_animating());
        assert_eq!(surface.view().target().zoom, 18.0);

        surface.tick(Millis(600.0));
        assert!(surface.viewport().zoom > 13.0 && surface.viewport().zoom < 18.0);

        surface.tick(Millis(1100.0));
        let expected = registry
            .transform(EPSG_4326, EPSG_3857, Coord::new(-44.615, -19.858))
            .unwrap();
        assert_eq!(surface.viewport().zoom, 18.0);
        assert_close(surface.viewport().center.x, expected.x, 1e-6);
        assert_close(surface.viewport().center.y, expected.y, 1e-6);
    }

    #[test]
    fn failed_reprojection_leaves_map_untouched() {
        let registry = ProjectionRegistry::new();
        let mut surface = surface();
        let mut handler = AddressSelectionHandler::default();
        let before = surface.clone();
        let err = handler
            .on_address_selected(
                &registry,
                &mut surface,
                &event(f64::NAN, -19.85, props(Some("Rua A"), None, None)),
                Millis(0.0),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SelectionError::Reproject(ProjectionError::OutOfDomain { .. })
        ));
        assert_eq!(surface, before);
    }
}
