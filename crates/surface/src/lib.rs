//! Map state for the viewer: configuration, viewport, layer stack and the
//! address selection flow, independent of any rendering engine.

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod map;
pub mod selection;
pub mod viewport;

pub use config::{ConfigError, ViewerConfig};
pub use context::{ContextError, DispatchError, MapContext};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use map::{DISPLAY_CRS, MapSurface};
pub use selection::{AddressSelectionHandler, SelectionError, SelectionOutcome, compose_label};
pub use viewport::{ViewConstraints, Viewport, ViewportState};
