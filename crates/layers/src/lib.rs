pub mod basemap;
pub mod fetch;
pub mod layer;
pub mod markers;
pub mod overlay;
pub mod symbology;
pub mod tooltip;

pub use layer::*;
