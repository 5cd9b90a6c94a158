pub mod feature_collection;
pub mod select_event;

pub use feature_collection::*;
pub use select_event::*;
