pub mod coord;
pub mod geodesy;
pub mod mercator;
pub mod projection;
pub mod tmerc;

pub use coord::*;
pub use geodesy::*;
pub use mercator::*;
pub use projection::*;
pub use tmerc::*;
