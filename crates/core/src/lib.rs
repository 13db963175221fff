pub mod gesture;
pub mod model;
pub mod reconcile;
pub mod timeline;
pub mod workload;

pub use model::*;
pub use reconcile::DayBoard;
