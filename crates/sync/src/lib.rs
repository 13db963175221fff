pub mod commit;
pub mod config;
pub mod poll;
pub mod push;
pub mod store;

pub use store::{SharedStore, TimelineStore};
