pub mod cache;
pub mod circuits;
pub mod stats;
