pub mod config;
pub mod plan;

pub use config::*;
pub use plan::*;
