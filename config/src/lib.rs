//! Configuration types and loading for the work-item pipeline.
//!
//! Configuration is loaded once at startup into immutable typed values which are then handed to
//! every component constructor.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
