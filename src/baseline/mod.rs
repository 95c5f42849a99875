pub mod config;
pub mod registry;

pub use config::BaselineConfig;
pub use registry::{BaselineRegistry, REFERENCE_KEY, SINGLE_MODEL_KEY};
