pub mod oracle;
pub mod progress;
pub mod result;
pub mod runner;
pub mod self_consistency;

pub use result::EvalResult;
pub use runner::BaselineRunner;
