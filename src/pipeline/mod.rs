pub mod client;
pub mod stream;
pub mod types;

pub use client::{PipelineBackend, PipelineClient, QueryError};
pub use types::{ClaimCounts, QueryResult, Stage};
