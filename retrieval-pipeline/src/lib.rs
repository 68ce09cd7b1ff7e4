#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod generation;
pub mod pipeline;
pub mod prompt;

pub use generation::{GenerationClient, GenerationOptions, GenerationStream};
pub use pipeline::QueryPipeline;
