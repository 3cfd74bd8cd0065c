pub mod arxiv_pipeline;

pub use arxiv_pipeline::{ArxivPipeline, RunMode};
