pub mod arxiv;
pub mod atom;
pub mod code_links;
pub mod etl;
pub mod last_run;
pub mod pdf;
pub mod render;
pub mod store;

pub use crate::domain::model::{Paper, PaperIndex, PaperRows, TransformResult};
pub use crate::domain::ports::{LoadSummary, Pipeline, Storage};
pub use crate::utils::error::Result;
