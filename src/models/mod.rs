//! Data model shared by the pipeline, the editor and the exporter.

pub mod enums;
pub mod graph;
pub mod verification;

pub use enums::*;
pub use graph::*;
pub use verification::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
