use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Geo(#[from] geo::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Raster grid of '{path}' does not match the grid of '{reference}' ({details})")]
    GridMismatch {
        path: PathBuf,
        reference: PathBuf,
        details: String,
    },
    #[error("Missing input raster: {0}")]
    MissingInput(PathBuf),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}
