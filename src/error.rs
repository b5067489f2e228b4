use std::path::PathBuf;
use thiserror::Error;

pub type EtlResult<T> = Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Structure error: {0}")]
    Structure(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Formula rewrite error: {0}")]
    Formula(String),

    #[error("Excel read error: {0}")]
    Excel(String),

    #[error("Excel export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
