use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("invalid Excel file: {path} ({details})")]
    InvalidExcel { path: PathBuf, details: String },

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("sheet \"{name}\" not found (available: {available})")]
    SheetNotFound { name: String, available: String },

    #[error("sheet \"{sheet}\" is missing columns: {}", .missing.join(", "))]
    SchemaMismatch { sheet: String, missing: Vec<String> },

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("invalid config {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("cannot write {path}: {details}")]
    WriteConflict { path: PathBuf, details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InputNotFound(_) => 1,
            Error::InvalidExcel { .. } => 2,
            Error::UnsupportedFormat(_) => 2,
            Error::SheetNotFound { .. } => 3,
            Error::SchemaMismatch { .. } => 3,
            Error::InvalidDateRange(_) => 4,
            Error::Config { .. } => 4,
            Error::WriteConflict { .. } => 5,
            Error::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
