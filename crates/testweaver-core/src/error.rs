//! Error types for analysis, scanning, configuration, templating and generation.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to analyse a single source file.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse { path: PathBuf },

    #[error("failed to load grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("no analyser registered for {0}")]
    Unsupported(PathBuf),
}

/// Failure to scan a project tree.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("project root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("scan cancelled")]
    Cancelled,
}

/// Failure to load, save or read a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("configuration I/O error: {source} (path: {path})")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to resolve or render a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{0}' not found")]
    NotFound(String),

    #[error("failed to compile template '{template}': {source}")]
    Compile {
        template: String,
        source: mustache::Error,
    },

    #[error("failed to render template '{template}': {source}")]
    Render {
        template: String,
        source: mustache::Error,
    },

    #[error("failed to load templates from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failure while synthesising or writing test files.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("I/O error: {source} (path: {path})")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("class '{0}' is not present in the analysis result")]
    MissingClass(String),

    #[error("refusing to purge {0}: it contains analysed source files")]
    UnsafeOutputDir(PathBuf),

    #[error("generation cancelled")]
    Cancelled,
}

impl GenerationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerationError::Io {
            path: path.into(),
            source,
        }
    }
}
