//! testweaver core: C# structural analysis and test skeleton generation.
//!
//! This crate contains the analysis-to-generation pipeline: tree-sitter based
//! C# analysis, project structure and existing test scanning, test case
//! synthesis, template rendering and the phased generation engine.

pub mod cancel;
pub mod config;
pub mod dotnet;
pub mod error;
pub mod generators;
pub mod heuristics;
pub mod languages;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod scanner;
pub mod templates;

pub use cancel::CancellationToken;
pub use config::GeneratorConfig;
pub use pipeline::{GenerationRequest, TestGeneratorEngine};
