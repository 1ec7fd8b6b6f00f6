//! Project structure scanner: file discovery, project layout and existing tests.

pub mod discovery;
pub mod existing_tests;
pub mod packages;
pub mod structure;

pub use discovery::discover_files;
pub use existing_tests::{analyze_existing_tests, analyze_existing_tests_excluding};
pub use structure::analyze_project_structure;
