//! Lightweight readers for .NET build manifests.

pub mod project;
pub mod solution;
