// src/config/mod.rs

//! Job manifest loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a manifest from disk (`loader.rs`).
//! - Validate invariants like known dependencies and acyclicity (`validate.rs`).
//! - Derive the dependency graph and admission order (`graph.rs`).

pub mod graph;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_manifest_path, load_and_validate, load_from_path};
pub use model::{JobConfig, Manifest, RawManifest, SchedulerSection, UnitKind};
