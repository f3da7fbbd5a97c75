//! Typed pipeline configuration.
//!
//! This module provides:
//! - The validated configuration model (tagged variants, no stringly-typed tags)
//! - Parsing from a JSON configuration tree with per-branch error paths
//! - Context documents bundling a pipeline with its deployment settings

mod context;
mod raw;
mod types;
mod validation;

pub use context::{load_context, ArchiConfig, ContextDocument, DataPipelineConfig, NetworkConfig};
pub use types::{
    BuildConfig, BuildVariant, DeployConfig, ExternalHostedRepository, ManagedRepository,
    PipelineConfig, RepoConfig, ValidateConfig,
};
pub use validation::{validate_email, validate_identifier, validate_secret_name};
