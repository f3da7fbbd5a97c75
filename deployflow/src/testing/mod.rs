//! Testing utilities for deployflow pipelines.
//!
//! This module provides:
//! - Configuration fixtures for every build variant
//! - Assertions for run-order and artifact-flow invariants
//! - Failure-injecting and recording collaborators

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_artifact_flow, assert_has_grant, assert_run_orders_increasing, assert_stage_names,
};
pub use fixtures::{
    container_config, custom_config, external_config, managed_config, mobile_config,
    sample_context, sample_context_json, validated_config,
};
pub use mocks::{FailingProvider, RecordingDeployStage};
