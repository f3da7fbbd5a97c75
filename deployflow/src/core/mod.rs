//! Core domain model types for deployflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Artifacts flowing between actions
//! - Actions and the stages that own them
//! - Resource references handed out by external collaborators
//! - Build specifications and compute tiers

mod action;
mod artifact;
mod buildspec;
mod compute;
mod resources;
mod stage;

pub use action::{Action, ActionProvider, BuildActionType, SourceOrigin};
pub use artifact::Artifact;
pub use buildspec::{ArtifactFiles, BuildPhase, BuildSpec, BuildSpecDocument, InstallPhase};
pub use compute::{map_compute, ComputeSize, ComputeTier};
pub use resources::{
    AssetRef, BucketCache, BucketRef, CacheStore, Credential, DistributionRef, FunctionRef,
    FunctionSpec, Grant, Permission, PolicyStatement, Principal, ProjectRef, ProjectSpec,
    RegistryRef, RepoRef, DEFAULT_BUILD_IMAGE,
};
pub use stage::Stage;
