//! # Deployflow
//!
//! Assembles multi-stage software delivery pipelines from a typed
//! configuration tree.
//!
//! Deployflow turns a declarative configuration into a pipeline definition
//! that an external execution service runs later:
//!
//! - **Source resolution**: managed or externally hosted repositories
//! - **Build variants**: synth, container, mobile package and custom-spec builds
//! - **Validation**: rendered diagrams behind a manual approval gate, then cleanup
//! - **Run-order sequencing**: explicit ordering of dependent actions in a stage
//! - **Deployment hand-off**: a pluggable provider appends the terminal stage
//!
//! Assembly is synchronous and declarative. Nothing is built or deployed;
//! collaborators only declare resources and hand back references.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deployflow::prelude::*;
//!
//! let config = PipelineConfig::from_json_str(r#"{
//!     "repo": { "type": "Managed", "name": "svc", "create": true },
//!     "validate": { "emails": ["ops@example.com"] }
//! }"#)?;
//!
//! let mut assembler = PipelineAssembler::new(
//!     "svc-pipeline",
//!     DeclarativeProvider::new(),
//!     NetworkDeployStage::default(),
//! );
//! let definition = assembler.assemble(&config)?;
//! println!("{}", definition.to_json()?);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        load_context, BuildConfig, BuildVariant, ContextDocument, DeployConfig, PipelineConfig,
        RepoConfig, ValidateConfig,
    };
    pub use crate::core::{
        Action, ActionProvider, Artifact, CacheStore, ComputeSize, ComputeTier, Grant,
        Permission, Principal, Stage,
    };
    pub use crate::errors::{
        ApprovalRejected, ConfigError, DefinitionError, DeployflowError, ErrorInfo,
        ProvisionError,
    };
    pub use crate::events::{AssemblyEventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::pipeline::{
        ActionOutcome, ExecutionPlan, PipelineAssembler, PipelineDefinition,
        PipelineDefinitionBuilder, RunOrderSequencer,
    };
    pub use crate::providers::{
        DeclarativeProvider, DeployContext, DeployStageProvider, NetworkDeployStage,
        ResourceProvider,
    };
}
