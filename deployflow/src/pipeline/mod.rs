//! Pipeline assembly.
//!
//! This module provides:
//! - Source and build resolution into typed actions
//! - The optional validation stage with its approval gate
//! - Run-order sequencing and definition building with artifact checks
//! - The top-level assembler and execution plans over its output

mod assembler;
mod build;
mod definition;
mod invoke;
mod plan;
mod sequencer;
mod source;
mod validate;


pub use assembler::{PipelineAssembler, BUILD_STAGE, CACHE_BUCKET, SOURCE_STAGE};
pub use build::{
    BuildActionFactory, BuildOutcome, BuildRequest, BuildResolver, ContainerBuild, CustomBuild,
    MobileBuild, SynthBuild, CLOUD_ASSEMBLY, REGISTRY_AUTH_RESOURCE,
};
pub use definition::{PipelineDefinition, PipelineDefinitionBuilder};
pub use invoke::{
    InvokeActionBuilder, InvokeOutcome, INVOKE_LOG_RETENTION_DAYS, INVOKE_TIMEOUT_SECS,
};
pub use plan::{ActionOutcome, ExecutionPlan, ExecutionReport, Halt, StagePlan, Wave};
pub use sequencer::RunOrderSequencer;
pub use source::{SourceOutcome, SourceResolver};
pub use validate::{
    PublishTarget, ValidateOutcome, ValidateStageAssembler, APPROVAL_ACTION, CLEANUP_ENTRY,
    DIAGRAMS_INDEX_PATH, VALIDATE_STAGE,
};
