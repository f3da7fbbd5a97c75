//! Top-level pipeline assembly.

use super::build::{BuildActionFactory, BuildRequest};
use super::definition::{PipelineDefinition, PipelineDefinitionBuilder};
use super::sequencer::RunOrderSequencer;
use super::source::SourceResolver;
use super::validate::{ValidateStageAssembler, VALIDATE_STAGE};
use crate::config::{ContextDocument, PipelineConfig};
use crate::core::{CacheStore, Stage};
use crate::errors::{ConfigError, DeployflowError};
use crate::events::{AssemblyEventSink, NoOpEventSink};
use crate::providers::{DeployContext, DeployStageProvider, NetworkDeployStage, ResourceProvider};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// Name of the source stage.
pub const SOURCE_STAGE: &str = "Source";

/// Name of the build stage.
pub const BUILD_STAGE: &str = "Build";

/// Logical id of the shared cache bucket.
pub const CACHE_BUCKET: &str = "CacheBucket";

/// Assembles pipeline definitions from configuration.
///
/// One assembly is a single synchronous pass: validate the configuration,
/// declare the shared cache, resolve the source, resolve the build, add the
/// validation stage when configured and hand off to the deployment-stage
/// provider. The first error aborts the pass and nothing is returned.
///
/// # Example
///
/// ```rust,ignore
/// let mut assembler = PipelineAssembler::new(
///     "svc-pipeline",
///     DeclarativeProvider::new(),
///     NetworkDeployStage::default(),
/// );
/// let definition = assembler.assemble(&config)?;
/// ```
pub struct PipelineAssembler<P, D> {
    name: String,
    prefix: String,
    provider: P,
    deploy_stage: D,
    event_sink: Arc<dyn AssemblyEventSink>,
}

impl<P, D> std::fmt::Debug for PipelineAssembler<P, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAssembler")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl<P, D> PipelineAssembler<P, D>
where
    P: ResourceProvider,
    D: DeployStageProvider,
{
    /// Creates an assembler.
    #[must_use]
    pub fn new(name: impl Into<String>, provider: P, deploy_stage: D) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            provider,
            deploy_stage,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the prefix applied to every generated name.
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the sink receiving assembly events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn AssemblyEventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resource provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the deployment-stage provider.
    #[must_use]
    pub const fn deploy_stage(&self) -> &D {
        &self.deploy_stage
    }

    /// Consumes the assembler, returning the resource provider.
    #[must_use]
    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Parses, validates and assembles a configuration tree.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before anything is declared, or the
    /// first assembly error.
    pub fn assemble_value(
        &mut self,
        value: serde_json::Value,
    ) -> Result<PipelineDefinition, DeployflowError> {
        match PipelineConfig::from_value(value) {
            Ok(config) => self.assemble(&config),
            Err(err) => {
                self.event_sink.emit(
                    "assembly.started",
                    Some(json!({ "pipeline": self.name })),
                );
                self.emit_failed(&err.clone().into());
                Err(err.into())
            }
        }
    }

    /// Assembles a pipeline definition.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before anything is declared, or the
    /// first collaborator or definition error.
    #[instrument(skip(self, config), fields(pipeline = %self.name))]
    pub fn assemble(
        &mut self,
        config: &PipelineConfig,
    ) -> Result<PipelineDefinition, DeployflowError> {
        let build = config.effective_build();
        self.event_sink.emit(
            "assembly.started",
            Some(json!({
                "pipeline": self.name,
                "build_variant": build.variant.to_string(),
                "validate": config.validate.is_some(),
            })),
        );

        match self.try_assemble(config) {
            Ok(definition) => {
                tracing::info!(
                    stages = definition.stages().len(),
                    actions = definition.action_count(),
                    grants = definition.grants().len(),
                    "Pipeline assembled"
                );
                self.event_sink.emit(
                    "assembly.completed",
                    Some(json!({
                        "pipeline": definition.name(),
                        "stages": definition.stage_names(),
                        "actions": definition.action_count(),
                        "fingerprint": definition.fingerprint(),
                    })),
                );
                Ok(definition)
            }
            Err(err) => {
                self.emit_failed(&err);
                Err(err)
            }
        }
    }

    fn try_assemble(
        &mut self,
        config: &PipelineConfig,
    ) -> Result<PipelineDefinition, DeployflowError> {
        config.validate()?;
        let build_config = config.effective_build();

        let cache = CacheStore::new(self.provider.provision_bucket(CACHE_BUCKET)?);
        let mut builder = PipelineDefinitionBuilder::new(&self.name, cache.clone());
        let mut sequencer = RunOrderSequencer::new();

        let source = SourceResolver::resolve(&mut self.provider, &config.repo, &self.prefix)?;
        let source_action = source
            .action
            .with_run_order(sequencer.next(SOURCE_STAGE));
        self.add_stage(&mut builder, Stage::with_actions(SOURCE_STAGE, [source_action])?)?;

        let request = BuildRequest {
            config: &build_config,
            input: &source.artifact,
            cache: &cache,
            prefix: &self.prefix,
            run_order: Some(sequencer.next(BUILD_STAGE)),
        };
        let build = BuildActionFactory::resolve(&mut self.provider, &request)?;
        builder.add_grants(build.grants.iter().cloned());
        let build_output = build.primary_output().cloned();
        self.add_stage(&mut builder, Stage::with_actions(BUILD_STAGE, [build.action])?)?;

        if let Some(ref validate) = config.validate {
            let input = build_output.as_ref().ok_or_else(|| {
                ConfigError::conflict(
                    "validate",
                    format!("the {} build produces no artifact to validate", build_config.variant),
                )
            })?;
            let outcome = ValidateStageAssembler::assemble(
                &mut self.provider,
                &mut sequencer,
                validate,
                input,
                &cache,
                &self.prefix,
            )?;
            builder.add_grants(outcome.grants);
            self.add_stage(&mut builder, outcome.stage)?;
        } else {
            tracing::debug!(stage = VALIDATE_STAGE, "No validate section, stage skipped");
        }

        let context = DeployContext {
            name_prefix: self.prefix.clone(),
            source: source.artifact,
            build_output,
            deploy: config.deploy.clone(),
        };
        let before = builder.stage_count();
        self.deploy_stage.append_deploy_stage(&mut builder, &context)?;
        for stage in &builder.stages()[before..] {
            self.emit_stage(stage);
        }

        Ok(builder.build()?)
    }

    fn add_stage(
        &self,
        builder: &mut PipelineDefinitionBuilder,
        stage: Stage,
    ) -> Result<(), DeployflowError> {
        builder.add_stage(stage)?;
        if let Some(stage) = builder.stages().last() {
            self.emit_stage(stage);
        }
        Ok(())
    }

    fn emit_stage(&self, stage: &Stage) {
        self.event_sink.emit(
            "stage.added",
            Some(json!({
                "stage": stage.name(),
                "actions": stage.len(),
            })),
        );
        for action in stage.actions() {
            self.event_sink.emit(
                "action.declared",
                Some(json!({
                    "stage": stage.name(),
                    "action": action.name(),
                    "category": action.provider().category(),
                    "run_order": action.run_order(),
                    "inputs": action.inputs(),
                    "outputs": action.outputs(),
                })),
            );
        }
    }

    fn emit_failed(&self, err: &DeployflowError) {
        tracing::error!(error = %err, "Pipeline assembly failed");
        self.event_sink.emit(
            "assembly.failed",
            Some(json!({
                "pipeline": self.name,
                "error": err.to_string(),
                "code": err.error_info().map(|info| info.code),
            })),
        );
    }
}

impl<P> PipelineAssembler<P, NetworkDeployStage>
where
    P: ResourceProvider,
{
    /// Creates an assembler for a context document. The pipeline is named
    /// after `archi.id` and deploys the configured network.
    #[must_use]
    pub fn for_context(document: &ContextDocument, provider: P) -> Self {
        Self::new(
            document.archi.id.clone(),
            provider,
            NetworkDeployStage::new(document.data_pipeline.network),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, BuildVariant, RepoConfig, ValidateConfig};
    use crate::events::CollectingEventSink;
    use crate::providers::{DeclarativeProvider, MockDeployStageProvider};
    use pretty_assertions::assert_eq;

    fn assembler() -> PipelineAssembler<DeclarativeProvider, NetworkDeployStage> {
        PipelineAssembler::new("p", DeclarativeProvider::new(), NetworkDeployStage::default())
    }

    #[test]
    fn test_stage_layout_without_validation() {
        let config = PipelineConfig::new(RepoConfig::managed("svc", true));
        let definition = assembler().assemble(&config).unwrap();
        assert_eq!(definition.stage_names(), vec!["Source", "Build", "Deploy"]);
        assert_eq!(definition.name(), "p");
        assert_eq!(definition.cache().bucket().id, CACHE_BUCKET);
    }

    #[test]
    fn test_stage_layout_with_validation() {
        let config = PipelineConfig::new(RepoConfig::managed("svc", true))
            .with_validate(ValidateConfig::with_emails(["a@x.com"]));
        let definition = assembler().assemble(&config).unwrap();
        assert_eq!(
            definition.stage_names(),
            vec!["Source", "Build", "Validate", "Deploy"]
        );
    }

    #[test]
    fn test_invalid_config_declares_nothing() {
        let config = PipelineConfig::new(RepoConfig::external("", "svc", "token"));
        let mut assembler = assembler();
        let err = assembler.assemble(&config).unwrap_err();
        assert!(matches!(err, DeployflowError::Config(_)));
        assert!(assembler.provider().is_empty());
    }

    #[test]
    fn test_assemble_value_reports_config_errors() {
        let sink = Arc::new(CollectingEventSink::new());
        let mut assembler = assembler().with_event_sink(sink.clone());
        let err = assembler
            .assemble_value(serde_json::json!({"repo": {"type": "External", "name": "svc"}}))
            .unwrap_err();

        assert_eq!(
            err.error_info().map(|i| i.code),
            Some("CONFIG-001-MISSING_FIELD".to_string())
        );
        assert!(assembler.provider().is_empty());
        assert_eq!(sink.event_types(), vec!["assembly.started", "assembly.failed"]);
        let failed = sink.events_of_type("assembly.failed");
        assert_eq!(failed.len(), 1);
        assert_eq!(
            failed[0].1.as_ref().map(|d| d["code"].clone()),
            Some(serde_json::json!("CONFIG-001-MISSING_FIELD"))
        );
    }

    #[test]
    fn test_events_follow_assembly() {
        let sink = Arc::new(CollectingEventSink::new());
        let config = PipelineConfig::new(RepoConfig::managed("svc", false));
        assembler()
            .with_event_sink(sink.clone())
            .assemble(&config)
            .unwrap();

        let types: Vec<_> = sink.events().into_iter().map(|(t, _)| t).collect();
        assert_eq!(types.first().map(String::as_str), Some("assembly.started"));
        assert_eq!(types.last().map(String::as_str), Some("assembly.completed"));
        assert_eq!(sink.events_of_type("stage.added").len(), 3);
        assert_eq!(sink.events_of_type("action.declared").len(), 4);
    }

    #[test]
    fn test_deploy_provider_sees_build_output() {
        let mut deploy = MockDeployStageProvider::new();
        deploy
            .expect_append_deploy_stage()
            .withf(|builder, context| {
                builder.stage_count() == 2
                    && context.source.name() == "AppSourceCode"
                    && context.build_output.as_ref().map(|a| a.name()) == Some("AppApkFiles")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let config = PipelineConfig::new(RepoConfig::managed("svc", true))
            .with_build(BuildConfig::new(BuildVariant::Mobile));
        let definition = PipelineAssembler::new("p", DeclarativeProvider::new(), deploy)
            .with_name_prefix("App")
            .assemble(&config)
            .unwrap();
        assert_eq!(definition.stage_names(), vec!["Source", "Build"]);
    }

    #[test]
    fn test_deploy_failure_aborts_assembly() {
        let mut deploy = MockDeployStageProvider::new();
        deploy.expect_append_deploy_stage().returning(|_, _| {
            Err(crate::errors::ProvisionError::new("deploy-stage", "Deploy", "quota").into())
        });

        let config = PipelineConfig::new(RepoConfig::managed("svc", true));
        let err = PipelineAssembler::new("p", DeclarativeProvider::new(), deploy)
            .assemble(&config)
            .unwrap_err();
        assert!(matches!(err, DeployflowError::Provision(_)));
    }

    #[test]
    fn test_for_context_names_pipeline_after_archi_id() {
        let document = ContextDocument::from_value(serde_json::json!({
            "archi": {"id": "svc-pipeline", "pipeline": {"repo": {"type": "Managed", "name": "svc"}}},
            "dataPipeline": {"network": {"azCount": 3}}
        }))
        .unwrap();

        let mut assembler = PipelineAssembler::for_context(&document, DeclarativeProvider::new());
        let definition = assembler.assemble(&document.archi.pipeline).unwrap();
        assert_eq!(definition.name(), "svc-pipeline");
        assert_eq!(assembler.name(), "svc-pipeline");
    }
}
