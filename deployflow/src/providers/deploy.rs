//! The network deployment stage.

use super::{DeployContext, DeployStageProvider};
use crate::config::NetworkConfig;
use crate::core::{Action, ActionProvider, Stage};
use crate::errors::DeployflowError;
use crate::pipeline::{PipelineDefinitionBuilder, RunOrderSequencer};
use std::collections::BTreeMap;

/// Name of the appended stage.
pub const DEPLOY_STAGE: &str = "Deploy";

/// Name of the deployed network unit.
pub const NETWORK_TARGET: &str = "DataPipelineNetwork";

/// Deploys the data pipeline network.
///
/// Appends a `Deploy` stage holding a prepare action followed by the
/// deploy action that executes what was prepared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkDeployStage {
    network: NetworkConfig,
}

impl NetworkDeployStage {
    /// Creates the stage for the given network settings.
    #[must_use]
    pub const fn new(network: NetworkConfig) -> Self {
        Self { network }
    }

    /// Returns the network settings.
    #[must_use]
    pub const fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn parameters(&self, operation: &str) -> BTreeMap<String, String> {
        let mut parameters = BTreeMap::new();
        parameters.insert("operation".to_string(), operation.to_string());
        if let Some(az_count) = self.network.az_count {
            parameters.insert("azCount".to_string(), az_count.to_string());
        }
        parameters
    }
}

impl DeployStageProvider for NetworkDeployStage {
    fn append_deploy_stage(
        &self,
        pipeline: &mut PipelineDefinitionBuilder,
        context: &DeployContext,
    ) -> Result<(), DeployflowError> {
        let mut sequencer = RunOrderSequencer::new();
        let target = format!("{}{NETWORK_TARGET}", context.name_prefix);
        let input = context.deployable().clone();

        let prepare = Action::new(
            format!("{target}.Prepare"),
            ActionProvider::Deploy {
                target: target.clone(),
                parameters: self.parameters("prepare"),
            },
        )
        .with_input(input.clone())
        .with_run_order(sequencer.next(DEPLOY_STAGE));

        let deploy = Action::new(
            format!("{target}.Deploy"),
            ActionProvider::Deploy {
                target: target.clone(),
                parameters: self.parameters("execute"),
            },
        )
        .with_input(input)
        .with_run_order(sequencer.next(DEPLOY_STAGE));

        let stage = Stage::with_actions(DEPLOY_STAGE, [prepare, deploy])?;
        pipeline.add_stage(stage)?;
        tracing::info!(
            deploy_target = %target,
            az_count = ?self.network.az_count,
            "Deploy stage appended"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Artifact, BucketRef, CacheStore};
    use pretty_assertions::assert_eq;

    fn builder_with_source() -> PipelineDefinitionBuilder {
        let cache = CacheStore::new(BucketRef {
            id: "CacheBucket".to_string(),
            name: "cache".to_string(),
            url: "s3://cache".to_string(),
        });
        let mut builder = PipelineDefinitionBuilder::new("p", cache);
        let source = Action::new(
            "Produce",
            ActionProvider::ManualApproval {
                external_link: None,
                notify_emails: Vec::new(),
            },
        )
        .with_output(Artifact::new("CloudAssembly"));
        builder
            .add_stage(Stage::with_actions("Source", [source]).unwrap())
            .unwrap();
        builder
    }

    fn context() -> DeployContext {
        DeployContext {
            name_prefix: String::new(),
            source: Artifact::new("SourceCode"),
            build_output: Some(Artifact::new("CloudAssembly")),
            deploy: None,
        }
    }

    #[test]
    fn test_prepare_runs_before_deploy() {
        let mut builder = builder_with_source();
        NetworkDeployStage::new(NetworkConfig { az_count: Some(2) })
            .append_deploy_stage(&mut builder, &context())
            .unwrap();

        let definition = builder.build().unwrap();
        let stage = definition.stage(DEPLOY_STAGE).unwrap();
        let names: Vec<_> = stage.actions().iter().map(Action::name).collect();
        assert_eq!(
            names,
            vec!["DataPipelineNetwork.Prepare", "DataPipelineNetwork.Deploy"]
        );
        assert_eq!(stage.run_orders(), vec![1, 2]);

        match stage.actions()[1].provider() {
            ActionProvider::Deploy { parameters, .. } => {
                assert_eq!(parameters.get("azCount"), Some(&"2".to_string()));
                assert_eq!(parameters.get("operation"), Some(&"execute".to_string()));
            }
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn test_absent_az_count_is_not_forwarded() {
        let stage = NetworkDeployStage::default();
        assert!(!stage.parameters("prepare").contains_key("azCount"));
    }

    #[test]
    fn test_unknown_artifact_is_rejected() {
        let mut builder = builder_with_source();
        let mut ctx = context();
        ctx.build_output = Some(Artifact::new("Missing"));
        let err = NetworkDeployStage::default()
            .append_deploy_stage(&mut builder, &ctx)
            .unwrap_err();
        assert!(matches!(err, DeployflowError::Definition(_)));
    }
}
