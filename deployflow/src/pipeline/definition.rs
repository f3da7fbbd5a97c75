//! Pipeline definitions and the builder that validates them.

use crate::core::{Action, Artifact, CacheStore, Grant, Stage};
use crate::errors::{DefinitionError, DeployflowError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Builder for creating validated pipeline definitions.
///
/// Stages are checked as they are appended: names must be unique, every
/// consumed artifact must have been produced by an earlier action and no
/// artifact may have two producers. Run-order rules inside a stage are
/// enforced by [`Stage::add_action`].
#[derive(Debug, Clone)]
pub struct PipelineDefinitionBuilder {
    /// The pipeline name.
    name: String,
    /// Shared cache store.
    cache: CacheStore,
    /// Stages in declaration order.
    stages: Vec<Stage>,
    /// Artifact name to qualified producer name.
    producers: BTreeMap<Artifact, String>,
    /// Artifacts some action consumes.
    consumed: BTreeSet<Artifact>,
    /// Collected permission grants.
    grants: Vec<Grant>,
}

impl PipelineDefinitionBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(name: impl Into<String>, cache: CacheStore) -> Self {
        Self {
            name: name.into(),
            cache,
            stages: Vec::new(),
            producers: BTreeMap::new(),
            consumed: BTreeSet::new(),
            grants: Vec::new(),
        }
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is empty, duplicates an existing stage
    /// name or breaks the artifact flow.
    pub fn stage(mut self, stage: Stage) -> Result<Self, DefinitionError> {
        self.add_stage(stage)?;
        Ok(self)
    }

    /// Appends a stage in place.
    ///
    /// Nothing is recorded when validation fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is empty, duplicates an existing stage
    /// name or breaks the artifact flow.
    pub fn add_stage(&mut self, stage: Stage) -> Result<(), DefinitionError> {
        if self.has_stage(stage.name()) {
            return Err(DefinitionError::DuplicateStage {
                stage: stage.name().to_string(),
            });
        }
        if stage.is_empty() {
            return Err(DefinitionError::Empty {
                name: stage.name().to_string(),
                what: "actions",
            });
        }

        let mut produced = BTreeMap::new();
        for action in stage.actions() {
            let qualified = qualify(stage.name(), action);
            for input in action.inputs() {
                if !self.producers.contains_key(input) && !produced.contains_key(input) {
                    return Err(DefinitionError::UnknownArtifact {
                        artifact: input.name().to_string(),
                        consumer: qualified,
                    });
                }
            }
            for output in action.outputs() {
                if let Some(first) = self.producers.get(output).or_else(|| produced.get(output)) {
                    return Err(DefinitionError::DuplicateProducer {
                        artifact: output.name().to_string(),
                        first: first.clone(),
                        second: qualified,
                    });
                }
                produced.insert(output.clone(), qualified.clone());
            }
        }

        for action in stage.actions() {
            self.consumed.extend(action.inputs().iter().cloned());
        }
        self.producers.extend(produced);
        tracing::info!(
            pipeline = %self.name,
            stage = %stage.name(),
            actions = stage.len(),
            "Stage added"
        );
        self.stages.push(stage);
        Ok(())
    }

    /// Adds permission grants.
    pub fn add_grants(&mut self, grants: impl IntoIterator<Item = Grant>) {
        self.grants.extend(grants);
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shared cache store.
    #[must_use]
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Returns the stages appended so far.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns true if a stage with this name exists.
    #[must_use]
    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name() == name)
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the qualified name of the action producing `artifact`.
    #[must_use]
    pub fn producer_of(&self, artifact: &Artifact) -> Option<&str> {
        self.producers.get(artifact).map(String::as_str)
    }

    /// Builds the definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no stages.
    pub fn build(mut self) -> Result<PipelineDefinition, DefinitionError> {
        if self.stages.is_empty() {
            return Err(DefinitionError::Empty {
                name: self.name,
                what: "stages",
            });
        }

        for (artifact, producer) in &self.producers {
            if !self.consumed.contains(artifact) {
                tracing::warn!(
                    artifact = %artifact,
                    producer = %producer,
                    "Artifact has no consumer inside the pipeline"
                );
            }
        }

        self.grants.sort();
        self.grants.dedup();
        Ok(PipelineDefinition {
            name: self.name,
            cache: self.cache,
            stages: self.stages,
            grants: self.grants,
        })
    }
}

fn qualify(stage: &str, action: &Action) -> String {
    format!("{stage}/{}", action.name())
}

/// A fully wired pipeline. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    name: String,
    cache: CacheStore,
    stages: Vec<Stage>,
    grants: Vec<Grant>,
}

impl PipelineDefinition {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shared cache store.
    #[must_use]
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Finds a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Returns the stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    /// Iterates over every action with its stage name.
    pub fn actions(&self) -> impl Iterator<Item = (&str, &Action)> {
        self.stages
            .iter()
            .flat_map(|s| s.actions().iter().map(move |a| (s.name(), a)))
    }

    /// Returns the total number of actions.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.stages.iter().map(Stage::len).sum()
    }

    /// Returns the consolidated, sorted permission grants.
    #[must_use]
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    /// Serializes the definition to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error.
    pub fn to_json(&self) -> Result<String, DeployflowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a definition previously produced by [`to_json`](Self::to_json).
    ///
    /// # Errors
    ///
    /// Returns a serialization error.
    pub fn from_json(json: &str) -> Result<Self, DeployflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns a short hash of the canonical JSON form.
    ///
    /// Two definitions assembled from the same configuration have the same
    /// fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActionProvider, BucketRef, Permission, Principal};
    use pretty_assertions::assert_eq;

    fn cache() -> CacheStore {
        CacheStore::new(BucketRef {
            id: "CacheBucket".to_string(),
            name: "cache".to_string(),
            url: "s3://cache".to_string(),
        })
    }

    fn gate(name: &str) -> Action {
        Action::new(
            name,
            ActionProvider::ManualApproval {
                external_link: None,
                notify_emails: Vec::new(),
            },
        )
    }

    fn stage(name: &str, actions: Vec<Action>) -> Stage {
        Stage::with_actions(name, actions).unwrap()
    }

    #[test]
    fn test_builder_threads_artifacts_across_stages() {
        let definition = PipelineDefinitionBuilder::new("p", cache())
            .stage(stage("Source", vec![gate("Fetch").with_output(Artifact::new("Src"))]))
            .unwrap()
            .stage(stage(
                "Build",
                vec![gate("Compile")
                    .with_input(Artifact::new("Src"))
                    .with_output(Artifact::new("Bin"))],
            ))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(definition.stage_names(), vec!["Source", "Build"]);
        assert_eq!(definition.action_count(), 2);
        let pairs: Vec<_> = definition.actions().map(|(s, a)| (s, a.name())).collect();
        assert_eq!(pairs, vec![("Source", "Fetch"), ("Build", "Compile")]);
    }

    #[test]
    fn test_unknown_artifact_is_rejected() {
        let err = PipelineDefinitionBuilder::new("p", cache())
            .stage(stage("Build", vec![gate("Compile").with_input(Artifact::new("Src"))]))
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::UnknownArtifact {
                artifact: "Src".to_string(),
                consumer: "Build/Compile".to_string(),
            }
        );
    }

    #[test]
    fn test_consumer_before_producer_in_stage_is_rejected() {
        let err = PipelineDefinitionBuilder::new("p", cache())
            .stage(stage(
                "Build",
                vec![
                    gate("Use").with_input(Artifact::new("Out")).with_run_order(1),
                    gate("Make").with_output(Artifact::new("Out")).with_run_order(2),
                ],
            ))
            .unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownArtifact { .. }));
    }

    #[test]
    fn test_duplicate_producer_is_rejected() {
        let mut builder = PipelineDefinitionBuilder::new("p", cache());
        builder
            .add_stage(stage("Source", vec![gate("A").with_output(Artifact::new("Out"))]))
            .unwrap();
        let err = builder
            .add_stage(stage("Build", vec![gate("B").with_output(Artifact::new("Out"))]))
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DuplicateProducer {
                artifact: "Out".to_string(),
                first: "Source/A".to_string(),
                second: "Build/B".to_string(),
            }
        );
        assert_eq!(builder.stage_count(), 1);
    }

    #[test]
    fn test_duplicate_and_empty_stages() {
        let mut builder = PipelineDefinitionBuilder::new("p", cache());
        builder.add_stage(stage("Source", vec![gate("A")])).unwrap();

        let dup = builder.add_stage(stage("Source", vec![gate("B")])).unwrap_err();
        assert!(matches!(dup, DefinitionError::DuplicateStage { .. }));

        let empty = builder.add_stage(Stage::new("Build")).unwrap_err();
        assert!(matches!(empty, DefinitionError::Empty { what: "actions", .. }));
    }

    #[test]
    fn test_empty_pipeline() {
        let err = PipelineDefinitionBuilder::new("p", cache()).build().unwrap_err();
        assert_eq!(
            err,
            DefinitionError::Empty {
                name: "p".to_string(),
                what: "stages",
            }
        );
    }

    #[test]
    fn test_grants_sorted_and_deduplicated() {
        let role = Principal::new("role");
        let mut builder = PipelineDefinitionBuilder::new("p", cache());
        builder.add_stage(stage("Source", vec![gate("A")])).unwrap();
        builder.add_grants([
            Grant::new(&role, Permission::Invalidate, "dist"),
            Grant::new(&role, Permission::Read, "bucket"),
            Grant::new(&role, Permission::Read, "bucket"),
        ]);
        let definition = builder.build().unwrap();
        assert_eq!(
            definition.grants(),
            &[
                Grant::new(&role, Permission::Read, "bucket"),
                Grant::new(&role, Permission::Invalidate, "dist"),
            ]
        );
    }

    #[test]
    fn test_json_round_trip_keeps_fingerprint() {
        let definition = PipelineDefinitionBuilder::new("p", cache())
            .stage(stage("Source", vec![gate("A").with_output(Artifact::new("Out"))]))
            .unwrap()
            .build()
            .unwrap();

        let json = definition.to_json().unwrap();
        let parsed = PipelineDefinition::from_json(&json).unwrap();
        assert_eq!(parsed, definition);
        assert_eq!(parsed.fingerprint(), definition.fingerprint());
        assert_eq!(definition.fingerprint().len(), 32);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = PipelineDefinitionBuilder::new("p", cache())
            .stage(stage("Source", vec![gate("A")]))
            .unwrap()
            .build()
            .unwrap();
        let b = PipelineDefinitionBuilder::new("p", cache())
            .stage(stage("Source", vec![gate("B")]))
            .unwrap()
            .build()
            .unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
