//! Collaborators for failure injection and call recording.

use parking_lot::Mutex;

use crate::core::{
    AssetRef, BucketRef, Credential, DistributionRef, FunctionRef, FunctionSpec, ProjectRef,
    ProjectSpec, RegistryRef, RepoRef,
};
use crate::errors::{DeployflowError, ProvisionError};
use crate::pipeline::PipelineDefinitionBuilder;
use crate::providers::{
    collaborator, BuildEnvironmentProvider, CredentialProvider, DeclarativeProvider,
    DeployContext, DeployStageProvider, FunctionProvider, PublishTargetProvider,
    RepositoryProvider,
};

/// A declarative provider that fails when asked for one resource id.
///
/// Every request is recorded, including the failing one, so tests can
/// check that nothing was declared after a failure.
#[derive(Debug, Default)]
pub struct FailingProvider {
    inner: DeclarativeProvider,
    fail_on: String,
    reason: String,
    requests: Vec<String>,
}

impl FailingProvider {
    /// Creates a provider failing on the resource with logical id `fail_on`.
    /// For credentials the id is the secret name.
    #[must_use]
    pub fn new(fail_on: impl Into<String>) -> Self {
        Self {
            fail_on: fail_on.into(),
            reason: "injected failure".to_string(),
            ..Self::default()
        }
    }

    /// Sets the reported failure reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Returns every requested resource id in order.
    #[must_use]
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    /// Returns the wrapped provider holding the successful declarations.
    #[must_use]
    pub const fn inner(&self) -> &DeclarativeProvider {
        &self.inner
    }

    fn check(&mut self, collaborator: &str, id: &str) -> Result<(), ProvisionError> {
        self.requests.push(id.to_string());
        if id == self.fail_on {
            tracing::debug!(collaborator, resource = id, "Injecting provision failure");
            return Err(ProvisionError::new(collaborator, id, &self.reason));
        }
        Ok(())
    }
}

impl CredentialProvider for FailingProvider {
    fn resolve_secret(&mut self, name: &str) -> Result<Credential, ProvisionError> {
        self.check(collaborator::CREDENTIAL, name)?;
        self.inner.resolve_secret(name)
    }
}

impl RepositoryProvider for FailingProvider {
    fn create_repository(&mut self, id: &str, name: &str) -> Result<RepoRef, ProvisionError> {
        self.check(collaborator::REPOSITORY, id)?;
        self.inner.create_repository(id, name)
    }

    fn reference_repository(&mut self, id: &str, name: &str) -> Result<RepoRef, ProvisionError> {
        self.check(collaborator::REPOSITORY, id)?;
        self.inner.reference_repository(id, name)
    }
}

impl BuildEnvironmentProvider for FailingProvider {
    fn provision_project(&mut self, spec: &ProjectSpec) -> Result<ProjectRef, ProvisionError> {
        self.check(collaborator::BUILD_ENVIRONMENT, &spec.id)?;
        self.inner.provision_project(spec)
    }

    fn provision_registry(&mut self, id: &str) -> Result<RegistryRef, ProvisionError> {
        self.check(collaborator::BUILD_ENVIRONMENT, id)?;
        self.inner.provision_registry(id)
    }
}

impl PublishTargetProvider for FailingProvider {
    fn provision_bucket(&mut self, id: &str) -> Result<BucketRef, ProvisionError> {
        self.check(collaborator::PUBLISH_TARGET, id)?;
        self.inner.provision_bucket(id)
    }

    fn provision_distribution(
        &mut self,
        id: &str,
        bucket: &BucketRef,
        default_root_object: &str,
    ) -> Result<DistributionRef, ProvisionError> {
        self.check(collaborator::PUBLISH_TARGET, id)?;
        self.inner
            .provision_distribution(id, bucket, default_root_object)
    }

    fn provision_asset(&mut self, id: &str, path: &str) -> Result<AssetRef, ProvisionError> {
        self.check(collaborator::PUBLISH_TARGET, id)?;
        self.inner.provision_asset(id, path)
    }
}

impl FunctionProvider for FailingProvider {
    fn provision_function(&mut self, spec: &FunctionSpec) -> Result<FunctionRef, ProvisionError> {
        self.check(collaborator::FUNCTION, &spec.id)?;
        self.inner.provision_function(spec)
    }
}

/// A deployment-stage provider that records what it was handed and
/// appends nothing.
#[derive(Debug, Default)]
pub struct RecordingDeployStage {
    calls: Mutex<Vec<(Vec<String>, DeployContext)>>,
}

impl RecordingDeployStage {
    /// Creates a new recording provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of times the provider was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the stage names present at each call.
    #[must_use]
    pub fn recorded_stages(&self) -> Vec<Vec<String>> {
        self.calls.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    /// Returns the context of each call.
    #[must_use]
    pub fn recorded_contexts(&self) -> Vec<DeployContext> {
        self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
    }
}

impl DeployStageProvider for RecordingDeployStage {
    fn append_deploy_stage(
        &self,
        pipeline: &mut PipelineDefinitionBuilder,
        context: &DeployContext,
    ) -> Result<(), DeployflowError> {
        let stages = pipeline
            .stages()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        self.calls.lock().push((stages, context.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failing_provider_passes_other_ids_through() {
        let mut provider = FailingProvider::new("Broken");
        let bucket = provider.provision_bucket("CacheBucket").unwrap();
        assert_eq!(bucket.id, "CacheBucket");
        assert_eq!(provider.inner().len(), 1);
    }

    #[test]
    fn test_failing_provider_fails_on_target() {
        let mut provider = FailingProvider::new("github-token").with_reason("access denied");
        let err = provider.resolve_secret("github-token").unwrap_err();

        assert_eq!(err.collaborator, collaborator::CREDENTIAL);
        assert_eq!(err.reason, "access denied");
        assert_eq!(provider.requests().to_vec(), vec!["github-token"]);
        assert!(provider.inner().is_empty());
    }
}
