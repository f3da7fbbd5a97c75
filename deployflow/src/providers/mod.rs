//! External collaborator interfaces.
//!
//! The assembly engine never provisions anything itself. It asks these
//! collaborators to declare resources and hand back references, then wires
//! the references into actions. Every call is a one-shot declaration: a
//! failure is surfaced as a [`ProvisionError`] and never retried.

mod declarative;
mod deploy;

pub use declarative::{secret_id, DeclarativeProvider, ResourceDeclaration, ResourceKind};
pub use deploy::{NetworkDeployStage, DEPLOY_STAGE, NETWORK_TARGET};

use crate::config::DeployConfig;
use crate::core::{
    Artifact, AssetRef, BucketRef, Credential, DistributionRef, FunctionRef, FunctionSpec,
    ProjectRef, ProjectSpec, RegistryRef, RepoRef,
};
use crate::errors::{DeployflowError, ProvisionError};
use crate::pipeline::PipelineDefinitionBuilder;

/// Collaborator names reported in [`ProvisionError::collaborator`].
pub mod collaborator {
    /// Secret retrieval.
    pub const CREDENTIAL: &str = "credential";
    /// Source repositories.
    pub const REPOSITORY: &str = "repository";
    /// Build projects and image registries.
    pub const BUILD_ENVIRONMENT: &str = "build-environment";
    /// Buckets, distributions and static assets.
    pub const PUBLISH_TARGET: &str = "publish-target";
    /// Short-lived functions.
    pub const FUNCTION: &str = "function";
    /// The terminal deployment stage.
    pub const DEPLOY_STAGE: &str = "deploy-stage";
}

/// Resolves stored secrets by name.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialProvider {
    /// Returns a reference to the named secret.
    fn resolve_secret(&mut self, name: &str) -> Result<Credential, ProvisionError>;
}

/// Declares or references source repositories.
#[cfg_attr(test, mockall::automock)]
pub trait RepositoryProvider {
    /// Declares a new repository.
    fn create_repository(&mut self, id: &str, name: &str) -> Result<RepoRef, ProvisionError>;

    /// References an existing repository by name.
    fn reference_repository(&mut self, id: &str, name: &str) -> Result<RepoRef, ProvisionError>;
}

/// Declares build projects and image registries.
#[cfg_attr(test, mockall::automock)]
pub trait BuildEnvironmentProvider {
    /// Declares a build project.
    fn provision_project(&mut self, spec: &ProjectSpec) -> Result<ProjectRef, ProvisionError>;

    /// Declares an image registry.
    fn provision_registry(&mut self, id: &str) -> Result<RegistryRef, ProvisionError>;
}

/// Declares object stores, distributions and static assets.
#[cfg_attr(test, mockall::automock)]
pub trait PublishTargetProvider {
    /// Declares an object store bucket.
    fn provision_bucket(&mut self, id: &str) -> Result<BucketRef, ProvisionError>;

    /// Declares a content distribution in front of `bucket`.
    fn provision_distribution(
        &mut self,
        id: &str,
        bucket: &BucketRef,
        default_root_object: &str,
    ) -> Result<DistributionRef, ProvisionError>;

    /// Declares a static asset uploaded from a local path.
    fn provision_asset(&mut self, id: &str, path: &str) -> Result<AssetRef, ProvisionError>;
}

/// Declares short-lived functions.
#[cfg_attr(test, mockall::automock)]
pub trait FunctionProvider {
    /// Declares a function.
    fn provision_function(&mut self, spec: &FunctionSpec) -> Result<FunctionRef, ProvisionError>;
}

/// Every collaborator the assembler talks to.
pub trait ResourceProvider:
    CredentialProvider
    + RepositoryProvider
    + BuildEnvironmentProvider
    + PublishTargetProvider
    + FunctionProvider
{
}

impl<T> ResourceProvider for T where
    T: CredentialProvider
        + RepositoryProvider
        + BuildEnvironmentProvider
        + PublishTargetProvider
        + FunctionProvider
{
}

/// What the deployment-stage provider gets to see of the assembled head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployContext {
    /// Prefix applied to every generated name.
    pub name_prefix: String,
    /// Artifact produced by the source action.
    pub source: Artifact,
    /// Artifact produced by the build action, if any.
    pub build_output: Option<Artifact>,
    /// Deploy settings from the configuration.
    pub deploy: Option<DeployConfig>,
}

impl DeployContext {
    /// Returns the artifact a deployment should consume: the build output,
    /// or the source artifact when the build produced none.
    #[must_use]
    pub fn deployable(&self) -> &Artifact {
        self.build_output.as_ref().unwrap_or(&self.source)
    }
}

/// Appends the terminal deployment stage.
#[cfg_attr(test, mockall::automock)]
pub trait DeployStageProvider {
    /// Appends one or more stages to `pipeline`.
    fn append_deploy_stage(
        &self,
        pipeline: &mut PipelineDefinitionBuilder,
        context: &DeployContext,
    ) -> Result<(), DeployflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployable_prefers_build_output() {
        let mut context = DeployContext {
            name_prefix: String::new(),
            source: Artifact::new("SourceCode"),
            build_output: Some(Artifact::new("CloudAssembly")),
            deploy: None,
        };
        assert_eq!(context.deployable().name(), "CloudAssembly");

        context.build_output = None;
        assert_eq!(context.deployable().name(), "SourceCode");
    }

    #[test]
    fn test_declarative_provider_is_a_resource_provider() {
        fn assert_provider<P: ResourceProvider>(_: &P) {}
        assert_provider(&DeclarativeProvider::new());
    }
}
