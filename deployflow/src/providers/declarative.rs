//! A provider that only records what it was asked to declare.
//!
//! References it hands out are deterministic tokens of the form
//! `${Id.Attribute}`, resolved later by whatever deploys the declarations.
//! Declaring the same resource again is a no-op, so one provider can back
//! repeated assemblies of the same configuration. Secret references live
//! under `Secret:{name}` and never clash with logical resource ids.

use super::{
    collaborator, BuildEnvironmentProvider, CredentialProvider, FunctionProvider,
    PublishTargetProvider, RepositoryProvider,
};
use crate::core::{
    AssetRef, BucketRef, Credential, DistributionRef, FunctionRef, FunctionSpec, Principal,
    ProjectRef, ProjectSpec, RegistryRef, RepoRef,
};
use crate::errors::ProvisionError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;

/// Kind of a recorded declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A reference to a stored secret.
    SecretReference,
    /// A newly declared repository.
    Repository,
    /// A reference to an existing repository.
    RepositoryReference,
    /// A build project.
    BuildProject,
    /// An image registry.
    ImageRegistry,
    /// An object store bucket.
    Bucket,
    /// A content distribution.
    Distribution,
    /// A static asset.
    Asset,
    /// A short-lived function.
    Function,
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    /// Logical id, unique within the provider. Secret references use
    /// [`secret_id`].
    pub id: String,
    /// What was declared.
    pub kind: ResourceKind,
    /// Declared properties.
    pub properties: serde_json::Value,
}

/// Records declarations in call order.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeProvider {
    declarations: Vec<ResourceDeclaration>,
    ids: BTreeSet<String>,
}

impl DeclarativeProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all declarations in call order.
    #[must_use]
    pub fn declarations(&self) -> &[ResourceDeclaration] {
        &self.declarations
    }

    /// Finds a declaration by id.
    #[must_use]
    pub fn declaration(&self, id: &str) -> Option<&ResourceDeclaration> {
        self.declarations.iter().find(|d| d.id == id)
    }

    /// Returns the declarations of one kind.
    #[must_use]
    pub fn declarations_of(&self, kind: ResourceKind) -> Vec<&ResourceDeclaration> {
        self.declarations.iter().filter(|d| d.kind == kind).collect()
    }

    /// Returns the number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns true if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Consumes the provider, returning its declarations.
    #[must_use]
    pub fn into_declarations(self) -> Vec<ResourceDeclaration> {
        self.declarations
    }

    fn declare(
        &mut self,
        collaborator: &str,
        id: &str,
        kind: ResourceKind,
        properties: serde_json::Value,
    ) -> Result<(), ProvisionError> {
        if !self.ids.insert(id.to_string()) {
            return match self.declaration(id) {
                Some(existing) if existing.kind == kind && existing.properties == properties => {
                    tracing::trace!(id, ?kind, "Resource already declared");
                    Ok(())
                }
                _ => Err(ProvisionError::new(
                    collaborator,
                    id,
                    "a resource with this id is already declared",
                )),
            };
        }
        tracing::debug!(id, ?kind, "Resource declared");
        self.declarations.push(ResourceDeclaration {
            id: id.to_string(),
            kind,
            properties,
        });
        Ok(())
    }
}

/// Returns the declaration id recorded for a secret reference.
#[must_use]
pub fn secret_id(name: &str) -> String {
    format!("Secret:{name}")
}

fn token(id: &str, attribute: &str) -> String {
    format!("${{{id}.{attribute}}}")
}

fn to_properties(
    collaborator: &str,
    id: &str,
    value: &impl Serialize,
) -> Result<serde_json::Value, ProvisionError> {
    serde_json::to_value(value)
        .map_err(|err| ProvisionError::new(collaborator, id, err.to_string()))
}

impl CredentialProvider for DeclarativeProvider {
    fn resolve_secret(&mut self, name: &str) -> Result<Credential, ProvisionError> {
        self.declare(
            collaborator::CREDENTIAL,
            &secret_id(name),
            ResourceKind::SecretReference,
            json!({ "secretName": name }),
        )?;
        Ok(Credential {
            secret_name: name.to_string(),
        })
    }
}

impl RepositoryProvider for DeclarativeProvider {
    fn create_repository(&mut self, id: &str, name: &str) -> Result<RepoRef, ProvisionError> {
        self.declare(
            collaborator::REPOSITORY,
            id,
            ResourceKind::Repository,
            json!({ "repositoryName": name }),
        )?;
        Ok(RepoRef {
            id: id.to_string(),
            name: name.to_string(),
            created: true,
        })
    }

    fn reference_repository(&mut self, id: &str, name: &str) -> Result<RepoRef, ProvisionError> {
        self.declare(
            collaborator::REPOSITORY,
            id,
            ResourceKind::RepositoryReference,
            json!({ "repositoryName": name }),
        )?;
        Ok(RepoRef {
            id: id.to_string(),
            name: name.to_string(),
            created: false,
        })
    }
}

impl BuildEnvironmentProvider for DeclarativeProvider {
    fn provision_project(&mut self, spec: &ProjectSpec) -> Result<ProjectRef, ProvisionError> {
        let properties = to_properties(collaborator::BUILD_ENVIRONMENT, &spec.id, spec)?;
        self.declare(
            collaborator::BUILD_ENVIRONMENT,
            &spec.id,
            ResourceKind::BuildProject,
            properties,
        )?;
        Ok(ProjectRef {
            id: spec.id.clone(),
            principal: Principal::new(token(&spec.id, "Role")),
        })
    }

    fn provision_registry(&mut self, id: &str) -> Result<RegistryRef, ProvisionError> {
        self.declare(
            collaborator::BUILD_ENVIRONMENT,
            id,
            ResourceKind::ImageRegistry,
            json!({}),
        )?;
        Ok(RegistryRef {
            id: id.to_string(),
            uri: token(id, "RepositoryUri"),
        })
    }
}

impl PublishTargetProvider for DeclarativeProvider {
    fn provision_bucket(&mut self, id: &str) -> Result<BucketRef, ProvisionError> {
        self.declare(collaborator::PUBLISH_TARGET, id, ResourceKind::Bucket, json!({}))?;
        let name = token(id, "BucketName");
        Ok(BucketRef {
            id: id.to_string(),
            url: format!("s3://{name}"),
            name,
        })
    }

    fn provision_distribution(
        &mut self,
        id: &str,
        bucket: &BucketRef,
        default_root_object: &str,
    ) -> Result<DistributionRef, ProvisionError> {
        self.declare(
            collaborator::PUBLISH_TARGET,
            id,
            ResourceKind::Distribution,
            json!({
                "origin": bucket.id,
                "defaultRootObject": default_root_object,
            }),
        )?;
        Ok(DistributionRef {
            id: id.to_string(),
            distribution_id: token(id, "DistributionId"),
            domain_name: token(id, "DomainName"),
        })
    }

    fn provision_asset(&mut self, id: &str, path: &str) -> Result<AssetRef, ProvisionError> {
        self.declare(
            collaborator::PUBLISH_TARGET,
            id,
            ResourceKind::Asset,
            json!({ "path": path }),
        )?;
        Ok(AssetRef {
            id: id.to_string(),
            object_url: token(id, "ObjectUrl"),
        })
    }
}

impl FunctionProvider for DeclarativeProvider {
    fn provision_function(&mut self, spec: &FunctionSpec) -> Result<FunctionRef, ProvisionError> {
        let properties = to_properties(collaborator::FUNCTION, &spec.id, spec)?;
        self.declare(
            collaborator::FUNCTION,
            &spec.id,
            ResourceKind::Function,
            properties,
        )?;
        Ok(FunctionRef {
            id: spec.id.clone(),
            name: token(&spec.id, "FunctionName"),
            principal: Principal::new(token(&spec.id, "Role")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BuildSpec, ComputeTier};

    #[test]
    fn test_tokens_are_deterministic() {
        let mut provider = DeclarativeProvider::new();
        let bucket = provider.provision_bucket("CacheBucket").unwrap();
        assert_eq!(bucket.name, "${CacheBucket.BucketName}");
        assert_eq!(bucket.url, "s3://${CacheBucket.BucketName}");

        let dist = provider
            .provision_distribution("SiteDistribution", &bucket, "index.html")
            .unwrap();
        assert_eq!(dist.domain_name, "${SiteDistribution.DomainName}");

        let decl = provider.declaration("SiteDistribution").unwrap();
        assert_eq!(decl.properties["origin"], "CacheBucket");
        assert_eq!(decl.properties["defaultRootObject"], "index.html");
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut provider = DeclarativeProvider::new();
        provider.provision_bucket("Bucket").unwrap();
        let err = provider.provision_asset("Bucket", "index.html").unwrap_err();
        assert_eq!(err.collaborator, collaborator::PUBLISH_TARGET);
        assert_eq!(err.resource, "Bucket");
        assert_eq!(provider.len(), 1);
    }

    #[test]
    fn test_secrets_may_be_resolved_twice() {
        let mut provider = DeclarativeProvider::new();
        provider.resolve_secret("gh-token").unwrap();
        let credential = provider.resolve_secret("gh-token").unwrap();
        assert_eq!(credential.secret_name, "gh-token");
        assert_eq!(provider.declarations_of(ResourceKind::SecretReference).len(), 1);
        assert!(provider.declaration(&secret_id("gh-token")).is_some());
    }

    #[test]
    fn test_secret_names_do_not_clash_with_resource_ids() {
        let mut provider = DeclarativeProvider::new();
        provider.resolve_secret("Proj").unwrap();
        let spec = ProjectSpec::new("Proj", BuildSpec::ProviderDefault, ComputeTier::Large);
        provider.provision_project(&spec).unwrap();

        assert_eq!(
            provider.declaration("Proj").map(|d| d.kind),
            Some(ResourceKind::BuildProject)
        );
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn test_identical_redeclaration_is_a_no_op() {
        let mut provider = DeclarativeProvider::new();
        let first = provider.create_repository("Repo", "svc").unwrap();
        let second = provider.create_repository("Repo", "svc").unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.len(), 1);

        let err = provider.create_repository("Repo", "other").unwrap_err();
        assert_eq!(err.resource, "Repo");
        let err = provider.reference_repository("Repo", "svc").unwrap_err();
        assert_eq!(err.collaborator, collaborator::REPOSITORY);
        assert_eq!(provider.len(), 1);
    }

    #[test]
    fn test_repository_creation_flag() {
        let mut provider = DeclarativeProvider::new();
        assert!(provider.create_repository("Repo", "svc").unwrap().created);
        assert!(!provider.reference_repository("Other", "svc").unwrap().created);
        assert_eq!(
            provider.declaration("Other").map(|d| d.kind),
            Some(ResourceKind::RepositoryReference)
        );
    }

    #[test]
    fn test_project_properties_record_the_spec() {
        let mut provider = DeclarativeProvider::new();
        let spec = ProjectSpec::new("Proj", BuildSpec::ProviderDefault, ComputeTier::Large);
        let project = provider.provision_project(&spec).unwrap();

        assert_eq!(project.principal.as_str(), "${Proj.Role}");
        let decl = provider.declaration("Proj").unwrap();
        assert_eq!(decl.properties["compute"], "large");
        assert_eq!(provider.into_declarations().len(), 1);
    }
}
