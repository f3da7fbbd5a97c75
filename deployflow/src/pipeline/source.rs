//! Source resolution.

use crate::config::RepoConfig;
use crate::core::{Action, ActionProvider, Artifact, SourceOrigin};
use crate::errors::ProvisionError;
use crate::providers::{CredentialProvider, RepositoryProvider};

/// A source action and the artifact it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// The source-fetch action. Its only output is `artifact`.
    pub action: Action,
    /// The fetched source code.
    pub artifact: Artifact,
}

/// Turns a repository origin into a source-fetch action.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceResolver;

impl SourceResolver {
    /// Resolves `repo` into a source action named `{prefix}RepoSource`
    /// producing `{prefix}SourceCode`.
    ///
    /// Managed repositories are declared when `create` is set and referenced
    /// by name otherwise. External repositories resolve their access token
    /// through the credential provider.
    ///
    /// # Errors
    ///
    /// Propagates the first collaborator failure.
    pub fn resolve<P>(
        provider: &mut P,
        repo: &RepoConfig,
        prefix: &str,
    ) -> Result<SourceOutcome, ProvisionError>
    where
        P: CredentialProvider + RepositoryProvider + ?Sized,
    {
        let artifact = Artifact::new(format!("{prefix}SourceCode"));

        let origin = match repo {
            RepoConfig::Managed(managed) => {
                let id = format!("{prefix}Repo");
                let repository = if managed.create {
                    provider.create_repository(&id, &managed.name)?
                } else {
                    provider.reference_repository(&id, &managed.name)?
                };
                SourceOrigin::Managed { repository }
            }
            RepoConfig::External(external) => {
                let credential = provider.resolve_secret(&external.token_name)?;
                SourceOrigin::External {
                    owner: external.owner.clone(),
                    repo: external.name.clone(),
                    credential,
                }
            }
        };

        let action = Action::new(
            format!("{prefix}RepoSource"),
            ActionProvider::Source { origin },
        )
        .with_output(artifact.clone());

        tracing::debug!(action = %action.name(), artifact = %artifact, "Source resolved");
        Ok(SourceOutcome { action, artifact })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Credential, RepoRef};
    use crate::providers::DeclarativeProvider;
    use mockall::mock;
    use pretty_assertions::assert_eq;

    mock! {
        Source {}
        impl CredentialProvider for Source {
            fn resolve_secret(&mut self, name: &str) -> Result<Credential, ProvisionError>;
        }
        impl RepositoryProvider for Source {
            fn create_repository(&mut self, id: &str, name: &str)
                -> Result<RepoRef, ProvisionError>;
            fn reference_repository(&mut self, id: &str, name: &str)
                -> Result<RepoRef, ProvisionError>;
        }
    }

    #[test]
    fn test_managed_repository_is_created() {
        let mut provider = DeclarativeProvider::new();
        let outcome =
            SourceResolver::resolve(&mut provider, &RepoConfig::managed("svc", true), "").unwrap();

        assert_eq!(outcome.action.name(), "RepoSource");
        assert_eq!(outcome.artifact, Artifact::new("SourceCode"));
        assert_eq!(outcome.action.outputs(), &[outcome.artifact.clone()]);
        match outcome.action.provider() {
            ActionProvider::Source {
                origin: SourceOrigin::Managed { repository },
            } => {
                assert!(repository.created);
                assert_eq!(repository.name, "svc");
            }
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn test_managed_repository_is_referenced() {
        let mut provider = MockSource::new();
        provider.expect_create_repository().never();
        provider
            .expect_reference_repository()
            .withf(|id, name| id == "AppRepo" && name == "svc")
            .times(1)
            .returning(|id, name| {
                Ok(RepoRef {
                    id: id.to_string(),
                    name: name.to_string(),
                    created: false,
                })
            });

        let outcome =
            SourceResolver::resolve(&mut provider, &RepoConfig::managed("svc", false), "App")
                .unwrap();
        assert_eq!(outcome.action.name(), "AppRepoSource");
        assert_eq!(outcome.artifact.name(), "AppSourceCode");
    }

    #[test]
    fn test_external_repository_resolves_credential() {
        let mut provider = MockSource::new();
        provider
            .expect_resolve_secret()
            .withf(|name| name == "gh-token")
            .times(1)
            .returning(|name| {
                Ok(Credential {
                    secret_name: name.to_string(),
                })
            });

        let repo = RepoConfig::external("acme", "svc", "gh-token");
        let outcome = SourceResolver::resolve(&mut provider, &repo, "").unwrap();
        assert_eq!(
            outcome.action.provider(),
            &ActionProvider::Source {
                origin: SourceOrigin::External {
                    owner: "acme".to_string(),
                    repo: "svc".to_string(),
                    credential: Credential {
                        secret_name: "gh-token".to_string(),
                    },
                },
            }
        );
    }

    #[test]
    fn test_credential_failure_propagates() {
        let mut provider = MockSource::new();
        provider
            .expect_resolve_secret()
            .returning(|name| Err(ProvisionError::new("credential", name, "access denied")));

        let repo = RepoConfig::external("acme", "svc", "gh-token");
        let err = SourceResolver::resolve(&mut provider, &repo, "").unwrap_err();
        assert_eq!(err.resource, "gh-token");
    }
}
