//! Permissive deserialization targets.
//!
//! The raw structs accept any shape serde can decode; turning them into the
//! typed model is where tags are resolved and required fields enforced.

use super::types::{
    join, BuildConfig, BuildVariant, DeployConfig, ExternalHostedRepository, ManagedRepository,
    PipelineConfig, RepoConfig, ValidateConfig,
};
use crate::core::{BuildActionType, ComputeSize};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPipelineConfig {
    repo: Option<RawRepoConfig>,
    build: Option<RawBuildConfig>,
    validate: Option<RawValidateConfig>,
    deploy: Option<RawStageConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepoConfig {
    #[serde(rename = "type")]
    repo_type: Option<String>,
    name: Option<String>,
    create: Option<bool>,
    owner: Option<String>,
    token_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuildConfig {
    variant: Option<String>,
    compute: Option<String>,
    runtimes: Option<BTreeMap<String, serde_json::Value>>,
    spec_filename: Option<String>,
    prebuild_script: Option<String>,
    postbuild_script: Option<String>,
    privileged: Option<bool>,
    env: Option<BTreeMap<String, String>>,
    prebuild_commands: Option<Vec<String>>,
    postbuild_commands: Option<Vec<String>>,
    action_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValidateConfig {
    emails: Option<Vec<String>>,
    compute: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStageConfig {
    compute: Option<String>,
    runtimes: Option<BTreeMap<String, serde_json::Value>>,
    spec_filename: Option<String>,
}

impl RawPipelineConfig {
    /// Resolves tags and required fields. `prefix` locates the tree in a larger document.
    pub(crate) fn into_config(self, prefix: &str) -> Result<PipelineConfig, ConfigError> {
        let repo_path = join(prefix, "repo");
        let repo = self
            .repo
            .ok_or_else(|| ConfigError::missing(&repo_path))?
            .into_config(&repo_path)?;

        let build = self
            .build
            .map(|raw| raw.into_config(&join(prefix, "build")))
            .transpose()?;
        let validate = self
            .validate
            .map(|raw| raw.into_config(&join(prefix, "validate")));
        let deploy = self
            .deploy
            .map(|raw| raw.into_config(&join(prefix, "deploy")))
            .transpose()?;

        Ok(PipelineConfig {
            repo,
            build,
            validate,
            deploy,
        })
    }
}

impl RawRepoConfig {
    fn into_config(self, path: &str) -> Result<RepoConfig, ConfigError> {
        let tag = required(self.repo_type, &join(path, "type"))?;
        match tag.as_str() {
            "Managed" | "CodeCommit" => Ok(RepoConfig::Managed(ManagedRepository {
                name: required(self.name, &join(path, "name"))?,
                create: self.create.unwrap_or(false),
            })),
            "External" | "GitHub" => Ok(RepoConfig::External(ExternalHostedRepository {
                owner: required(self.owner, &join(path, "owner"))?,
                name: required(self.name, &join(path, "name"))?,
                token_name: required(self.token_name, &join(path, "tokenName"))?,
            })),
            _ => Err(ConfigError::UnsupportedRepoType {
                path: join(path, "type"),
                tag,
            }),
        }
    }
}

impl RawBuildConfig {
    fn into_config(self, path: &str) -> Result<BuildConfig, ConfigError> {
        let privileged = self.privileged.unwrap_or(false);
        let variant = match self.variant {
            Some(tag) => BuildVariant::from_tag(&tag).ok_or_else(|| {
                ConfigError::UnsupportedBuildVariant {
                    path: join(path, "variant"),
                    tag,
                }
            })?,
            None if self.spec_filename.is_some() => BuildVariant::Custom,
            None if privileged => BuildVariant::Container,
            None => BuildVariant::Synth,
        };

        let action_type = match self.action_type.as_deref() {
            None | Some("Build") => BuildActionType::Build,
            Some("Test") => BuildActionType::Test,
            Some(other) => {
                return Err(ConfigError::invalid(
                    join(path, "actionType"),
                    format!("'{other}' is not one of Build, Test"),
                ))
            }
        };

        Ok(BuildConfig {
            variant,
            compute: compute_size(self.compute, &join(path, "compute")),
            runtimes: runtimes(self.runtimes, &join(path, "runtimes"))?,
            spec_filename: self.spec_filename,
            prebuild_script: self.prebuild_script,
            postbuild_script: self.postbuild_script,
            privileged,
            env: self.env.unwrap_or_default(),
            prebuild_commands: self.prebuild_commands.unwrap_or_default(),
            postbuild_commands: self.postbuild_commands.unwrap_or_default(),
            action_type,
        })
    }
}

impl RawValidateConfig {
    fn into_config(self, path: &str) -> ValidateConfig {
        ValidateConfig {
            emails: self.emails.unwrap_or_default(),
            compute: compute_size(self.compute, &join(path, "compute")),
        }
    }
}

impl RawStageConfig {
    fn into_config(self, path: &str) -> Result<DeployConfig, ConfigError> {
        Ok(DeployConfig {
            compute: compute_size(self.compute, &join(path, "compute")),
            runtimes: runtimes(self.runtimes, &join(path, "runtimes"))?,
            spec_filename: self.spec_filename,
        })
    }
}

fn required(value: Option<String>, path: &str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::missing(path)),
    }
}

fn compute_size(tag: Option<String>, path: &str) -> Option<ComputeSize> {
    let tag = tag?;
    let size = ComputeSize::from_tag(&tag);
    if size.is_none() {
        tracing::warn!(path, tag = %tag, "Unknown compute size, using provider default");
    }
    size
}

fn runtimes(
    raw: Option<BTreeMap<String, serde_json::Value>>,
    path: &str,
) -> Result<BTreeMap<String, String>, ConfigError> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(name, version)| {
            let version = match version {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                other => {
                    return Err(ConfigError::invalid(
                        format!("{path}.{name}"),
                        format!("expected a version string or number, got {other}"),
                    ))
                }
            };
            Ok((name, version))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawPipelineConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_repo_section() {
        let err = raw(json!({})).into_config("").unwrap_err();
        assert_eq!(err, ConfigError::missing("repo"));
    }

    #[test]
    fn test_prefix_is_applied_to_paths() {
        let err = raw(json!({"repo": {"type": "External", "name": "svc"}}))
            .into_config("archi.pipeline")
            .unwrap_err();
        assert_eq!(err, ConfigError::missing("archi.pipeline.repo.owner"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let err = raw(json!({"repo": {"type": "Managed", "name": "  "}}))
            .into_config("")
            .unwrap_err();
        assert_eq!(err, ConfigError::missing("repo.name"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let config = raw(json!({
            "repo": {"type": "Managed", "name": "svc"},
            "staging": {"compute": "Small"}
        }))
        .into_config("")
        .unwrap();
        assert!(config.deploy.is_none());
    }

    #[test]
    fn test_action_type() {
        let config = raw(json!({
            "repo": {"type": "Managed", "name": "svc"},
            "build": {"variant": "Custom", "actionType": "Test"}
        }))
        .into_config("")
        .unwrap();
        assert_eq!(
            config.build.map(|b| b.action_type),
            Some(BuildActionType::Test)
        );

        let err = raw(json!({
            "repo": {"type": "Managed", "name": "svc"},
            "build": {"actionType": "Lint"}
        }))
        .into_config("")
        .unwrap_err();
        assert_eq!(err.path(), Some("build.actionType"));
    }

    #[test]
    fn test_runtime_rejects_non_scalar() {
        let err = raw(json!({
            "repo": {"type": "Managed", "name": "svc"},
            "deploy": {"runtimes": {"nodejs": true}}
        }))
        .into_config("")
        .unwrap_err();
        assert_eq!(err.path(), Some("deploy.runtimes.nodejs"));
    }
}
