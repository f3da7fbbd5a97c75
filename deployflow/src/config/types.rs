//! The validated configuration model.

use super::raw::RawPipelineConfig;
use super::validation::{validate_email, validate_identifier, validate_secret_name};
use crate::core::{BuildActionType, ComputeSize};
use crate::errors::ConfigError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Root configuration of a pipeline.
///
/// An absent optional section disables the corresponding stage entirely,
/// except `build`, which falls back to a default synth build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    /// Source-control origin.
    pub repo: RepoConfig,
    /// Build settings.
    pub build: Option<BuildConfig>,
    /// Validation stage settings. Presence creates the stage.
    pub validate: Option<ValidateConfig>,
    /// Settings forwarded to the deployment-stage provider.
    pub deploy: Option<DeployConfig>,
}

impl PipelineConfig {
    /// Creates a configuration with only a source origin.
    #[must_use]
    pub const fn new(repo: RepoConfig) -> Self {
        Self {
            repo,
            build: None,
            validate: None,
            deploy: None,
        }
    }

    /// Sets the build section.
    #[must_use]
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = Some(build);
        self
    }

    /// Sets the validate section.
    #[must_use]
    pub fn with_validate(mut self, validate: ValidateConfig) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Sets the deploy section.
    #[must_use]
    pub fn with_deploy(mut self, deploy: DeployConfig) -> Self {
        self.deploy = Some(deploy);
        self
    }

    /// Parses and validates a configuration tree.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first failing branch.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawPipelineConfig = serde_json::from_value(value)?;
        let config = raw.into_config("")?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first failing branch.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Returns the build section, or the default synth build when absent.
    #[must_use]
    pub fn effective_build(&self) -> BuildConfig {
        self.build.clone().unwrap_or_default()
    }

    /// Checks every section and the combinations between them.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first failing branch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_at("")
    }

    pub(crate) fn validate_at(&self, prefix: &str) -> Result<(), ConfigError> {
        self.repo.validate(&join(prefix, "repo"))?;
        let build = self.effective_build();
        build.validate(&join(prefix, "build"))?;
        if let Some(ref validate) = self.validate {
            let path = join(prefix, "validate");
            validate.validate(&path)?;
            if !build.variant.produces_artifact() {
                return Err(ConfigError::conflict(
                    path,
                    format!(
                        "the {} build variant produces no artifact for the validation stage to render",
                        build.variant
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Source-control origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum RepoConfig {
    /// A repository owned by the pipeline's provider.
    Managed(ManagedRepository),
    /// A repository hosted elsewhere, accessed with a stored credential.
    External(ExternalHostedRepository),
}

impl RepoConfig {
    /// Creates a managed repository origin.
    #[must_use]
    pub fn managed(name: impl Into<String>, create: bool) -> Self {
        Self::Managed(ManagedRepository {
            name: name.into(),
            create,
        })
    }

    /// Creates an externally hosted origin.
    #[must_use]
    pub fn external(
        owner: impl Into<String>,
        name: impl Into<String>,
        token_name: impl Into<String>,
    ) -> Self {
        Self::External(ExternalHostedRepository {
            owner: owner.into(),
            name: name.into(),
            token_name: token_name.into(),
        })
    }

    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        match self {
            Self::Managed(repo) => validate_identifier(&join(path, "name"), &repo.name),
            Self::External(repo) => {
                validate_identifier(&join(path, "owner"), &repo.owner)?;
                validate_identifier(&join(path, "name"), &repo.name)?;
                validate_secret_name(&join(path, "tokenName"), &repo.token_name)
            }
        }
    }
}

/// A repository managed by the pipeline's own provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedRepository {
    /// Repository name.
    pub name: String,
    /// Declare a new repository instead of referencing an existing one.
    pub create: bool,
}

/// A repository hosted by a third party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalHostedRepository {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Name of the secret holding the access token.
    pub token_name: String,
}

/// Which build-action factory handles a build section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BuildVariant {
    /// Synthesize the deployable description.
    #[default]
    Synth,
    /// Build and push a container image.
    Container,
    /// Assemble mobile packages.
    Mobile,
    /// Run a caller-provided build specification.
    Custom,
}

impl BuildVariant {
    /// Parses a configuration tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Synth" => Some(Self::Synth),
            "Container" => Some(Self::Container),
            "Mobile" => Some(Self::Mobile),
            "Custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Returns true if the variant synthesizes its own phases.
    #[must_use]
    pub const fn synthesizes_phases(self) -> bool {
        !matches!(self, Self::Custom)
    }

    /// Returns true if the variant declares an output artifact.
    #[must_use]
    pub const fn produces_artifact(self) -> bool {
        !matches!(self, Self::Container)
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synth => write!(f, "Synth"),
            Self::Container => write!(f, "Container"),
            Self::Mobile => write!(f, "Mobile"),
            Self::Custom => write!(f, "Custom"),
        }
    }
}

/// Build settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Selected factory.
    pub variant: BuildVariant,
    /// Compute size; absent means provider default.
    pub compute: Option<ComputeSize>,
    /// Runtime name to version.
    pub runtimes: BTreeMap<String, String>,
    /// Build specification file loaded from the source artifact.
    pub spec_filename: Option<String>,
    /// Script sourced before the build, if present in the source tree.
    pub prebuild_script: Option<String>,
    /// Script sourced after the build, if present in the source tree.
    pub postbuild_script: Option<String>,
    /// Run the build privileged.
    pub privileged: bool,
    /// Extra environment variables.
    pub env: BTreeMap<String, String>,
    /// Commands run before the pre-build script hook.
    pub prebuild_commands: Vec<String>,
    /// Commands run after the post-build script hook.
    pub postbuild_commands: Vec<String>,
    /// How a custom build is reported to the execution service.
    pub action_type: BuildActionType,
}

impl BuildConfig {
    /// Creates a build section for a variant.
    #[must_use]
    pub fn new(variant: BuildVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Sets the compute size.
    #[must_use]
    pub const fn with_compute(mut self, compute: ComputeSize) -> Self {
        self.compute = Some(compute);
        self
    }

    /// Pins a runtime version.
    #[must_use]
    pub fn with_runtime(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.runtimes.insert(name.into(), version.into());
        self
    }

    /// Sets the build specification file.
    #[must_use]
    pub fn with_spec_filename(mut self, filename: impl Into<String>) -> Self {
        self.spec_filename = Some(filename.into());
        self
    }

    /// Sets the script sourced before the build.
    #[must_use]
    pub fn with_prebuild_script(mut self, path: impl Into<String>) -> Self {
        self.prebuild_script = Some(path.into());
        self
    }

    /// Sets the script sourced after the build.
    #[must_use]
    pub fn with_postbuild_script(mut self, path: impl Into<String>) -> Self {
        self.postbuild_script = Some(path.into());
        self
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the action type.
    #[must_use]
    pub const fn with_action_type(mut self, action_type: BuildActionType) -> Self {
        self.action_type = action_type;
        self
    }

    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        if let Some(ref filename) = self.spec_filename {
            if filename.trim().is_empty() {
                return Err(ConfigError::invalid(
                    join(path, "specFilename"),
                    "must not be empty",
                ));
            }
            if self.variant.synthesizes_phases() {
                return Err(ConfigError::conflict(
                    path,
                    format!(
                        "specFilename cannot be combined with the {} variant, which synthesizes its own phases",
                        self.variant
                    ),
                ));
            }
        }
        if !self.variant.synthesizes_phases() {
            let has_inline = !self.prebuild_commands.is_empty()
                || !self.postbuild_commands.is_empty()
                || self.prebuild_script.is_some()
                || self.postbuild_script.is_some();
            if has_inline {
                return Err(ConfigError::conflict(
                    path,
                    "the Custom variant takes its phases from the build specification; \
                     remove the pre/post build commands and scripts",
                ));
            }
        }
        Ok(())
    }
}

/// Validation stage settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidateConfig {
    /// Recipients notified when the approval gate opens.
    pub emails: Vec<String>,
    /// Compute size of the rendering project.
    pub compute: Option<ComputeSize>,
}

impl ValidateConfig {
    /// Creates validation settings notifying the given recipients.
    #[must_use]
    pub fn with_emails(emails: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            emails: emails.into_iter().map(Into::into).collect(),
            compute: None,
        }
    }

    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        for (i, email) in self.emails.iter().enumerate() {
            validate_email(&format!("{path}.emails[{i}]"), email)?;
        }
        Ok(())
    }
}

/// Settings forwarded untouched to the deployment-stage provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    /// Compute size for deployment builds.
    pub compute: Option<ComputeSize>,
    /// Runtime name to version.
    pub runtimes: BTreeMap<String, String>,
    /// Build specification file.
    pub spec_filename: Option<String>,
}

pub(crate) fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}
