//! Build specifications handed to the build-environment provider.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a build project gets its phase definitions from.
///
/// A project either loads a specification file from its input artifact or
/// runs phases synthesized at assembly time, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum BuildSpec {
    /// Load the named file from the source artifact at build time.
    FromSourceFile(String),
    /// Phases synthesized during assembly.
    Inline(BuildSpecDocument),
    /// No specification; the provider's own default applies.
    ProviderDefault,
}

impl BuildSpec {
    /// Returns the inline document, if this spec has one.
    #[must_use]
    pub const fn document(&self) -> Option<&BuildSpecDocument> {
        match self {
            Self::Inline(doc) => Some(doc),
            _ => None,
        }
    }
}

/// The install phase, which also pins runtime versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPhase {
    /// Runtime name to version.
    #[serde(rename = "runtime-versions", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub runtime_versions: BTreeMap<String, String>,
    /// Commands to run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

/// Any non-install phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPhase {
    /// Commands to run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

/// Files collected as the project's output artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFiles {
    /// Glob patterns.
    pub files: Vec<String>,
    /// Flatten directory structure.
    #[serde(rename = "discard-paths")]
    pub discard_paths: bool,
}

/// Phases, environment and cache paths of a synthesized build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpecDocument {
    /// Specification format version.
    pub version: String,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Install phase.
    pub install: InstallPhase,
    /// Pre-build phase.
    pub pre_build: BuildPhase,
    /// Build phase.
    pub build: BuildPhase,
    /// Post-build phase.
    pub post_build: BuildPhase,
    /// Output files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactFiles>,
    /// Paths persisted to the build cache.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_paths: Vec<String>,
}

impl Default for BuildSpecDocument {
    fn default() -> Self {
        Self {
            version: "0.2".to_string(),
            env: BTreeMap::new(),
            install: InstallPhase::default(),
            pre_build: BuildPhase::default(),
            build: BuildPhase::default(),
            post_build: BuildPhase::default(),
            artifacts: None,
            cache_paths: Vec::new(),
        }
    }
}

impl BuildSpecDocument {
    /// Creates an empty version 0.2 document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Merges environment variables. Later entries win.
    #[must_use]
    pub fn with_envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Merges runtime versions into the install phase.
    #[must_use]
    pub fn with_runtimes(mut self, runtimes: impl IntoIterator<Item = (String, String)>) -> Self {
        self.install.runtime_versions.extend(runtimes);
        self
    }

    /// Sets install commands.
    #[must_use]
    pub fn with_install(mut self, commands: Vec<String>) -> Self {
        self.install.commands = commands;
        self
    }

    /// Sets pre-build commands.
    #[must_use]
    pub fn with_pre_build(mut self, commands: Vec<String>) -> Self {
        self.pre_build.commands = commands;
        self
    }

    /// Sets build commands.
    #[must_use]
    pub fn with_build(mut self, commands: Vec<String>) -> Self {
        self.build.commands = commands;
        self
    }

    /// Sets post-build commands.
    #[must_use]
    pub fn with_post_build(mut self, commands: Vec<String>) -> Self {
        self.post_build.commands = commands;
        self
    }

    /// Declares output files.
    #[must_use]
    pub fn with_artifact_files(mut self, files: Vec<String>, discard_paths: bool) -> Self {
        self.artifacts = Some(ArtifactFiles {
            files,
            discard_paths,
        });
        self
    }

    /// Declares cache paths.
    #[must_use]
    pub fn with_cache_paths(mut self, paths: Vec<String>) -> Self {
        self.cache_paths = paths;
        self
    }

    /// Renders the document as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_defaults_to_version_0_2() {
        let doc = BuildSpecDocument::new();
        assert_eq!(doc.version, "0.2");
        assert!(doc.env.is_empty());
        assert!(doc.artifacts.is_none());
    }

    #[test]
    fn test_runtimes_merge_and_render() {
        let doc = BuildSpecDocument::new()
            .with_runtimes([("nodejs".to_string(), "12".to_string())])
            .with_runtimes([("docker".to_string(), "20.10".to_string())])
            .with_build(vec!["make".to_string()]);

        let json = doc.to_json();
        assert_eq!(json["install"]["runtime-versions"]["docker"], "20.10");
        assert_eq!(json["install"]["runtime-versions"]["nodejs"], "12");
        assert_eq!(json["build"]["commands"][0], "make");
        assert!(json.get("cache_paths").is_none());
    }

    #[test]
    fn test_artifact_files_render_discard_paths() {
        let doc = BuildSpecDocument::new()
            .with_artifact_files(vec!["*.apk".to_string()], true);
        assert_eq!(doc.to_json()["artifacts"]["discard-paths"], true);
    }

    #[test]
    fn test_spec_document_accessor() {
        assert!(BuildSpec::ProviderDefault.document().is_none());
        assert!(BuildSpec::FromSourceFile("buildspec.yml".into()).document().is_none());
        assert!(BuildSpec::Inline(BuildSpecDocument::new()).document().is_some());
    }
}
