//! Error types for the deployflow assembly engine.
//!
//! Every failure aborts assembly. Nothing here is retried: building a
//! pipeline definition is a one-shot declarative pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The main error type for deployflow operations.
#[derive(Debug, Error)]
pub enum DeployflowError {
    /// The configuration tree failed validation.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// An external collaborator failed to provision a resource.
    #[error("{0}")]
    Provision(#[from] ProvisionError),

    /// A stage or action violated a structural invariant.
    #[error("{0}")]
    Definition(#[from] DefinitionError),

    /// A manual approval gate was rejected while walking an execution plan.
    #[error("{0}")]
    ApprovalRejected(#[from] ApprovalRejected),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployflowError {
    /// Returns structured diagnostics for the error, when available.
    #[must_use]
    pub fn error_info(&self) -> Option<ErrorInfo> {
        match self {
            Self::Config(err) => Some(err.error_info()),
            Self::Provision(err) => Some(err.error_info()),
            Self::Definition(err) => Some(err.error_info()),
            Self::ApprovalRejected(err) => Some(err.error_info()),
            Self::Serialization(_) | Self::Io(_) => None,
        }
    }
}

impl From<serde_json::Error> for DeployflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Structured diagnostics attached to an error.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "CONFIG-001-MISSING_FIELD").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ErrorInfo {
    /// Creates new error info. The fix hint defaults to the suggestion table.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        let code = code.into();
        let fix_hint = ErrorSuggestions::get(&code).map(ToString::to_string);
        Self {
            code,
            summary: summary.into(),
            fix_hint,
            context: BTreeMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Errors raised while validating a configuration tree.
///
/// `path` is the dotted location of the offending branch, e.g. `repo.owner`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is absent.
    #[error("Missing required field '{path}'")]
    MissingField {
        /// Dotted path of the missing field.
        path: String,
    },

    /// A field is present but holds an unusable value.
    #[error("Invalid value for '{path}': {reason}")]
    InvalidValue {
        /// Dotted path of the field.
        path: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The repository origin tag is not one of the known variants.
    #[error("Unsupported repository type '{tag}' at '{path}'")]
    UnsupportedRepoType {
        /// Dotted path of the tag.
        path: String,
        /// The unrecognized tag.
        tag: String,
    },

    /// The build variant tag is not one of the known variants.
    #[error("Unsupported build variant '{tag}' at '{path}'")]
    UnsupportedBuildVariant {
        /// Dotted path of the tag.
        path: String,
        /// The unrecognized tag.
        tag: String,
    },

    /// Two settings cannot be used together.
    #[error("Conflicting configuration at '{path}': {reason}")]
    Conflict {
        /// Dotted path of the conflicting section.
        path: String,
        /// What conflicts with what.
        reason: String,
    },

    /// The document could not be decoded at all.
    #[error("Malformed configuration: {message}")]
    Parse {
        /// Decoder message.
        message: String,
    },
}

impl ConfigError {
    /// Creates a missing field error.
    #[must_use]
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the dotted path of the failing branch, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::MissingField { path }
            | Self::InvalidValue { path, .. }
            | Self::UnsupportedRepoType { path, .. }
            | Self::UnsupportedBuildVariant { path, .. }
            | Self::Conflict { path, .. } => Some(path),
            Self::Parse { .. } => None,
        }
    }

    /// Returns structured diagnostics.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        let code = match self {
            Self::MissingField { .. } => "CONFIG-001-MISSING_FIELD",
            Self::InvalidValue { .. } => "CONFIG-002-INVALID_VALUE",
            Self::UnsupportedRepoType { .. } => "CONFIG-003-REPO_TYPE",
            Self::UnsupportedBuildVariant { .. } => "CONFIG-004-BUILD_VARIANT",
            Self::Conflict { .. } => "CONFIG-005-CONFLICT",
            Self::Parse { .. } => "CONFIG-006-PARSE",
        };
        let info = ErrorInfo::new(code, self.to_string());
        match self.path() {
            Some(path) => info.with_context_entry("path", path),
            None => info,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}

/// Error raised by an external collaborator while declaring a resource.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{collaborator} provider failed for '{resource}': {reason}")]
pub struct ProvisionError {
    /// Which collaborator failed (e.g. "credential", "function").
    pub collaborator: String,
    /// The logical id of the resource being declared.
    pub resource: String,
    /// The reason reported by the collaborator.
    pub reason: String,
}

impl ProvisionError {
    /// Creates a new provision error.
    #[must_use]
    pub fn new(
        collaborator: impl Into<String>,
        resource: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            collaborator: collaborator.into(),
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Returns structured diagnostics.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        ErrorInfo::new("PROVISION-001-FAILED", self.to_string())
            .with_context_entry("collaborator", &self.collaborator)
            .with_context_entry("resource", &self.resource)
    }
}

/// Structural invariant violations in a pipeline definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// Two stages share a name.
    #[error("Duplicate stage '{stage}'")]
    DuplicateStage {
        /// The stage name.
        stage: String,
    },

    /// Two actions in one stage share a name.
    #[error("Duplicate action '{action}' in stage '{stage}'")]
    DuplicateAction {
        /// The stage name.
        stage: String,
        /// The action name.
        action: String,
    },

    /// An action was appended with a smaller run-order than its predecessor.
    #[error("Action '{action}' in stage '{stage}' has run-order {run_order}, below previous {previous}")]
    DecreasingRunOrder {
        /// The stage name.
        stage: String,
        /// The action name.
        action: String,
        /// The offending run-order.
        run_order: u32,
        /// The highest run-order already in the stage.
        previous: u32,
    },

    /// An action consumes an artifact produced in the same stage without running after it.
    #[error("Action '{consumer}' consumes '{artifact}' from '{producer}' in stage '{stage}' without a later run-order")]
    ConsumerNotAfterProducer {
        /// The stage name.
        stage: String,
        /// The artifact name.
        artifact: String,
        /// The producing action.
        producer: String,
        /// The consuming action.
        consumer: String,
    },

    /// Two actions declare the same output artifact.
    #[error("Artifact '{artifact}' is produced by both '{first}' and '{second}'")]
    DuplicateProducer {
        /// The artifact name.
        artifact: String,
        /// The first producer.
        first: String,
        /// The second producer.
        second: String,
    },

    /// An action consumes an artifact nothing before it produces.
    #[error("Action '{consumer}' consumes '{artifact}' which no earlier action produces")]
    UnknownArtifact {
        /// The artifact name.
        artifact: String,
        /// The consuming action.
        consumer: String,
    },

    /// A stage or pipeline has nothing in it.
    #[error("'{name}' has no {what}")]
    Empty {
        /// The stage or pipeline name.
        name: String,
        /// "stages" or "actions".
        what: &'static str,
    },
}

impl DefinitionError {
    /// Returns structured diagnostics.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        let code = match self {
            Self::DuplicateStage { .. } => "DEFINITION-001-DUPLICATE_STAGE",
            Self::DuplicateAction { .. } => "DEFINITION-002-DUPLICATE_ACTION",
            Self::DecreasingRunOrder { .. } | Self::ConsumerNotAfterProducer { .. } => {
                "DEFINITION-003-RUN_ORDER"
            }
            Self::DuplicateProducer { .. } | Self::UnknownArtifact { .. } => {
                "DEFINITION-004-ARTIFACT_FLOW"
            }
            Self::Empty { .. } => "DEFINITION-005-EMPTY",
        };
        ErrorInfo::new(code, self.to_string())
    }
}

/// A manual approval gate was rejected. Terminal for the run; never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Approval '{action}' rejected in stage '{stage}'")]
pub struct ApprovalRejected {
    /// The stage holding the gate.
    pub stage: String,
    /// The approval action name.
    pub action: String,
    /// Actions that will not run because the stage halted.
    pub skipped: Vec<String>,
}

impl ApprovalRejected {
    /// Returns structured diagnostics.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        ErrorInfo::new("EXECUTION-001-APPROVAL_REJECTED", self.to_string())
            .with_context_entry("stage", &self.stage)
            .with_context_entry("skipped", self.skipped.join(","))
    }
}

/// Provides default suggestions for common error codes.
pub struct ErrorSuggestions;

impl ErrorSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "CONFIG-001-MISSING_FIELD" => Some(
                "Add the missing field. Managed repositories need 'name'; \
                 external repositories need 'owner', 'name' and 'tokenName'.",
            ),
            "CONFIG-003-REPO_TYPE" => Some("Set 'repo.type' to 'Managed' or 'External'."),
            "CONFIG-004-BUILD_VARIANT" => Some(
                "Set 'build.variant' to one of 'Synth', 'Container', 'Mobile' or 'Custom', \
                 or omit it to infer the variant from the build settings.",
            ),
            "CONFIG-005-CONFLICT" => Some(
                "A build either loads its specification from 'specFilename' or synthesizes \
                 its phases. Remove one of the two.",
            ),
            "DEFINITION-003-RUN_ORDER" => Some(
                "Allocate run-orders from the stage's sequencer so each dependent action \
                 runs strictly after its producer.",
            ),
            "DEFINITION-005-EMPTY" => Some("Add at least one action before finishing the stage."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_carries_path() {
        let err = ConfigError::missing("repo.owner");
        assert_eq!(err.path(), Some("repo.owner"));
        assert!(err.to_string().contains("repo.owner"));

        let info = err.error_info();
        assert_eq!(info.code, "CONFIG-001-MISSING_FIELD");
        assert_eq!(info.context.get("path"), Some(&"repo.owner".to_string()));
        assert!(info.fix_hint.is_some());
    }

    #[test]
    fn test_unsupported_repo_type_message() {
        let err = ConfigError::UnsupportedRepoType {
            path: "repo.type".to_string(),
            tag: "Svn".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported repository type 'Svn' at 'repo.type'");
        assert_eq!(err.error_info().code, "CONFIG-003-REPO_TYPE");
    }

    #[test]
    fn test_parse_error_has_no_path() {
        let err: ConfigError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.path().is_none());
        assert_eq!(err.error_info().code, "CONFIG-006-PARSE");
    }

    #[test]
    fn test_provision_error_info() {
        let err = ProvisionError::new("function", "CleanupHandler", "quota exceeded");
        assert_eq!(
            err.to_string(),
            "function provider failed for 'CleanupHandler': quota exceeded"
        );
        let info = err.error_info();
        assert_eq!(info.context.get("resource"), Some(&"CleanupHandler".to_string()));
    }

    #[test]
    fn test_run_order_errors_share_code() {
        let decreasing = DefinitionError::DecreasingRunOrder {
            stage: "Validate".to_string(),
            action: "Approval".to_string(),
            run_order: 1,
            previous: 2,
        };
        let not_after = DefinitionError::ConsumerNotAfterProducer {
            stage: "Validate".to_string(),
            artifact: "Out".to_string(),
            producer: "A".to_string(),
            consumer: "B".to_string(),
        };
        assert_eq!(decreasing.error_info().code, not_after.error_info().code);
    }

    #[test]
    fn test_top_level_error_info() {
        let err: DeployflowError = ConfigError::missing("repo").into();
        assert_eq!(
            err.error_info().map(|i| i.code),
            Some("CONFIG-001-MISSING_FIELD".to_string())
        );

        let io: DeployflowError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(io.error_info().is_none());
    }

    #[test]
    fn test_suggestions() {
        assert!(ErrorSuggestions::get("CONFIG-005-CONFLICT").is_some());
        assert!(ErrorSuggestions::get("UNKNOWN").is_none());
    }
}
