//! Pipeline actions.

use super::{Artifact, Credential, FunctionRef, ProjectRef, RepoRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where a source action fetches code from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceOrigin {
    /// A repository managed by the pipeline's own provider.
    Managed {
        /// The repository.
        repository: RepoRef,
    },
    /// A repository hosted by a third party, accessed with a credential.
    External {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Access credential reference.
        credential: Credential,
    },
}

/// How the execution service should treat a build action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildActionType {
    /// A regular build.
    #[default]
    Build,
    /// A test run.
    Test,
}

impl fmt::Display for BuildActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// The external execution environment an action requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionProvider {
    /// Fetch source code.
    Source {
        /// The origin.
        origin: SourceOrigin,
    },
    /// Run a build project.
    Build {
        /// The project.
        project: ProjectRef,
        /// Build or test.
        action_type: BuildActionType,
    },
    /// Block until a human approves or rejects.
    ManualApproval {
        /// Link shown to reviewers.
        external_link: Option<String>,
        /// Recipients notified when the gate opens.
        notify_emails: Vec<String>,
    },
    /// Invoke a short-lived function.
    Invoke {
        /// The function.
        function: FunctionRef,
        /// Parameters passed to the invocation.
        user_parameters: BTreeMap<String, String>,
    },
    /// Deploy a unit of infrastructure. Declared by the deploy-stage provider.
    Deploy {
        /// Name of the deployed unit.
        target: String,
        /// Provider-specific parameters.
        parameters: BTreeMap<String, String>,
    },
}

impl ActionProvider {
    /// Short category name used in logs and events.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Source { .. } => "source",
            Self::Build { .. } => "build",
            Self::ManualApproval { .. } => "approval",
            Self::Invoke { .. } => "invoke",
            Self::Deploy { .. } => "deploy",
        }
    }
}

/// A unit of pipeline work.
///
/// Created once by a factory and immutable after it is added to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    inputs: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    outputs: Vec<Artifact>,
    provider: ActionProvider,
}

impl Action {
    /// Creates an action with no artifacts and no explicit run-order.
    #[must_use]
    pub fn new(name: impl Into<String>, provider: ActionProvider) -> Self {
        Self {
            name: name.into(),
            run_order: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            provider,
        }
    }

    /// Adds an input artifact.
    #[must_use]
    pub fn with_input(mut self, artifact: Artifact) -> Self {
        self.inputs.push(artifact);
        self
    }

    /// Adds an output artifact.
    #[must_use]
    pub fn with_output(mut self, artifact: Artifact) -> Self {
        self.outputs.push(artifact);
        self
    }

    /// Sets the run-order.
    #[must_use]
    pub const fn with_run_order(mut self, run_order: u32) -> Self {
        self.run_order = Some(run_order);
        self
    }

    /// Sets or clears the run-order.
    #[must_use]
    pub const fn with_optional_run_order(mut self, run_order: Option<u32>) -> Self {
        self.run_order = run_order;
        self
    }

    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the explicit run-order, if any.
    #[must_use]
    pub const fn run_order(&self) -> Option<u32> {
        self.run_order
    }

    /// Returns the run-order the execution service will use (1 when unset).
    #[must_use]
    pub fn effective_run_order(&self) -> u32 {
        self.run_order.unwrap_or(1)
    }

    /// Returns the input artifacts.
    #[must_use]
    pub fn inputs(&self) -> &[Artifact] {
        &self.inputs
    }

    /// Returns the output artifacts.
    #[must_use]
    pub fn outputs(&self) -> &[Artifact] {
        &self.outputs
    }

    /// Returns the execution environment.
    #[must_use]
    pub const fn provider(&self) -> &ActionProvider {
        &self.provider
    }

    /// Returns true for manual approval gates.
    #[must_use]
    pub const fn is_approval(&self) -> bool {
        matches!(self.provider, ActionProvider::ManualApproval { .. })
    }
}
