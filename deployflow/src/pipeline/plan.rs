//! Execution plans.
//!
//! Assembly only declares a pipeline; an external engine runs it. The plan
//! models the order that engine follows so gate and failure semantics can
//! be checked without one: stages run in sequence, actions inside a stage
//! run in waves of equal run-order, and a wave only starts once the
//! previous one finished.

use super::definition::PipelineDefinition;
use crate::core::Action;
use crate::errors::ApprovalRejected;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of running one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action completed.
    Succeeded,
    /// The action failed. Its stage halts.
    Failed,
    /// A human approved the gate.
    Approved,
    /// A human rejected the gate. Terminal for the run.
    Rejected,
}

impl ActionOutcome {
    /// Returns true if the run may continue past this action.
    #[must_use]
    pub const fn proceeds(self) -> bool {
        matches!(self, Self::Succeeded | Self::Approved)
    }
}

/// Actions of one stage sharing a run-order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wave {
    /// The shared run-order.
    pub run_order: u32,
    /// Actions in declaration order.
    pub actions: Vec<Action>,
}

/// The waves of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    /// Stage name.
    pub name: String,
    /// Waves in run-order.
    pub waves: Vec<Wave>,
}

/// Why a walk stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Halt {
    /// Stage of the failing action.
    pub stage: String,
    /// The failing action.
    pub action: String,
    /// Actions that did not run, qualified as `Stage/Action`.
    pub skipped: Vec<String>,
}

/// Result of walking a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Actions that ran, qualified as `Stage/Action`, in execution order.
    pub executed: Vec<String>,
    /// Set when a failed action halted the run.
    pub failed: Option<Halt>,
}

impl ExecutionReport {
    /// Returns true if every action ran and succeeded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// The order in which an execution engine runs a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    stages: Vec<StagePlan>,
}

impl ExecutionPlan {
    /// Groups every stage's actions into waves by run-order.
    #[must_use]
    pub fn from_definition(definition: &PipelineDefinition) -> Self {
        let stages = definition
            .stages()
            .iter()
            .map(|stage| {
                let mut waves: BTreeMap<u32, Vec<Action>> = BTreeMap::new();
                for action in stage.actions() {
                    waves
                        .entry(action.effective_run_order())
                        .or_default()
                        .push(action.clone());
                }
                StagePlan {
                    name: stage.name().to_string(),
                    waves: waves
                        .into_iter()
                        .map(|(run_order, actions)| Wave { run_order, actions })
                        .collect(),
                }
            })
            .collect();
        Self { stages }
    }

    /// Returns the stage plans.
    #[must_use]
    pub fn stages(&self) -> &[StagePlan] {
        &self.stages
    }

    /// Returns the total number of waves.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.stages.iter().map(|s| s.waves.len()).sum()
    }

    /// Walks the plan, asking `decide` for the outcome of each action.
    ///
    /// Every action of a wave runs. If any of them does not proceed, the
    /// walk stops after that wave and everything later is skipped,
    /// including cleanup ordered after a gate.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalRejected`] if a manual approval is rejected. A
    /// failed action is not an error; it is reported in
    /// [`ExecutionReport::failed`].
    pub fn walk<F>(&self, mut decide: F) -> Result<ExecutionReport, ApprovalRejected>
    where
        F: FnMut(&str, &Action) -> ActionOutcome,
    {
        let mut report = ExecutionReport::default();

        for (stage_index, stage) in self.stages.iter().enumerate() {
            for (wave_index, wave) in stage.waves.iter().enumerate() {
                let mut halted: Option<(&Action, ActionOutcome)> = None;
                for action in &wave.actions {
                    let outcome = decide(&stage.name, action);
                    tracing::debug!(
                        stage = %stage.name,
                        action = %action.name(),
                        run_order = wave.run_order,
                        ?outcome,
                        "Action finished"
                    );
                    report
                        .executed
                        .push(format!("{}/{}", stage.name, action.name()));
                    if !outcome.proceeds() && halted.is_none() {
                        halted = Some((action, outcome));
                    }
                }

                if let Some((action, outcome)) = halted {
                    let skipped = self.remaining(stage_index, wave_index + 1);
                    tracing::warn!(
                        stage = %stage.name,
                        action = %action.name(),
                        skipped = skipped.len(),
                        "Stage halted"
                    );
                    if outcome == ActionOutcome::Rejected && action.is_approval() {
                        return Err(ApprovalRejected {
                            stage: stage.name.clone(),
                            action: action.name().to_string(),
                            skipped,
                        });
                    }
                    report.failed = Some(Halt {
                        stage: stage.name.clone(),
                        action: action.name().to_string(),
                        skipped,
                    });
                    return Ok(report);
                }
            }
        }

        Ok(report)
    }

    fn remaining(&self, stage_index: usize, first_wave: usize) -> Vec<String> {
        let mut skipped = Vec::new();
        for (index, stage) in self.stages.iter().enumerate().skip(stage_index) {
            let start = if index == stage_index { first_wave } else { 0 };
            for wave in stage.waves.iter().skip(start) {
                skipped.extend(
                    wave.actions
                        .iter()
                        .map(|a| format!("{}/{}", stage.name, a.name())),
                );
            }
        }
        skipped
    }
}
