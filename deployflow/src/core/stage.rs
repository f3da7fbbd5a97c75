//! Stages: ordered groups of actions sharing a logical phase.

use super::Action;
use crate::errors::DefinitionError;
use serde::{Deserialize, Serialize};

/// An ordered set of actions.
///
/// Run-orders never decrease in declaration order, and an action that
/// consumes an artifact produced earlier in the same stage must have a
/// strictly greater run-order than its producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    name: String,
    actions: Vec<Action>,
}

impl Stage {
    /// Creates an empty stage.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Creates a stage from actions, validating each as it is appended.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation.
    pub fn with_actions(
        name: impl Into<String>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Result<Self, DefinitionError> {
        let mut stage = Self::new(name);
        for action in actions {
            stage.add_action(action)?;
        }
        Ok(stage)
    }

    /// Appends an action.
    ///
    /// # Errors
    ///
    /// Returns an error on a duplicate name, a decreasing run-order, or a
    /// consumer that does not run strictly after its in-stage producer.
    pub fn add_action(&mut self, action: Action) -> Result<(), DefinitionError> {
        if self.action(action.name()).is_some() {
            return Err(DefinitionError::DuplicateAction {
                stage: self.name.clone(),
                action: action.name().to_string(),
            });
        }

        let run_order = action.effective_run_order();
        if let Some(previous) = self.max_run_order() {
            if run_order < previous {
                return Err(DefinitionError::DecreasingRunOrder {
                    stage: self.name.clone(),
                    action: action.name().to_string(),
                    run_order,
                    previous,
                });
            }
        }

        for input in action.inputs() {
            let producer = self
                .actions
                .iter()
                .find(|existing| existing.outputs().contains(input));
            if let Some(producer) = producer {
                if producer.effective_run_order() >= run_order {
                    return Err(DefinitionError::ConsumerNotAfterProducer {
                        stage: self.name.clone(),
                        artifact: input.name().to_string(),
                        producer: producer.name().to_string(),
                        consumer: action.name().to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            stage = %self.name,
            action = %action.name(),
            category = action.provider().category(),
            run_order = ?action.run_order(),
            "Action added to stage"
        );
        self.actions.push(action);
        Ok(())
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the actions in declaration order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Looks up an action by name.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name() == name)
    }

    /// Returns the highest effective run-order in the stage.
    #[must_use]
    pub fn max_run_order(&self) -> Option<u32> {
        self.actions.iter().map(Action::effective_run_order).max()
    }

    /// Returns the effective run-orders in declaration order.
    #[must_use]
    pub fn run_orders(&self) -> Vec<u32> {
        self.actions.iter().map(Action::effective_run_order).collect()
    }

    /// Returns the number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if the stage has no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
