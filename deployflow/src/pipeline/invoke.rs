//! Function invocation actions.

use crate::core::{Action, ActionProvider, FunctionRef, FunctionSpec, PolicyStatement};
use crate::errors::ProvisionError;
use crate::providers::FunctionProvider;
use std::collections::BTreeMap;

/// Timeout of invoked functions.
pub const INVOKE_TIMEOUT_SECS: u32 = 60;

/// Log retention of invoked functions.
pub const INVOKE_LOG_RETENTION_DAYS: u32 = 1;

/// A declared function and the action invoking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOutcome {
    /// The invoke action.
    pub action: Action,
    /// The declared function. Its principal is what callers grant to.
    pub function: FunctionRef,
}

/// Builds an action that invokes a short-lived function.
///
/// The function is declared as `{prefix}Handler` from the code at `entry`
/// and invoked by an action named `{prefix}Action`.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = InvokeActionBuilder::new("Cleanup", "cdn-empty-handler")
///     .with_parameter("sourceName", bucket.name)
///     .with_run_order(3)
///     .build(&mut provider)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeActionBuilder {
    prefix: String,
    entry: String,
    index: Option<String>,
    handler: Option<String>,
    parameters: BTreeMap<String, String>,
    policies: Vec<PolicyStatement>,
    run_order: Option<u32>,
}

impl InvokeActionBuilder {
    /// Creates a builder for the function at `entry`.
    #[must_use]
    pub fn new(prefix: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entry: entry.into(),
            index: None,
            handler: None,
            parameters: BTreeMap::new(),
            policies: Vec::new(),
            run_order: None,
        }
    }

    /// Sets the module file holding the handler.
    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Sets the handler name.
    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Adds a user parameter passed to the function on invocation.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Adds an initial policy statement.
    #[must_use]
    pub fn with_policy(mut self, policy: PolicyStatement) -> Self {
        self.policies.push(policy);
        self
    }

    /// Sets the run-order of the action.
    #[must_use]
    pub const fn with_run_order(mut self, run_order: u32) -> Self {
        self.run_order = Some(run_order);
        self
    }

    /// Returns the function spec this builder declares.
    #[must_use]
    pub fn function_spec(&self) -> FunctionSpec {
        FunctionSpec {
            id: format!("{}Handler", self.prefix),
            entry: self.entry.clone(),
            index: self.index.clone(),
            handler: self.handler.clone(),
            timeout_secs: INVOKE_TIMEOUT_SECS,
            log_retention_days: INVOKE_LOG_RETENTION_DAYS,
            policies: self.policies.clone(),
        }
    }

    /// Declares the function and builds the action.
    ///
    /// # Errors
    ///
    /// Propagates the function provider's failure.
    pub fn build(
        self,
        provider: &mut (impl FunctionProvider + ?Sized),
    ) -> Result<InvokeOutcome, ProvisionError> {
        let function = provider.provision_function(&self.function_spec())?;
        let action = Action::new(
            format!("{}Action", self.prefix),
            ActionProvider::Invoke {
                function: function.clone(),
                user_parameters: self.parameters,
            },
        )
        .with_optional_run_order(self.run_order);

        tracing::debug!(action = %action.name(), function = %function.id, "Invoke action built");
        Ok(InvokeOutcome { action, function })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Principal;
    use crate::providers::MockFunctionProvider;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_spec_defaults() {
        let spec = InvokeActionBuilder::new("Cleanup", "cdn-empty-handler").function_spec();
        assert_eq!(spec.id, "CleanupHandler");
        assert_eq!(spec.entry, "cdn-empty-handler");
        assert_eq!(spec.timeout_secs, 60);
        assert_eq!(spec.log_retention_days, 1);
        assert!(spec.index.is_none());
        assert!(spec.policies.is_empty());
    }

    #[test]
    fn test_build_wires_function_and_parameters() {
        let mut provider = MockFunctionProvider::new();
        provider
            .expect_provision_function()
            .withf(|spec| spec.id == "CleanupHandler" && spec.handler.as_deref() == Some("main"))
            .times(1)
            .returning(|spec| {
                Ok(FunctionRef {
                    id: spec.id.clone(),
                    name: "cleanup-fn".to_string(),
                    principal: Principal::new("cleanup-role"),
                })
            });

        let outcome = InvokeActionBuilder::new("Cleanup", "cdn-empty-handler")
            .with_index("index.py")
            .with_handler("main")
            .with_parameter("sourceName", "bucket")
            .with_parameter("distributionId", "dist")
            .with_policy(PolicyStatement {
                actions: vec!["logs:PutLogEvents".to_string()],
                resources: vec!["*".to_string()],
            })
            .with_run_order(3)
            .build(&mut provider)
            .unwrap();

        assert_eq!(outcome.action.name(), "CleanupAction");
        assert_eq!(outcome.action.run_order(), Some(3));
        assert_eq!(outcome.function.principal, Principal::new("cleanup-role"));
        match outcome.action.provider() {
            ActionProvider::Invoke {
                user_parameters, ..
            } => {
                let keys: Vec<_> = user_parameters.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["distributionId", "sourceName"]);
            }
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn test_build_propagates_failure() {
        let mut provider = MockFunctionProvider::new();
        provider
            .expect_provision_function()
            .returning(|spec| {
                Err(ProvisionError::new("function", &spec.id, "runtime unavailable"))
            });

        let err = InvokeActionBuilder::new("Cleanup", "cdn-empty-handler")
            .build(&mut provider)
            .unwrap_err();
        assert_eq!(err.resource, "CleanupHandler");
    }
}
