//! Assertions over assembled pipeline definitions.

use crate::core::{Permission, Principal, Stage};
use crate::pipeline::PipelineDefinition;
use std::collections::BTreeMap;

/// Asserts that the definition's stages are exactly `expected`, in order.
pub fn assert_stage_names(definition: &PipelineDefinition, expected: &[&str]) {
    let actual = definition.stage_names();
    assert_eq!(
        actual, expected,
        "Expected stages {expected:?}, got {actual:?}"
    );
}

/// Asserts that every action of `stage` has an explicit run-order and that
/// the run-orders strictly increase in declaration order.
pub fn assert_run_orders_increasing(stage: &Stage) {
    let missing: Vec<_> = stage
        .actions()
        .iter()
        .filter(|a| a.run_order().is_none())
        .map(|a| a.name().to_string())
        .collect();
    assert!(
        missing.is_empty(),
        "Stage '{}' has actions without a run-order: {missing:?}",
        stage.name()
    );

    let orders = stage.run_orders();
    assert!(
        orders.windows(2).all(|w| w[0] < w[1]),
        "Stage '{}' run-orders are not strictly increasing: {orders:?}",
        stage.name()
    );
}

/// Asserts that every consumed artifact has exactly one producer, declared
/// in an earlier stage or at a strictly lower run-order in the same stage.
pub fn assert_artifact_flow(definition: &PipelineDefinition) {
    let mut producers: BTreeMap<&str, (usize, u32, &str)> = BTreeMap::new();
    for (index, stage) in definition.stages().iter().enumerate() {
        for action in stage.actions() {
            for output in action.outputs() {
                let producer = (index, action.effective_run_order(), action.name());
                let previous = producers.insert(output.name(), producer);
                assert!(
                    previous.is_none(),
                    "Artifact '{}' has more than one producer",
                    output.name()
                );
            }
        }
    }

    for (index, stage) in definition.stages().iter().enumerate() {
        for action in stage.actions() {
            for input in action.inputs() {
                let Some(&(producer_stage, producer_order, producer)) = producers.get(input.name())
                else {
                    panic!(
                        "Action '{}/{}' consumes '{}' which nothing produces",
                        stage.name(),
                        action.name(),
                        input.name()
                    );
                };
                assert!(
                    producer_stage < index
                        || (producer_stage == index
                            && producer_order < action.effective_run_order()),
                    "Action '{}/{}' is not sequenced after '{producer}', the producer of '{}'",
                    stage.name(),
                    action.name(),
                    input.name()
                );
            }
        }
    }
}

/// Asserts that the definition grants `permission` on `resource` to `principal`.
pub fn assert_has_grant(
    definition: &PipelineDefinition,
    principal: &str,
    permission: Permission,
    resource: &str,
) {
    let principal = Principal::new(principal);
    assert!(
        definition.grants().iter().any(|g| g.principal == principal
            && g.permission == permission
            && g.resource == resource),
        "Expected grant {permission:?} on '{resource}' to '{}', grants: {:?}",
        principal.as_str(),
        definition.grants()
    );
}
