//! Configuration fixtures.

use crate::config::{
    BuildConfig, BuildVariant, ContextDocument, PipelineConfig, RepoConfig, ValidateConfig,
};
use crate::core::ComputeSize;

/// A managed repository created by the pipeline, default synth build.
#[must_use]
pub fn managed_config(name: &str) -> PipelineConfig {
    PipelineConfig::new(RepoConfig::managed(name, true))
}

/// An externally hosted repository read with the `github-token` secret.
#[must_use]
pub fn external_config(owner: &str, name: &str) -> PipelineConfig {
    PipelineConfig::new(RepoConfig::external(owner, name, "github-token"))
}

/// [`managed_config`] plus a validation stage notifying `emails`.
#[must_use]
pub fn validated_config(name: &str, emails: &[&str]) -> PipelineConfig {
    managed_config(name).with_validate(ValidateConfig::with_emails(emails.iter().copied()))
}

/// A privileged container build with both script hooks.
#[must_use]
pub fn container_config(name: &str) -> PipelineConfig {
    managed_config(name).with_build(
        BuildConfig::new(BuildVariant::Container)
            .with_compute(ComputeSize::Large)
            .with_prebuild_script("scripts/prebuild.sh")
            .with_postbuild_script("scripts/postbuild.sh")
            .with_env("STAGE", "dev"),
    )
}

/// A mobile package build.
#[must_use]
pub fn mobile_config(name: &str) -> PipelineConfig {
    managed_config(name).with_build(BuildConfig::new(BuildVariant::Mobile))
}

/// A custom build reading `spec_filename` from the source tree.
#[must_use]
pub fn custom_config(name: &str, spec_filename: &str) -> PipelineConfig {
    managed_config(name)
        .with_build(BuildConfig::new(BuildVariant::Custom).with_spec_filename(spec_filename))
}

/// A context document with a validated pipeline and a two-zone network.
#[must_use]
pub fn sample_context_json() -> serde_json::Value {
    serde_json::json!({
        "archi": {
            "id": "svc-pipeline",
            "pipeline": {
                "repo": { "type": "Managed", "name": "svc", "create": true },
                "build": { "compute": "Medium", "runtimes": { "nodejs": 18 } },
                "validate": { "emails": ["ops@example.com"] }
            }
        },
        "dataPipeline": { "network": { "azCount": 2 } }
    })
}

/// Parses [`sample_context_json`].
///
/// # Panics
///
/// Panics if the fixture no longer validates.
#[must_use]
pub fn sample_context() -> ContextDocument {
    match ContextDocument::from_value(sample_context_json()) {
        Ok(document) => document,
        Err(err) => panic!("sample context fixture is invalid: {err}"),
    }
}
