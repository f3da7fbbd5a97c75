//! The validation stage.
//!
//! Renders the synthesized templates as diagrams, publishes them behind a
//! distribution, waits for a human to approve them, then empties the
//! publish target again. Each step gets a fresh run-order, so the approval
//! is never offered before rendering succeeds and cleanup never runs
//! before the approval is decided.

use super::invoke::InvokeActionBuilder;
use super::sequencer::RunOrderSequencer;
use crate::config::ValidateConfig;
use crate::core::{
    map_compute, Action, ActionProvider, Artifact, AssetRef, BucketRef, BuildActionType,
    BuildSpec, BuildSpecDocument, CacheStore, DistributionRef, Grant, Permission, ProjectSpec,
    Stage,
};
use crate::errors::DeployflowError;
use crate::providers::{BuildEnvironmentProvider, FunctionProvider, PublishTargetProvider};

/// Name of the validation stage.
pub const VALIDATE_STAGE: &str = "Validate";

/// Name of the approval action.
pub const APPROVAL_ACTION: &str = "Approval";

/// Local path of the index page published next to the diagrams.
pub const DIAGRAMS_INDEX_PATH: &str = "cloud-diagrams/index.html";

/// Entry of the function that empties the publish target.
pub const CLEANUP_ENTRY: &str = "cdn-empty-handler";

const RENDER_LOOP: &str = r#"for f in *.template.json ; do
  cfn-dia h -c -t "${f}" -o "../out/${f%.template.json}" ;
  echo $( jq ". + [\"${f%.template.json}\"]" ../out/templates.json ) > ../out/templates.json ;
done"#;

/// Where rendered diagrams are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    /// Bucket holding the rendered site.
    pub source: BucketRef,
    /// Distribution serving the bucket.
    pub distribution: DistributionRef,
    /// Index page uploaded next to the diagrams.
    pub index: AssetRef,
}

impl PublishTarget {
    /// Returns the link reviewers open from the approval gate.
    #[must_use]
    pub fn link(&self) -> String {
        format!("https://{}", self.distribution.domain_name)
    }
}

/// The assembled validation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOutcome {
    /// The stage: render, approve, clean up.
    pub stage: Stage,
    /// The publish target the stage renders to.
    pub publish: PublishTarget,
    /// Grants for the render project and the cleanup function.
    pub grants: Vec<Grant>,
}

/// Builds the validation stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateStageAssembler;

impl ValidateStageAssembler {
    /// Assembles the stage consuming `input`, the synthesized description.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures and stage invariant violations.
    pub fn assemble<P>(
        provider: &mut P,
        sequencer: &mut RunOrderSequencer,
        config: &ValidateConfig,
        input: &Artifact,
        cache: &CacheStore,
        prefix: &str,
    ) -> Result<ValidateOutcome, DeployflowError>
    where
        P: BuildEnvironmentProvider + PublishTargetProvider + FunctionProvider + ?Sized,
    {
        let publish = Self::publish_target(provider)?;
        let mut grants = Vec::new();

        let render = Self::render_action(
            provider,
            &publish,
            config,
            input,
            cache,
            prefix,
            sequencer.next(VALIDATE_STAGE),
            &mut grants,
        )?;

        let approval = Action::new(
            APPROVAL_ACTION,
            ActionProvider::ManualApproval {
                external_link: Some(publish.link()),
                notify_emails: config.emails.clone(),
            },
        )
        .with_run_order(sequencer.next(VALIDATE_STAGE));

        let cleanup = InvokeActionBuilder::new(format!("{prefix}Cleanup"), CLEANUP_ENTRY)
            .with_parameter("sourceName", publish.source.name.clone())
            .with_parameter("distributionId", publish.distribution.distribution_id.clone())
            .with_run_order(sequencer.next(VALIDATE_STAGE))
            .build(provider)?;
        let principal = &cleanup.function.principal;
        grants.extend([
            Grant::new(principal, Permission::Read, &publish.source.id),
            Grant::new(principal, Permission::Delete, &publish.source.id),
            Grant::new(principal, Permission::Invalidate, &publish.distribution.id),
        ]);

        let stage = Stage::with_actions(VALIDATE_STAGE, [render, approval, cleanup.action])?;
        tracing::info!(
            stage = VALIDATE_STAGE,
            recipients = config.emails.len(),
            link = %publish.link(),
            "Validation stage assembled"
        );
        Ok(ValidateOutcome {
            stage,
            publish,
            grants,
        })
    }

    fn publish_target<P>(provider: &mut P) -> Result<PublishTarget, DeployflowError>
    where
        P: PublishTargetProvider + ?Sized,
    {
        let source = provider.provision_bucket("DiagramsSiteSource")?;
        let distribution =
            provider.provision_distribution("DiagramsSiteDistribution", &source, "index.html")?;
        let index = provider.provision_asset("DiagramsIndex", DIAGRAMS_INDEX_PATH)?;
        Ok(PublishTarget {
            source,
            distribution,
            index,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn render_action<P>(
        provider: &mut P,
        publish: &PublishTarget,
        config: &ValidateConfig,
        input: &Artifact,
        cache: &CacheStore,
        prefix: &str,
        run_order: u32,
        grants: &mut Vec<Grant>,
    ) -> Result<Action, DeployflowError>
    where
        P: BuildEnvironmentProvider + ?Sized,
    {
        let document = BuildSpecDocument::new()
            .with_env("SITE_SOURCE", publish.source.url.clone())
            .with_env("SITE_DISTRIBUTION", publish.distribution.distribution_id.clone())
            .with_env("INDEX_ASSET", publish.index.object_url.clone())
            .with_runtimes([("nodejs".to_string(), "12".to_string())])
            .with_install(vec!["yarn global add @mhlabs/cfn-diagram".to_string()])
            .with_pre_build(vec![
                "mkdir out".to_string(),
                r#"jq -n "[]" > ./out/templates.json"#.to_string(),
                "cd assembly-*".to_string(),
            ])
            .with_build(vec![RENDER_LOOP.to_string()])
            .with_post_build(vec![
                "aws s3 sync ../out/ ${SITE_SOURCE}".to_string(),
                "aws s3 cp ${INDEX_ASSET} ${SITE_SOURCE}/index.html --content-type text/html \
                 --metadata-directive REPLACE"
                    .to_string(),
                r#"aws cloudfront create-invalidation --distribution-id ${SITE_DISTRIBUTION} --paths "/*""#
                    .to_string(),
            ])
            .with_cache_paths(vec![
                "/usr/local/share/.config/yarn/global/**/*".to_string(),
                "${HOME}/.config/yarn/global/**/*".to_string(),
            ]);

        let project_id = format!("{prefix}DiagramProject");
        let spec = ProjectSpec::new(
            project_id.clone(),
            BuildSpec::Inline(document),
            map_compute(config.compute),
        )
        .with_cache(cache.cache_for(project_id));
        let project = provider.provision_project(&spec)?;

        grants.extend([
            Grant::new(&project.principal, Permission::ReadWrite, &publish.source.id),
            Grant::new(&project.principal, Permission::Read, &publish.index.id),
            Grant::new(&project.principal, Permission::Invalidate, &publish.distribution.id),
        ]);

        Ok(Action::new(
            format!("{prefix}Diagram"),
            ActionProvider::Build {
                project,
                action_type: BuildActionType::Build,
            },
        )
        .with_input(input.clone())
        .with_run_order(run_order))
    }
}
