//! Build-action resolvers.
//!
//! Each build variant has a resolver that turns the build section and the
//! source artifact into a build project, a build action, its outputs and
//! the permissions the project needs. Permissions are returned as
//! [`Grant`] triples instead of being applied, so the caller decides where
//! they go.

use crate::config::{BuildConfig, BuildVariant};
use crate::core::{
    map_compute, Action, ActionProvider, Artifact, BuildActionType, BuildSpec,
    BuildSpecDocument, CacheStore, Grant, Permission, Principal, ProjectRef, ProjectSpec,
};
use crate::errors::ProvisionError;
use crate::providers::BuildEnvironmentProvider;

/// Name of the synth build's output artifact.
pub const CLOUD_ASSEMBLY: &str = "CloudAssembly";

/// Resource granted when a project may read registry auth tokens.
pub const REGISTRY_AUTH_RESOURCE: &str = "*";

/// Everything a resolver needs to declare one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// The build section.
    pub config: &'a BuildConfig,
    /// The artifact the build consumes.
    pub input: &'a Artifact,
    /// Shared cache store for variants that cache.
    pub cache: &'a CacheStore,
    /// Prefix applied to every generated name.
    pub prefix: &'a str,
    /// Run-order of the build action.
    pub run_order: Option<u32>,
}

/// A declared build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// The build action.
    pub action: Action,
    /// Artifacts the action produces. Empty for side-effect-only builds.
    pub outputs: Vec<Artifact>,
    /// The project the action runs in.
    pub project: ProjectRef,
    /// Grants the project needs.
    pub grants: Vec<Grant>,
}

impl BuildOutcome {
    /// Returns the principal the build runs as.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.project.principal
    }

    /// Returns the first output artifact, if any.
    #[must_use]
    pub fn primary_output(&self) -> Option<&Artifact> {
        self.outputs.first()
    }
}

/// Declares one build variant.
pub trait BuildResolver {
    /// The variant this resolver handles.
    fn variant(&self) -> BuildVariant;

    /// Declares the build project and returns the action wired to it.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures.
    fn resolve(
        &self,
        provider: &mut dyn BuildEnvironmentProvider,
        request: &BuildRequest<'_>,
    ) -> Result<BuildOutcome, ProvisionError>;
}

/// Selects and runs the resolver for a build section.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildActionFactory;

impl BuildActionFactory {
    /// Returns the resolver for a variant.
    #[must_use]
    pub fn resolver(variant: BuildVariant) -> &'static dyn BuildResolver {
        match variant {
            BuildVariant::Synth => &SynthBuild,
            BuildVariant::Container => &ContainerBuild,
            BuildVariant::Mobile => &MobileBuild,
            BuildVariant::Custom => &CustomBuild,
        }
    }

    /// Resolves the build selected by `request.config.variant`.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures.
    pub fn resolve(
        provider: &mut dyn BuildEnvironmentProvider,
        request: &BuildRequest<'_>,
    ) -> Result<BuildOutcome, ProvisionError> {
        let resolver = Self::resolver(request.config.variant);
        let outcome = resolver.resolve(provider, request)?;
        tracing::debug!(
            variant = %resolver.variant(),
            action = %outcome.action.name(),
            project = %outcome.project.id,
            outputs = outcome.outputs.len(),
            "Build resolved"
        );
        Ok(outcome)
    }
}

/// Sources a script when it exists in the source tree and succeeds otherwise.
fn script_hook(var: &str) -> String {
    format!(r#"[ -f "${{{var}}}" ] && . ./${{{var}}} || [ ! -f "${{{var}}}" ]"#)
}

fn script_env(config: &BuildConfig) -> Vec<(String, String)> {
    let mut env = Vec::new();
    if let Some(ref script) = config.prebuild_script {
        env.push(("PREBUILD_SCRIPT".to_string(), script.clone()));
    }
    if let Some(ref script) = config.postbuild_script {
        env.push(("POSTBUILD_SCRIPT".to_string(), script.clone()));
    }
    env
}

fn pinned(runtimes: &[(&str, &str)]) -> Vec<(String, String)> {
    runtimes
        .iter()
        .map(|(name, version)| ((*name).to_string(), (*version).to_string()))
        .collect()
}

fn commands(commands: &[&str]) -> Vec<String> {
    commands.iter().map(ToString::to_string).collect()
}

fn build_action(
    name: String,
    project: &ProjectRef,
    action_type: BuildActionType,
    request: &BuildRequest<'_>,
    outputs: &[Artifact],
) -> Action {
    outputs.iter().fold(
        Action::new(
            name,
            ActionProvider::Build {
                project: project.clone(),
                action_type,
            },
        )
        .with_input(request.input.clone())
        .with_optional_run_order(request.run_order),
        |action, output| action.with_output(output.clone()),
    )
}

/// Synthesizes the deployable description of the pipeline's own stacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthBuild;

impl BuildResolver for SynthBuild {
    fn variant(&self) -> BuildVariant {
        BuildVariant::Synth
    }

    fn resolve(
        &self,
        provider: &mut dyn BuildEnvironmentProvider,
        request: &BuildRequest<'_>,
    ) -> Result<BuildOutcome, ProvisionError> {
        let config = request.config;
        let output = Artifact::new(CLOUD_ASSEMBLY);

        let mut pre_build = config.prebuild_commands.clone();
        pre_build.push("npx yaml2json cdk.context.yaml > cdk.context.json".to_string());

        let document = BuildSpecDocument::new()
            .with_envs(config.env.clone())
            .with_runtimes(config.runtimes.clone())
            .with_install(commands(&["yarn install --frozen-lockfile"]))
            .with_pre_build(pre_build)
            .with_build(commands(&["npx cdk synth"]))
            .with_post_build(config.postbuild_commands.clone())
            .with_artifact_files(commands(&["cdk.out/**/*"]), false);

        let spec = ProjectSpec::new(
            format!("{}SynthProject", request.prefix),
            BuildSpec::Inline(document),
            map_compute(config.compute),
        );
        let project = provider.provision_project(&spec)?;

        let outputs = vec![output];
        let action = build_action(
            format!("{}Synth", request.prefix),
            &project,
            BuildActionType::Build,
            request,
            &outputs,
        );
        Ok(BuildOutcome {
            action,
            outputs,
            project,
            grants: Vec::new(),
        })
    }
}

/// Builds a container image and pushes it to a registry.
///
/// The pushed image is the only result, so the action declares no output
/// artifact.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerBuild;

impl BuildResolver for ContainerBuild {
    fn variant(&self) -> BuildVariant {
        BuildVariant::Container
    }

    fn resolve(
        &self,
        provider: &mut dyn BuildEnvironmentProvider,
        request: &BuildRequest<'_>,
    ) -> Result<BuildOutcome, ProvisionError> {
        let config = request.config;
        let registry = provider.provision_registry(&format!("{}ContRepo", request.prefix))?;

        let mut pre_build = config.prebuild_commands.clone();
        pre_build.extend([
            script_hook("PREBUILD_SCRIPT"),
            "aws ecr get-login-password | docker login --username AWS --password-stdin ${REPO_URI}"
                .to_string(),
            "docker pull ${REPO_URI}:latest || true".to_string(),
        ]);
        let mut post_build = vec![
            "docker push ${REPO_URI}".to_string(),
            script_hook("POSTBUILD_SCRIPT"),
        ];
        post_build.extend(config.postbuild_commands.iter().cloned());

        let document = BuildSpecDocument::new()
            .with_envs(config.env.clone())
            .with_envs(script_env(config))
            .with_env("REPO_URI", registry.uri.clone())
            .with_runtimes(config.runtimes.clone())
            .with_runtimes(pinned(&[("docker", "20.10")]))
            .with_pre_build(pre_build)
            .with_build(commands(&[
                "DOCKER_BUILDKIT=1 docker build --build-arg BUILDKIT_INLINE_CACHE=1 \
                 --cache-from ${REPO_URI}:latest -t ${REPO_URI}:latest .",
            ]))
            .with_post_build(post_build);

        let spec = ProjectSpec::new(
            format!("{}ContProject", request.prefix),
            BuildSpec::Inline(document),
            map_compute(config.compute),
        )
        .privileged();
        let project = provider.provision_project(&spec)?;

        let grants = vec![
            Grant::new(
                &project.principal,
                Permission::AuthTokenRead,
                REGISTRY_AUTH_RESOURCE,
            ),
            Grant::new(&project.principal, Permission::PullPush, &registry.id),
        ];
        let action = build_action(
            format!("{}ContBuild", request.prefix),
            &project,
            BuildActionType::Build,
            request,
            &[],
        );
        Ok(BuildOutcome {
            action,
            outputs: Vec::new(),
            project,
            grants,
        })
    }
}

/// Assembles mobile packages with a bucket-backed gradle cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct MobileBuild;

impl BuildResolver for MobileBuild {
    fn variant(&self) -> BuildVariant {
        BuildVariant::Mobile
    }

    fn resolve(
        &self,
        provider: &mut dyn BuildEnvironmentProvider,
        request: &BuildRequest<'_>,
    ) -> Result<BuildOutcome, ProvisionError> {
        let config = request.config;
        let output = Artifact::new(format!("{}ApkFiles", request.prefix));
        let project_id = format!("{}DroidProject", request.prefix);

        let mut pre_build = config.prebuild_commands.clone();
        pre_build.push(script_hook("PREBUILD_SCRIPT"));
        let mut post_build = vec![script_hook("POSTBUILD_SCRIPT")];
        post_build.extend(config.postbuild_commands.iter().cloned());

        let document = BuildSpecDocument::new()
            .with_envs(config.env.clone())
            .with_envs(script_env(config))
            .with_runtimes(config.runtimes.clone())
            .with_runtimes(pinned(&[("android", "29"), ("java", "corretto8")]))
            .with_pre_build(pre_build)
            .with_build(commands(&["./gradlew assembleDebug"]))
            .with_post_build(post_build)
            .with_artifact_files(commands(&["./app/build/outputs/**/*.apk"]), true)
            .with_cache_paths(commands(&[
                "${HOME}/.gradle/caches/**/*",
                "${HOME}/.gradle/jdks/**/*",
                "${HOME}/.gradle/wrapper/dists/**/*",
                "./build-cache/**/*",
            ]));

        let spec = ProjectSpec::new(
            project_id.clone(),
            BuildSpec::Inline(document),
            map_compute(config.compute),
        )
        .with_cache(request.cache.cache_for(project_id));
        let project = provider.provision_project(&spec)?;

        let outputs = vec![output];
        let action = build_action(
            format!("{}DroidBuild", request.prefix),
            &project,
            BuildActionType::Build,
            request,
            &outputs,
        );
        Ok(BuildOutcome {
            action,
            outputs,
            project,
            grants: Vec::new(),
        })
    }
}

/// Runs a caller-provided build specification.
///
/// Without a spec filename the project is declared with
/// [`BuildSpec::ProviderDefault`] and the provider's own default applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomBuild;

impl BuildResolver for CustomBuild {
    fn variant(&self) -> BuildVariant {
        BuildVariant::Custom
    }

    fn resolve(
        &self,
        provider: &mut dyn BuildEnvironmentProvider,
        request: &BuildRequest<'_>,
    ) -> Result<BuildOutcome, ProvisionError> {
        let config = request.config;
        let output = Artifact::new(format!("{}Artifact", request.prefix));
        let project_id = format!("{}Project", request.prefix);

        let build_spec = match config.spec_filename {
            Some(ref filename) => BuildSpec::FromSourceFile(filename.clone()),
            None => {
                tracing::warn!(
                    project = %project_id,
                    "Custom build has no spec filename, delegating to the provider default"
                );
                BuildSpec::ProviderDefault
            }
        };

        let spec = ProjectSpec::new(project_id.clone(), build_spec, map_compute(config.compute))
            .with_cache(request.cache.cache_for(project_id));
        let spec = if config.privileged { spec.privileged() } else { spec };
        let project = provider.provision_project(&spec)?;

        let outputs = vec![output];
        let action = build_action(
            format!("{}Action", request.prefix),
            &project,
            config.action_type,
            request,
            &outputs,
        );
        Ok(BuildOutcome {
            action,
            outputs,
            project,
            grants: Vec::new(),
        })
    }
}
