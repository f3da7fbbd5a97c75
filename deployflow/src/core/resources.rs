//! References to externally provisioned resources.
//!
//! The assembly engine never creates or destroys these. Collaborators hand
//! them out and the engine treats them as capability tokens.

use super::{BuildSpec, ComputeTier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image used by every build project unless a provider overrides it.
pub const DEFAULT_BUILD_IMAGE: &str = "amazonlinux2-x86_64-standard:3.0";

/// An execution identity that permissions can be granted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub String);

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the principal name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A permission a principal can hold on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read objects.
    Read,
    /// Read and write objects.
    ReadWrite,
    /// Delete objects.
    Delete,
    /// Pull and push images.
    PullPush,
    /// Obtain a registry authorization token.
    AuthTokenRead,
    /// Invalidate a distribution's edge cache.
    Invalidate,
}

/// A (principal, permission, resource) triple the caller applies after assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    /// Who receives the permission.
    pub principal: Principal,
    /// What they may do.
    pub permission: Permission,
    /// The resource identifier it applies to.
    pub resource: String,
}

impl Grant {
    /// Creates a grant.
    #[must_use]
    pub fn new(principal: &Principal, permission: Permission, resource: impl Into<String>) -> Self {
        Self {
            principal: principal.clone(),
            permission,
            resource: resource.into(),
        }
    }
}

/// A source repository, either created by the pipeline or referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    /// Logical id.
    pub id: String,
    /// Repository name.
    pub name: String,
    /// Whether the repository is declared by this pipeline.
    pub created: bool,
}

/// A reference to a secret. The value is resolved by the execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Name of the secret holding the credential.
    pub secret_name: String,
}

/// An object store bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRef {
    /// Logical id.
    pub id: String,
    /// Bucket name token.
    pub name: String,
    /// URL of the bucket root, usable in build commands.
    pub url: String,
}

/// The shared cache store. Passed by value into every factory that caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStore {
    bucket: BucketRef,
}

impl CacheStore {
    /// Wraps an externally provisioned bucket.
    #[must_use]
    pub const fn new(bucket: BucketRef) -> Self {
        Self { bucket }
    }

    /// Returns the backing bucket.
    #[must_use]
    pub const fn bucket(&self) -> &BucketRef {
        &self.bucket
    }

    /// Returns a bucket-backed cache keyed by a project identifier.
    #[must_use]
    pub fn cache_for(&self, prefix: impl Into<String>) -> BucketCache {
        BucketCache {
            bucket: self.bucket.name.clone(),
            prefix: prefix.into(),
        }
    }
}

/// A cache location inside the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCache {
    /// Bucket name token.
    pub bucket: String,
    /// Key prefix, normally the owning project's id.
    pub prefix: String,
}

/// A content-delivery distribution in front of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRef {
    /// Logical id.
    pub id: String,
    /// Provider-assigned distribution id token.
    pub distribution_id: String,
    /// Public domain name token.
    pub domain_name: String,
}

/// A static file uploaded alongside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    /// Logical id.
    pub id: String,
    /// URL of the uploaded object.
    pub object_url: String,
}

/// A container image registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRef {
    /// Logical id.
    pub id: String,
    /// Registry URI token.
    pub uri: String,
}

/// What a build project needs from the build-environment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Logical id.
    pub id: String,
    /// Phase definitions.
    pub build_spec: BuildSpec,
    /// Compute tier.
    pub compute: ComputeTier,
    /// Build image.
    pub build_image: String,
    /// Whether the build runs privileged (needed for image builds).
    pub privileged: bool,
    /// Optional bucket-backed cache.
    pub cache: Option<BucketCache>,
}

impl ProjectSpec {
    /// Creates an unprivileged, uncached project spec on the default image.
    #[must_use]
    pub fn new(id: impl Into<String>, build_spec: BuildSpec, compute: ComputeTier) -> Self {
        Self {
            id: id.into(),
            build_spec,
            compute,
            build_image: DEFAULT_BUILD_IMAGE.to_string(),
            privileged: false,
            cache: None,
        }
    }

    /// Marks the project privileged.
    #[must_use]
    pub const fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Attaches a cache.
    #[must_use]
    pub fn with_cache(mut self, cache: BucketCache) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// A provisioned build project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Logical id.
    pub id: String,
    /// The project's execution principal.
    pub principal: Principal,
}

/// An initial policy attached to a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    /// Allowed operations.
    pub actions: Vec<String>,
    /// Resources the operations apply to.
    pub resources: Vec<String>,
}

/// What a short-lived function needs from the function provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Logical id.
    pub id: String,
    /// Path of the function's code directory.
    pub entry: String,
    /// Module file inside the entry, if not the provider default.
    pub index: Option<String>,
    /// Handler name, if not the provider default.
    pub handler: Option<String>,
    /// Invocation timeout.
    pub timeout_secs: u32,
    /// How long invocation logs are kept.
    pub log_retention_days: u32,
    /// Initial policies.
    pub policies: Vec<PolicyStatement>,
}

/// A provisioned function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRef {
    /// Logical id.
    pub id: String,
    /// Function name token.
    pub name: String,
    /// The function's execution principal.
    pub principal: Principal,
}
