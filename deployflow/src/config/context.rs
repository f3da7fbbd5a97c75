//! Context documents: a pipeline plus the settings its deploy stage reads.

use super::raw::RawPipelineConfig;
use super::types::PipelineConfig;
use crate::errors::{ConfigError, DeployflowError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Network settings for the deployed architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Availability zones to spread across; provider default when absent.
    #[serde(default)]
    pub az_count: Option<u8>,
}

/// Settings of the deployed data pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataPipelineConfig {
    /// Network settings.
    #[serde(default)]
    pub network: NetworkConfig,
}

/// A named pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiConfig {
    /// Pipeline identifier; becomes the pipeline definition's name.
    pub id: String,
    /// The pipeline configuration.
    pub pipeline: PipelineConfig,
}

/// A full context document.
///
/// ```json
/// {
///   "archi": { "id": "svc-pipeline", "pipeline": { "repo": { "type": "Managed", "name": "svc" } } },
///   "dataPipeline": { "network": { "azCount": 2 } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    /// The pipeline to assemble.
    pub archi: ArchiConfig,
    /// Settings for the deploy stage.
    pub data_pipeline: DataPipelineConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContext {
    archi: Option<RawArchi>,
    #[serde(default)]
    data_pipeline: DataPipelineConfig,
}

#[derive(Debug, Deserialize)]
struct RawArchi {
    id: Option<String>,
    pipeline: Option<RawPipelineConfig>,
}

impl ContextDocument {
    /// Parses and validates a context tree.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first failing branch.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawContext = serde_json::from_value(value)?;
        let archi = raw.archi.ok_or_else(|| ConfigError::missing("archi"))?;
        let id = match archi.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(ConfigError::missing("archi.id")),
        };
        let pipeline = archi
            .pipeline
            .ok_or_else(|| ConfigError::missing("archi.pipeline"))?
            .into_config("archi.pipeline")?;
        pipeline.validate_at("archi.pipeline")?;

        if raw.data_pipeline.network.az_count == Some(0) {
            return Err(ConfigError::invalid(
                "dataPipeline.network.azCount",
                "must be at least 1",
            ));
        }

        Ok(Self {
            archi: ArchiConfig { id, pipeline },
            data_pipeline: raw.data_pipeline,
        })
    }

    /// Parses and validates a JSON context document.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first failing branch.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }
}

/// Loads a context document from a JSON file.
///
/// # Errors
///
/// Returns an IO error if the file cannot be read, or a configuration error.
pub fn load_context(path: impl AsRef<Path>) -> Result<ContextDocument, DeployflowError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "Loading context document");
    let contents = std::fs::read_to_string(path)?;
    Ok(ContextDocument::from_json_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepoConfig;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_context_document() {
        let doc = ContextDocument::from_value(json!({
            "archi": {
                "id": "svc-pipeline",
                "pipeline": {"repo": {"type": "Managed", "name": "svc", "create": true}}
            },
            "dataPipeline": {"network": {"azCount": 2}}
        }))
        .unwrap();

        assert_eq!(doc.archi.id, "svc-pipeline");
        assert_eq!(doc.archi.pipeline.repo, RepoConfig::managed("svc", true));
        assert_eq!(doc.data_pipeline.network.az_count, Some(2));
    }

    #[test]
    fn test_data_pipeline_is_optional() {
        let doc = ContextDocument::from_value(json!({
            "archi": {"id": "p", "pipeline": {"repo": {"type": "Managed", "name": "svc"}}}
        }))
        .unwrap();
        assert_eq!(doc.data_pipeline, DataPipelineConfig::default());
    }

    #[test]
    fn test_errors_are_located_in_the_document() {
        let err = ContextDocument::from_value(json!({
            "archi": {"id": "p", "pipeline": {"repo": {"type": "External", "name": "svc"}}}
        }))
        .unwrap_err();
        assert_eq!(err, ConfigError::missing("archi.pipeline.repo.owner"));

        let err = ContextDocument::from_value(json!({"archi": {"pipeline": {}}})).unwrap_err();
        assert_eq!(err, ConfigError::missing("archi.id"));
    }

    #[test]
    fn test_zero_availability_zones() {
        let err = ContextDocument::from_value(json!({
            "archi": {"id": "p", "pipeline": {"repo": {"type": "Managed", "name": "svc"}}},
            "dataPipeline": {"network": {"azCount": 0}}
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("dataPipeline.network.azCount"));
    }

    #[test]
    fn test_load_context_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"archi": {{"id": "p", "pipeline": {{"repo": {{"type": "Managed", "name": "svc"}}}}}}}}"#
        )
        .unwrap();

        let doc = load_context(file.path()).unwrap();
        assert_eq!(doc.archi.id, "p");
    }

    #[test]
    fn test_load_context_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_context(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, DeployflowError::Io(_)));
    }
}
