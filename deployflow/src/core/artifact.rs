//! Named artifact handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque named handle for a unit of build output flowing between actions.
///
/// An artifact carries no data at assembly time. It only names the output an
/// action promises to produce so later actions can declare it as an input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact {
    name: String,
}

impl Artifact {
    /// Creates a new artifact handle.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the artifact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_serializes_as_its_name() {
        let artifact = Artifact::new("SourceCode");
        assert_eq!(artifact.name(), "SourceCode");
        assert_eq!(serde_json::to_value(&artifact).unwrap(), serde_json::json!("SourceCode"));
        assert_eq!(artifact.to_string(), "SourceCode");
    }
}
