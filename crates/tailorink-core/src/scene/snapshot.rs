//! Serialized scene snapshots.

use super::{SceneError, SceneObject};
use serde::{Deserialize, Serialize};

/// Snapshot format written by this crate.
pub const SNAPSHOT_VERSION: &str = "tailorink/1";

fn default_version() -> String {
    SNAPSHOT_VERSION.to_string()
}

/// Every object on the surface at one point in time, enough to rebuild the
/// editable scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// A snapshot with no objects.
    pub fn empty() -> Self {
        Self {
            version: default_version(),
            objects: Vec::new(),
            background: None,
        }
    }

    /// Parse a snapshot. A blank string is an empty scene.
    pub fn parse(json: &str) -> Result<Self, SceneError> {
        if json.trim().is_empty() {
            return Ok(Self::empty());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to compact JSON. Output is deterministic for equal snapshots.
    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
