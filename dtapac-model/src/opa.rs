//! Status reports pushed by the policy engine's status plugin.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleStatus {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_successful_activation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpaStatus {
    pub labels: HashMap<String, String>,
    pub bundles: HashMap<String, BundleStatus>,
}

impl OpaStatus {
    /// Active revision of the named bundle, if the report mentions it.
    pub fn bundle_revision(&self, bundle: &str) -> Option<&str> {
        self.bundles
            .get(bundle)
            .and_then(|status| status.active_revision.as_deref())
            .filter(|revision| !revision.is_empty())
    }
}
