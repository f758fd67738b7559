//! Policy decisions.
//!
//! [`DecisionClient`] is the seam to the policy engine; [`PolicyAuditor`]
//! binds a client to a policy path and converts typed subjects into typed
//! analyses.

use async_trait::async_trait;

use crate::error::Result;

mod auditor;
mod opa;

pub use auditor::{Auditors, FindingAuditor, PolicyAuditor, ViolationAuditor, analysis_path};
pub use opa::OpaClient;
pub(crate) use opa::base_url_with_trailing_slash;

/// Request/response access to a policy engine.
///
/// Implementations must be safe for concurrent use: the live receiver and the
/// portfolio scanner query the same client at the same time.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    /// Evaluate the policy at `policy_path` for `input`.
    ///
    /// Returns `Ok(None)` when the policy produced no result for the input.
    async fn decide(
        &self,
        policy_path: &str,
        input: serde_json::Value,
    ) -> Result<Option<serde_json::Value>>;
}
