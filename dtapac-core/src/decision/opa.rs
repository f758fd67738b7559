use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::DecisionClient;
use crate::error::{AuditError, Result};

/// Client for the Open Policy Agent data API.
#[derive(Clone)]
pub struct OpaClient {
    base_url: Url,
    http: reqwest::Client,
}

impl fmt::Debug for OpaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct DecisionRequest {
    input: serde_json::Value,
}

#[derive(Deserialize)]
struct DecisionResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
}

impl OpaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_http_client(base_url, http)
    }

    pub fn with_http_client(base_url: &str, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            base_url: base_url_with_trailing_slash(base_url)?,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn decision_url(&self, policy_path: &str) -> Result<Url> {
        let path = policy_path.trim_matches('/');
        if path.is_empty() {
            return Err(AuditError::Configuration(
                "policy path must not be empty".into(),
            ));
        }
        Ok(self.base_url.join(&format!("v1/data/{path}"))?)
    }
}

#[async_trait]
impl DecisionClient for OpaClient {
    #[instrument(skip(self, input), level = "debug", err)]
    async fn decide(
        &self,
        policy_path: &str,
        input: serde_json::Value,
    ) -> Result<Option<serde_json::Value>> {
        let url = self.decision_url(policy_path)?;
        let response = self
            .http
            .post(url.clone())
            .json(&DecisionRequest { input })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::Status {
                method: "POST",
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let decision: DecisionResponse = response.json().await?;
        let result = decision.result.filter(|value| !value.is_null());
        if result.is_none() {
            debug!(policy_path, "policy produced no result");
        }
        Ok(result)
    }
}

pub(crate) fn base_url_with_trailing_slash(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
