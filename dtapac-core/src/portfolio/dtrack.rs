use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};
use url::Url;

use super::{PageOptions, PortfolioClient};
use crate::decision::base_url_with_trailing_slash;
use crate::error::{AuditError, Result};
use crate::model::{
    FindingAnalysisRequest, FindingRecord, Page, PolicyViolation, Project, ProjectId,
    ViolationAnalysisRequest,
};

const API_KEY_HEADER: &str = "X-Api-Key";
const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// REST client for the Dependency-Track API.
#[derive(Clone)]
pub struct DependencyTrackClient {
    base_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl fmt::Debug for DependencyTrackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyTrackClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl DependencyTrackClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_http_client(base_url, api_key, http)
    }

    pub fn with_http_client(
        base_url: &str,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url_with_trailing_slash(base_url)?,
            api_key: api_key.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<(Url, RequestBuilder)> {
        let url = self.base_url.join(path)?;
        let builder = self
            .http
            .request(method, url.clone())
            .header(API_KEY_HEADER, &self.api_key);
        Ok((url, builder))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        page: PageOptions,
    ) -> Result<Page<T>> {
        let (url, builder) = self.request(Method::GET, path)?;
        let page_number = page.page_number.to_string();
        let page_size = page.page_size.to_string();
        let response = builder
            .query(query)
            .query(&[
                ("pageNumber", page_number.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;
        let response = ensure_success("GET", &url, response).await?;

        let total = total_count(&response)?;
        let items: Vec<T> = response.json().await?;
        let total = total.unwrap_or(items.len());
        debug!(url = %url, page = page.page_number, items = items.len(), total, "fetched page");
        Ok(Page::new(items, total))
    }

    async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let (url, builder) = self.request(Method::PUT, path)?;
        let response = builder.json(body).send().await?;
        ensure_success("PUT", &url, response).await?;
        Ok(())
    }
}

async fn ensure_success(method: &'static str, url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AuditError::Status {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

fn total_count(response: &Response) -> Result<Option<usize>> {
    let Some(value) = response.headers().get(TOTAL_COUNT_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .map(Some)
        .ok_or_else(|| {
            AuditError::InvalidResponse(format!("malformed {TOTAL_COUNT_HEADER} header: {value:?}"))
        })
}

#[async_trait]
impl PortfolioClient for DependencyTrackClient {
    #[instrument(skip(self), level = "debug", err)]
    async fn projects(&self, page: PageOptions) -> Result<Page<Project>> {
        self.get_page("api/v1/project", &[], page).await
    }

    #[instrument(skip(self), level = "debug", fields(project = %project), err)]
    async fn findings(&self, project: ProjectId, page: PageOptions) -> Result<Page<FindingRecord>> {
        let path = format!("api/v1/finding/project/{project}");
        self.get_page(&path, &[("suppressed", "true")], page).await
    }

    #[instrument(skip(self), level = "debug", fields(project = %project), err)]
    async fn violations(
        &self,
        project: ProjectId,
        page: PageOptions,
    ) -> Result<Page<PolicyViolation>> {
        let path = format!("api/v1/violation/project/{project}");
        self.get_page(&path, &[("suppressed", "false")], page).await
    }

    async fn submit_finding_analysis(&self, request: &FindingAnalysisRequest) -> Result<()> {
        self.put("api/v1/analysis", request).await
    }

    async fn submit_violation_analysis(&self, request: &ViolationAnalysisRequest) -> Result<()> {
        self.put("api/v1/violation/analysis", request).await
    }
}
