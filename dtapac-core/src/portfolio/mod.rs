//! Portfolio access.
//!
//! [`PortfolioClient`] is the seam to the system of record. Reads are paged;
//! [`fetch_all`] drives any paged read to completion.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    FindingAnalysisRequest, FindingRecord, Page, PolicyViolation, Project, ProjectId,
    ViolationAnalysisRequest,
};

mod dtrack;
mod paging;

pub use dtrack::DependencyTrackClient;
pub use paging::{
    DEFAULT_PAGE_SIZE, PageOptions, fetch_all, fetch_all_findings, fetch_all_projects,
    fetch_all_violations,
};

#[async_trait]
pub trait PortfolioClient: Send + Sync {
    async fn projects(&self, page: PageOptions) -> Result<Page<Project>>;

    /// Findings of one project, including suppressed ones.
    async fn findings(&self, project: ProjectId, page: PageOptions) -> Result<Page<FindingRecord>>;

    /// Unsuppressed policy violations of one project.
    async fn violations(
        &self,
        project: ProjectId,
        page: PageOptions,
    ) -> Result<Page<PolicyViolation>>;

    async fn submit_finding_analysis(&self, request: &FindingAnalysisRequest) -> Result<()>;

    async fn submit_violation_analysis(&self, request: &ViolationAnalysisRequest) -> Result<()>;
}
