use std::future::Future;

use crate::error::Result;
use crate::model::{FindingRecord, Page, PolicyViolation, Project, ProjectId};

use super::PortfolioClient;

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// One-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub page_number: usize,
    pub page_size: usize,
}

impl PageOptions {
    pub fn first(page_size: usize) -> Self {
        Self {
            page_number: 1,
            page_size,
        }
    }

    pub fn next(self) -> Self {
        Self {
            page_number: self.page_number + 1,
            ..self
        }
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// Drive a paged read to completion.
///
/// Stops once the collected item count reaches the reported total or a page
/// comes back empty. The first error aborts the whole fetch.
pub async fn fetch_all<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(PageOptions) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page = PageOptions::default();

    loop {
        let Page {
            items: batch,
            total,
        } = fetch_page(page).await?;
        if batch.is_empty() {
            break;
        }
        items.extend(batch);
        if items.len() >= total {
            break;
        }
        page = page.next();
    }

    Ok(items)
}

pub async fn fetch_all_projects(client: &dyn PortfolioClient) -> Result<Vec<Project>> {
    fetch_all(|page| client.projects(page)).await
}

pub async fn fetch_all_findings(
    client: &dyn PortfolioClient,
    project: ProjectId,
) -> Result<Vec<FindingRecord>> {
    fetch_all(|page| client.findings(project, page)).await
}

pub async fn fetch_all_violations(
    client: &dyn PortfolioClient,
    project: ProjectId,
) -> Result<Vec<PolicyViolation>> {
    fetch_all(|page| client.violations(project, page)).await
}
