// Cleanup service - Bulk deletion of charts and datasets
use crate::application::superset_api::{ListQuery, SupersetApi};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CleanupReport {
    pub deleted: Vec<i64>,
    pub failed: Vec<i64>,
}

const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Chart,
    Dataset,
}

impl Target {
    fn name(self) -> &'static str {
        match self {
            Target::Chart => "chart",
            Target::Dataset => "dataset",
        }
    }
}

#[derive(Clone)]
pub struct CleanupService {
    api: Arc<dyn SupersetApi>,
    pacing: Duration,
    page_size: u32,
}

impl CleanupService {
    pub fn new(api: Arc<dyn SupersetApi>, pacing: Duration) -> Self {
        Self {
            api,
            pacing,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub async fn delete_all_charts(&self) -> anyhow::Result<CleanupReport> {
        self.delete_all(Target::Chart).await
    }

    pub async fn delete_all_datasets(&self) -> anyhow::Result<CleanupReport> {
        self.delete_all(Target::Dataset).await
    }

    /// Deletes each chart in turn; a failure is recorded and the loop moves on.
    pub async fn delete_charts(&self, ids: &[i64]) -> CleanupReport {
        let mut report = CleanupReport::default();
        for &id in ids {
            self.delete_one(Target::Chart, id, &mut report).await;
        }
        report
    }

    /// Lists newest first and deletes until a listing has nothing left to
    /// try. Deleted items fall off the listing, so the same page is read
    /// again; the page index only advances past items already attempted.
    async fn delete_all(&self, target: Target) -> anyhow::Result<CleanupReport> {
        let mut report = CleanupReport::default();
        let mut page = 0;
        loop {
            let listed = self.list_ids(target, page).await?;
            if listed.is_empty() {
                break;
            }
            let fresh: Vec<i64> = listed
                .into_iter()
                .filter(|id| !report.deleted.contains(id) && !report.failed.contains(id))
                .collect();
            if fresh.is_empty() {
                page += 1;
                continue;
            }
            tracing::info!("Found {} {}s to delete on page {}", fresh.len(), target.name(), page);
            for id in fresh {
                self.delete_one(target, id, &mut report).await;
            }
        }
        Ok(report)
    }

    async fn list_ids(&self, target: Target, page: u32) -> anyhow::Result<Vec<i64>> {
        let query = ListQuery::newest_first(self.page_size).page(page);
        Ok(match target {
            Target::Chart => self.api.list_charts(&query).await?.iter().map(|c| c.id).collect(),
            Target::Dataset => self.api.list_datasets(&query).await?.iter().map(|d| d.id).collect(),
        })
    }

    async fn delete_one(&self, target: Target, id: i64, report: &mut CleanupReport) {
        let result = match target {
            Target::Chart => self.api.delete_chart(id).await,
            Target::Dataset => self.api.delete_dataset(id).await,
        };
        match result {
            Ok(()) => {
                tracing::info!("Deleted {} {}", target.name(), id);
                report.deleted.push(id);
            }
            Err(e) => {
                tracing::warn!("Failed to delete {} {}: {:#}", target.name(), id, e);
                report.failed.push(id);
            }
        }
        self.pause().await;
    }

    async fn pause(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }
}
