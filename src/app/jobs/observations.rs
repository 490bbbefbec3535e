use async_trait::async_trait;

use super::{fetch_pipeline, snapshot_tree, source_url, storage};
use crate::config::Settings;
use crate::domain::model::RequestDescriptor;
use crate::domain::ports::Job;
use crate::utils::error::Result;

pub const OBSERVATIONS_FILE: &str = "observations.json";
pub const OBSERVATIONS_SUMMARY_FILE: &str = "observations-summary.json";

/// 抓觀察項與專案使用者並落檔;轉換留給 create-issues 做
pub struct FetchObservationsJob {
    settings: Settings,
}

impl FetchObservationsJob {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn endpoints(&self) -> Vec<RequestDescriptor> {
        let project = &self.settings.source.project_id;
        vec![
            RequestDescriptor::new(
                "observations",
                "project",
                source_url(
                    &self.settings,
                    &format!("/observations/items?project_id={}", project),
                ),
            ),
            RequestDescriptor::new(
                "users",
                "project",
                source_url(&self.settings, &format!("/projects/{}/users", project)),
            ),
        ]
    }
}

#[async_trait]
impl Job for FetchObservationsJob {
    fn name(&self) -> &str {
        "fetch-observations"
    }

    async fn run(&self) -> Result<String> {
        let storage = storage(&self.settings);
        let mut pipeline = fetch_pipeline(&self.settings);

        let tree = pipeline.run(&self.endpoints(), &[]).await?;
        snapshot_tree(&storage, &tree, OBSERVATIONS_FILE, OBSERVATIONS_SUMMARY_FILE).await?;

        Ok(format!("{}/{}", storage.base_path(), OBSERVATIONS_FILE))
    }
}
