use async_trait::async_trait;

use super::forms::results_with_summary;
use super::observations::OBSERVATIONS_FILE;
use super::{read_json, storage, write_json};
use crate::config::Settings;
use crate::core::transform::transform_observation;
use crate::core::{IssueSubmitter, UserMapping};
use crate::domain::model::ResultTree;
use crate::domain::ports::Job;
use crate::utils::error::{MigrateError, Result};

pub const ISSUE_RESULTS_FILE: &str = "issue-results.json";

/// 讀觀察項快照,逐筆轉成議題並提交
pub struct CreateIssuesJob {
    settings: Settings,
}

impl CreateIssuesJob {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Job for CreateIssuesJob {
    fn name(&self) -> &str {
        "create-issues"
    }

    async fn run(&self) -> Result<String> {
        if self.settings.target.issue_type_id.is_none()
            || self.settings.target.issue_subtype_id.is_none()
        {
            return Err(MigrateError::MissingConfig {
                field: "TARGET_ISSUE_TYPE_ID / TARGET_ISSUE_SUBTYPE_ID".to_string(),
            });
        }

        let storage = storage(&self.settings);
        let tree: ResultTree = read_json(&storage, OBSERVATIONS_FILE).await.map_err(|_| {
            MigrateError::processing(format!(
                "Observations snapshot not found ({}). Run fetch-observations first",
                OBSERVATIONS_FILE
            ))
        })?;

        let observations = tree.records("project", "observations");
        if observations.is_empty() {
            tracing::warn!("No observations to migrate");
        }

        let client = reqwest::Client::new();
        let source_users = tree.records("project", "users");
        let mapping =
            UserMapping::from_remote(&client, &self.settings.target, &source_users).await;

        let issues: Vec<_> = observations
            .iter()
            .map(|obs| transform_observation(obs, &mapping, &self.settings.target))
            .collect();

        tracing::info!("Submitting {} issues", issues.len());
        let outcomes = IssueSubmitter::new(self.settings.target.clone())
            .submit_all(&issues)
            .await;
        write_json(&storage, ISSUE_RESULTS_FILE, &results_with_summary(&outcomes)).await?;

        Ok(format!("{}/{}", storage.base_path(), ISSUE_RESULTS_FILE))
    }
}
