use async_trait::async_trait;

use super::{fetch_pipeline, snapshot_tree, source_url, storage, write_json};
use crate::config::Settings;
use crate::core::transform::transform_daily_logs;
use crate::core::{ExpansionRule, UserMapping};
use crate::domain::model::RequestDescriptor;
use crate::domain::ports::Job;
use crate::utils::error::Result;

pub const DAILYLOG_DATA_FILE: &str = "dailylog-data.json";
pub const DAILYLOG_SUMMARY_FILE: &str = "dailylog-summary.json";
pub const DAILYLOG_FORMS_FILE: &str = "dailylog-forms.json";
pub const USER_MAPPING_FILE: &str = "user-mapping.json";

/// 抓日誌、使用者與廠商,展開每筆日誌的細節與人力記錄,
/// join 成目標日報並落檔
pub struct FetchDailyLogsJob {
    settings: Settings,
}

impl FetchDailyLogsJob {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn endpoints(&self) -> Vec<RequestDescriptor> {
        let project = &self.settings.source.project_id;
        vec![
            RequestDescriptor::new(
                "dailyLogs",
                "project",
                source_url(&self.settings, &format!("/projects/{}/daily_logs", project)),
            ),
            RequestDescriptor::new(
                "users",
                "project",
                source_url(&self.settings, &format!("/projects/{}/users", project)),
            ),
            RequestDescriptor::new(
                "vendors",
                "project",
                source_url(&self.settings, &format!("/projects/{}/vendors", project)),
            ),
        ]
    }

    fn expansion_rules(&self) -> Result<Vec<ExpansionRule>> {
        let project = &self.settings.source.project_id;
        Ok(vec![
            ExpansionRule::new(
                "project",
                "dailyLogs",
                "dailyLogDetails",
                "dailyLogs",
                &source_url(&self.settings, &format!("/projects/{}/daily_logs/{{id}}", project)),
            )?,
            ExpansionRule::new(
                "project",
                "dailyLogs",
                "manpowerLogs",
                "manpower",
                &source_url(
                    &self.settings,
                    &format!("/projects/{}/daily_logs/{{id}}/manpower_logs", project),
                ),
            )?,
        ])
    }
}

#[async_trait]
impl Job for FetchDailyLogsJob {
    fn name(&self) -> &str {
        "fetch-daily-logs"
    }

    async fn run(&self) -> Result<String> {
        let storage = storage(&self.settings);
        let mut pipeline = fetch_pipeline(&self.settings);

        let tree = pipeline
            .run(&self.endpoints(), &self.expansion_rules()?)
            .await?;
        snapshot_tree(&storage, &tree, DAILYLOG_DATA_FILE, DAILYLOG_SUMMARY_FILE).await?;

        let source_users = tree.records("project", "users");
        let client = reqwest::Client::new();
        let mapping =
            UserMapping::from_remote(&client, &self.settings.target, &source_users).await;
        write_json(&storage, USER_MAPPING_FILE, &mapping.snapshot()).await?;

        let forms = transform_daily_logs(&tree, &mapping);
        tracing::info!("Transformed {} daily logs", forms.len());
        write_json(&storage, DAILYLOG_FORMS_FILE, &forms).await?;

        Ok(format!("{}/{}", storage.base_path(), DAILYLOG_FORMS_FILE))
    }
}
