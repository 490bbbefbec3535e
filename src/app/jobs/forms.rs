use async_trait::async_trait;

use super::{read_optional_json, storage, write_json};
use super::checklists::FORM_DATA_FILE;
use super::daily_logs::DAILYLOG_FORMS_FILE;
use crate::config::Settings;
use crate::core::FormSubmitter;
use crate::domain::model::{DailyLogForm, RunSummary, SubmissionOutcome, TransformedForm};
use crate::domain::ports::Job;
use crate::utils::error::{MigrateError, Result};

pub const FORM_RESULTS_FILE: &str = "form-results.json";
pub const DAILYLOG_RESULTS_FILE: &str = "dailylog-forms-results.json";

/// 讀取轉換後的表單快照並提交到目標平台。檢查表表單與日報
/// 各走各的模板,哪個快照存在就提交哪個
pub struct CreateFormsJob {
    settings: Settings,
}

impl CreateFormsJob {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Job for CreateFormsJob {
    fn name(&self) -> &str {
        "create-forms"
    }

    async fn run(&self) -> Result<String> {
        let storage = storage(&self.settings);
        let submitter = FormSubmitter::new(self.settings.target.clone());

        let forms: Option<Vec<TransformedForm>> =
            read_optional_json(&storage, FORM_DATA_FILE).await?;
        let daily_logs: Option<Vec<DailyLogForm>> =
            read_optional_json(&storage, DAILYLOG_FORMS_FILE).await?;

        if forms.is_none() && daily_logs.is_none() {
            return Err(MigrateError::processing(format!(
                "No form data found ({} or {}). Run fetch-checklists or fetch-daily-logs first",
                FORM_DATA_FILE, DAILYLOG_FORMS_FILE
            )));
        }

        let mut last_output = String::new();

        if let Some(forms) = forms {
            tracing::info!("Processing {} checklist forms", forms.len());
            let outcomes = submitter.submit_all(&forms).await;
            write_json(&storage, FORM_RESULTS_FILE, &results_with_summary(&outcomes)).await?;
            last_output = format!("{}/{}", storage.base_path(), FORM_RESULTS_FILE);
        }

        if let Some(logs) = daily_logs {
            tracing::info!("Processing {} daily log forms", logs.len());
            let outcomes = submitter.submit_all_daily_logs(&logs).await;
            write_json(&storage, DAILYLOG_RESULTS_FILE, &results_with_summary(&outcomes)).await?;
            last_output = format!("{}/{}", storage.base_path(), DAILYLOG_RESULTS_FILE);
        }

        Ok(last_output)
    }
}

pub(super) fn results_with_summary(outcomes: &[SubmissionOutcome]) -> serde_json::Value {
    serde_json::json!({
        "summary": RunSummary::from_outcomes(outcomes),
        "results": outcomes,
    })
}
