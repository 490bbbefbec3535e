use reqwest::Client;
use serde::Deserialize;

use crate::config::settings::TargetSettings;
use crate::domain::model::{
    CustomFieldValue, CustomValue, DailyLogForm, FormPayload, IssuePayload, RunSummary,
    SubmissionOutcome, TransformedForm, UpdateData,
};
use crate::utils::error::{MigrateError, Result};

#[derive(Debug, Deserialize)]
struct TemplatePage {
    data: Vec<Template>,
}

#[derive(Debug, Deserialize)]
struct Template {
    id: String,
    name: String,
    status: String,
}

/// 建立表單的回應。欄位識別碼在這裡才出現,後續的
/// values:batch-update 必須用它們
#[derive(Debug, Deserialize)]
struct CreatedForm {
    id: String,
    #[serde(rename = "customValues", default)]
    custom_values: Vec<CreatedField>,
}

#[derive(Debug, Deserialize)]
struct CreatedField {
    #[serde(rename = "fieldId")]
    field_id: String,
    #[serde(rename = "itemLabel")]
    item_label: Option<String>,
    definition: Option<FieldDefinition>,
}

#[derive(Debug, Deserialize)]
struct FieldDefinition {
    name: Option<String>,
}

impl CreatedField {
    fn label(&self) -> Option<&str> {
        self.item_label
            .as_deref()
            .or_else(|| self.definition.as_ref()?.name.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    id: String,
}

/// 對目標平台建立表單:查模板 → POST 建立 → PUT 更新自訂欄位值。
/// 單筆失敗只產生 failed outcome,不會讓整批中斷
pub struct FormSubmitter {
    client: Client,
    target: TargetSettings,
}

impl FormSubmitter {
    pub fn new(target: TargetSettings) -> Self {
        Self {
            client: Client::new(),
            target,
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}{}",
            self.target.base_url, self.target.project_id, path
        )
    }

    pub async fn create_form(&self, form: &TransformedForm) -> SubmissionOutcome {
        match self.try_create_form(form).await {
            Ok(id) => {
                tracing::info!("✅ Form \"{}\" created ({})", form.form_data.name, id);
                SubmissionOutcome::success(id)
            }
            Err(e) => {
                tracing::warn!("❌ Form \"{}\" failed: {}", form.form_data.name, e);
                SubmissionOutcome::failed(e.to_string())
            }
        }
    }

    async fn try_create_form(&self, form: &TransformedForm) -> Result<String> {
        let template = self.find_template(&form.template_name).await?;
        let created = self.post_form(&template.id, &form.form_data).await?;

        if !form.update_data.is_empty() {
            let custom_values = assign_field_ids(&form.update_data, &created.custom_values);
            if custom_values.is_empty() {
                tracing::warn!(
                    "No matching custom fields on form \"{}\", basic form created",
                    form.form_data.name
                );
            } else {
                self.put_values(&created.id, custom_values).await?;
            }
        }

        Ok(created.id)
    }

    /// 日報走固定模板,自訂欄位用建立回應裡的欄位名稱做
    /// 啟發式配對(weather/temp/precip/manpower/notes)
    pub async fn create_daily_log_form(&self, log: &DailyLogForm) -> SubmissionOutcome {
        match self.try_create_daily_log_form(log).await {
            Ok(id) => {
                tracing::info!("✅ Daily log form for {} created ({})", log.date, id);
                SubmissionOutcome::success(id)
            }
            Err(e) => {
                tracing::warn!("❌ Daily log form for {} failed: {}", log.date, e);
                SubmissionOutcome::failed(e.to_string())
            }
        }
    }

    async fn try_create_daily_log_form(&self, log: &DailyLogForm) -> Result<String> {
        let template = self.find_template(&self.target.daily_log_template).await?;

        let form_data = FormPayload {
            assignee_id: log.created_by.clone(),
            assignee_type: "user".to_string(),
            name: log.title.clone(),
            description: Some(if log.summary.is_empty() {
                "Daily log report".to_string()
            } else {
                log.summary.clone()
            }),
            form_date: Some(log.date.clone()),
            notes: Some(format!(
                "Weather: {}, Temp: {}, Precipitation: {}",
                log.weather.conditions, log.weather.temperature, log.weather.precipitation
            )),
        };

        let created = self.post_form(&template.id, &form_data).await?;
        let custom_values = daily_log_values(log, &created.custom_values);
        if custom_values.is_empty() {
            tracing::info!("No matching custom fields in template, basic form created");
        } else {
            self.put_values(&created.id, custom_values).await?;
        }

        Ok(created.id)
    }

    async fn find_template(&self, name: &str) -> Result<Template> {
        let response = self
            .client
            .get(self.url("/form-templates"))
            .bearer_auth(&self.target.auth_token)
            .query(&[("limit", "50"), ("offset", "0")])
            .send()
            .await?;
        let page: TemplatePage = parse_response(response).await?;
        let available: Vec<String> = page.data.iter().map(|t| t.name.clone()).collect();

        page.data
            .into_iter()
            .find(|t| t.name == name && t.status == "active")
            .inspect(|t| tracing::debug!("Using template {} ({})", t.name, t.id))
            .ok_or_else(|| {
                MigrateError::processing(format!(
                    "Template \"{}\" not found or not active. Available templates: {}",
                    name,
                    available.join(", ")
                ))
            })
    }

    async fn post_form(&self, template_id: &str, form_data: &FormPayload) -> Result<CreatedForm> {
        let response = self
            .client
            .post(self.url(&format!("/form-templates/{}/forms", template_id)))
            .bearer_auth(&self.target.auth_token)
            .json(form_data)
            .send()
            .await?;
        parse_response(response).await
    }

    async fn put_values(&self, form_id: &str, custom_values: Vec<CustomValue>) -> Result<()> {
        let count = custom_values.len();
        let response = self
            .client
            .put(self.url(&format!("/forms/{}/values:batch-update", form_id)))
            .bearer_auth(&self.target.auth_token)
            .json(&UpdateData { custom_values })
            .send()
            .await?;
        ensure_success(response).await?;
        tracing::debug!("Updated {} custom values on form {}", count, form_id);
        Ok(())
    }

    pub async fn submit_all(&self, forms: &[TransformedForm]) -> Vec<SubmissionOutcome> {
        let mut outcomes = Vec::with_capacity(forms.len());
        for form in forms {
            outcomes.push(self.create_form(form).await);
        }
        log_summary("form", &outcomes);
        outcomes
    }

    pub async fn submit_all_daily_logs(&self, logs: &[DailyLogForm]) -> Vec<SubmissionOutcome> {
        let mut outcomes = Vec::with_capacity(logs.len());
        for log in logs {
            outcomes.push(self.create_daily_log_form(log).await);
        }
        log_summary("daily log form", &outcomes);
        outcomes
    }
}

/// 對目標平台建立議題,一筆一個 POST
pub struct IssueSubmitter {
    client: Client,
    target: TargetSettings,
}

impl IssueSubmitter {
    pub fn new(target: TargetSettings) -> Self {
        Self {
            client: Client::new(),
            target,
        }
    }

    pub async fn create_issue(&self, issue: &IssuePayload) -> SubmissionOutcome {
        match self.try_create_issue(issue).await {
            Ok(id) => {
                tracing::info!("✅ Issue \"{}\" created ({})", issue.title, id);
                SubmissionOutcome::success(id)
            }
            Err(e) => {
                tracing::warn!("❌ Issue \"{}\" failed: {}", issue.title, e);
                SubmissionOutcome::failed(e.to_string())
            }
        }
    }

    async fn try_create_issue(&self, issue: &IssuePayload) -> Result<String> {
        let response = self
            .client
            .post(format!(
                "{}/projects/{}/issues",
                self.target.base_url, self.target.project_id
            ))
            .bearer_auth(&self.target.auth_token)
            .json(issue)
            .send()
            .await?;
        let created: CreatedIssue = parse_response(response).await?;
        Ok(created.id)
    }

    pub async fn submit_all(&self, issues: &[IssuePayload]) -> Vec<SubmissionOutcome> {
        let mut outcomes = Vec::with_capacity(issues.len());
        for issue in issues {
            outcomes.push(self.create_issue(issue).await);
        }
        log_summary("issue", &outcomes);
        outcomes
    }
}

/// 待提交值配上建立回應指派的欄位識別碼。配不到的標籤略過並警告
fn assign_field_ids(
    pending: &[crate::domain::model::PendingValue],
    fields: &[CreatedField],
) -> Vec<CustomValue> {
    pending
        .iter()
        .filter_map(|p| {
            let field = fields.iter().find(|f| f.label() == Some(p.item_label.as_str()));
            match field {
                Some(field) => Some(CustomValue {
                    field_id: field.field_id.clone(),
                    value: p.value.clone(),
                }),
                None => {
                    tracing::warn!("No field matches item label \"{}\", skipping", p.item_label);
                    None
                }
            }
        })
        .collect()
}

fn daily_log_values(log: &DailyLogForm, fields: &[CreatedField]) -> Vec<CustomValue> {
    let find = |predicate: &dyn Fn(&str) -> bool| {
        fields.iter().find_map(|f| {
            let name = f.label()?.to_lowercase();
            predicate(&name).then(|| f.field_id.clone())
        })
    };

    let mut values = Vec::new();

    if let Some(field_id) = find(&|n| n.contains("weather") || n.contains("condition")) {
        values.push(text_value(field_id, &log.weather.conditions));
    }
    if let Some(field_id) = find(&|n| n.contains("temp")) {
        values.push(text_value(field_id, &log.weather.temperature));
    }
    if let Some(field_id) = find(&|n| n.contains("precip") || n.contains("rain")) {
        values.push(text_value(field_id, &log.weather.precipitation));
    }
    if !log.manpower.is_empty() {
        if let Some(field_id) =
            find(&|n| n.contains("manpower") || n.contains("labor") || n.contains("crew"))
        {
            let text = log
                .manpower
                .iter()
                .map(|mp| {
                    format!(
                        "Company: {}, Workers: {}, Hours: {}, Notes: {}",
                        mp.company, mp.number_of_workers, mp.hours, mp.description
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            values.push(text_value(field_id, &text));
        }
    }
    if !log.summary.is_empty() {
        if let Some(field_id) = find(&|n| n.contains("note") || n.contains("comment")) {
            values.push(text_value(field_id, &log.summary));
        }
    }

    values
}

fn text_value(field_id: String, text: &str) -> CustomValue {
    CustomValue {
        field_id,
        value: CustomFieldValue::Text(text.to_string()),
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = ensure_success(response).await?;
    Ok(response.json().await?)
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MigrateError::processing(format!(
        "Request failed with status {}: {}",
        status.as_u16(),
        body
    )))
}

fn log_summary(kind: &str, outcomes: &[SubmissionOutcome]) {
    let summary = RunSummary::from_outcomes(outcomes);
    tracing::info!(
        "📋 {} submission: {} total, {} successful, {} failed",
        kind,
        summary.total,
        summary.successful,
        summary.failed
    );
    for outcome in outcomes.iter().filter(|o| !o.is_success()) {
        if let Some(error) = &outcome.error {
            tracing::warn!("- {}", error);
        }
    }
}
