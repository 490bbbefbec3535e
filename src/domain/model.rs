use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::error::{MigrateError, Result};

/// OAuth 憑證，快取在結果目錄的 tokens.json，最後寫入者為準
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() >= at,
            None => false,
        }
    }
}

/// 一個尚未執行的具名請求，於批次內 name 唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub url: String,
}

impl RequestDescriptor {
    pub fn new(name: &str, category: &str, url: String) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            subcategory: None,
            url,
        }
    }

    pub fn with_subcategory(mut self, subcategory: &str) -> Self {
        self.subcategory = Some(subcategory.to_string());
        self
    }
}

/// 請求結束狀態。序列化成快照檔使用的原始值：
/// 數字狀態碼、"skipped" 或 "unknown"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Ok(u16),
    Unauthorized,
    Failed(u16),
    Skipped,
    Unreachable,
}

impl RequestStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestStatus::Ok(_))
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            RequestStatus::Ok(code) | RequestStatus::Failed(code) => Some(*code),
            RequestStatus::Unauthorized => Some(401),
            _ => None,
        }
    }
}

impl Serialize for RequestStatus {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RequestStatus::Ok(code) | RequestStatus::Failed(code) => {
                serializer.serialize_u16(*code)
            }
            RequestStatus::Unauthorized => serializer.serialize_u16(401),
            RequestStatus::Skipped => serializer.serialize_str("skipped"),
            RequestStatus::Unreachable => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(n) => {
                let code = n.as_u64().unwrap_or(0) as u16;
                Ok(match code {
                    200..=299 => RequestStatus::Ok(code),
                    401 => RequestStatus::Unauthorized,
                    _ => RequestStatus::Failed(code),
                })
            }
            serde_json::Value::String(s) if s == "skipped" => Ok(RequestStatus::Skipped),
            serde_json::Value::String(_) => Ok(RequestStatus::Unreachable),
            _ => Err(serde::de::Error::custom("invalid request status")),
        }
    }
}

/// 單一描述符執行一次後產生的結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestResult {
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: RequestStatus,
}

impl RequestResult {
    pub fn success(descriptor: &RequestDescriptor, data: serde_json::Value, code: u16) -> Self {
        Self {
            name: descriptor.name.clone(),
            category: descriptor.category.clone(),
            subcategory: descriptor.subcategory.clone(),
            data: Some(data),
            error: None,
            status: RequestStatus::Ok(code),
        }
    }

    pub fn failure(descriptor: &RequestDescriptor, status: RequestStatus, error: String) -> Self {
        Self {
            name: descriptor.name.clone(),
            category: descriptor.category.clone(),
            subcategory: descriptor.subcategory.clone(),
            data: None,
            error: Some(error),
            status,
        }
    }

    pub fn skipped(descriptor: &RequestDescriptor) -> Self {
        Self::failure(
            descriptor,
            RequestStatus::Skipped,
            "Skipped due to pending token refresh".to_string(),
        )
    }
}

/// ResultTree 中的一個節點：{data, error, status}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: RequestStatus,
}

impl ResultEntry {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_success()
    }
}

/// 批次結果的聚合狀態：category -> name -> ResultEntry。
/// 建構時檢查同一 category 內的 name 不得重複。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTree {
    entries: BTreeMap<String, BTreeMap<String, ResultEntry>>,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results(results: Vec<RequestResult>) -> Result<Self> {
        let mut tree = Self::new();
        tree.extend(results)?;
        Ok(tree)
    }

    pub fn extend(&mut self, results: Vec<RequestResult>) -> Result<()> {
        for result in results {
            self.insert(result)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, result: RequestResult) -> Result<()> {
        let category = self.entries.entry(result.category.clone()).or_default();
        if category.contains_key(&result.name) {
            return Err(MigrateError::data_shape(format!(
                "Duplicate result name '{}' in category '{}'",
                result.name, result.category
            )));
        }
        category.insert(
            result.name,
            ResultEntry {
                data: result.data,
                error: result.error,
                status: result.status,
            },
        );
        Ok(())
    }

    pub fn entry(&self, category: &str, name: &str) -> Option<&ResultEntry> {
        self.entries.get(category)?.get(name)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, ResultEntry>)> {
        self.entries.iter()
    }

    /// 取出某個節點 data 內的記錄陣列。支援兩種回應形狀：
    /// 陣列本體，或帶 data/results 陣列欄位的物件
    pub fn records(&self, category: &str, name: &str) -> Vec<&serde_json::Value> {
        let Some(entry) = self.entry(category, name) else {
            return Vec::new();
        };
        let Some(data) = &entry.data else {
            return Vec::new();
        };
        match data {
            serde_json::Value::Array(items) => items.iter().collect(),
            serde_json::Value::Object(obj) => obj
                .get("data")
                .or_else(|| obj.get("results"))
                .and_then(|v| v.as_array())
                .map(|items| items.iter().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 轉換後等待提交的自訂欄位值。欄位識別碼要到建立表單
/// 之後才由目標 API 指派，因此提交前只記來源欄位標籤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingValue {
    pub item_label: String,
    #[serde(flatten)]
    pub value: CustomFieldValue,
}

/// 目標 API 的 customValues 項目：{fieldId, <kind>Val}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomValue {
    #[serde(rename = "fieldId")]
    pub field_id: String,
    #[serde(flatten)]
    pub value: CustomFieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomFieldValue {
    #[serde(rename = "textVal")]
    Text(String),
    #[serde(rename = "numberVal")]
    Number(String),
    #[serde(rename = "toggleVal")]
    Toggle(String),
    #[serde(rename = "choiceVal")]
    Choice(String),
    #[serde(rename = "arrayVal")]
    Array(Vec<String>),
}

/// 建立表單的本體。缺值欄位直接省略，不送 null
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPayload {
    pub assignee_id: String,
    pub assignee_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// 一筆來源記錄轉換後的建立/更新配對
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformedForm {
    pub template_name: String,
    pub form_data: FormPayload,
    pub update_data: Vec<PendingValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateData {
    pub custom_values: Vec<CustomValue>,
}

/// 日誌轉換後的中間形狀（目標 API 的日報資料）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogForm {
    pub id: String,
    pub date: String,
    pub created_by: String,
    pub title: String,
    pub summary: String,
    pub weather: WeatherReport,
    pub manpower: Vec<ManpowerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub conditions: String,
    pub temperature: String,
    pub precipitation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManpowerEntry {
    pub company: String,
    pub number_of_workers: u64,
    pub hours: f64,
    pub description: String,
}

/// 觀察項轉換後的議題建立本體
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePayload {
    pub title: String,
    pub description: String,
    pub status: String,
    pub issue_type_id: String,
    pub issue_subtype_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_details: Option<String>,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_type: Option<String>,
    pub custom_attributes: Vec<CustomAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAttribute {
    pub attribute_definition_id: String,
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// 每筆記錄一個提交結果，失敗不中斷批次
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionOutcome {
    pub fn success(id: String) -> Self {
        Self {
            id: Some(id),
            status: OutcomeStatus::Success,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            id: None,
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[SubmissionOutcome]) -> Self {
        let successful = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            total: outcomes.len(),
            successful,
            failed: outcomes.len() - successful,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub endpoints: usize,
    pub successful: usize,
    pub failed: usize,
}

/// 擷取批次的回應摘要，依 category 分組
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSummary {
    pub categories: BTreeMap<String, CategorySummary>,
    pub total_endpoints: usize,
    pub successful_endpoints: usize,
    pub failed_endpoints: usize,
}

impl FetchSummary {
    pub fn from_tree(tree: &ResultTree) -> Self {
        let mut categories = BTreeMap::new();
        let mut total = 0;
        let mut successful = 0;
        let mut failed = 0;

        for (category, entries) in tree.categories() {
            let ok = entries.values().filter(|e| e.error.is_none()).count();
            let bad = entries.len() - ok;
            total += entries.len();
            successful += ok;
            failed += bad;
            categories.insert(
                category.clone(),
                CategorySummary {
                    endpoints: entries.len(),
                    successful: ok,
                    failed: bad,
                },
            );
        }

        Self {
            categories,
            total_endpoints: total,
            successful_endpoints: successful,
            failed_endpoints: failed,
        }
    }
}

/// JSON 值轉字串（去除字串外的引號），URL 參數與欄位值共用
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string().trim_matches('"').to_string(),
    }
}
