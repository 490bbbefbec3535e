use std::collections::HashMap;

use crate::config::mapping::{FieldKind, FieldKindMap};
use crate::config::settings::TargetSettings;
use crate::domain::model::{
    value_to_string, CustomAttribute, DailyLogForm, FormPayload, IssuePayload, ManpowerEntry,
    PendingValue, ResultTree, TransformedForm, WeatherReport, CustomFieldValue,
};

/// 依來源欄位型別標籤決定目標值的包裝形狀。缺值(null、空字串、
/// 空陣列)直接丟掉,不產生半套的值
pub fn pending_value(
    item_label: &str,
    field_type: &str,
    raw: &serde_json::Value,
    kinds: &FieldKindMap,
) -> Option<PendingValue> {
    if raw.is_null() {
        return None;
    }

    let value = match kinds.kind_for(field_type) {
        FieldKind::Array => {
            let items: Vec<String> = raw
                .as_array()?
                .iter()
                .map(value_to_string)
                .filter(|s| !s.is_empty())
                .collect();
            if items.is_empty() {
                return None;
            }
            CustomFieldValue::Array(items)
        }
        kind => {
            let text = value_to_string(raw);
            if text.is_empty() {
                return None;
            }
            match kind {
                FieldKind::Number => CustomFieldValue::Number(text),
                FieldKind::Toggle => CustomFieldValue::Toggle(text),
                FieldKind::Choice => CustomFieldValue::Choice(text),
                _ => CustomFieldValue::Text(text),
            }
        }
    };

    Some(PendingValue {
        item_label: item_label.to_string(),
        value,
    })
}

/// 來源使用者 id → 目標使用者 id,以 email 不分大小寫配對。
/// 查不到一律回預設指派人,絕不回空字串
#[derive(Debug, Clone)]
pub struct UserMapping {
    map: HashMap<String, String>,
    default_assignee: String,
}

impl UserMapping {
    pub fn build(
        source_users: &[&serde_json::Value],
        target_users: &[&serde_json::Value],
        default_assignee: &str,
    ) -> Self {
        tracing::info!(
            "Mapping {} source users to {} target users",
            source_users.len(),
            target_users.len()
        );

        let mut by_email: HashMap<String, String> = HashMap::new();
        for user in target_users {
            let Some(email) = str_field(user, "email") else {
                continue;
            };
            let Some(member_id) =
                str_field(user, "memberId").or_else(|| str_field(user, "id"))
            else {
                continue;
            };
            by_email.insert(email.to_lowercase(), member_id);
        }

        let mut map = HashMap::new();
        for user in source_users {
            let Some(source_id) = str_field(user, "id") else {
                continue;
            };
            let email = str_field(user, "email_address").map(|e| e.to_lowercase());
            match email.as_deref().and_then(|e| by_email.get(e)) {
                Some(target_id) => {
                    tracing::debug!("Mapped user {} to {}", source_id, target_id);
                    map.insert(source_id, target_id.clone());
                }
                None => {
                    tracing::warn!(
                        "No target user found for source user {}, using default assignee",
                        source_id
                    );
                }
            }
        }

        Self {
            map,
            default_assignee: default_assignee.to_string(),
        }
    }

    /// 先抓目標專案成員再建映射。抓不到成員名單時照樣可用,
    /// 只是所有人都退回預設指派人
    pub async fn from_remote(
        client: &reqwest::Client,
        target: &TargetSettings,
        source_users: &[&serde_json::Value],
    ) -> Self {
        let target_users = fetch_target_users(client, target).await;
        let refs: Vec<&serde_json::Value> = target_users.iter().collect();
        Self::build(source_users, &refs, &target.default_assignee_id)
    }

    pub fn target_id(&self, source_id: Option<&str>) -> &str {
        source_id
            .and_then(|id| self.map.get(id))
            .map(String::as_str)
            .unwrap_or(&self.default_assignee)
    }

    /// 供落檔快照用
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "defaultAssignee": self.default_assignee,
            "mapped": self.map,
        })
    }
}

async fn fetch_target_users(
    client: &reqwest::Client,
    target: &TargetSettings,
) -> Vec<serde_json::Value> {
    let url = format!("{}/projects/{}/users", target.base_url, target.project_id);
    match client.get(&url).bearer_auth(&target.auth_token).send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<serde_json::Value>().await {
                Ok(body) => body
                    .get("results")
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default(),
                Err(e) => {
                    tracing::warn!("Could not parse target users response: {}", e);
                    Vec::new()
                }
            }
        }
        Ok(response) => {
            tracing::warn!(
                "Fetching target users failed with status {}, using default assignee only",
                response.status()
            );
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(
                "Fetching target users failed ({}), using default assignee only",
                e
            );
            Vec::new()
        }
    }
}

/// 主日誌與相依的細節/人力結果 join 成目標日報。缺欄位補預設值,
/// 單筆髒資料只影響自己那筆
pub fn transform_daily_logs(tree: &ResultTree, users: &UserMapping) -> Vec<DailyLogForm> {
    let logs = tree.records("project", "dailyLogs");
    if logs.is_empty() {
        tracing::warn!("No daily logs found in fetched data, nothing to transform");
        return Vec::new();
    }

    tracing::info!("Transforming {} daily logs", logs.len());
    let mut forms = Vec::with_capacity(logs.len());

    for log in logs {
        let Some(id) = str_field(log, "id") else {
            tracing::warn!("Daily log without id, skipping");
            continue;
        };

        let detail = tree
            .entry("dependent", &format!("dailyLogDetails_{}", id))
            .and_then(|e| e.data.clone())
            .unwrap_or(serde_json::Value::Null);
        let manpower_records = tree.records("dependent", &format!("manpowerLogs_{}", id));

        let date = str_field(log, "log_date")
            .map(|d| d.chars().take(10).collect::<String>())
            .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());

        let creator = log
            .get("created_by")
            .and_then(|c| str_field(c, "id"));
        let created_by = users.target_id(creator.as_deref()).to_string();

        let pick = |key: &str, fallback: &str| {
            str_field(&detail, key)
                .or_else(|| str_field(log, key))
                .unwrap_or_else(|| fallback.to_string())
        };

        forms.push(DailyLogForm {
            id: id.clone(),
            title: format!("Daily Log - {}", date),
            summary: pick("notes", "No notes provided"),
            weather: WeatherReport {
                conditions: pick("weather_conditions", "Not specified"),
                temperature: pick("temperature", "Not recorded"),
                precipitation: pick("precipitation", "0"),
            },
            manpower: manpower_records.iter().map(|mp| manpower_entry(mp)).collect(),
            date,
            created_by,
        });
    }

    forms
}

fn manpower_entry(record: &serde_json::Value) -> ManpowerEntry {
    ManpowerEntry {
        company: record
            .get("company")
            .and_then(|c| str_field(c, "name"))
            .unwrap_or_else(|| "Unknown".to_string()),
        number_of_workers: record
            .get("number_of_workers")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        hours: record.get("hours").and_then(|v| v.as_f64()).unwrap_or(0.0),
        description: str_field(record, "description").unwrap_or_default(),
    }
}

/// 檢查表 → 建立/更新配對。表單模板名取自來源清單名,
/// 項目回覆轉成待提交的自訂欄位值
pub fn transform_checklists(
    tree: &ResultTree,
    kinds: &FieldKindMap,
    target: &TargetSettings,
) -> Vec<TransformedForm> {
    let lists = tree.records("project", "lists");
    let items = tree.records("project", "listItems");
    let mut forms = Vec::with_capacity(lists.len());

    for list in lists {
        let Some(list_id) = str_field(list, "id") else {
            continue;
        };
        let name = str_field(list, "name").unwrap_or_else(|| "Untitled".to_string());

        let update_data: Vec<PendingValue> = items
            .iter()
            .filter(|item| {
                item.get("list_id")
                    .map(value_to_string)
                    .as_deref()
                    == Some(list_id.as_str())
            })
            .filter_map(|item| {
                let label = str_field(item, "name")?;
                let field_type = str_field(item, "item_type").unwrap_or_default();
                let raw = item.get("item_response")?;
                pending_value(&label, &field_type, raw, kinds)
            })
            .collect();

        forms.push(TransformedForm {
            template_name: name.clone(),
            form_data: FormPayload {
                assignee_id: target.default_assignee_id.clone(),
                assignee_type: "user".to_string(),
                name,
                description: str_field(list, "description"),
                form_date: str_field(list, "inspection_date")
                    .map(|d| d.chars().take(10).collect()),
                notes: None,
            },
            update_data,
        });
    }

    forms
}

/// 觀察項 → 議題建立本體。標題「{編號}: {名稱}」,自訂欄位原樣帶過
pub fn transform_observation(
    obs: &serde_json::Value,
    users: &UserMapping,
    target: &TargetSettings,
) -> IssuePayload {
    let number = str_field(obs, "number").unwrap_or_default();
    let name = str_field(obs, "name").unwrap_or_else(|| "Untitled".to_string());
    let title = format!("{}: {}", number, name).trim().to_string();

    let assignee = obs.get("assignee").and_then(|a| str_field(a, "id"));
    let (assigned_to, assigned_to_type) = match assignee {
        Some(id) => (
            Some(users.target_id(Some(&id)).to_string()),
            Some("user".to_string()),
        ),
        None => (None, None),
    };

    let custom_attributes = obs
        .get("custom_fields")
        .and_then(|v| v.as_array())
        .map(|fields| {
            fields
                .iter()
                .filter_map(|field| {
                    Some(CustomAttribute {
                        attribute_definition_id: str_field(field, "custom_field_definition_id")?,
                        value: field.get("value").cloned().unwrap_or(serde_json::Value::Null),
                        attribute_type: str_field(field, "type")
                            .unwrap_or_else(|| "text".to_string()),
                        title: str_field(field, "title").unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    IssuePayload {
        title,
        description: str_field(obs, "description").unwrap_or_default(),
        status: target.issue_status.clone(),
        issue_type_id: target.issue_type_id.clone().unwrap_or_default(),
        issue_subtype_id: target.issue_subtype_id.clone().unwrap_or_default(),
        due_date: str_field(obs, "due_date"),
        start_date: str_field(obs, "start_date"),
        location_details: str_field(obs, "location"),
        published: false,
        assigned_to,
        assigned_to_type,
        custom_attributes,
    }
}

/// 缺值(null、空字串)視為沒有欄位
fn str_field(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        other => Some(value_to_string(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{RequestDescriptor, RequestResult};

    fn kinds() -> FieldKindMap {
        FieldKindMap::default()
    }

    #[test]
    fn test_number_field_becomes_number_val_string() {
        let value = pending_value("Crew size", "number", &serde_json::json!("2"), &kinds()).unwrap();
        assert_eq!(value.value, CustomFieldValue::Number("2".to_string()));

        let wire = serde_json::to_value(&value).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({"itemLabel": "Crew size", "numberVal": "2"})
        );
    }

    #[test]
    fn test_multiple_choice_becomes_array_val() {
        let value = pending_value(
            "Defects found",
            "multiple choice",
            &serde_json::json!(["Answer 2", "Answer 3"]),
            &kinds(),
        )
        .unwrap();

        let wire = serde_json::to_value(&value).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({
                "itemLabel": "Defects found",
                "arrayVal": ["Answer 2", "Answer 3"]
            })
        );
    }

    #[test]
    fn test_boolean_field_becomes_toggle_val() {
        let value = pending_value("Approved", "boolean", &serde_json::json!("Yes"), &kinds()).unwrap();
        assert_eq!(value.value, CustomFieldValue::Toggle("Yes".to_string()));
    }

    #[test]
    fn test_unknown_field_type_defaults_to_text() {
        let value =
            pending_value("Remarks", "paragraph", &serde_json::json!("done"), &kinds()).unwrap();
        assert_eq!(value.value, CustomFieldValue::Text("done".to_string()));
    }

    #[test]
    fn test_empty_values_are_dropped() {
        assert!(pending_value("a", "text", &serde_json::Value::Null, &kinds()).is_none());
        assert!(pending_value("a", "text", &serde_json::json!(""), &kinds()).is_none());
        assert!(pending_value("a", "multiple choice", &serde_json::json!([]), &kinds()).is_none());
    }

    #[test]
    fn test_user_mapping_matches_emails_case_insensitively() {
        let source = serde_json::json!([
            {"id": 101, "email_address": "Alice@Example.com"},
            {"id": 102, "email_address": "bob@example.com"},
            {"id": 103}
        ]);
        let target = serde_json::json!([
            {"email": "alice@example.com", "memberId": "M-ALICE"},
            {"email": "carol@example.com", "memberId": "M-CAROL"}
        ]);
        let source_refs: Vec<&serde_json::Value> = source.as_array().unwrap().iter().collect();
        let target_refs: Vec<&serde_json::Value> = target.as_array().unwrap().iter().collect();

        let mapping = UserMapping::build(&source_refs, &target_refs, "DEFAULT-ID");

        assert_eq!(mapping.target_id(Some("101")), "M-ALICE");
        // 配不到 email、沒 email、完全未知,都退回預設指派人
        assert_eq!(mapping.target_id(Some("102")), "DEFAULT-ID");
        assert_eq!(mapping.target_id(Some("103")), "DEFAULT-ID");
        assert_eq!(mapping.target_id(Some("999")), "DEFAULT-ID");
        assert_eq!(mapping.target_id(None), "DEFAULT-ID");
        assert!(!mapping.target_id(Some("999")).is_empty());
    }

    fn tree_from(parts: Vec<(&str, &str, serde_json::Value)>) -> ResultTree {
        let results = parts
            .into_iter()
            .map(|(category, name, data)| {
                let descriptor =
                    RequestDescriptor::new(name, category, format!("http://src/{}", name));
                RequestResult::success(&descriptor, data, 200)
            })
            .collect();
        ResultTree::from_results(results).unwrap()
    }

    #[test]
    fn test_daily_log_join_prefers_detail_over_base_fields() {
        let tree = tree_from(vec![
            (
                "project",
                "dailyLogs",
                serde_json::json!({"data": [{
                    "id": 7,
                    "log_date": "2024-03-15T08:00:00Z",
                    "created_by": {"id": 101},
                    "weather_conditions": "Cloudy"
                }]}),
            ),
            (
                "dependent",
                "dailyLogDetails_7",
                serde_json::json!({
                    "weather_conditions": "Sunny",
                    "temperature": "28C",
                    "notes": "Poured slab"
                }),
            ),
            (
                "dependent",
                "manpowerLogs_7",
                serde_json::json!([{
                    "company": {"name": "Acme Concrete"},
                    "number_of_workers": 5,
                    "hours": 7.5,
                    "description": "Slab pour"
                }]),
            ),
        ]);
        let mapping = UserMapping {
            map: HashMap::from([("101".to_string(), "M-ALICE".to_string())]),
            default_assignee: "DEFAULT-ID".to_string(),
        };

        let forms = transform_daily_logs(&tree, &mapping);

        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form.date, "2024-03-15");
        assert_eq!(form.title, "Daily Log - 2024-03-15");
        assert_eq!(form.created_by, "M-ALICE");
        assert_eq!(form.summary, "Poured slab");
        assert_eq!(form.weather.conditions, "Sunny");
        assert_eq!(form.weather.temperature, "28C");
        assert_eq!(form.weather.precipitation, "0");
        assert_eq!(form.manpower.len(), 1);
        assert_eq!(form.manpower[0].company, "Acme Concrete");
        assert_eq!(form.manpower[0].number_of_workers, 5);
    }

    #[test]
    fn test_daily_log_without_details_gets_defaults() {
        let tree = tree_from(vec![(
            "project",
            "dailyLogs",
            serde_json::json!([{"id": "9"}]),
        )]);
        let mapping = UserMapping {
            map: HashMap::new(),
            default_assignee: "DEFAULT-ID".to_string(),
        };

        let forms = transform_daily_logs(&tree, &mapping);

        let form = &forms[0];
        assert_eq!(form.created_by, "DEFAULT-ID");
        assert_eq!(form.summary, "No notes provided");
        assert_eq!(form.weather.conditions, "Not specified");
        assert_eq!(form.weather.temperature, "Not recorded");
        assert!(form.manpower.is_empty());
    }

    #[test]
    fn test_checklist_items_become_pending_values() {
        let tree = tree_from(vec![
            (
                "project",
                "lists",
                serde_json::json!([{
                    "id": 55,
                    "name": "Material Inspection Request",
                    "description": "Incoming material checks",
                    "inspection_date": "2024-04-01"
                }]),
            ),
            (
                "project",
                "listItems",
                serde_json::json!([
                    {"list_id": 55, "name": "Packing List", "item_type": "boolean", "item_response": "Yes"},
                    {"list_id": 55, "name": "Quantity", "item_type": "number", "item_response": 12},
                    {"list_id": 55, "name": "Unanswered", "item_type": "text", "item_response": null},
                    {"list_id": 99, "name": "Other list item", "item_type": "text", "item_response": "x"}
                ]),
            ),
        ]);
        let target = crate::config::settings::test_support::settings_for(
            "https://s.example.com",
            "https://t.example.com",
        )
        .target;

        let forms = transform_checklists(&tree, &kinds(), &target);

        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form.template_name, "Material Inspection Request");
        assert_eq!(form.form_data.assignee_id, target.default_assignee_id);
        assert_eq!(form.update_data.len(), 2);
        assert_eq!(form.update_data[0].item_label, "Packing List");
        assert_eq!(
            form.update_data[0].value,
            CustomFieldValue::Toggle("Yes".to_string())
        );
        assert_eq!(
            form.update_data[1].value,
            CustomFieldValue::Number("12".to_string())
        );
    }

    #[test]
    fn test_observation_becomes_issue_payload() {
        let obs = serde_json::json!({
            "number": 42,
            "name": "Exposed rebar",
            "description": "Rebar exposed on level 3",
            "assignee": {"id": 101},
            "due_date": "2024-05-01",
            "location": "Level 3, Zone B",
            "custom_fields": [{
                "custom_field_definition_id": 9001,
                "value": "High",
                "type": "text",
                "title": "Severity"
            }]
        });
        let mapping = UserMapping {
            map: HashMap::from([("101".to_string(), "M-ALICE".to_string())]),
            default_assignee: "DEFAULT-ID".to_string(),
        };
        let target = crate::config::settings::test_support::settings_for(
            "https://s.example.com",
            "https://t.example.com",
        )
        .target;

        let issue = transform_observation(&obs, &mapping, &target);

        assert_eq!(issue.title, "42: Exposed rebar");
        assert_eq!(issue.status, "open");
        assert_eq!(issue.assigned_to.as_deref(), Some("M-ALICE"));
        assert_eq!(issue.assigned_to_type.as_deref(), Some("user"));
        assert!(!issue.published);
        assert_eq!(issue.custom_attributes.len(), 1);
        assert_eq!(issue.custom_attributes[0].attribute_definition_id, "9001");
        assert_eq!(issue.custom_attributes[0].title, "Severity");
    }

    #[test]
    fn test_observation_without_number_or_assignee() {
        let obs = serde_json::json!({"name": "Untagged finding"});
        let mapping = UserMapping {
            map: HashMap::new(),
            default_assignee: "DEFAULT-ID".to_string(),
        };
        let target = crate::config::settings::test_support::settings_for(
            "https://s.example.com",
            "https://t.example.com",
        )
        .target;

        let issue = transform_observation(&obs, &mapping, &target);

        assert_eq!(issue.title, ": Untagged finding");
        assert!(issue.assigned_to.is_none());
        assert!(issue.custom_attributes.is_empty());
    }
}
