use crate::domain::model::{RequestDescriptor, ResultTree};
use crate::utils::error::{MigrateError, Result};

/// 相依請求的展開規則:從先前批次的某個結果集取出每筆記錄的 id,
/// 套進 URL 模板產生第二批描述符
#[derive(Debug, Clone)]
pub struct ExpansionRule {
    /// 來源結果在 ResultTree 的位置
    pub source_category: String,
    pub source_name: String,
    /// 展開後的描述符名稱前綴:`<prefix>_<id>`
    pub name_prefix: String,
    /// 展開後描述符的 subcategory(供後續 join 用)
    pub subcategory: String,
    /// 必須包含 `{id}` 佔位符
    pub url_template: String,
}

impl ExpansionRule {
    pub fn new(
        source_category: &str,
        source_name: &str,
        name_prefix: &str,
        subcategory: &str,
        url_template: &str,
    ) -> Result<Self> {
        if !url_template.contains("{id}") {
            return Err(MigrateError::data_shape(format!(
                "Expansion template for '{}' is missing the {{id}} placeholder: {}",
                name_prefix, url_template
            )));
        }
        Ok(Self {
            source_category: source_category.to_string(),
            source_name: source_name.to_string(),
            name_prefix: name_prefix.to_string(),
            subcategory: subcategory.to_string(),
            url_template: url_template.to_string(),
        })
    }
}

/// 純函式:不發請求,只產生描述符。沒有 id 的記錄直接略過並警告,
/// 不讓單筆髒資料毀掉整批展開
pub fn expand(tree: &ResultTree, rules: &[ExpansionRule]) -> Vec<RequestDescriptor> {
    let mut descriptors = Vec::new();

    for rule in rules {
        let records = tree.records(&rule.source_category, &rule.source_name);
        if records.is_empty() {
            tracing::warn!(
                "No records under {}/{} to expand for '{}'",
                rule.source_category,
                rule.source_name,
                rule.name_prefix
            );
            continue;
        }

        for record in records {
            let Some(id) = record_id(record) else {
                tracing::warn!(
                    "Record under {}/{} has no usable id, skipping",
                    rule.source_category,
                    rule.source_name
                );
                continue;
            };

            let name = format!("{}_{}", rule.name_prefix, id);
            let url = rule.url_template.replace("{id}", &id);
            descriptors.push(
                RequestDescriptor::new(&name, "dependent", url)
                    .with_subcategory(&rule.subcategory),
            );
        }
    }

    descriptors
}

fn record_id(record: &serde_json::Value) -> Option<String> {
    match record.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
