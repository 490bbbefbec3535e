use crate::utils::error::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 目標 API 的欄位值種類，對應 customValues 的 <kind>Val 鍵
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Toggle,
    Choice,
    Array,
}

#[derive(Debug, Clone, Deserialize)]
struct MappingFile {
    #[serde(default)]
    default_kind: FieldKind,
    #[serde(default)]
    field_types: HashMap<String, FieldKind>,
}

/// 來源欄位型別標籤 -> 目標欄位值種類的宣告式對照表。
/// 取代原本散落在各腳本內的硬編碼常數；比對不分大小寫，
/// 未知標籤一律退回泛用文字欄位
#[derive(Debug, Clone)]
pub struct FieldKindMap {
    default_kind: FieldKind,
    field_types: HashMap<String, FieldKind>,
}

impl Default for FieldKindMap {
    fn default() -> Self {
        let mut field_types = HashMap::new();
        for (label, kind) in [
            ("boolean", FieldKind::Toggle),
            ("yes/no", FieldKind::Toggle),
            ("multiple choice", FieldKind::Array),
            ("checkbox", FieldKind::Array),
            ("number", FieldKind::Number),
            ("single choice", FieldKind::Choice),
            ("dropdown", FieldKind::Choice),
            ("text", FieldKind::Text),
            ("free text", FieldKind::Text),
        ] {
            field_types.insert(label.to_string(), kind);
        }
        Self {
            default_kind: FieldKind::Text,
            field_types,
        }
    }
}

impl FieldKindMap {
    pub fn kind_for(&self, label: &str) -> FieldKind {
        self.field_types
            .get(label.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or(self.default_kind)
    }

    /// 從 TOML 檔案載入對照表
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MigrateError::Io)?;
        Self::from_str(&content)
    }

    /// 從 TOML 字串解析對照表
    pub fn from_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let file: MappingFile =
            toml::from_str(&processed_content).map_err(|e| MigrateError::InvalidConfigValue {
                field: "field_mapping".to_string(),
                value: "<toml>".to_string(),
                reason: format!("Mapping TOML parsing error: {}", e),
            })?;

        let field_types = file
            .field_types
            .into_iter()
            .map(|(label, kind)| (label.to_lowercase(), kind))
            .collect();

        Ok(Self {
            default_kind: file.default_kind,
            field_types,
        })
    }

    /// 替換 ${VAR} 形式的環境變數
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_covers_known_labels() {
        let map = FieldKindMap::default();
        assert_eq!(map.kind_for("boolean"), FieldKind::Toggle);
        assert_eq!(map.kind_for("Multiple Choice"), FieldKind::Array);
        assert_eq!(map.kind_for("number"), FieldKind::Number);
        assert_eq!(map.kind_for("single choice"), FieldKind::Choice);
    }

    #[test]
    fn test_unknown_label_falls_back_to_text() {
        let map = FieldKindMap::default();
        assert_eq!(map.kind_for("signature block"), FieldKind::Text);
        assert_eq!(map.kind_for(""), FieldKind::Text);
    }

    #[test]
    fn test_from_toml_string() {
        let map = FieldKindMap::from_str(
            r#"
default_kind = "text"

[field_types]
"boolean" = "toggle"
"Rating Scale" = "number"
"#,
        )
        .unwrap();
        assert_eq!(map.kind_for("boolean"), FieldKind::Toggle);
        assert_eq!(map.kind_for("rating scale"), FieldKind::Number);
        assert_eq!(map.kind_for("anything else"), FieldKind::Text);
    }

    #[test]
    fn test_env_substitution_keeps_unknown_placeholder() {
        let substituted =
            FieldKindMap::substitute_env_vars("default_kind = \"${SITEBRIDGE_NO_SUCH_VAR}\"")
                .unwrap();
        assert!(substituted.contains("${SITEBRIDGE_NO_SUCH_VAR}"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = FieldKindMap::from_str("field_types = 42").unwrap_err();
        assert!(matches!(
            err,
            MigrateError::InvalidConfigValue { .. }
        ));
    }
}
