use crate::utils::error::Result;
use crate::utils::validation::{
    env_or, require_env, validate_non_empty_string, validate_url, Validate,
};

/// 來源平台（讀取端）設定
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub base_url: String,
    pub company_id: String,
    /// 租戶範圍標頭的名稱，例如 "X-Company-Id"
    pub company_header: String,
    pub project_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: String,
    /// 環境提供的既有 access token，沒有快取時的後備
    pub access_token: Option<String>,
}

impl SourceSettings {
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth/authorize", self.base_url)
    }
}

/// 目標平台（寫入端）設定
#[derive(Debug, Clone)]
pub struct TargetSettings {
    pub base_url: String,
    pub project_id: String,
    pub auth_token: String,
    /// 身份對應缺漏時的預設指派人
    pub default_assignee_id: String,
    pub daily_log_template: String,
    pub issue_status: String,
    pub issue_type_id: Option<String>,
    pub issue_subtype_id: Option<String>,
}

/// 行程啟動時建構一次的完整配置，取代原本散落各腳本的
/// 模組層級環境變數常數
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: SourceSettings,
    pub target: TargetSettings,
    pub results_dir: String,
    pub field_mapping_file: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let source = SourceSettings {
            base_url: require_env("SOURCE_BASE_URL")?,
            company_id: require_env("SOURCE_COMPANY_ID")?,
            company_header: env_or("SOURCE_COMPANY_HEADER", "X-Company-Id"),
            project_id: require_env("SOURCE_PROJECT_ID")?,
            client_id: require_env("SOURCE_CLIENT_ID")?,
            client_secret: require_env("SOURCE_CLIENT_SECRET")?,
            redirect_uri: env_or("SOURCE_REDIRECT_URI", "http://localhost:3000/auth/callback"),
            scopes: env_or(
                "SOURCE_SCOPES",
                "data:read data:write data:create account:read account:write",
            ),
            access_token: std::env::var("SOURCE_ACCESS_TOKEN").ok(),
        };

        let target = TargetSettings {
            base_url: require_env("TARGET_BASE_URL")?,
            project_id: require_env("TARGET_PROJECT_ID")?,
            auth_token: require_env("TARGET_AUTH_TOKEN")?,
            default_assignee_id: require_env("TARGET_DEFAULT_ASSIGNEE_ID")?,
            daily_log_template: env_or("TARGET_DAILY_LOG_TEMPLATE", "Daily Logs"),
            issue_status: env_or("TARGET_ISSUE_STATUS", "open"),
            issue_type_id: std::env::var("TARGET_ISSUE_TYPE_ID").ok(),
            issue_subtype_id: std::env::var("TARGET_ISSUE_SUBTYPE_ID").ok(),
        };

        Ok(Self {
            source,
            target,
            results_dir: env_or("RESULTS_DIR", "./results/generated"),
            field_mapping_file: std::env::var("FIELD_MAPPING_FILE").ok(),
        })
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("SOURCE_BASE_URL", &self.source.base_url)?;
        validate_url("SOURCE_REDIRECT_URI", &self.source.redirect_uri)?;
        validate_url("TARGET_BASE_URL", &self.target.base_url)?;
        validate_non_empty_string("SOURCE_COMPANY_ID", &self.source.company_id)?;
        validate_non_empty_string("SOURCE_PROJECT_ID", &self.source.project_id)?;
        validate_non_empty_string("TARGET_PROJECT_ID", &self.target.project_id)?;
        validate_non_empty_string(
            "TARGET_DEFAULT_ASSIGNEE_ID",
            &self.target.default_assignee_id,
        )?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// 測試用設定，指向 mock server
    pub fn settings_for(source_base: &str, target_base: &str) -> Settings {
        Settings {
            source: SourceSettings {
                base_url: source_base.trim_end_matches('/').to_string(),
                company_id: "4266122".to_string(),
                company_header: "X-Company-Id".to_string(),
                project_id: "121313".to_string(),
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                redirect_uri: "http://localhost:3000/auth/callback".to_string(),
                scopes: "data:read data:write".to_string(),
                access_token: None,
            },
            target: TargetSettings {
                base_url: target_base.trim_end_matches('/').to_string(),
                project_id: "proj-1".to_string(),
                auth_token: "target-token".to_string(),
                default_assignee_id: "PUJXLNP3U8TM".to_string(),
                daily_log_template: "Daily Logs".to_string(),
                issue_status: "open".to_string(),
                issue_type_id: Some("64d1071e-e071-498c-a9f1-2af27f7b206f".to_string()),
                issue_subtype_id: Some("c4965ffe-3812-4f0f-b41a-4a94dbdab1bb".to_string()),
            },
            results_dir: "./results/generated".to_string(),
            field_mapping_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::settings_for;
    use super::*;

    #[test]
    fn test_valid_settings_pass_validation() {
        let settings = settings_for("https://source.example.com", "https://target.example.com");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_base_url_fails_validation() {
        let mut settings = settings_for("https://source.example.com", "https://target.example.com");
        settings.target.base_url = "not a url".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_project_id_fails_validation() {
        let mut settings = settings_for("https://source.example.com", "https://target.example.com");
        settings.source.project_id = " ".to_string();
        assert!(settings.validate().is_err());
    }
}
