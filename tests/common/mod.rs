use sitebridge::config::settings::{SourceSettings, TargetSettings};
use sitebridge::Settings;

/// 指向測試伺服器的完整配置
pub fn settings(source_base: &str, target_base: &str, results_dir: &str) -> Settings {
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
            issue_type_id: Some("type-1".to_string()),
            issue_subtype_id: Some("sub-1".to_string()),
        },
        results_dir: results_dir.to_string(),
        field_mapping_file: None,
    }
}

/// 預先寫好的有效憑證快取,讓測試不用走互動授權
pub async fn seed_tokens(results_dir: &std::path::Path, access_token: &str) {
    let cred = serde_json::json!({
        "accessToken": access_token,
        "refreshToken": "refresh-1",
        "expiresAt": "2999-01-01T00:00:00Z"
    });
    tokio::fs::create_dir_all(results_dir).await.unwrap();
    tokio::fs::write(
        results_dir.join("tokens.json"),
        serde_json::to_vec_pretty(&cred).unwrap(),
    )
    .await
    .unwrap();
}
