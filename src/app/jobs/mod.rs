pub mod checklists;
pub mod daily_logs;
pub mod forms;
pub mod issues;
pub mod observations;

pub use checklists::FetchChecklistsJob;
pub use daily_logs::FetchDailyLogsJob;
pub use forms::CreateFormsJob;
pub use issues::CreateIssuesJob;
pub use observations::FetchObservationsJob;

use crate::adapters::LocalStorage;
use crate::config::Settings;
use crate::core::{FetchPipeline, SequentialRunner, TokenManager};
use crate::domain::model::{FetchSummary, ResultTree};
use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// 來源平台的 REST 路徑都掛在同一個版本前綴下
fn source_url(settings: &Settings, path: &str) -> String {
    format!("{}/rest/v1.0{}", settings.source.base_url, path)
}

fn storage(settings: &Settings) -> LocalStorage {
    LocalStorage::new(settings.results_dir.clone())
}

fn fetch_pipeline(settings: &Settings) -> FetchPipeline<LocalStorage> {
    let runner = SequentialRunner::new().with_company_header(
        &settings.source.company_header,
        &settings.source.company_id,
    );
    let tokens = TokenManager::new(settings.source.clone(), storage(settings));
    FetchPipeline::new(runner, tokens)
}

async fn write_json<T: serde::Serialize>(
    storage: &LocalStorage,
    filename: &str,
    data: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(data)?;
    storage.write_file(filename, &bytes).await?;
    tracing::info!("📁 Data saved to {}/{}", storage.base_path(), filename);
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(
    storage: &LocalStorage,
    filename: &str,
) -> Result<T> {
    let bytes = storage.read_file(filename).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// 選擇性快照:檔案不存在回 None,存在但解析失敗照樣是錯誤,
/// 壞掉的輸入不能被當成沒有輸入
async fn read_optional_json<T: serde::de::DeserializeOwned>(
    storage: &LocalStorage,
    filename: &str,
) -> Result<Option<T>> {
    match storage.read_file(filename).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(crate::utils::error::MigrateError::Io(e))
            if e.kind() == std::io::ErrorKind::NotFound =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// 擷取類工作共用的收尾:結果樹 + 摘要雙快照
async fn snapshot_tree(
    storage: &LocalStorage,
    tree: &ResultTree,
    data_file: &str,
    summary_file: &str,
) -> Result<()> {
    write_json(storage, data_file, tree).await?;
    write_json(storage, summary_file, &FetchSummary::from_tree(tree)).await?;
    Ok(())
}
