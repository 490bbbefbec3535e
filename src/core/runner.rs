use reqwest::Client;
use std::time::Duration;

use crate::domain::model::{RequestDescriptor, RequestResult, RequestStatus};

const MAX_RETRIES: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// 一個批次執行完的結果。needs_token_refresh 為真表示呼叫端
/// 應先更新 token，再整批重跑（不支援逐筆續跑）
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<RequestResult>,
    pub needs_token_refresh: bool,
}

/// 依序執行請求描述符。刻意不併發：避免壓垮有速率限制的
/// 第三方 API，也讓 401 能提早終止整個批次
pub struct SequentialRunner {
    client: Client,
    company_header: Option<(String, String)>,
    max_retries: u32,
    retry_delay: Duration,
}

impl SequentialRunner {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            company_header: None,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }

    /// 附帶租戶範圍標頭，例如 ("X-Company-Id", "4266122")
    pub fn with_company_header(mut self, name: &str, value: &str) -> Self {
        self.company_header = Some((name.to_string(), value.to_string()));
        self
    }

    /// 測試用：縮短重試延遲
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// 逐筆執行；出現 401 後其餘描述符一律記為 skipped。
    /// 可安全地在 refresh 後用同一批描述符重跑
    pub async fn run(&self, descriptors: &[RequestDescriptor], token: &str) -> BatchOutcome {
        let mut results = Vec::with_capacity(descriptors.len());
        let mut needs_token_refresh = false;

        for descriptor in descriptors {
            if needs_token_refresh {
                results.push(RequestResult::skipped(descriptor));
                continue;
            }

            let result = self.execute(descriptor, token).await;
            if result.status == RequestStatus::Unauthorized {
                needs_token_refresh = true;
            }
            results.push(result);
        }

        BatchOutcome {
            results,
            needs_token_refresh,
        }
    }

    /// 單一描述符：401 不重試；其他失敗最多再試 max_retries 次，
    /// 每次固定延遲
    async fn execute(&self, descriptor: &RequestDescriptor, token: &str) -> RequestResult {
        let mut attempt = 0u32;

        loop {
            tracing::debug!("Making request to: {}", descriptor.name);

            let mut request = self
                .client
                .get(&descriptor.url)
                .bearer_auth(token);
            if let Some((name, value)) = &self.company_header {
                request = request.header(name.as_str(), value.as_str());
            }

            let failure = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.json::<serde_json::Value>().await {
                            Ok(data) => {
                                tracing::info!(
                                    "{}: Success ({})",
                                    descriptor.name,
                                    status.as_u16()
                                );
                                return RequestResult::success(descriptor, data, status.as_u16());
                            }
                            Err(e) => (
                                RequestStatus::Failed(status.as_u16()),
                                format!("Invalid JSON response: {}", e),
                            ),
                        }
                    } else if status.as_u16() == 401 {
                        tracing::warn!("{}: Unauthorized (401)", descriptor.name);
                        return RequestResult::failure(
                            descriptor,
                            RequestStatus::Unauthorized,
                            format!("Request failed with status: {}", status),
                        );
                    } else {
                        (
                            RequestStatus::Failed(status.as_u16()),
                            format!("Request failed with status: {}", status),
                        )
                    }
                }
                Err(e) => (RequestStatus::Unreachable, e.to_string()),
            };

            let (status, error) = failure;
            if attempt < self.max_retries {
                attempt += 1;
                tracing::info!(
                    "Retrying {} (Attempt {} of {})",
                    descriptor.name,
                    attempt,
                    self.max_retries
                );
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            tracing::warn!("{}: Failed - {}", descriptor.name, error);
            return RequestResult::failure(descriptor, status, error);
        }
    }
}

impl Default for SequentialRunner {
    fn default() -> Self {
        Self::new()
    }
}
