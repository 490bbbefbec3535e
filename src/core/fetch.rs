use crate::core::expand::{expand, ExpansionRule};
use crate::core::runner::SequentialRunner;
use crate::core::token::TokenManager;
use crate::domain::model::{
    Credential, FetchSummary, RequestDescriptor, RequestResult, ResultTree,
};
use crate::domain::ports::Storage;
use crate::utils::error::{MigrateError, Result};

/// 抓取流程的明確狀態。401 後的處置不再靠遞迴重新進入整個流程,
/// 而是走 NeedsRefresh → Refreshing → Retrying 一輪
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Running,
    NeedsRefresh,
    Refreshing,
    Retrying,
    Done,
    Failed,
}

/// 主批次 + 相依批次的抓取協調器。每個批次最多允許一輪
/// refresh 後重跑;refresh 成功後仍整批 401 視為授權失敗
pub struct FetchPipeline<S: Storage> {
    runner: SequentialRunner,
    tokens: TokenManager<S>,
    state: FetchState,
}

impl<S: Storage> FetchPipeline<S> {
    pub fn new(runner: SequentialRunner, tokens: TokenManager<S>) -> Self {
        Self {
            runner,
            tokens,
            state: FetchState::Idle,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// 執行主批次,依規則展開相依批次,回傳合併後的結果樹。
    /// 只有設定/授權問題會讓整個 run 失敗;個別端點失敗留在樹裡
    pub async fn run(
        &mut self,
        endpoints: &[RequestDescriptor],
        rules: &[ExpansionRule],
    ) -> Result<ResultTree> {
        let mut cred = self.tokens.get_token().await?;
        self.state = FetchState::Running;
        tracing::info!("🚀 Starting fetch: {} endpoint(s)", endpoints.len());

        let mut tree = ResultTree::new();
        let primary = self.run_batch(endpoints, &mut cred).await?;
        tree.extend(primary)?;

        if !rules.is_empty() {
            let dependents = expand(&tree, rules);
            if !dependents.is_empty() {
                tracing::info!("Fetching {} dependent request(s)", dependents.len());
                let results = self.run_batch(&dependents, &mut cred).await?;
                tree.extend(results)?;
            }
        }

        self.state = FetchState::Done;
        log_summary(&tree);
        Ok(tree)
    }

    async fn run_batch(
        &mut self,
        descriptors: &[RequestDescriptor],
        cred: &mut Credential,
    ) -> Result<Vec<RequestResult>> {
        let outcome = self.runner.run(descriptors, &cred.access_token).await;
        if !outcome.needs_token_refresh {
            return Ok(outcome.results);
        }

        self.state = FetchState::NeedsRefresh;
        tracing::warn!("🔑 Token rejected, refreshing and re-running the batch");

        self.state = FetchState::Refreshing;
        *cred = match self.renew(cred).await {
            Ok(cred) => cred,
            Err(e) => {
                self.state = FetchState::Failed;
                return Err(e);
            }
        };

        self.state = FetchState::Retrying;
        let retry = self.runner.run(descriptors, &cred.access_token).await;
        if retry.needs_token_refresh {
            self.state = FetchState::Failed;
            return Err(MigrateError::auth(
                "Requests still unauthorized after a successful token refresh",
            ));
        }

        self.state = FetchState::Running;
        Ok(retry.results)
    }

    /// 有 refresh token 就走 refresh,否則重新跑 client_credentials
    async fn renew(&self, cred: &Credential) -> Result<Credential> {
        if cred.refresh_token.is_some() {
            self.tokens.refresh(cred).await
        } else {
            self.tokens.client_credentials().await
        }
    }
}

fn log_summary(tree: &ResultTree) {
    let summary = FetchSummary::from_tree(tree);
    for (category, stats) in &summary.categories {
        tracing::info!(
            "📋 {}: {}/{} succeeded",
            category,
            stats.successful,
            stats.endpoints
        );
    }
    tracing::info!(
        "✅ Fetch complete: {}/{} endpoints succeeded",
        summary.successful_endpoints,
        summary.total_endpoints
    );
}
