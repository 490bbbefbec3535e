use clap::{Parser, Subcommand};
use sitebridge::domain::ports::Job;
use sitebridge::utils::{logger, validation::Validate};
use sitebridge::{
    CreateFormsJob, CreateIssuesJob, FetchChecklistsJob, FetchDailyLogsJob, FetchObservationsJob,
    LocalStorage, Settings, TokenManager,
};

#[derive(Debug, Parser)]
#[command(name = "sitebridge", about = "Migrates construction project data between PM platforms")]
struct Cli {
    /// 輸出更囉唆的日誌
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 取得來源平台的 OAuth token 並快取
    Login {
        /// 走 client_credentials,不開互動授權
        #[arg(long)]
        two_legged: bool,
    },
    /// 抓檢查表並轉成待建立的表單
    FetchChecklists,
    /// 抓日誌並轉成目標日報
    FetchDailyLogs,
    /// 抓觀察項
    FetchObservations,
    /// 把轉換後的表單提交到目標平台
    CreateForms,
    /// 把觀察項轉成議題提交到目標平台
    CreateIssues,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting sitebridge");

    // 驗證配置
    let settings = match Settings::from_env().and_then(|s| {
        s.validate()?;
        Ok(s)
    }) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let job: Box<dyn Job> = match cli.command {
        Command::Login { two_legged } => {
            let storage = LocalStorage::new(settings.results_dir.clone());
            let tokens = TokenManager::new(settings.source.clone(), storage);
            let result = if two_legged {
                tokens.client_credentials().await
            } else {
                tokens.interactive_flow().await
            };
            match result {
                Ok(_) => {
                    println!("✅ Login successful, tokens cached");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!("❌ Login failed: {}", e);
                    eprintln!("❌ {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::FetchChecklists => Box::new(FetchChecklistsJob::new(settings)),
        Command::FetchDailyLogs => Box::new(FetchDailyLogsJob::new(settings)),
        Command::FetchObservations => Box::new(FetchObservationsJob::new(settings)),
        Command::CreateForms => Box::new(CreateFormsJob::new(settings)),
        Command::CreateIssues => Box::new(CreateIssuesJob::new(settings)),
    };

    tracing::info!("Running job: {}", job.name());
    match job.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Job {} completed successfully!", job.name());
            println!("✅ Job {} completed successfully!", job.name());
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!("❌ Job {} failed: {}", job.name(), e);
            eprintln!("❌ {}", e);
            std::process::exit(if e.is_fatal() { 1 } else { 2 });
        }
    }

    Ok(())
}
