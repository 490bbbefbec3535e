pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::LocalStorage;
pub use app::jobs::{
    CreateFormsJob, CreateIssuesJob, FetchChecklistsJob, FetchDailyLogsJob, FetchObservationsJob,
};
pub use config::Settings;
pub use core::{FetchPipeline, FormSubmitter, IssueSubmitter, SequentialRunner, TokenManager};
pub use domain::ports::Job;
pub use utils::error::{MigrateError, Result};
