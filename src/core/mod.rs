pub mod expand;
pub mod fetch;
pub mod runner;
pub mod submit;
pub mod token;
pub mod transform;

pub use expand::{expand, ExpansionRule};
pub use fetch::{FetchPipeline, FetchState};
pub use runner::{BatchOutcome, SequentialRunner};
pub use submit::{FormSubmitter, IssueSubmitter};
pub use token::TokenManager;
pub use transform::UserMapping;
