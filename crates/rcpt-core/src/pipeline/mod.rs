//! Suggestion pipeline: request tokens, the provider decision table and
//! the orchestrator that ties extraction, parsing, quota and memory
//! together.

mod decision;
mod orchestrator;
mod status;
mod token;

pub use decision::{decide, reached_service, Blocker, CloudAvailability, Facts, Plan, Rule, Step, DECISION_TABLE};
pub use orchestrator::{Attempt, Pipeline, PipelineBuilder, PipelineResult, RunOutcome};
pub use status::{LogStatus, StatusSink};
pub use token::RequestTokens;
