//! Campaign orchestration: sequences channel batches with configurable
//! pacing, tolerating partial failure of any channel or recipient.

pub mod advisor;
pub mod engine;

pub use advisor::{ChannelPlan, HeuristicAdvisor, NoopAdvisor, StrategyAdvisor};
pub use engine::{OrchestrationRequest, Orchestrator};
