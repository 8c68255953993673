//! Narrative insights for funnel analyses.
//!
//! The text-generation service itself is external: callers plug it in through
//! [`InsightProvider`]. This crate owns the prompt context, the expected
//! response shape, and what to do when the service is missing or misbehaves
//! (return no insights, never fail the analysis).

pub mod context;
pub mod engine;
pub mod plan;
pub mod provider;

pub use context::build_context;
pub use engine::{parse_insights, InsightDetails, InsightEngine, Insights};
pub use plan::{executive_summary, FunnelHealth, OptimizationPlan};
pub use provider::{CompletionRequest, InsightProvider, SYSTEM_PROMPT};
