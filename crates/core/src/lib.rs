pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{FunnelError, FunnelResult};
pub use types::{
    AnalysisResult, BenchmarkComparison, BenchmarkEntry, FunnelData, FunnelStage,
    HistoricalRecord, ImpactAnalysis, Performance, SourceBreakdown, Stage, StageImpact, StageMetric,
    StageStatus, StandardFunnel,
};
