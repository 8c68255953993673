//! Funnel analysis: conversion and drop-off per stage, problematic-stage
//! flags and impact-if-fixed projections.

use funnel_core::{
    AnalysisResult, BenchmarkComparison, BenchmarkEntry, FunnelData, FunnelError, FunnelResult,
    ImpactAnalysis, Performance, StageImpact, StageMetric, StageStatus,
};
use tracing::{debug, info};

/// Typical B2B SaaS conversion rates (percent) keyed by transition label.
pub const BENCHMARKS: [(&str, f64); 4] = [
    ("Visitor to Lead", 2.0),
    ("Lead to MQL", 50.0),
    ("MQL to SQL", 40.0),
    ("Overall", 0.4),
];

const OVERALL: &str = "Overall";

/// Stateless analyzer: the same input always yields the same result.
#[derive(Debug, Clone)]
pub struct FunnelAnalyzer;

impl FunnelAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Compute per-stage metrics and flag stages whose drop-off strictly
    /// exceeds `threshold`.
    ///
    /// A stage whose predecessor has a zero count converts at 0% (100%
    /// drop-off); a zero baseline gives an overall conversion of 0%.
    pub fn analyze_funnel(
        &self,
        funnel_data: &FunnelData,
        threshold: f64,
    ) -> FunnelResult<AnalysisResult> {
        validate_threshold(threshold)?;
        let stages = funnel_data.stages();
        if stages.is_empty() {
            return Err(FunnelError::invalid_input("funnel data has no stages"));
        }

        let mut stage_metrics = Vec::with_capacity(stages.len());
        let mut problematic_stages = Vec::new();
        let mut biggest_drop: Option<(usize, f64)> = None;

        for (i, stage) in stages.iter().enumerate() {
            let (conversion_rate, drop_off) = if i == 0 {
                (100.0, 0.0)
            } else {
                let previous = stages[i - 1].count;
                let conversion = percentage(stage.count, previous).unwrap_or_else(|| {
                    debug!(stage = %stage.name, "Predecessor stage is empty, treating as 0% conversion");
                    0.0
                });
                (conversion, 100.0 - conversion)
            };

            let flagged = i > 0 && drop_off > threshold;
            if flagged {
                problematic_stages.push(stage.name.clone());
            }
            if i > 0 && drop_off > biggest_drop.map_or(0.0, |(_, value)| value) {
                biggest_drop = Some((i, drop_off));
            }

            // Reported drop-off is derived from the rounded rate so the pair
            // always sums to 100.
            let conversion_rate = round1(conversion_rate);
            stage_metrics.push(StageMetric {
                stage: stage.name.clone(),
                count: stage.count,
                conversion_rate,
                drop_off: round1(100.0 - conversion_rate),
                status: if flagged {
                    StageStatus::NeedsAttention
                } else {
                    StageStatus::Healthy
                },
            });
        }

        let overall_conversion =
            percentage(funnel_data.last_count(), funnel_data.first_count()).unwrap_or(0.0);

        let (biggest_drop_stage, biggest_drop_value) = match biggest_drop {
            Some((i, value)) => (Some(stages[i].name.clone()), value),
            None => (None, 0.0),
        };

        info!(
            stages = stages.len(),
            threshold,
            problematic = problematic_stages.len(),
            overall_conversion,
            "Funnel analyzed"
        );

        Ok(AnalysisResult {
            stage_metrics,
            problematic_stages,
            overall_conversion,
            biggest_drop_stage,
            biggest_drop_value,
            threshold_used: threshold,
            total_visitors: funnel_data.first_count(),
            final_conversions: funnel_data.last_count(),
        })
    }

    /// Project each problematic stage's count as if its drop-off sat exactly
    /// at the threshold: `previous × (100 − threshold) / 100`, truncated.
    pub fn calculate_potential_impact(&self, analysis: &AnalysisResult) -> ImpactAnalysis {
        let improved_conversion = (100.0 - analysis.threshold_used) / 100.0;
        let metrics = &analysis.stage_metrics;

        let stages = metrics
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, metric)| analysis.is_problematic(&metric.stage))
            .map(|(i, metric)| {
                let previous = metrics[i - 1].count;
                let potential_count = (previous as f64 * improved_conversion) as u64;
                let potential_increase = potential_count as i64 - metric.count as i64;
                let improvement_percentage = if metric.count > 0 {
                    potential_increase as f64 / metric.count as f64 * 100.0
                } else {
                    0.0
                };
                StageImpact {
                    stage: metric.stage.clone(),
                    current_count: metric.count,
                    potential_count,
                    potential_increase,
                    improvement_percentage,
                }
            })
            .collect();

        ImpactAnalysis { stages }
    }

    /// Compare adjacent-stage conversion rates and the overall conversion with
    /// [`BENCHMARKS`]. Transitions absent from the table are skipped; matching
    /// a benchmark exactly counts as below it.
    pub fn get_benchmark_comparison(&self, analysis: &AnalysisResult) -> BenchmarkComparison {
        let transitions = analysis.stage_metrics.windows(2).map(|pair| {
            (
                format!("{} to {}", pair[0].stage, pair[1].stage),
                pair[1].conversion_rate,
            )
        });

        let entries = transitions
            .chain(std::iter::once((
                OVERALL.to_string(),
                analysis.overall_conversion,
            )))
            .filter_map(|(transition, actual)| {
                let benchmark = benchmark_for(&transition)?;
                Some(BenchmarkEntry {
                    performance: if actual > benchmark {
                        Performance::Above
                    } else {
                        Performance::Below
                    },
                    difference: actual - benchmark,
                    transition,
                    actual,
                    benchmark,
                })
            })
            .collect();

        BenchmarkComparison { entries }
    }
}

impl Default for FunnelAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Thresholds are percentages; anything outside `[0, 100]` is rejected.
pub fn validate_threshold(threshold: f64) -> FunnelResult<()> {
    if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
        return Err(FunnelError::InvalidInput(format!(
            "threshold must be a percentage between 0 and 100, got {threshold}"
        )));
    }
    Ok(())
}

fn benchmark_for(transition: &str) -> Option<f64> {
    BENCHMARKS
        .iter()
        .find(|(label, _)| *label == transition)
        .map(|(_, rate)| *rate)
}

/// `100 × part / whole`, or `None` when `whole` is zero.
fn percentage(part: u64, whole: u64) -> Option<f64> {
    (whole > 0).then(|| part as f64 * 100.0 / whole as f64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
