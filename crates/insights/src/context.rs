//! Text context describing a funnel analysis, sent to the insight service.

use funnel_core::{AnalysisResult, FunnelData, FunnelResult};
use std::fmt::Write;

const CLOSING: &str = "Please provide specific, actionable recommendations for improving conversion rates and reducing drop-offs.";

/// Render the raw stage counts and the computed analysis as a prompt body.
pub fn build_context(analysis: &AnalysisResult, funnel: &FunnelData) -> FunnelResult<String> {
    let raw = serde_json::to_string_pretty(funnel)?;
    let threshold = analysis.threshold_used;

    let mut context = String::new();
    let _ = write!(
        context,
        "\nFUNNEL PERFORMANCE ANALYSIS\n\nRaw Data:\n{raw}\n\nAnalysis Results:\n\
         - Overall Conversion Rate: {:.1}%\n\
         - Total Visitors: {}\n\
         - Final Conversions: {}\n\
         - Drop-off Threshold Used: {threshold}%\n\
         - Problematic Stages: {}\n\n\
         Stage-by-Stage Performance:\n",
        analysis.overall_conversion,
        format_thousands(analysis.total_visitors),
        format_thousands(analysis.final_conversions),
        analysis.problematic_stages.len(),
    );

    for metric in &analysis.stage_metrics {
        let _ = writeln!(
            context,
            "- {}: {} visitors, {:.1}% conversion, {:.1}% drop-off",
            metric.stage,
            format_thousands(metric.count),
            metric.conversion_rate,
            metric.drop_off,
        );
    }

    if analysis.has_issues() {
        context.push_str("\nProblematic Stages Identified:\n");
        for stage in &analysis.problematic_stages {
            let _ = writeln!(context, "- {stage}: Exceeds {threshold}% drop-off threshold");
        }
    }

    if let Some(stage) = &analysis.biggest_drop_stage {
        let _ = writeln!(
            context,
            "\nBiggest Drop-off: {stage} ({:.1}%)",
            analysis.biggest_drop_value
        );
    }

    context.push('\n');
    context.push_str(CLOSING);
    Ok(context)
}

/// `1234567` → `"1,234,567"`.
pub(crate) fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
