//! Stakeholder-facing artifacts derived from an analysis and its insights.

use crate::context::format_thousands;
use crate::engine::Insights;
use funnel_core::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

const IMMEDIATE_KEYWORDS: [&str; 4] = ["immediately", "urgent", "asap", "critical"];
const SHORT_TERM_KEYWORDS: [&str; 4] = ["test", "optimize", "improve", "enhance"];

pub const KPIS_TO_TRACK: [&str; 5] = [
    "Conversion rate by stage",
    "Drop-off percentage",
    "Time to convert",
    "Cost per conversion",
    "Lead quality score",
];

/// Recommendations bucketed by urgency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPlan {
    pub immediate_actions: Vec<String>,
    pub short_term_goals: Vec<String>,
    pub long_term_strategy: Vec<String>,
    pub kpis_to_track: Vec<String>,
}

impl OptimizationPlan {
    /// Urgency keywords win over improvement keywords; everything else is
    /// long-term strategy. Matching is case-insensitive.
    pub fn from_insights(insights: &Insights) -> Self {
        let mut plan = Self {
            kpis_to_track: KPIS_TO_TRACK.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        };

        for rec in &insights.recommendations {
            let lower = rec.to_lowercase();
            let mentions = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));
            if mentions(&IMMEDIATE_KEYWORDS) {
                plan.immediate_actions.push(rec.clone());
            } else if mentions(&SHORT_TERM_KEYWORDS) {
                plan.short_term_goals.push(rec.clone());
            } else {
                plan.long_term_strategy.push(rec.clone());
            }
        }

        plan
    }
}

/// Overall health tier used in the executive summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelHealth {
    /// Overall conversion above 1%.
    Healthy,
    /// Above 0.5%.
    Moderate,
    Critical,
}

impl FunnelHealth {
    pub fn from_overall_conversion(overall_conversion: f64) -> Self {
        if overall_conversion > 1.0 {
            FunnelHealth::Healthy
        } else if overall_conversion > 0.5 {
            FunnelHealth::Moderate
        } else {
            FunnelHealth::Critical
        }
    }
}

impl fmt::Display for FunnelHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunnelHealth::Healthy => f.write_str("HEALTHY - Conversion rate above 1%"),
            FunnelHealth::Moderate => f.write_str("MODERATE - Conversion rate needs improvement"),
            FunnelHealth::Critical => f.write_str("CRITICAL - Conversion rate below 0.5%"),
        }
    }
}

/// Plain-text summary for stakeholders. Lists the top three recommendations
/// when insights are available.
pub fn executive_summary(analysis: &AnalysisResult, insights: Option<&Insights>) -> String {
    let mut summary = String::new();
    let _ = write!(
        summary,
        "\nFUNNEL PERFORMANCE EXECUTIVE SUMMARY\n\nOVERVIEW:\n\
         • Total Visitors: {}\n\
         • Final Conversions: {}\n\
         • Overall Conversion Rate: {:.1}%\n\
         • Issues Identified: {} problematic stages\n\n\
         PERFORMANCE STATUS:\n{}\n",
        format_thousands(analysis.total_visitors),
        format_thousands(analysis.final_conversions),
        analysis.overall_conversion,
        analysis.problematic_stages.len(),
        FunnelHealth::from_overall_conversion(analysis.overall_conversion),
    );

    if analysis.has_issues() {
        summary.push_str("\nCRITICAL ISSUES:\n");
        for stage in &analysis.problematic_stages {
            let _ = writeln!(summary, "• {stage} stage showing excessive drop-off");
        }
    }

    if let Some(insights) = insights.filter(|i| !i.recommendations.is_empty()) {
        summary.push_str("\nTOP RECOMMENDATIONS:\n");
        for (i, rec) in insights.recommendations.iter().take(3).enumerate() {
            let _ = writeln!(summary, "{}. {rec}", i + 1);
        }
    }

    summary.push_str(
        "\nNEXT STEPS:\n\
         • Review detailed analysis in dashboard\n\
         • Implement high-priority recommendations\n\
         • Monitor conversion rates daily\n\
         • Schedule weekly funnel review meetings\n",
    );
    summary
}
