//! End-to-end: synthetic data → analysis → projections → insight context.

use chrono::NaiveDate;
use funnel_core::config::InsightsConfig;
use funnel_core::{FunnelData, Performance, Stage, StageStatus};
use funnel_insights::{build_context, executive_summary, InsightEngine, OptimizationPlan};
use funnel_reporting::{parse_funnel_csv, FunnelAnalyzer};
use funnel_simulation::DataGenerator;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_generated_funnel_analyzes_cleanly() {
    let analyzer = FunnelAnalyzer::new();
    let mut generator = DataGenerator::seeded(2024);

    for _ in 0..20 {
        let funnel: FunnelData = generator
            .generate_funnel_data("Last 90 Days", &["Google Ads", "Organic"])
            .into();
        assert!(funnel.has_standard_stages());

        let analysis = analyzer.analyze_funnel(&funnel, 35.0).unwrap();
        assert_eq!(analysis.stage_metrics.len(), 4);
        assert_eq!(analysis.stage_metrics[0].conversion_rate, 100.0);
        assert_eq!(analysis.total_visitors, funnel.first_count());

        // Visitor → Lead converts at no more than 3.5%, far past the threshold.
        assert_eq!(analysis.stage_metrics[1].status, StageStatus::NeedsAttention);
        assert!(analysis.is_problematic("Lead"));

        let impact = analyzer.calculate_potential_impact(&analysis);
        let lead = impact.get("Lead").unwrap();
        assert!(lead.potential_count > lead.current_count);
        assert!(impact.total_potential_increase() > 0);

        let benchmarks = analyzer.get_benchmark_comparison(&analysis);
        assert_eq!(benchmarks.len(), 4);
        assert!(benchmarks.get("Overall").is_some());
    }
}

#[test]
fn test_csv_round_trip_through_analysis() {
    let csv = "Stage,Count\nVisitor,10000\nLead,250\nMQL,120\nSQL,80\n";
    let funnel = parse_funnel_csv(csv.as_bytes()).unwrap();
    let analysis = FunnelAnalyzer::new().analyze_funnel(&funnel, 35.0).unwrap();

    assert_eq!(analysis.problematic_stages, vec!["Lead", "MQL"]);
    assert_eq!(analysis.biggest_drop_stage.as_deref(), Some("Lead"));
    assert!((analysis.overall_conversion - 0.8).abs() < 1e-9);

    let benchmarks = FunnelAnalyzer::new().get_benchmark_comparison(&analysis);
    let visitor_to_lead = benchmarks.get("Visitor to Lead").unwrap();
    assert_eq!(visitor_to_lead.actual, 2.5);
    assert_eq!(visitor_to_lead.performance, Performance::Above);
    let lead_to_mql = benchmarks.get("Lead to MQL").unwrap();
    assert_eq!(lead_to_mql.performance, Performance::Below);
}

#[test]
fn test_insights_degrade_without_provider() {
    let funnel = FunnelData::from_pairs([("Visitor", 5000), ("Lead", 100), ("MQL", 40)]).unwrap();
    let analysis = FunnelAnalyzer::new().analyze_funnel(&funnel, 40.0).unwrap();

    let engine = InsightEngine::disabled(InsightsConfig::default());
    assert!(!engine.is_available());
    let insights = engine.generate_insights(&analysis, &funnel);
    assert!(insights.is_none());

    let context = build_context(&analysis, &funnel).unwrap();
    assert!(context.contains("- Drop-off Threshold Used: 40%"));
    assert!(context.contains("- Lead: Exceeds 40% drop-off threshold"));

    let summary = executive_summary(&analysis, insights.as_ref());
    assert!(summary.contains("• Total Visitors: 5,000"));
    assert!(!summary.contains("TOP RECOMMENDATIONS"));
}

#[test]
fn test_plan_from_parsed_reply() {
    let insights = funnel_insights::parse_insights(
        r#"{"summary": "s", "recommendations": ["Improve form UX", "Fix tracking ASAP"]}"#,
    )
    .unwrap();
    let plan = OptimizationPlan::from_insights(&insights);
    assert_eq!(plan.immediate_actions, vec!["Fix tracking ASAP"]);
    assert_eq!(plan.short_term_goals, vec!["Improve form UX"]);
}

#[test]
fn test_history_and_breakdown_feed_the_analyzer() {
    let mut generator = DataGenerator::with_rng(StdRng::seed_from_u64(77));
    let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    let records = generator.generate_historical_data_until(end, 7).unwrap();
    assert_eq!(records.len(), 28);

    let analyzer = FunnelAnalyzer::new();
    for day in records.chunks(4) {
        let funnel =
            FunnelData::from_pairs(day.iter().map(|r| (r.stage.as_str(), r.count))).unwrap();
        assert_eq!(day[0].stage, Stage::Visitor);
        analyzer.analyze_funnel(&funnel, 35.0).unwrap();
    }

    let overall: FunnelData = generator
        .generate_funnel_data("Last 30 Days", &["Direct"])
        .into();
    let breakdown = generator.generate_traffic_source_breakdown(&overall, &["Email", "Direct"]);
    let sources: Vec<&str> = breakdown.iter().map(|(source, _)| source).collect();
    assert_eq!(sources, vec!["Email", "Direct"]);
    for source_funnel in breakdown.values() {
        let analysis = analyzer.analyze_funnel(source_funnel, 35.0).unwrap();
        assert!(analysis.total_visitors <= overall.first_count());
    }
}
