//! Funnel Express: conversion-funnel health analysis and demo data.
//!
//! Every command writes JSON (or plain text for `--summary`, `--prompt` and
//! `template`) to stdout; logs go to stderr.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use funnel_core::config::AppConfig;
use funnel_core::{
    AnalysisResult, BenchmarkComparison, FunnelData, ImpactAnalysis, SourceBreakdown,
};
use funnel_insights::{
    build_context, executive_summary, InsightEngine, Insights, OptimizationPlan,
};
use funnel_reporting::{csv_template, read_funnel_csv, FunnelAnalyzer};
use funnel_simulation::DataGenerator;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "funnel-express")]
#[command(about = "Conversion-funnel health analysis and synthetic funnel data")]
#[command(version)]
struct Cli {
    /// Config file (TOML, YAML or JSON); FUNNEL_EXPRESS__* variables override it
    #[arg(long, global = true, env = "FUNNEL_EXPRESS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze stage counts from a CSV file or the command line
    Analyze(AnalyzeArgs),
    /// Generate a synthetic funnel and analyze it
    Generate(GenerateArgs),
    /// Generate a daily funnel series in long format
    History {
        #[arg(long, default_value_t = 30)]
        days: u32,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate a synthetic funnel and split it across traffic sources
    Breakdown(SourceArgs),
    /// Print the `Stage,Count` CSV template
    Template,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// CSV file with `Stage` and `Count` columns
    #[arg(long, conflicts_with = "stage", required_unless_present = "stage")]
    csv: Option<PathBuf>,

    /// Stage count as NAME=COUNT, repeated in funnel order
    #[arg(long = "stage", value_parser = parse_stage)]
    stage: Vec<(String, u64)>,

    /// Drop-off threshold percentage (overrides config)
    #[arg(long)]
    threshold: Option<f64>,

    /// Print the executive summary instead of JSON
    #[arg(long, conflicts_with = "prompt")]
    summary: bool,

    /// Print the insight-service context instead of JSON
    #[arg(long)]
    prompt: bool,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Reporting window, e.g. "Last 7 Days" (overrides config)
    #[arg(long)]
    period: Option<String>,

    /// Traffic source label, repeatable (overrides config)
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Seed for reproducible output (overrides config)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Drop-off threshold percentage (overrides config)
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Serialize)]
struct FunnelReport<'a> {
    funnel: &'a FunnelData,
    analysis: &'a AnalysisResult,
    impact: ImpactAnalysis,
    benchmarks: BenchmarkComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    insights: Option<Insights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<OptimizationPlan>,
}

#[derive(Serialize)]
struct BreakdownReport {
    funnel: FunnelData,
    breakdown: SourceBreakdown,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "funnel_express=info,funnel_reporting=info,funnel_simulation=info,funnel_insights=info"
                    .into()
            }),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_none() => {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }
        Err(e) => return Err(e).context("failed to load config file"),
    };

    match cli.command {
        Command::Analyze(args) => analyze(&config, args),
        Command::Generate(args) => generate(&config, args),
        Command::History { days, seed } => {
            let mut generator = data_generator(seed.or(config.generator.seed));
            let records = generator.generate_historical_data(days)?;
            print_json(&records)
        }
        Command::Breakdown(args) => breakdown(&config, args),
        Command::Template => {
            print!("{}", csv_template());
            Ok(())
        }
    }
}

fn analyze(config: &AppConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let funnel = match &args.csv {
        Some(path) => read_funnel_csv(path)
            .with_context(|| format!("failed to read funnel CSV {}", path.display()))?,
        None => FunnelData::from_pairs(args.stage)?,
    };
    let threshold = resolve_threshold(config, args.threshold);

    let analyzer = FunnelAnalyzer::new();
    let analysis = analyzer.analyze_funnel(&funnel, threshold)?;

    if args.prompt {
        println!("{}", build_context(&analysis, &funnel)?);
        return Ok(());
    }

    let insights = insight_engine(config).generate_insights(&analysis, &funnel);
    if args.summary {
        println!("{}", executive_summary(&analysis, insights.as_ref()));
        return Ok(());
    }

    print_json(&funnel_report(&analyzer, &funnel, &analysis, insights))
}

fn generate(config: &AppConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let (period, sources, seed) = resolve_sources(config, args.source);
    let threshold = resolve_threshold(config, args.threshold);

    let funnel: FunnelData = data_generator(seed)
        .generate_funnel_data(&period, &sources)
        .into();

    let analyzer = FunnelAnalyzer::new();
    let analysis = analyzer.analyze_funnel(&funnel, threshold)?;
    print_json(&funnel_report(&analyzer, &funnel, &analysis, None))
}

fn breakdown(config: &AppConfig, args: SourceArgs) -> anyhow::Result<()> {
    let (period, sources, seed) = resolve_sources(config, args);
    let mut generator = data_generator(seed);

    let funnel: FunnelData = generator.generate_funnel_data(&period, &sources).into();
    let breakdown = generator.generate_traffic_source_breakdown(&funnel, &sources);
    print_json(&BreakdownReport { funnel, breakdown })
}

/// The CLI ships no insight provider, so configured credentials only matter
/// to library callers that attach one.
fn insight_engine(config: &AppConfig) -> InsightEngine {
    if config.insights.is_active() {
        debug!(
            model = %config.insights.model,
            "Insights enabled in config but no provider is attached, skipping"
        );
    }
    InsightEngine::disabled(config.insights.clone())
}

fn funnel_report<'a>(
    analyzer: &FunnelAnalyzer,
    funnel: &'a FunnelData,
    analysis: &'a AnalysisResult,
    insights: Option<Insights>,
) -> FunnelReport<'a> {
    if !funnel.has_standard_stages() {
        info!("Funnel lacks Visitor/Lead/MQL/SQL stages, benchmark comparison will be partial");
    }
    FunnelReport {
        funnel,
        analysis,
        impact: analyzer.calculate_potential_impact(analysis),
        benchmarks: analyzer.get_benchmark_comparison(analysis),
        plan: insights.as_ref().map(OptimizationPlan::from_insights),
        insights,
    }
}

fn resolve_threshold(config: &AppConfig, cli_threshold: Option<f64>) -> f64 {
    let threshold = cli_threshold.unwrap_or(config.analysis.default_threshold);
    if !config.analysis.in_recommended_band(threshold) {
        warn!(
            threshold,
            min = config.analysis.min_threshold,
            max = config.analysis.max_threshold,
            "Threshold outside the recommended band"
        );
    }
    threshold
}

fn resolve_sources(config: &AppConfig, args: SourceArgs) -> (String, Vec<String>, Option<u64>) {
    let period = args
        .period
        .unwrap_or_else(|| config.generator.time_period.clone());
    let sources = if args.sources.is_empty() {
        config.generator.traffic_sources.clone()
    } else {
        args.sources
    };
    let seed = args.seed.or(config.generator.seed);
    info!(period = %period, sources = ?sources, seed = ?seed, "Generator settings");
    (period, sources, seed)
}

fn data_generator(seed: Option<u64>) -> DataGenerator<Box<dyn RngCore>> {
    let rng: Box<dyn RngCore> = match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(rand::thread_rng()),
    };
    DataGenerator::with_rng(rng)
}

fn parse_stage(raw: &str) -> Result<(String, u64), String> {
    let (name, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=COUNT, got '{raw}'"))?;
    let count = count
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("count for '{}' must be a non-negative integer", name.trim()))?;
    Ok((name.trim().to_string(), count))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
