//! Demo data generator for the fixed Visitor → Lead → MQL → SQL funnel.
//!
//! All draws come from the generator's own random source, so two generators
//! built with [`DataGenerator::seeded`] and the same seed produce identical
//! output. [`DataGenerator::new`] uses the thread-local source.
//!
//! Unknown time-period and traffic-source labels are not errors: they fall
//! back to a multiplier of 1.0 so dashboards can pass through free-form
//! labels.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use funnel_core::{
    FunnelData, FunnelError, FunnelResult, HistoricalRecord, SourceBreakdown, Stage, StandardFunnel,
};
use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

pub const BASE_VISITORS: f64 = 1000.0;

pub const TIME_MULTIPLIERS: [(&str, f64); 3] = [
    ("Last 7 Days", 0.3),
    ("Last 30 Days", 1.0),
    ("Last 90 Days", 2.8),
];

pub const TRAFFIC_MULTIPLIERS: [(&str, f64); 5] = [
    ("Google Ads", 1.2),
    ("Facebook Ads", 1.0),
    ("Organic", 0.8),
    ("Direct", 0.6),
    ("Email", 0.4),
];

/// Used when the caller passes no traffic sources at all.
pub const DEFAULT_TRAFFIC_SOURCES: [&str; 2] = ["Google Ads", "Facebook Ads"];

// Uniform ranges, as fractions.
const JITTER: (f64, f64) = (0.8, 1.2);
const VISITOR_TO_LEAD: (f64, f64) = (0.015, 0.035);
const LEAD_TO_MQL: (f64, f64) = (0.40, 0.65);
const MQL_TO_SQL: (f64, f64) = (0.25, 0.50);
const DEGRADED_LEAD_TO_MQL: (f64, f64) = (0.20, 0.35);
const DEGRADED_MQL_TO_SQL: (f64, f64) = (0.15, 0.30);
const BOTTLENECK_PROBABILITY: f64 = 0.3;

const DAILY_VISITORS_MIN: u64 = 800;
const DAILY_VISITORS_MAX: u64 = 1200;
const WEEKDAY_BOOST: f64 = 1.1;

/// Longest daily series the generator produces (ten years).
pub const MAX_HISTORY_DAYS: u32 = 3650;

/// Share of the overall funnel attributed to each source in a breakdown.
const SOURCE_SHARES: [(&str, (f64, f64)); 5] = [
    ("Google Ads", (0.4, 0.6)),
    ("Facebook Ads", (0.2, 0.4)),
    ("Organic", (0.1, 0.3)),
    ("Direct", (0.05, 0.2)),
    ("Email", (0.02, 0.1)),
];
const UNKNOWN_SOURCE_SHARE: (f64, f64) = (0.05, 0.15);

/// Stage-to-stage conversion fractions for one synthetic funnel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRates {
    pub visitor_to_lead: f64,
    pub lead_to_mql: f64,
    pub mql_to_sql: f64,
}

pub struct DataGenerator<R = ThreadRng> {
    rng: R,
}

impl DataGenerator<ThreadRng> {
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for DataGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl DataGenerator<StdRng> {
    /// Deterministic generator for tests and reproducible demos.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> DataGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Generate a four-stage funnel for a reporting window and a set of
    /// traffic sources.
    ///
    /// Visitors are `round(1000 × time × mean(source multipliers) × jitter)`
    /// with jitter uniform in [0.8, 1.2].
    pub fn generate_funnel_data<S: AsRef<str>>(
        &mut self,
        time_period: &str,
        traffic_sources: &[S],
    ) -> StandardFunnel {
        let expected = expected_visitors(time_period, traffic_sources);
        let jitter = self.rng.gen_range(JITTER.0..=JITTER.1);
        let visitors = (expected * jitter).round() as u64;

        let funnel = self.generate_realistic_funnel(visitors);
        info!(
            time_period,
            visitors = funnel.visitor,
            sqls = funnel.sql,
            "Synthetic funnel generated"
        );
        funnel
    }

    /// Draw the three stage conversion rates. With probability 0.3 one of the
    /// later transitions is degraded to simulate a bottleneck.
    pub fn draw_conversion_rates(&mut self) -> ConversionRates {
        let mut rates = ConversionRates {
            visitor_to_lead: self.uniform(VISITOR_TO_LEAD),
            lead_to_mql: self.uniform(LEAD_TO_MQL),
            mql_to_sql: self.uniform(MQL_TO_SQL),
        };

        if self.rng.gen_bool(BOTTLENECK_PROBABILITY) {
            if self.rng.gen_bool(0.5) {
                rates.lead_to_mql = self.uniform(DEGRADED_LEAD_TO_MQL);
                debug!(rate = rates.lead_to_mql, "Injected Lead→MQL bottleneck");
            } else {
                rates.mql_to_sql = self.uniform(DEGRADED_MQL_TO_SQL);
                debug!(rate = rates.mql_to_sql, "Injected MQL→SQL bottleneck");
            }
        }

        rates
    }

    /// Expand a visitor count into a full funnel. Every derived stage is
    /// floored and then clamped to at least 1.
    pub fn generate_realistic_funnel(&mut self, visitors: u64) -> StandardFunnel {
        let rates = self.draw_conversion_rates();
        let lead = apply_rate(visitors, rates.visitor_to_lead);
        let mql = apply_rate(lead, rates.lead_to_mql);
        let sql = apply_rate(mql, rates.mql_to_sql);

        StandardFunnel {
            visitor: visitors,
            lead,
            mql,
            sql,
        }
    }

    /// Daily funnels for the `days` days ending today, flattened to one
    /// record per (day, stage).
    pub fn generate_historical_data(&mut self, days: u32) -> FunnelResult<Vec<HistoricalRecord>> {
        let today = Utc::now().date_naive();
        self.generate_historical_data_until(today, days)
    }

    /// Same as [`Self::generate_historical_data`] with an explicit last day.
    ///
    /// `days` above [`MAX_HISTORY_DAYS`], or a series that would start before
    /// the earliest representable date, is `InvalidInput`.
    pub fn generate_historical_data_until(
        &mut self,
        end: NaiveDate,
        days: u32,
    ) -> FunnelResult<Vec<HistoricalRecord>> {
        if days > MAX_HISTORY_DAYS {
            return Err(FunnelError::InvalidInput(format!(
                "history is limited to {MAX_HISTORY_DAYS} days, got {days}"
            )));
        }
        if days == 0 {
            return Ok(Vec::new());
        }
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days - 1)))
            .ok_or_else(|| {
                FunnelError::InvalidInput(format!("{days} days before {end} is out of range"))
            })?;

        let mut records = Vec::with_capacity(days as usize * Stage::ALL.len());
        for date in start.iter_days().take(days as usize) {
            let mut base = self.rng.gen_range(DAILY_VISITORS_MIN..=DAILY_VISITORS_MAX);
            if is_weekday(date) {
                base = (base as f64 * WEEKDAY_BOOST) as u64;
            }

            let funnel = self.generate_realistic_funnel(base);
            records.extend(
                funnel
                    .iter()
                    .map(|(stage, count)| HistoricalRecord { date, stage, count }),
            );
        }

        debug!(days, records = records.len(), "Historical series generated");
        Ok(records)
    }

    /// Split a funnel across traffic sources, keeping the order they were
    /// given in. Each source gets an independent share drawn from its range
    /// and applied to every stage (floored, at least 1). Shares are not
    /// normalized across sources; a repeated source keeps its first position
    /// and the last draw.
    pub fn generate_traffic_source_breakdown<S: AsRef<str>>(
        &mut self,
        funnel_data: &FunnelData,
        traffic_sources: &[S],
    ) -> SourceBreakdown {
        let mut breakdown = SourceBreakdown::new();

        for source in traffic_sources {
            let source = source.as_ref();
            let share = self.uniform(source_share_range(source));
            let source_data = funnel_data.map_counts(|count| apply_rate(count, share));
            breakdown.insert(source, source_data);
        }

        breakdown
    }

    fn uniform(&mut self, (low, high): (f64, f64)) -> f64 {
        self.rng.gen_range(low..=high)
    }
}

/// Multiplier for a reporting window; unknown labels map to 1.0.
pub fn time_multiplier(time_period: &str) -> f64 {
    lookup(&TIME_MULTIPLIERS, time_period).unwrap_or_else(|| {
        debug!(time_period, "Unknown time period, using multiplier 1.0");
        1.0
    })
}

/// Mean of the per-source multipliers (unknown sources count as 1.0). An
/// empty list means [`DEFAULT_TRAFFIC_SOURCES`].
pub fn traffic_multiplier<S: AsRef<str>>(traffic_sources: &[S]) -> f64 {
    if traffic_sources.is_empty() {
        return traffic_multiplier(&DEFAULT_TRAFFIC_SOURCES);
    }
    let total: f64 = traffic_sources
        .iter()
        .map(|source| {
            let source = source.as_ref();
            lookup(&TRAFFIC_MULTIPLIERS, source).unwrap_or_else(|| {
                debug!(source, "Unknown traffic source, using multiplier 1.0");
                1.0
            })
        })
        .sum();
    total / traffic_sources.len() as f64
}

/// Visitor count before jitter: `1000 × time × traffic`.
pub fn expected_visitors<S: AsRef<str>>(time_period: &str, traffic_sources: &[S]) -> f64 {
    BASE_VISITORS * time_multiplier(time_period) * traffic_multiplier(traffic_sources)
}

fn source_share_range(source: &str) -> (f64, f64) {
    SOURCE_SHARES
        .iter()
        .find(|(label, _)| *label == source)
        .map_or(UNKNOWN_SOURCE_SHARE, |(_, range)| *range)
}

fn lookup(table: &[(&str, f64)], label: &str) -> Option<f64> {
    table
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, value)| *value)
}

fn apply_rate(count: u64, rate: f64) -> u64 {
    ((count as f64 * rate).floor() as u64).max(1)
}

fn is_weekday(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() <= 5
}
