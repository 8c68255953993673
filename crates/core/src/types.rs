use crate::error::{FunnelError, FunnelResult};
use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

// ─── Stages ─────────────────────────────────────────────────────────────────

/// One step of the standard B2B funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Visitor,
    Lead,
    #[serde(rename = "MQL")]
    Mql,
    #[serde(rename = "SQL")]
    Sql,
}

impl Stage {
    /// Stages in funnel order.
    pub const ALL: [Stage; 4] = [Stage::Visitor, Stage::Lead, Stage::Mql, Stage::Sql];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Visitor => "Visitor",
            Stage::Lead => "Lead",
            Stage::Mql => "MQL",
            Stage::Sql => "SQL",
        }
    }

    pub fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts for the fixed Visitor → Lead → MQL → SQL funnel produced by the
/// data generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardFunnel {
    pub visitor: u64,
    pub lead: u64,
    pub mql: u64,
    pub sql: u64,
}

impl StandardFunnel {
    pub fn count(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Visitor => self.visitor,
            Stage::Lead => self.lead,
            Stage::Mql => self.mql,
            Stage::Sql => self.sql,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, u64)> + '_ {
        Stage::ALL.into_iter().map(move |s| (s, self.count(s)))
    }

    pub fn to_funnel_data(&self) -> FunnelData {
        FunnelData {
            stages: self
                .iter()
                .map(|(stage, count)| FunnelStage {
                    name: stage.as_str().to_string(),
                    count,
                })
                .collect(),
        }
    }
}

impl From<StandardFunnel> for FunnelData {
    fn from(funnel: StandardFunnel) -> Self {
        funnel.to_funnel_data()
    }
}

// ─── Funnel Data ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub name: String,
    pub count: u64,
}

/// Ordered stage-name → count mapping. Insertion order is the funnel
/// sequence; stages are never reordered by value.
///
/// Serializes as a JSON object whose keys keep funnel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunnelData {
    stages: Vec<FunnelStage>,
}

impl FunnelData {
    /// Build funnel data, rejecting empty input, blank names and duplicate
    /// stage names.
    pub fn new(stages: Vec<FunnelStage>) -> FunnelResult<Self> {
        if stages.is_empty() {
            return Err(FunnelError::invalid_input("funnel data has no stages"));
        }
        let mut seen = HashSet::with_capacity(stages.len());
        for stage in &stages {
            if stage.name.trim().is_empty() {
                return Err(FunnelError::invalid_input("stage name must not be empty"));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(FunnelError::InvalidInput(format!(
                    "duplicate stage name: {}",
                    stage.name
                )));
            }
        }
        Ok(Self { stages })
    }

    pub fn from_pairs<I, S>(pairs: I) -> FunnelResult<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, count)| FunnelStage {
                    name: name.into(),
                    count,
                })
                .collect(),
        )
    }

    pub fn stages(&self) -> &[FunnelStage] {
        &self.stages
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.stages.iter().map(|s| (s.name.as_str(), s.count))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.stages.iter().find(|s| s.name == name).map(|s| s.count)
    }

    /// Count of the baseline (first) stage.
    pub fn first_count(&self) -> u64 {
        self.stages.first().map_or(0, |s| s.count)
    }

    /// Count of the final stage.
    pub fn last_count(&self) -> u64 {
        self.stages.last().map_or(0, |s| s.count)
    }

    /// Same stages in the same order with each count transformed.
    pub fn map_counts(&self, mut f: impl FnMut(u64) -> u64) -> FunnelData {
        FunnelData {
            stages: self
                .stages
                .iter()
                .map(|s| FunnelStage {
                    name: s.name.clone(),
                    count: f(s.count),
                })
                .collect(),
        }
    }

    /// Whether all of Visitor, Lead, MQL and SQL are present.
    pub fn has_standard_stages(&self) -> bool {
        Stage::ALL
            .iter()
            .all(|stage| self.get(stage.as_str()).is_some())
    }
}

impl Serialize for FunnelData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.stages.len()))?;
        for stage in &self.stages {
            map.serialize_entry(&stage.name, &stage.count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FunnelData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FunnelDataVisitor;

        impl<'de> Visitor<'de> for FunnelDataVisitor {
            type Value = FunnelData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of stage name to non-negative integer count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FunnelData, A::Error> {
                let mut stages = Vec::with_capacity(access.size_hint().unwrap_or(4));
                while let Some((name, count)) = access.next_entry::<String, u64>()? {
                    stages.push(FunnelStage { name, count });
                }
                FunnelData::new(stages).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_map(FunnelDataVisitor)
    }
}

/// Per-source funnels in the order the sources were requested. Serializes as
/// a JSON object keyed by source name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBreakdown {
    sources: Vec<(String, FunnelData)>,
}

impl SourceBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source, or replaces its funnel in place if already present.
    pub fn insert(&mut self, source: impl Into<String>, data: FunnelData) {
        let source = source.into();
        match self.sources.iter_mut().find(|(name, _)| *name == source) {
            Some(entry) => entry.1 = data,
            None => self.sources.push((source, data)),
        }
    }

    pub fn get(&self, source: &str) -> Option<&FunnelData> {
        self.sources
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, data)| data)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FunnelData)> + '_ {
        self.sources.iter().map(|(name, data)| (name.as_str(), data))
    }

    pub fn values(&self) -> impl Iterator<Item = &FunnelData> + '_ {
        self.sources.iter().map(|(_, data)| data)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Serialize for SourceBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sources.len()))?;
        for (name, data) in &self.sources {
            map.serialize_entry(name, data)?;
        }
        map.end()
    }
}

// ─── Analysis Results ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Healthy,
    NeedsAttention,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Healthy => f.write_str("Healthy"),
            StageStatus::NeedsAttention => f.write_str("Needs Attention"),
        }
    }
}

/// Per-stage row of the metrics table. Percentages are rounded to one
/// decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetric {
    pub stage: String,
    pub count: u64,
    /// Percentage of the previous stage that reached this one; 100.0 for the
    /// baseline.
    pub conversion_rate: f64,
    /// `100 - conversion_rate`. Negative when a stage grew.
    pub drop_off: f64,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub stage_metrics: Vec<StageMetric>,
    /// Stages whose drop-off strictly exceeds the threshold, in funnel order.
    pub problematic_stages: Vec<String>,
    pub overall_conversion: f64,
    pub biggest_drop_stage: Option<String>,
    pub biggest_drop_value: f64,
    pub threshold_used: f64,
    pub total_visitors: u64,
    pub final_conversions: u64,
}

impl AnalysisResult {
    pub fn metric(&self, stage: &str) -> Option<&StageMetric> {
        self.stage_metrics.iter().find(|m| m.stage == stage)
    }

    pub fn is_problematic(&self, stage: &str) -> bool {
        self.problematic_stages.iter().any(|s| s == stage)
    }

    pub fn has_issues(&self) -> bool {
        !self.problematic_stages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Performance {
    Above,
    Below,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    /// "StageA to StageB" or "Overall".
    pub transition: String,
    pub actual: f64,
    pub benchmark: f64,
    pub performance: Performance,
    pub difference: f64,
}

/// Benchmark entries in funnel order, "Overall" last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkComparison {
    pub entries: Vec<BenchmarkEntry>,
}

impl BenchmarkComparison {
    pub fn get(&self, transition: &str) -> Option<&BenchmarkEntry> {
        self.entries.iter().find(|e| e.transition == transition)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Projection for one problematic stage if its drop-off sat exactly at the
/// threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageImpact {
    pub stage: String,
    pub current_count: u64,
    pub potential_count: u64,
    /// May be negative.
    pub potential_increase: i64,
    pub improvement_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImpactAnalysis {
    pub stages: Vec<StageImpact>,
}

impl ImpactAnalysis {
    pub fn get(&self, stage: &str) -> Option<&StageImpact> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn total_potential_increase(&self) -> i64 {
        self.stages.iter().map(|s| s.potential_increase).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// One (day, stage) row of a long-format historical series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub stage: Stage,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FunnelData {
        FunnelData::from_pairs([("Visitor", 1000), ("Lead", 250), ("MQL", 125), ("SQL", 50)])
            .unwrap()
    }

    #[test]
    fn test_rejects_empty_funnel() {
        let err = FunnelData::new(Vec::new()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_rejects_duplicate_stage() {
        let err = FunnelData::from_pairs([("Visitor", 10), ("Visitor", 5)]).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("duplicate stage name"));
    }

    #[test]
    fn test_rejects_blank_stage_name() {
        assert!(FunnelData::from_pairs([("  ", 10)]).is_err());
    }

    #[test]
    fn test_order_is_preserved() {
        let data = FunnelData::from_pairs([("Lead", 5), ("Visitor", 100)]).unwrap();
        let names: Vec<&str> = data.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Lead", "Visitor"]);
        assert_eq!(data.first_count(), 5);
        assert_eq!(data.last_count(), 100);
    }

    #[test]
    fn test_json_round_trip_keeps_order() {
        let data = sample();
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"Visitor":1000,"Lead":250,"MQL":125,"SQL":50}"#);
        let back: FunnelData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_json_rejects_non_numeric_count() {
        let parsed: Result<FunnelData, _> = serde_json::from_str(r#"{"Visitor":"lots"}"#);
        assert!(parsed.is_err());
        let parsed: Result<FunnelData, _> = serde_json::from_str(r#"{"Visitor":-3}"#);
        assert!(parsed.is_err());
        let parsed: Result<FunnelData, _> = serde_json::from_str("{}");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_standard_stage_detection() {
        assert!(sample().has_standard_stages());
        let partial = FunnelData::from_pairs([("Visitor", 10), ("Lead", 2)]).unwrap();
        assert!(!partial.has_standard_stages());
    }

    #[test]
    fn test_standard_funnel_conversion() {
        let funnel = StandardFunnel {
            visitor: 900,
            lead: 20,
            mql: 10,
            sql: 4,
        };
        let data: FunnelData = funnel.into();
        let expected =
            FunnelData::from_pairs([("Visitor", 900), ("Lead", 20), ("MQL", 10), ("SQL", 4)])
                .unwrap();
        assert_eq!(data, expected);
        assert_eq!(Stage::from_name("MQL"), Some(Stage::Mql));
        assert_eq!(Stage::from_name("mql"), None);
        assert_eq!(StageStatus::NeedsAttention.to_string(), "Needs Attention");
    }

    #[test]
    fn test_source_breakdown_keeps_request_order() {
        let mut breakdown = SourceBreakdown::new();
        breakdown.insert("Organic", FunnelData::from_pairs([("Visitor", 10)]).unwrap());
        breakdown.insert("Email", FunnelData::from_pairs([("Visitor", 4)]).unwrap());
        breakdown.insert("Organic", FunnelData::from_pairs([("Visitor", 12)]).unwrap());

        let names: Vec<&str> = breakdown.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Organic", "Email"]);
        assert_eq!(breakdown.get("Organic").unwrap().first_count(), 12);

        let json = serde_json::to_string(&breakdown).unwrap();
        assert_eq!(json, r#"{"Organic":{"Visitor":12},"Email":{"Visitor":4}}"#);
    }

    #[test]
    fn test_historical_record_serializes_stage_label() {
        let record = HistoricalRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            stage: Stage::Sql,
            count: 7,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2024-03-04");
        assert_eq!(json["stage"], "SQL");
    }
}
