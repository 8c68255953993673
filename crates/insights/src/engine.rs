use crate::context::build_context;
use crate::provider::{CompletionRequest, InsightProvider, SYSTEM_PROMPT};
use funnel_core::config::InsightsConfig;
use funnel_core::{AnalysisResult, FunnelData, FunnelError, FunnelResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Narrative insights returned by the text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub priorities: Vec<String>,
    #[serde(default)]
    pub insights: InsightDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightDetails {
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

/// Parse the service's JSON reply. Anything unparseable counts as the service
/// being unavailable.
pub fn parse_insights(raw: &str) -> FunnelResult<Insights> {
    serde_json::from_str(raw).map_err(|e| {
        FunnelError::ExternalServiceUnavailable(format!("malformed insight response: {e}"))
    })
}

/// Asks the configured provider for insights and degrades to `None` on any
/// failure. The analysis itself is never affected.
pub struct InsightEngine {
    config: InsightsConfig,
    provider: Option<Arc<dyn InsightProvider>>,
}

impl InsightEngine {
    pub fn new(config: InsightsConfig, provider: Arc<dyn InsightProvider>) -> Self {
        Self {
            config,
            provider: Some(provider),
        }
    }

    /// Engine with no provider attached; always yields no insights.
    pub fn disabled(config: InsightsConfig) -> Self {
        Self {
            config,
            provider: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some() && self.config.is_active()
    }

    pub fn build_request(
        &self,
        analysis: &AnalysisResult,
        funnel: &FunnelData,
    ) -> FunnelResult<CompletionRequest> {
        let context = build_context(analysis, funnel)?;
        Ok(CompletionRequest {
            model: self.config.model.clone(),
            api_key: self.config.api_key.clone().unwrap_or_default(),
            system_prompt: SYSTEM_PROMPT,
            user_message: format!("Analyze this funnel data and provide insights:\n\n{context}"),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            timeout: Duration::from_millis(self.config.timeout_ms),
        })
    }

    pub fn generate_insights(
        &self,
        analysis: &AnalysisResult,
        funnel: &FunnelData,
    ) -> Option<Insights> {
        let provider = match &self.provider {
            Some(provider) if self.config.is_active() => provider,
            _ => {
                debug!("Insight service not configured, skipping insights");
                return None;
            }
        };

        let result = self
            .build_request(analysis, funnel)
            .and_then(|request| provider.complete(&request))
            .and_then(|raw| parse_insights(&raw));

        match result {
            Ok(insights) => {
                info!(
                    recommendations = insights.recommendations.len(),
                    "Insights generated"
                );
                Some(insights)
            }
            Err(e) => {
                warn!(error = %e, "Insight generation failed, continuing without insights");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnel_core::{StageMetric, StageStatus};
    use std::sync::Mutex;

    const REPLY: &str = r#"{
        "summary": "Lead capture is the bottleneck.",
        "recommendations": ["Fix the signup form immediately", "Test shorter forms"],
        "priorities": ["Lead capture"],
        "insights": {
            "key_findings": ["75% of visitors leave before converting"],
            "opportunities": ["Retarget visitors"],
            "risks": ["Paid traffic cost"]
        }
    }"#;

    /// Replays a canned reply and records the requests it saw.
    struct ScriptedProvider {
        reply: FunnelResult<String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(FunnelError::ExternalServiceUnavailable("timed out".into())),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl InsightProvider for ScriptedProvider {
        fn complete(&self, request: &CompletionRequest) -> FunnelResult<String> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(e) => Err(FunnelError::ExternalServiceUnavailable(e.to_string())),
            }
        }
    }

    fn active_config() -> InsightsConfig {
        InsightsConfig {
            enabled: true,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    fn sample() -> (AnalysisResult, FunnelData) {
        let funnel = FunnelData::from_pairs([("Visitor", 1000), ("Lead", 250)]).unwrap();
        let analysis = AnalysisResult {
            stage_metrics: vec![
                StageMetric {
                    stage: "Visitor".into(),
                    count: 1000,
                    conversion_rate: 100.0,
                    drop_off: 0.0,
                    status: StageStatus::Healthy,
                },
                StageMetric {
                    stage: "Lead".into(),
                    count: 250,
                    conversion_rate: 25.0,
                    drop_off: 75.0,
                    status: StageStatus::NeedsAttention,
                },
            ],
            problematic_stages: vec!["Lead".into()],
            overall_conversion: 25.0,
            biggest_drop_stage: Some("Lead".into()),
            biggest_drop_value: 75.0,
            threshold_used: 35.0,
            total_visitors: 1000,
            final_conversions: 250,
        };
        (analysis, funnel)
    }

    #[test]
    fn test_generate_insights_success() {
        let provider = ScriptedProvider::ok(REPLY);
        let engine = InsightEngine::new(active_config(), provider.clone());
        let (analysis, funnel) = sample();

        let insights = engine.generate_insights(&analysis, &funnel).unwrap();
        assert_eq!(insights.summary, "Lead capture is the bottleneck.");
        assert_eq!(insights.recommendations.len(), 2);
        assert_eq!(insights.insights.risks, vec!["Paid traffic cost"]);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gpt-4o");
        assert_eq!(seen[0].max_tokens, 2000);
        assert_eq!(seen[0].timeout, Duration::from_secs(30));
        assert!(seen[0]
            .user_message
            .starts_with("Analyze this funnel data and provide insights:"));
        assert!(seen[0].user_message.contains("- Lead: Exceeds 35% drop-off threshold"));
    }

    #[test]
    fn test_no_key_means_no_insights() {
        let provider = ScriptedProvider::ok(REPLY);
        let config = InsightsConfig {
            enabled: true,
            ..Default::default()
        };
        let engine = InsightEngine::new(config, provider.clone());
        let (analysis, funnel) = sample();

        assert!(!engine.is_available());
        assert!(engine.generate_insights(&analysis, &funnel).is_none());
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_disabled_engine() {
        let engine = InsightEngine::disabled(active_config());
        let (analysis, funnel) = sample();
        assert!(engine.generate_insights(&analysis, &funnel).is_none());
    }

    #[test]
    fn test_service_failure_degrades() {
        let engine = InsightEngine::new(active_config(), ScriptedProvider::failing());
        let (analysis, funnel) = sample();
        assert!(engine.generate_insights(&analysis, &funnel).is_none());
    }

    #[test]
    fn test_malformed_reply_degrades() {
        let engine = InsightEngine::new(active_config(), ScriptedProvider::ok("not json"));
        let (analysis, funnel) = sample();
        assert!(engine.generate_insights(&analysis, &funnel).is_none());

        let err = parse_insights(r#"{"recommendations": []}"#).unwrap_err();
        assert!(matches!(err, FunnelError::ExternalServiceUnavailable(_)));
    }

    #[test]
    fn test_missing_lists_default_empty() {
        let insights = parse_insights(r#"{"summary": "ok"}"#).unwrap();
        assert!(insights.recommendations.is_empty());
        assert!(insights.insights.key_findings.is_empty());
    }
}
