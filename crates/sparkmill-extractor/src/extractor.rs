//! The extraction cascade

use crate::cleanup::{braced_span, clean_markdown, heuristic_repair, is_balanced};
use crate::config::ExtractorConfig;
use crate::repair::Repairer;
use crate::types::{ExtractionSpec, ParseAttempt, ParseResult, Strategy};
use crate::validate::missing_fields;
use crate::{ExtractorError, RepairError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns raw generated text into a validated JSON value
///
/// Strategies run in strict order and stop at the first one whose output
/// parses and contains every required field: direct parse, markdown cleanup,
/// mixed-content span, heuristic repair, escalated repair, fallback. When
/// all of them fail the result carries every attempt's diagnostics.
#[derive(Clone)]
pub struct StructuredExtractor {
    repairer: Option<Arc<dyn Repairer>>,
    config: ExtractorConfig,
}

/// Mutable state of one cascade run
struct Cascade<'a> {
    raw: &'a str,
    spec: &'a ExtractionSpec,
    attempts: Vec<ParseAttempt>,
    last_tried: Option<String>,
}

struct Found {
    strategy: Strategy,
    value: Value,
    cleaned: Option<String>,
}

impl<'a> Cascade<'a> {
    fn new(raw: &'a str, spec: &'a ExtractionSpec) -> Self {
        Self {
            raw,
            spec,
            attempts: Vec::new(),
            last_tried: None,
        }
    }

    fn missing(&self, value: &Value) -> Vec<String> {
        missing_fields(value, &self.spec.required_fields)
    }

    fn cleaned_text(&self, text: &str) -> Option<String> {
        (text != self.raw).then(|| text.to_string())
    }

    /// Parse and validate one candidate, recording the attempt
    fn attempt(&mut self, strategy: Strategy, text: &str) -> Option<Found> {
        let cleaned = self.cleaned_text(text);

        if strategy != Strategy::Direct && self.last_tried.as_deref() == Some(text) {
            self.attempts.push(ParseAttempt::failed(
                strategy,
                cleaned,
                "no change from previous candidate",
            ));
            return None;
        }
        self.last_tried = Some(text.to_string());

        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(e) => {
                self.attempts
                    .push(ParseAttempt::failed(strategy, cleaned, e.to_string()));
                return None;
            }
        };

        let missing = self.missing(&value);
        if !missing.is_empty() {
            self.attempts.push(ParseAttempt::failed(
                strategy,
                cleaned,
                format!("missing required fields: {}", missing.join(", ")),
            ));
            return None;
        }

        self.attempts
            .push(ParseAttempt::succeeded(strategy, cleaned.clone()));
        Some(Found {
            strategy,
            value,
            cleaned,
        })
    }

    fn skip(&mut self, strategy: Strategy, reason: impl Into<String>) {
        self.attempts
            .push(ParseAttempt::failed(strategy, None, reason));
    }

    fn success(self, found: Found) -> ParseResult {
        debug!(
            "Extraction succeeded at {} after {} attempt(s)",
            found.strategy,
            self.attempts.len()
        );
        ParseResult {
            success: true,
            value: Some(found.value),
            raw: self.raw.to_string(),
            cleaned: found.cleaned,
            error: None,
            strategy: Some(found.strategy),
            used_fallback: found.strategy == Strategy::Fallback,
            attempts: self.attempts,
        }
    }

    /// Fallback substitution, or explicit failure
    fn finish(mut self) -> ParseResult {
        if let Some(fallback) = self.spec.fallback.clone() {
            let missing = self.missing(&fallback);
            if missing.is_empty() {
                self.attempts
                    .push(ParseAttempt::succeeded(Strategy::Fallback, None));
                let result = self.success(Found {
                    strategy: Strategy::Fallback,
                    value: fallback,
                    cleaned: None,
                });
                warn!(
                    "Extraction degraded to fallback; attempts: {}",
                    result.diagnostics()
                );
                return result;
            }
            self.skip(
                Strategy::Fallback,
                format!("fallback missing required fields: {}", missing.join(", ")),
            );
        }

        let result = ParseResult {
            success: false,
            value: None,
            raw: self.raw.to_string(),
            cleaned: self.last_tried.filter(|t| t != self.raw),
            error: Some("no strategy produced a valid value".to_string()),
            strategy: None,
            used_fallback: false,
            attempts: self.attempts,
        };
        warn!("Extraction failed; attempts: {}", result.diagnostics());
        debug!("Unextractable text ({} chars): {}", result.raw.len(), result.raw);
        result
    }
}

impl StructuredExtractor {
    /// Extractor without escalated repair
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            repairer: None,
            config,
        })
    }

    /// Attach the escalated-repair strategy
    pub fn with_repairer(mut self, repairer: Arc<dyn Repairer>) -> Self {
        self.repairer = Some(repairer);
        self
    }

    /// Extractor configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Whether a call to [`extract`](Self::extract) may reach the network
    pub fn can_escalate(&self) -> bool {
        self.repairer.is_some() && self.config.enable_escalated_repair
    }

    /// Run the syntactic strategies; on failure return the best candidate
    fn syntactic(&self, cascade: &mut Cascade<'_>) -> Result<Found, String> {
        let raw = cascade.raw;

        if let Some(found) = cascade.attempt(Strategy::Direct, raw) {
            return Ok(found);
        }

        let cleaned = clean_markdown(raw);
        if let Some(found) = cascade.attempt(Strategy::Cleanup, &cleaned) {
            return Ok(found);
        }

        let mut best = raw.trim().to_string();
        match braced_span(&cleaned).or_else(|| braced_span(raw)) {
            None => cascade.skip(Strategy::MixedContent, "no braced span"),
            Some(span) => {
                best = span.to_string();
                if is_balanced(span) {
                    if let Some(found) = cascade.attempt(Strategy::MixedContent, span) {
                        return Ok(found);
                    }
                } else {
                    cascade.skip(Strategy::MixedContent, "unbalanced braces");
                }
            }
        }

        if self.config.enable_heuristic_repair {
            let source = if best.contains('{') { best.as_str() } else { cleaned.as_str() };
            let repaired = heuristic_repair(source);
            if let Some(found) = cascade.attempt(Strategy::Heuristic, &repaired) {
                return Ok(found);
            }
        } else {
            cascade.skip(Strategy::Heuristic, "disabled");
        }

        Err(best)
    }

    /// Full cascade, including escalated repair when configured
    pub async fn extract(&self, raw: &str, spec: &ExtractionSpec) -> ParseResult {
        let mut cascade = Cascade::new(raw, spec);
        let best = match self.syntactic(&mut cascade) {
            Ok(found) => return cascade.success(found),
            Err(best) => best,
        };

        match &self.repairer {
            Some(repairer) if self.config.enable_escalated_repair => {
                let chars = best.chars().count();
                if chars > self.config.max_input_chars {
                    let err = RepairError::InputTooLong(chars, self.config.max_input_chars);
                    warn!("Skipping escalated repair: {}", err);
                    cascade.skip(Strategy::Escalated, err.to_string());
                } else {
                    let repaired = repairer
                        .repair(&best, spec.context.as_deref(), spec.schema_hint.as_ref())
                        .await;
                    match repaired {
                        Ok(repaired) => {
                            let missing = cascade.missing(&repaired.value);
                            if missing.is_empty() {
                                cascade.attempts.push(ParseAttempt::succeeded(
                                    Strategy::Escalated,
                                    Some(repaired.text.clone()),
                                ));
                                return cascade.success(Found {
                                    strategy: Strategy::Escalated,
                                    value: repaired.value,
                                    cleaned: Some(repaired.text),
                                });
                            }
                            cascade.attempts.push(ParseAttempt::failed(
                                Strategy::Escalated,
                                Some(repaired.text),
                                format!("missing required fields: {}", missing.join(", ")),
                            ));
                        }
                        Err(e) => cascade.skip(Strategy::Escalated, e.to_string()),
                    }
                }
            }
            Some(_) => cascade.skip(Strategy::Escalated, "disabled"),
            None => cascade.skip(Strategy::Escalated, "no repairer attached"),
        }

        cascade.finish()
    }

    /// Cascade without the network strategy
    pub fn extract_offline(&self, raw: &str, spec: &ExtractionSpec) -> ParseResult {
        let mut cascade = Cascade::new(raw, spec);
        match self.syntactic(&mut cascade) {
            Ok(found) => cascade.success(found),
            Err(_) => {
                cascade.skip(Strategy::Escalated, "offline");
                cascade.finish()
            }
        }
    }
}

impl Default for StructuredExtractor {
    fn default() -> Self {
        Self {
            repairer: None,
            config: ExtractorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline() -> StructuredExtractor {
        StructuredExtractor::default()
    }

    #[test]
    fn test_direct_parse_returns_value_unchanged() {
        let raw = r#"{"title": "Mealwise", "scores": {"feasibility": 7}}"#;
        let result = offline().extract_offline(raw, &ExtractionSpec::new(["title"]));
        assert!(result.is_parsed());
        assert_eq!(result.strategy, Some(Strategy::Direct));
        assert_eq!(result.value, Some(serde_json::from_str::<Value>(raw).unwrap()));
        assert!(result.cleaned.is_none());
        assert_eq!(result.attempts.len(), 1);
    }

    #[test]
    fn test_cleanup_strips_fence() {
        let raw = "Here's the JSON:\n```json\n{\"summary\": \"s\"}\n```\nHope this helps!";
        let result = offline().extract_offline(raw, &ExtractionSpec::new(["summary"]));
        assert_eq!(result.strategy, Some(Strategy::Cleanup));
        assert_eq!(result.cleaned.as_deref(), Some("{\"summary\": \"s\"}"));
    }

    #[test]
    fn test_mixed_content_span() {
        let raw = "The plan {\"model\": \"saas\"} is final. Note: see {above}";
        let spec = ExtractionSpec::new(["model"]);
        let result = offline().extract_offline(raw, &spec);
        // First `{` to last `}` swallows the trailing note, so only repair can save it
        assert!(!matches!(result.strategy, Some(Strategy::MixedContent)));

        let raw = "Result follows {\"model\": \"saas\"} end";
        let result = offline().extract_offline(raw, &spec);
        assert_eq!(result.strategy, Some(Strategy::MixedContent));
        assert_eq!(result.value, Some(json!({"model": "saas"})));
    }

    #[test]
    fn test_heuristic_repair_strategy() {
        let raw = "{model: 'saas', pricing: [],}";
        let result = offline().extract_offline(raw, &ExtractionSpec::new(["model", "pricing"]));
        assert_eq!(result.strategy, Some(Strategy::Heuristic));
        assert_eq!(result.value, Some(json!({"model": "saas", "pricing": []})));
    }

    #[test]
    fn test_strict_config_skips_heuristics() {
        let extractor = StructuredExtractor::new(ExtractorConfig::strict()).unwrap();
        let result = extractor.extract_offline("{model: 'saas'}", &ExtractionSpec::new(["model"]));
        assert!(!result.success);
        assert!(result
            .attempts
            .iter()
            .any(|a| a.strategy == Strategy::Heuristic && a.error.as_deref() == Some("disabled")));
    }

    #[test]
    fn test_missing_field_without_fallback_fails() {
        let result = offline().extract_offline(r#"{"title": "x"}"#, &ExtractionSpec::new(["title", "tags"]));
        assert!(!result.success);
        assert!(result.value.is_none());
        assert!(result.diagnostics().contains("missing required fields: tags"));
    }

    #[test]
    fn test_missing_field_with_fallback_returns_fallback() {
        let fallback = json!({"title": "unknown", "tags": []});
        let spec = ExtractionSpec::new(["title", "tags"]).with_fallback(fallback.clone());
        let result = offline().extract_offline(r#"{"title": "x"}"#, &spec);
        assert!(result.is_degraded());
        assert_eq!(result.value, Some(fallback));
        assert_eq!(result.strategy, Some(Strategy::Fallback));
    }

    #[test]
    fn test_invalid_fallback_is_failure() {
        let spec = ExtractionSpec::new(["title"]).with_fallback(json!({"other": 1}));
        let result = offline().extract_offline("nonsense", &spec);
        assert!(!result.success);
        assert!(!result.used_fallback);
        assert!(result.diagnostics().contains("fallback missing required fields: title"));
    }

    #[test]
    fn test_failure_keeps_raw_and_all_attempts() {
        let result = offline().extract_offline("no data here", &ExtractionSpec::new(["a"]));
        assert!(!result.success);
        assert_eq!(result.raw, "no data here");
        let strategies: Vec<Strategy> = result.attempts.iter().map(|a| a.strategy).collect();
        assert_eq!(
            strategies,
            vec![
                Strategy::Direct,
                Strategy::Cleanup,
                Strategy::MixedContent,
                Strategy::Heuristic,
                Strategy::Escalated,
            ]
        );
    }

    #[test]
    fn test_zero_max_input_rejected() {
        let config = ExtractorConfig {
            max_input_chars: 0,
            ..Default::default()
        };
        assert!(matches!(
            StructuredExtractor::new(config),
            Err(ExtractorError::Config(_))
        ));
    }
}
