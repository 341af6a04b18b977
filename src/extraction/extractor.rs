//! The extraction cascade.
//!
//! Order per message:
//! 1. Urgent symptom rules (always)
//! 2. Semantic matcher; accepted when the input is simple or the match is confident
//! 3. LLM, for complex input only, under a timeout
//! 4. Semantic result if it found anything, else regex rules
//! 5. Open-answer capture for free-text questions

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::conversation::{FieldValue, names};
use crate::error::LlmError;
use crate::extraction::llm::{LlmExtraction, build_extraction_prompt, parse_extraction_response};
use crate::extraction::rules::{implied_facts, is_simple_input, regex_extract};
use crate::extraction::types::{ExtractionLayer, ExtractionOutcome, ExtractionSource, FieldExtraction};
use crate::extraction::urgent::detect_urgent_symptoms;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, estimate_cost};
use crate::semantic::SemanticMatcher;

/// Confidence given to a raw reply recorded for an open-text question.
const OPEN_ANSWER_CONFIDENCE: f32 = 0.6;

const SYSTEM_PROMPT: &str = "You extract structured health intake data from patient messages. Respond with a single JSON object and nothing else.";

/// Fields whose answers have no closed vocabulary.
pub fn is_open_text_field(field: &str) -> bool {
    matches!(
        field,
        names::DIET
            | names::ACTIVITY
            | names::CONSTRAINTS
            | names::HABITS_FOLLOWED
            | names::HABITS_STRUGGLED
            | names::HEALTH_READINGS
            | names::BARRIERS
            | names::FEELINGS
    )
}

/// Per-message field extractor.
pub struct FieldExtractor {
    matcher: Arc<SemanticMatcher>,
    llm: Option<Arc<dyn LlmProvider>>,
    config: ExtractorConfig,
}

impl FieldExtractor {
    /// Extractor without an LLM layer.
    pub fn new(matcher: Arc<SemanticMatcher>, config: ExtractorConfig) -> Self {
        Self {
            matcher,
            llm: None,
            config,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Whether the LLM layer can run at all.
    pub fn llm_available(&self) -> bool {
        self.config.use_llm && self.llm.is_some()
    }

    pub fn matcher(&self) -> &SemanticMatcher {
        &self.matcher
    }

    /// Extract everything from one message. Never fails: layer errors are
    /// logged and the cascade moves on.
    pub async fn extract_all(
        &self,
        message: &str,
        context: &[String],
        last_field: Option<&str>,
    ) -> ExtractionOutcome {
        let urgent_symptoms = detect_urgent_symptoms(message);
        let simple = is_simple_input(message);

        let semantic = self.extract_with_semantic(message, last_field, &urgent_symptoms);
        let semantic_confident = semantic.max_confidence() >= self.config.confident_threshold;

        let mut outcome = if !semantic.fields.is_empty() && (simple || semantic_confident) {
            debug!(simple, fields = semantic.fields.len(), "Semantic layer accepted");
            semantic
        } else {
            let llm_result = if !simple && self.llm_available() {
                self.try_llm(message, context, last_field, &urgent_symptoms)
                    .await
            } else {
                None
            };

            match llm_result {
                Some(outcome) => outcome,
                None if !semantic.fields.is_empty() => {
                    debug!(fields = semantic.fields.len(), "Using low-confidence semantic result");
                    semantic
                }
                None => {
                    debug!("Falling back to regex rules");
                    ExtractionOutcome {
                        fields: regex_extract(message, last_field),
                        implied: implied_facts(message),
                        urgent_symptoms,
                        layer: ExtractionLayer::Regex,
                    }
                }
            }
        };

        capture_open_answer(&mut outcome, message, last_field);
        outcome
    }

    /// Rephrased question for a field the user's answer left unclear.
    pub fn clarification(&self, text: &str, field: &str, attempt: u32) -> String {
        self.matcher.clarification(text, field, attempt)
    }

    fn extract_with_semantic(
        &self,
        message: &str,
        last_field: Option<&str>,
        urgent: &[String],
    ) -> ExtractionOutcome {
        let threshold = self.config.confident_threshold;
        let fields = self
            .matcher
            .extract_all_fields(message, last_field)
            .into_iter()
            .map(|(name, m)| {
                let extraction = FieldExtraction::new(
                    name.clone(),
                    m.value,
                    m.confidence,
                    ExtractionSource::Semantic(m.method),
                )
                .needing_clarification(m.confidence < threshold);
                (name, extraction)
            })
            .collect();

        ExtractionOutcome {
            fields,
            implied: implied_facts(message),
            urgent_symptoms: urgent.to_vec(),
            layer: ExtractionLayer::Semantic,
        }
    }

    /// Run the LLM layer. `None` on any failure or an empty result.
    async fn try_llm(
        &self,
        message: &str,
        context: &[String],
        last_field: Option<&str>,
        urgent: &[String],
    ) -> Option<ExtractionOutcome> {
        let raw = match self.complete(message, context, last_field).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "LLM extraction failed, falling back");
                return None;
            }
        };

        let parsed = match parse_extraction_response(&raw) {
            LlmExtraction::Parsed(parsed) => parsed,
            LlmExtraction::Malformed { raw, reason } => {
                warn!(raw_response = %raw, reason = %reason, "Malformed LLM extraction, falling back");
                return None;
            }
        };

        let fields: std::collections::BTreeMap<_, _> = parsed
            .valued()
            .map(|(name, value, confidence)| {
                (
                    name.to_string(),
                    FieldExtraction::new(name, value.clone(), confidence, ExtractionSource::Llm),
                )
            })
            .collect();
        if fields.is_empty() {
            debug!("LLM returned no fields");
            return None;
        }

        let mut implied = implied_facts(message);
        implied.extend(parsed.implied_strings());

        debug!(fields = fields.len(), "LLM layer accepted");
        Some(ExtractionOutcome {
            fields,
            implied,
            urgent_symptoms: urgent.to_vec(),
            layer: ExtractionLayer::Llm,
        })
    }

    async fn complete(
        &self,
        message: &str,
        context: &[String],
        last_field: Option<&str>,
    ) -> Result<String, LlmError> {
        let Some(llm) = &self.llm else {
            return Err(LlmError::RequestFailed {
                provider: "none".into(),
                reason: "no LLM configured".into(),
            });
        };

        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_extraction_prompt(message, context, last_field)),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let timeout: Duration = self.config.llm_timeout;
        let response = tokio::time::timeout(timeout, llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: llm.model_name().to_string(),
                timeout,
            })??;

        let cost = estimate_cost(llm.as_ref(), &response);
        if cost > self.config.cost_warn_threshold {
            warn!(
                model = llm.model_name(),
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                cost = %cost,
                "Expensive extraction call"
            );
        } else {
            debug!(
                model = llm.model_name(),
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                cost = %cost,
                "Extraction call finished"
            );
        }

        Ok(response.content)
    }
}

/// Record the raw reply for an open-text question nothing else answered.
fn capture_open_answer(outcome: &mut ExtractionOutcome, message: &str, last_field: Option<&str>) {
    let Some(field) = last_field else {
        return;
    };
    let text = message.trim();
    if text.is_empty() || !is_open_text_field(field) || outcome.fields.contains_key(field) {
        return;
    }
    outcome.fields.insert(
        field.to_string(),
        FieldExtraction::new(
            field,
            FieldValue::text(text),
            OPEN_ANSWER_CONFIDENCE,
            ExtractionSource::OpenAnswer,
        ),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::conversation::FieldConfidence;
    use crate::llm::{CompletionResponse, FinishReason};

    struct MockLlm {
        response: String,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockLlm {
        fn replying(response: &str) -> Self {
            Self {
                response: response.into(),
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(CompletionResponse {
                content: self.response.clone(),
                input_tokens: 100,
                output_tokens: 50,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }
    }

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(Arc::new(SemanticMatcher::new()), ExtractorConfig::default())
    }

    const COMPLEX: &str = "well, my doctor once mentioned something about my numbers being off";

    // ── Cascade tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn simple_input_uses_semantic_without_llm() {
        let llm = Arc::new(MockLlm::replying("{}"));
        let extractor = extractor().with_llm(llm.clone());
        let outcome = extractor.extract_all("I'm 45", &[], Some(names::AGE)).await;
        assert_eq!(outcome.layer, ExtractionLayer::Semantic);
        assert_eq!(outcome.fields[names::AGE].value.as_f64(), Some(45.0));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn complex_input_goes_to_llm() {
        let llm = Arc::new(MockLlm::replying(
            r#"{"fields": {"conditions": {"value": ["hypertension"], "confidence": 0.6}}, "implied": {}}"#,
        ));
        let extractor = extractor().with_llm(llm.clone());
        let outcome = extractor.extract_all(COMPLEX, &[], None).await;
        assert_eq!(outcome.layer, ExtractionLayer::Llm);
        let conditions = &outcome.fields[names::CONDITIONS];
        assert_eq!(conditions.value, FieldValue::List(vec!["hypertension".into()]));
        assert_eq!(conditions.tag(), FieldConfidence::Medium);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_llm_output_falls_through_to_regex() {
        let llm = Arc::new(MockLlm::replying("no idea, sorry"));
        let extractor = extractor().with_llm(llm);
        let outcome = extractor.extract_all(COMPLEX, &[], None).await;
        assert_eq!(outcome.layer, ExtractionLayer::Regex);
    }

    #[tokio::test]
    async fn llm_timeout_falls_through() {
        let llm = Arc::new(MockLlm {
            response: r#"{"fields": {"age": {"value": 45}}}"#.into(),
            delay: Some(Duration::from_millis(200)),
            calls: AtomicUsize::new(0),
        });
        let config = ExtractorConfig {
            llm_timeout: Duration::from_millis(10),
            ..ExtractorConfig::default()
        };
        let extractor =
            FieldExtractor::new(Arc::new(SemanticMatcher::new()), config).with_llm(llm.clone());
        let outcome = extractor.extract_all(COMPLEX, &[], None).await;
        assert_ne!(outcome.layer, ExtractionLayer::Llm);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    struct UnreachableLlm;

    #[async_trait]
    impl LlmProvider for UnreachableLlm {
        fn model_name(&self) -> &str {
            "unreachable"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::RequestFailed {
                provider: "unreachable".into(),
                reason: "connection refused".into(),
            })
        }
    }

    #[tokio::test]
    async fn provider_error_falls_through() {
        let extractor = extractor().with_llm(Arc::new(UnreachableLlm));
        let outcome = extractor.extract_all(COMPLEX, &[], None).await;
        assert_ne!(outcome.layer, ExtractionLayer::Llm);
    }

    #[tokio::test]
    async fn disabled_llm_is_never_called() {
        let llm = Arc::new(MockLlm::replying("{}"));
        let config = ExtractorConfig {
            use_llm: false,
            ..ExtractorConfig::default()
        };
        let extractor =
            FieldExtractor::new(Arc::new(SemanticMatcher::new()), config).with_llm(llm.clone());
        assert!(!extractor.llm_available());
        extractor.extract_all(COMPLEX, &[], None).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn regex_fallback_for_unmatched_input() {
        let outcome = extractor()
            .extract_all("I just turned 50 last week, yay", &[], None)
            .await;
        assert_eq!(outcome.layer, ExtractionLayer::Regex);
        assert_eq!(outcome.fields[names::AGE].value.as_f64(), Some(50.0));
    }

    #[tokio::test]
    async fn low_confidence_semantic_needs_clarification() {
        let outcome = extractor()
            .extract_all("I think so", &[], Some(names::CONDITIONS))
            .await;
        let conditions = &outcome.fields[names::CONDITIONS];
        assert_eq!(conditions.value, FieldValue::text("uncertain"));
        assert!(conditions.needs_clarification);
        assert_eq!(conditions.tag(), FieldConfidence::NeedsClarification);
    }

    // ── Side-channel tests ──────────────────────────────────────────

    #[tokio::test]
    async fn urgent_symptoms_survive_any_layer() {
        let outcome = extractor()
            .extract_all("I have chest pain", &[], Some(names::AGE))
            .await;
        assert_eq!(outcome.urgent_symptoms, vec!["chest pain"]);
    }

    #[tokio::test]
    async fn open_answer_capture() {
        let outcome = extractor()
            .extract_all("I kept up the evening walks", &[], Some(names::HABITS_FOLLOWED))
            .await;
        let followed = &outcome.fields[names::HABITS_FOLLOWED];
        assert_eq!(followed.value, FieldValue::text("I kept up the evening walks"));
        assert_eq!(followed.source, ExtractionSource::OpenAnswer);
        assert_eq!(followed.tag(), FieldConfidence::Medium);

        let outcome = extractor()
            .extract_all("purple", &[], Some(names::SMOKING))
            .await;
        assert!(!outcome.fields.contains_key(names::SMOKING));
    }

    #[tokio::test]
    async fn implied_facts_are_reported() {
        let outcome = extractor()
            .extract_all("I work night shift", &[], Some(names::CONSTRAINTS))
            .await;
        assert_eq!(outcome.implied["sleep_pattern"], "irregular (works nights)");
    }
}
