//! Analysis Engine
//!
//! Wraps one streaming completion call per tier: selects the tier's
//! instruction prompt, concatenates the fetched files into the user
//! message, re-emits incremental text fragments as `chunk` events, and at
//! stream end leniently parses the accumulated text into findings.

mod backend;
mod parse;
mod prompts;

pub use backend::{
    AnthropicBackend, CompletionBackend, CompletionOutcome, CompletionRequest, CompletionUsage,
    DeltaCallback, DEFAULT_API_BASE,
};
pub use parse::{ParsedAnalysis, parse_analysis};
pub use prompts::{build_user_message, system_prompt};

use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::constants::engine;
use crate::cost::PricingModel;
use crate::types::{FetchedFile, Finding, PriorityTier, Result};

/// Incremental output of one tier analysis.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// One raw text fragment from the completion stream, in arrival order.
    Chunk { text: String },
    /// The parsed end-of-stream result.
    Complete {
        findings: Vec<Finding>,
        input_tokens: u64,
        output_tokens: u64,
        cost_usd: f64,
    },
}

/// Final accounting for one tier's analysis.
#[derive(Debug, Clone)]
pub struct TierAnalysis {
    pub findings: Vec<Finding>,
    pub summary: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

pub struct AnalysisEngine {
    backend: Arc<dyn CompletionBackend>,
    pricing: PricingModel,
    temperature: f32,
    max_output_tokens: u32,
}

impl AnalysisEngine {
    pub fn new(backend: Arc<dyn CompletionBackend>, pricing: PricingModel) -> Self {
        Self {
            backend,
            pricing,
            temperature: engine::TEMPERATURE,
            max_output_tokens: engine::MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_output_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Analyze one tier's files with a single streaming completion.
    ///
    /// Text fragments are forwarded on `events` as they arrive; findings
    /// only exist after the stream ends and the accumulated text parses.
    /// Send failures are ignored: a caller that dropped the receiver
    /// simply stops seeing chunks.
    pub async fn stream_analyze(
        &self,
        files: &[FetchedFile],
        credential: &SecretString,
        tier: PriorityTier,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<TierAnalysis> {
        let request = CompletionRequest {
            system_prompt: system_prompt(tier),
            user_message: build_user_message(files),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        };

        info!(
            %tier,
            files = files.len(),
            "starting tier analysis stream"
        );

        let chunk_events = events.clone();
        let on_delta = move |text: &str| {
            let _ = chunk_events.send(EngineEvent::Chunk {
                text: text.to_string(),
            });
        };

        let outcome = self
            .backend
            .stream_completion(credential, &request, &on_delta)
            .await?;

        let parsed = parse_analysis(&outcome.text);
        let cost_usd = self
            .pricing
            .cost(outcome.usage.input_tokens, outcome.usage.output_tokens);

        info!(
            %tier,
            findings = parsed.findings.len(),
            input_tokens = outcome.usage.input_tokens,
            output_tokens = outcome.usage.output_tokens,
            "tier analysis complete"
        );

        let analysis = TierAnalysis {
            findings: parsed.findings,
            summary: parsed.summary,
            input_tokens: outcome.usage.input_tokens,
            output_tokens: outcome.usage.output_tokens,
            cost_usd,
        };

        let _ = events.send(EngineEvent::Complete {
            findings: analysis.findings.clone(),
            input_tokens: analysis.input_tokens,
            output_tokens: analysis.output_tokens,
            cost_usd: analysis.cost_usd,
        });

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::types::LensError;

    /// Backend that streams a scripted response in fixed-size fragments.
    struct ScriptedBackend {
        response: String,
        usage: CompletionUsage,
        calls: AtomicUsize,
        fail_with: Option<fn() -> LensError>,
    }

    impl ScriptedBackend {
        fn new(response: &str, input_tokens: u64, output_tokens: u64) -> Self {
            Self {
                response: response.to_string(),
                usage: CompletionUsage {
                    input_tokens,
                    output_tokens,
                },
                calls: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        fn failing(err: fn() -> LensError) -> Self {
            Self {
                response: String::new(),
                usage: CompletionUsage::default(),
                calls: AtomicUsize::new(0),
                fail_with: Some(err),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn stream_completion(
            &self,
            _credential: &SecretString,
            _request: &CompletionRequest,
            on_delta: &DeltaCallback<'_>,
        ) -> Result<CompletionOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.fail_with {
                return Err(err());
            }
            let fragments: Vec<String> = self
                .response
                .chars()
                .collect::<Vec<_>>()
                .chunks(8)
                .map(|c| c.iter().collect())
                .collect();
            for fragment in &fragments {
                on_delta(fragment);
            }
            Ok(CompletionOutcome {
                text: self.response.clone(),
                usage: self.usage,
            })
        }
    }

    fn files() -> Vec<FetchedFile> {
        vec![FetchedFile {
            path: ".env".to_string(),
            content: "API_KEY=sk-live-123".to_string(),
            size: 19,
        }]
    }

    fn credential() -> SecretString {
        SecretString::from("test-key")
    }

    const FINDINGS_JSON: &str = r#"{"issues":[{"severity":"CRITICAL","category":"security","file":".env","line":1,"title":"Live API key committed","description":"A production key is in version control."}],"summary":"One critical issue."}"#;

    #[tokio::test]
    async fn test_stream_analyze_parses_findings() {
        let backend = Arc::new(ScriptedBackend::new(FINDINGS_JSON, 800, 120));
        let engine = AnalysisEngine::new(backend, PricingModel::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let analysis = engine
            .stream_analyze(&files(), &credential(), PriorityTier::Security, tx)
            .await
            .unwrap();

        assert_eq!(analysis.findings.len(), 1);
        assert_eq!(analysis.findings[0].file, ".env");
        assert_eq!(analysis.input_tokens, 800);
        assert_eq!(analysis.output_tokens, 120);
        assert!(analysis.cost_usd > 0.0);

        // Chunks precede the complete event and reassemble the raw text.
        let mut text = String::new();
        let mut saw_complete = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                EngineEvent::Chunk { text: t } => {
                    assert!(!saw_complete);
                    text.push_str(&t);
                }
                EngineEvent::Complete { findings, .. } => {
                    saw_complete = true;
                    assert_eq!(findings.len(), 1);
                }
            }
        }
        assert!(saw_complete);
        assert_eq!(text, FINDINGS_JSON);
    }

    #[tokio::test]
    async fn test_fenced_json_parsed() {
        let fenced = format!("```json\n{}\n```", FINDINGS_JSON);
        let backend = Arc::new(ScriptedBackend::new(&fenced, 10, 10));
        let engine = AnalysisEngine::new(backend, PricingModel::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let analysis = engine
            .stream_analyze(&files(), &credential(), PriorityTier::Security, tx)
            .await
            .unwrap();
        assert_eq!(analysis.findings.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_json_is_zero_findings_not_error() {
        let backend = Arc::new(ScriptedBackend::new(r#"{"issues":[{"sev"#, 10, 10));
        let engine = AnalysisEngine::new(backend, PricingModel::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let analysis = engine
            .stream_analyze(&files(), &credential(), PriorityTier::CoreLogic, tx)
            .await
            .unwrap();
        // Tokens are still accounted even when nothing parsed.
        assert_eq!(analysis.input_tokens, 10);
    }

    #[tokio::test]
    async fn test_auth_error_propagates() {
        let backend = Arc::new(ScriptedBackend::failing(|| LensError::AiInvalidCredentials));
        let engine = AnalysisEngine::new(backend, PricingModel::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = engine
            .stream_analyze(&files(), &credential(), PriorityTier::Security, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::AiInvalidCredentials));
        assert!(!err.retryable());
    }

    #[tokio::test]
    async fn test_dropped_chunk_receiver_is_harmless() {
        let backend = Arc::new(ScriptedBackend::new(FINDINGS_JSON, 10, 10));
        let engine = AnalysisEngine::new(backend, PricingModel::default());
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let analysis = engine
            .stream_analyze(&files(), &credential(), PriorityTier::Security, tx)
            .await
            .unwrap();
        assert_eq!(analysis.findings.len(), 1);
    }
}
