//! Analysis Orchestrator
//!
//! The run state machine: validate the repository, then for each priority
//! tier in order fetch the matching files, stream one AI analysis, re-emit
//! every finding as an `issue` event, and pause for caller approval before
//! opening the next tier.
//!
//! ```text
//! Idle → ValidatingRepository → FetchingTier(n) → AnalyzingTier(n)
//!          → AwaitingApproval(n)  [n < 3]
//!          → FetchingTier(n+1) → ... → Complete | Failed
//! ```
//!
//! Event ordering within one tier: `status`/`file` events strictly precede
//! `issue` events, which precede that tier's `complete` event; tiers never
//! interleave. Any fatal error emits exactly one `error` event and closes
//! the stream. A dropped event receiver is the cancellation signal: the run
//! ceases all further work and emission.

mod preflight;
mod session;

pub use preflight::{Preflight, RepoEstimate, TierPreflight};
pub use session::AnalysisSession;

use secrecy::SecretString;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace, warn};
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::constants::{stream, tiers};
use crate::cost::{PricingModel, estimate_output_tokens, estimate_tokens_from_size};
use crate::engine::{AnalysisEngine, EngineEvent};
use crate::gateway::{ContentGateway, FetchProgress};
use crate::types::{
    AnalysisEvent, ErrorPayload, FilePayload, FileStatus, FileTreeEntry, LensError, PriorityTier,
    RepoMetadata, RepoRef, Result, RunSummary, StatusPayload, TierCompletePayload, TierEstimate,
    TierResult,
};

/// Input for one analysis run.
#[derive(Debug)]
pub struct StartRequest {
    pub repository_url: String,
    pub ai_credential: SecretString,
    pub starting_tier: PriorityTier,
}

/// Caller verdict on a completed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Stop,
}

/// Out-of-band approve/stop signal, tagged with the tier it answers.
/// Signals for any other tier are ignored; the run keeps waiting.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalSignal {
    pub tier: PriorityTier,
    pub decision: ApprovalDecision,
}

/// Mutable aggregate of one in-flight run. Tier results append as tiers
/// complete; the awaiting-approval state lives in the control flow of
/// [`Orchestrator::run`].
struct RunState {
    run_id: String,
    metadata: RepoMetadata,
    tiers: Vec<TierResult>,
    skipped: Vec<PriorityTier>,
}

impl RunState {
    fn new(run_id: String, metadata: RepoMetadata) -> Self {
        Self {
            run_id,
            metadata,
            tiers: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn record(&mut self, result: TierResult) {
        self.tiers.push(result);
    }

    /// Mark `first` and everything after it as skipped (caller stopped
    /// early).
    fn skip_from(&mut self, first: PriorityTier) {
        let mut tier = Some(first);
        while let Some(t) = tier {
            self.skipped.push(t);
            tier = t.next();
        }
    }

    fn finish(self, started: Instant) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            repository: self.metadata,
            total_input_tokens: self.tiers.iter().map(|t| t.input_tokens).sum(),
            total_output_tokens: self.tiers.iter().map(|t| t.output_tokens).sum(),
            total_cost_usd: self.tiers.iter().map(|t| t.cost_usd).sum(),
            tiers: self.tiers,
            skipped_tiers: self.skipped,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

pub struct Orchestrator {
    gateway: Arc<ContentGateway>,
    engine: AnalysisEngine,
    classifier: Classifier,
    pricing: PricingModel,
    max_files_per_tier: usize,
    heartbeat_interval: Duration,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<ContentGateway>,
        engine: AnalysisEngine,
        classifier: Classifier,
        pricing: PricingModel,
    ) -> Self {
        Self {
            gateway,
            engine,
            classifier,
            pricing,
            max_files_per_tier: tiers::DEFAULT_MAX_FILES_PER_TIER,
            heartbeat_interval: Duration::from_secs(stream::HEARTBEAT_INTERVAL_SECS),
        }
    }

    pub fn with_max_files(mut self, max_files_per_tier: usize) -> Self {
        self.max_files_per_tier = max_files_per_tier;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Drive one run to its terminal state.
    ///
    /// Events go out on `events`; approval verdicts come in on `approvals`.
    /// Every fatal error is reported as a single `error` event before this
    /// returns, except cancellation (the receiver is already gone).
    pub async fn run(
        &self,
        request: StartRequest,
        events: mpsc::Sender<AnalysisEvent>,
        approvals: mpsc::Receiver<ApprovalSignal>,
    ) -> Result<RunSummary> {
        let run_id = Uuid::new_v4().to_string();
        info!(run_id, url = %request.repository_url, "starting analysis run");

        match self.run_inner(&run_id, request, &events, approvals).await {
            Ok(summary) => Ok(summary),
            Err(err) if err.is_cancelled() => {
                info!(run_id, "run cancelled by caller");
                Err(err)
            }
            Err(err) => {
                warn!(run_id, %err, "run failed");
                let _ = events
                    .send(AnalysisEvent::Error(ErrorPayload::from_error(&err)))
                    .await;
                Err(err)
            }
        }
    }

    async fn run_inner(
        &self,
        run_id: &str,
        request: StartRequest,
        events: &mpsc::Sender<AnalysisEvent>,
        mut approvals: mpsc::Receiver<ApprovalSignal>,
    ) -> Result<RunSummary> {
        let started = Instant::now();

        emit(
            events,
            AnalysisEvent::Status(StatusPayload::message("Validating repository")),
        )
        .await?;

        let repo = RepoRef::parse(&request.repository_url)?;
        let metadata = self.gateway.get_metadata(&repo).await?;
        if metadata.private && !self.gateway.has_credential() {
            return Err(LensError::PrivateRepo {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
            });
        }

        let tree = self
            .gateway
            .get_file_tree(&repo, &metadata.default_branch)
            .await?;
        emit(
            events,
            AnalysisEvent::Status(StatusPayload::message(format!(
                "Repository {} validated: {} files at {}",
                metadata.full_name,
                tree.len(),
                metadata.default_branch
            ))),
        )
        .await?;

        let mut state = RunState::new(run_id.to_string(), metadata);
        let mut tier = request.starting_tier;

        loop {
            let result = self
                .run_tier(&repo, &tree, tier, &request.ai_credential, events)
                .await?;

            let next_estimate = tier.next().map(|next| self.estimate_tier(&tree, next, &result));
            emit(
                events,
                AnalysisEvent::Complete(TierCompletePayload {
                    priority: tier,
                    files_scanned: result.files_scanned,
                    issues_found: result.findings.len(),
                    tokens_used: result.tokens_used(),
                    cost: result.cost_usd,
                    next_priority_estimate: next_estimate,
                }),
            )
            .await?;

            state.record(result);

            let Some(next) = tier.next() else {
                break;
            };

            match self.await_approval(tier, &mut approvals, events).await? {
                ApprovalDecision::Approve => tier = next,
                ApprovalDecision::Stop => {
                    state.skip_from(next);
                    break;
                }
            }
        }

        let summary = state.finish(started);
        info!(
            run_id,
            findings = summary.total_findings(),
            cost_usd = summary.total_cost_usd,
            duration_ms = summary.duration_ms,
            "run complete"
        );
        Ok(summary)
    }

    /// Fetch and analyze one tier. Zero matching (or zero surviving) files
    /// short-circuits to an empty result without touching the AI service.
    async fn run_tier(
        &self,
        repo: &RepoRef,
        tree: &[FileTreeEntry],
        tier: PriorityTier,
        credential: &SecretString,
        events: &mpsc::Sender<AnalysisEvent>,
    ) -> Result<TierResult> {
        let matched = self.classifier.files_for_tier(tree, tier);
        let selected: Vec<String> = matched
            .iter()
            .take(self.max_files_per_tier)
            .map(|entry| entry.path.clone())
            .collect();

        info!(
            %tier,
            matched = matched.len(),
            selected = selected.len(),
            "tier fetch phase"
        );

        if selected.is_empty() {
            emit(
                events,
                AnalysisEvent::Status(StatusPayload::message(format!(
                    "No files matched priority {} ({})",
                    tier,
                    tier.label()
                ))),
            )
            .await?;
            return Ok(TierResult::empty(tier));
        }

        emit(
            events,
            AnalysisEvent::Status(StatusPayload {
                message: format!("Fetching {} {} files", selected.len(), tier.label()),
                files_scanned: 0,
                total_files: selected.len(),
                current_file: None,
            }),
        )
        .await?;
        for path in &selected {
            emit(
                events,
                AnalysisEvent::File(FilePayload {
                    path: path.clone(),
                    priority: tier,
                    status: FileStatus::Scanning,
                }),
            )
            .await?;
        }

        let (progress_tx, mut progress_rx) =
            mpsc::channel::<FetchProgress>(stream::EVENT_CHANNEL_CAPACITY);
        let gateway = self.gateway.clone();
        let fetch_repo = repo.clone();
        let paths = selected.clone();
        let max_files = self.max_files_per_tier;
        let fetch = tokio::spawn(async move {
            gateway
                .get_file_contents(&fetch_repo, &paths, max_files, Some(progress_tx))
                .await
        });

        while let Some(progress) = progress_rx.recv().await {
            if let Err(err) = self.forward_progress(tier, &progress, events).await {
                // Cancelled mid-fetch: stop the in-flight batch work and
                // discard whatever it already gathered.
                fetch.abort();
                return Err(err);
            }
        }

        let outcome = fetch
            .await
            .map_err(|e| LensError::Internal(format!("fetch task failed: {}", e)))??;

        let files = outcome.fetched;
        if files.is_empty() {
            warn!(%tier, "no file content survived the fetch, completing tier with zero findings");
            return Ok(TierResult::empty(tier));
        }

        emit(
            events,
            AnalysisEvent::Status(StatusPayload::message(format!(
                "Analyzing {} files with the priority {} rubric",
                files.len(),
                tier
            ))),
        )
        .await?;

        // Raw stream fragments are not part of the caller protocol; drain
        // them at trace level so the engine channel never backs up.
        let (engine_tx, mut engine_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(event) = engine_rx.recv().await {
                if let EngineEvent::Chunk { text } = event {
                    trace!(bytes = text.len(), "analysis stream chunk");
                }
            }
        });

        let analysis = self
            .engine
            .stream_analyze(&files, credential, tier, engine_tx)
            .await?;

        for finding in &analysis.findings {
            emit(events, AnalysisEvent::Issue(finding.clone())).await?;
        }

        Ok(TierResult {
            tier,
            files_scanned: files.len(),
            findings: analysis.findings,
            input_tokens: analysis.input_tokens,
            output_tokens: analysis.output_tokens,
            cost_usd: analysis.cost_usd,
        })
    }

    /// Re-emit one gateway progress notification as a `status` event, plus
    /// a `file` completion event when the fetch succeeded. Failed fetches
    /// stay visible only in the counters.
    async fn forward_progress(
        &self,
        tier: PriorityTier,
        progress: &FetchProgress,
        events: &mpsc::Sender<AnalysisEvent>,
    ) -> Result<()> {
        emit(
            events,
            AnalysisEvent::Status(StatusPayload {
                message: format!("Scanned {} of {} files", progress.processed, progress.total),
                files_scanned: progress.processed,
                total_files: progress.total,
                current_file: Some(progress.path.clone()),
            }),
        )
        .await?;

        if progress.ok {
            emit(
                events,
                AnalysisEvent::File(FilePayload {
                    path: progress.path.clone(),
                    priority: tier,
                    status: FileStatus::Complete,
                }),
            )
            .await?;
        }
        Ok(())
    }

    /// Forward-looking estimate for `tier`, extrapolated from the previous
    /// tier's observed tokens per file. A previous tier that scanned zero
    /// files falls back to tree-entry byte sizes, the same arithmetic the
    /// pre-flight estimate uses.
    fn estimate_tier(
        &self,
        tree: &[FileTreeEntry],
        tier: PriorityTier,
        previous: &TierResult,
    ) -> TierEstimate {
        let matched = self.classifier.files_for_tier(tree, tier);
        let count = matched.len().min(self.max_files_per_tier);

        let input_tokens = if previous.files_scanned > 0 {
            previous.input_tokens / previous.files_scanned as u64 * count as u64
        } else {
            matched
                .iter()
                .take(count)
                .map(|entry| estimate_tokens_from_size(entry.size))
                .sum()
        };
        let output_tokens = estimate_output_tokens(input_tokens);

        TierEstimate {
            files: count,
            estimated_tokens: input_tokens + output_tokens,
            estimated_cost: self.pricing.cost(input_tokens, output_tokens),
        }
    }

    /// Suspend until the caller answers for `completed`. No timeout: an
    /// abandoned run keeps heartbeating indefinitely. A dropped approval
    /// sender is read as an early stop.
    async fn await_approval(
        &self,
        completed: PriorityTier,
        approvals: &mut mpsc::Receiver<ApprovalSignal>,
        events: &mpsc::Sender<AnalysisEvent>,
    ) -> Result<ApprovalDecision> {
        info!(tier = %completed, "awaiting approval to continue");

        let mut heartbeat = tokio::time::interval(self.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so the initial
        // heartbeat lands one full interval after the pause begins.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                signal = approvals.recv() => match signal {
                    Some(signal) if signal.tier == completed => {
                        info!(tier = %completed, decision = ?signal.decision, "approval received");
                        return Ok(signal.decision);
                    }
                    Some(signal) => {
                        warn!(expected = %completed, got = %signal.tier, "ignoring approval signal for wrong tier");
                    }
                    None => return Ok(ApprovalDecision::Stop),
                },
                _ = heartbeat.tick() => {
                    emit(events, AnalysisEvent::Heartbeat).await?;
                }
            }
        }
    }
}

/// A send failure means the caller dropped the receiver: the run is
/// cancelled and must stop all further work.
async fn emit(events: &mpsc::Sender<AnalysisEvent>, event: AnalysisEvent) -> Result<()> {
    events.send(event).await.map_err(|_| LensError::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;

    use crate::engine::{
        CompletionBackend, CompletionOutcome, CompletionRequest, CompletionUsage, DeltaCallback,
    };
    use crate::gateway::HostingProvider;
    use crate::types::RepoMetadata;

    struct FakeHost {
        private: bool,
        has_credential: bool,
        tree: Vec<FileTreeEntry>,
        contents: HashMap<String, String>,
        metadata_calls: AtomicUsize,
        tree_calls: AtomicUsize,
        fetched_paths: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                private: false,
                has_credential: false,
                tree: files
                    .iter()
                    .map(|(path, content)| FileTreeEntry {
                        path: path.to_string(),
                        size: content.len() as u64,
                        sha: format!("sha-{}", path),
                    })
                    .collect(),
                contents: files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
                metadata_calls: AtomicUsize::new(0),
                tree_calls: AtomicUsize::new(0),
                fetched_paths: Mutex::new(Vec::new()),
            }
        }

        fn private(mut self) -> Self {
            self.private = true;
            self
        }
    }

    #[async_trait]
    impl HostingProvider for FakeHost {
        async fn get_metadata(&self, repo: &RepoRef) -> Result<RepoMetadata> {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            Ok(RepoMetadata {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
                full_name: repo.to_string(),
                description: None,
                stars: 42,
                language: Some("Rust".to_string()),
                updated_at: chrono::Utc::now(),
                default_branch: "main".to_string(),
                private: self.private,
            })
        }

        async fn get_tree(&self, _repo: &RepoRef, _branch: &str) -> Result<Vec<FileTreeEntry>> {
            self.tree_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tree.clone())
        }

        async fn get_file_content(&self, _repo: &RepoRef, path: &str) -> Result<String> {
            self.fetched_paths.lock().unwrap().push(path.to_string());
            self.contents
                .get(path)
                .cloned()
                .ok_or_else(|| LensError::AccessDenied(format!("missing: {}", path)))
        }

        fn has_credential(&self) -> bool {
            self.has_credential
        }
    }

    struct FakeBackend {
        response: String,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for FakeBackend {
        async fn stream_completion(
            &self,
            _credential: &SecretString,
            _request: &CompletionRequest,
            on_delta: &DeltaCallback<'_>,
        ) -> Result<CompletionOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            on_delta(&self.response);
            Ok(CompletionOutcome {
                text: self.response.clone(),
                usage: CompletionUsage {
                    input_tokens: 100,
                    output_tokens: 20,
                },
            })
        }
    }

    const ISSUE_JSON: &str = r#"{"issues":[{"severity":"CRITICAL","category":"security","file":".env","line":1,"title":"Live key committed","description":"A production key is in version control."}],"summary":"one issue"}"#;

    fn build(host: Arc<FakeHost>, backend: Arc<FakeBackend>) -> Arc<Orchestrator> {
        let gateway = Arc::new(ContentGateway::new(host));
        let engine = AnalysisEngine::new(backend, PricingModel::default());
        Arc::new(Orchestrator::new(
            gateway,
            engine,
            Classifier::new(),
            PricingModel::default(),
        ))
    }

    fn request() -> StartRequest {
        StartRequest {
            repository_url: "octocat/demo".to_string(),
            ai_credential: SecretString::from("sk-test"),
            starting_tier: PriorityTier::Security,
        }
    }

    /// Run a full session, answering every approval gate the same way.
    async fn drive(
        orchestrator: Arc<Orchestrator>,
        approve: bool,
    ) -> (Vec<AnalysisEvent>, Result<RunSummary>) {
        let mut session = AnalysisSession::start(orchestrator, request());
        let mut events = Vec::new();
        while let Some(event) = session.next_event().await {
            if let AnalysisEvent::Complete(payload) = &event {
                let tier = payload.priority;
                events.push(event);
                if tier != PriorityTier::Supporting {
                    if approve {
                        session.approve(tier).await;
                    } else {
                        session.stop(tier).await;
                    }
                }
                continue;
            }
            events.push(event);
        }
        let summary = session.join().await;
        (events, summary)
    }

    fn completes(events: &[AnalysisEvent]) -> Vec<&TierCompletePayload> {
        events
            .iter()
            .filter_map(|e| match e {
                AnalysisEvent::Complete(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_ignored_repo_completes_without_ai() {
        let host = Arc::new(FakeHost::new(&[
            ("logo.png", "binary"),
            ("banner.jpg", "binary"),
            ("icon.gif", "binary"),
        ]));
        let backend = Arc::new(FakeBackend::new(ISSUE_JSON));
        let orchestrator = build(host.clone(), backend.clone());

        let (events, summary) = drive(orchestrator, true).await;
        let summary = summary.unwrap();

        let completes = completes(&events);
        assert_eq!(completes.len(), 3);
        for payload in &completes {
            assert_eq!(payload.files_scanned, 0);
            assert_eq!(payload.issues_found, 0);
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(!events.iter().any(|e| matches!(e, AnalysisEvent::Error(_))));
        assert_eq!(summary.total_findings(), 0);
        assert_eq!(summary.total_cost_usd, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tier1_fetches_only_security_files() {
        let host = Arc::new(FakeHost::new(&[
            (".env", "API_KEY=sk-live"),
            ("README.md", "# demo"),
        ]));
        let backend = Arc::new(FakeBackend::new(ISSUE_JSON));
        let orchestrator = build(host.clone(), backend.clone());

        let (events, summary) = drive(orchestrator, false).await;
        let summary = summary.unwrap();

        assert_eq!(*host.fetched_paths.lock().unwrap(), vec![".env"]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.tiers.len(), 1);
        assert_eq!(summary.tiers[0].tier, PriorityTier::Security);
        assert_eq!(
            summary.skipped_tiers,
            vec![PriorityTier::CoreLogic, PriorityTier::Supporting]
        );
        assert_eq!(completes(&events).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fenced_findings_streamed_as_issue_events() {
        let fenced = format!("```json\n{}\n```", ISSUE_JSON);
        let host = Arc::new(FakeHost::new(&[(".env", "API_KEY=sk-live")]));
        let backend = Arc::new(FakeBackend::new(&fenced));
        let orchestrator = build(host, backend);

        let (events, summary) = drive(orchestrator, false).await;
        assert!(summary.is_ok());

        let issue_index = events
            .iter()
            .position(|e| matches!(e, AnalysisEvent::Issue(_)))
            .expect("an issue event");
        let complete_index = events
            .iter()
            .position(|e| matches!(e, AnalysisEvent::Complete(_)))
            .unwrap();
        assert!(issue_index < complete_index);

        match &events[issue_index] {
            AnalysisEvent::Issue(finding) => assert_eq!(finding.file, ".env"),
            _ => unreachable!(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_json_completes_tier_without_error() {
        let host = Arc::new(FakeHost::new(&[(".env", "API_KEY=sk-live")]));
        let backend = Arc::new(FakeBackend::new(r#"{"issues":[{"sev"#));
        let orchestrator = build(host, backend);

        let (events, summary) = drive(orchestrator, false).await;
        let summary = summary.unwrap();

        assert!(!events.iter().any(|e| matches!(e, AnalysisEvent::Error(_))));
        assert!(!events.iter().any(|e| matches!(e, AnalysisEvent::Issue(_))));
        let completes = completes(&events);
        assert_eq!(completes.len(), 1);
        assert_eq!(completes[0].issues_found, 0);
        // Tokens are still accounted even with nothing parsed.
        assert_eq!(summary.total_input_tokens, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_private_repo_without_credential_fails_fast() {
        let host = Arc::new(FakeHost::new(&[(".env", "secret")]).private());
        let backend = Arc::new(FakeBackend::new(ISSUE_JSON));
        let orchestrator = build(host.clone(), backend.clone());

        let (events, summary) = drive(orchestrator, true).await;

        assert!(matches!(summary, Err(LensError::PrivateRepo { .. })));
        let error = events
            .iter()
            .find_map(|e| match e {
                AnalysisEvent::Error(payload) => Some(payload),
                _ => None,
            })
            .expect("an error event");
        assert_eq!(error.code, "private_repo_requires_login");
        assert!(!error.retryable);
        // Failed before any tree listing or AI work.
        assert_eq!(host.tree_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_accumulates_across_tiers() {
        let host = Arc::new(FakeHost::new(&[
            (".env", "API_KEY=sk-live"),
            ("src/app.py", "print('hi')"),
            ("README.md", "# demo"),
        ]));
        let backend = Arc::new(FakeBackend::new(ISSUE_JSON));
        let orchestrator = build(host, backend.clone());

        let (events, summary) = drive(orchestrator, true).await;
        let summary = summary.unwrap();

        // One AI call per non-empty tier.
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary.tiers.len(), 3);
        assert!(summary.skipped_tiers.is_empty());
        assert_eq!(summary.total_input_tokens, 300);
        assert_eq!(summary.total_output_tokens, 60);
        assert_eq!(summary.total_findings(), 3);
        let expected_cost: f64 = summary.tiers.iter().map(|t| t.cost_usd).sum();
        assert!((summary.total_cost_usd - expected_cost).abs() < 1e-12);
        assert_eq!(completes(&events).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_event_carries_next_estimate() {
        let host = Arc::new(FakeHost::new(&[
            (".env", "API_KEY=sk-live"),
            ("src/app.py", "print('hi')"),
            ("README.md", "# demo"),
        ]));
        let backend = Arc::new(FakeBackend::new(ISSUE_JSON));
        let orchestrator = build(host, backend);

        let (events, _) = drive(orchestrator, true).await;
        let completes = completes(&events);

        let tier1 = completes
            .iter()
            .find(|p| p.priority == PriorityTier::Security)
            .unwrap();
        let estimate = tier1.next_priority_estimate.as_ref().expect("an estimate");
        assert_eq!(estimate.files, 1);
        // Extrapolated from tier 1's 100 input tokens over 1 file.
        assert_eq!(estimate.estimated_tokens, 100 + 20);
        assert!(estimate.estimated_cost > 0.0);

        let tier3 = completes
            .iter()
            .find(|p| p.priority == PriorityTier::Supporting)
            .unwrap();
        assert!(tier3.next_priority_estimate.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tier2_activity_before_approval() {
        let host = Arc::new(FakeHost::new(&[
            (".env", "API_KEY=sk-live"),
            ("src/app.py", "print('hi')"),
        ]));
        let backend = Arc::new(FakeBackend::new(ISSUE_JSON));
        let orchestrator = build(host, backend);

        let (event_tx, mut event_rx) = mpsc::channel(stream::EVENT_CHANNEL_CAPACITY);
        let (approval_tx, approval_rx) = mpsc::channel(4);
        let runner = orchestrator.clone();
        let handle =
            tokio::spawn(async move { runner.run(request(), event_tx, approval_rx).await });

        loop {
            match event_rx.recv().await.unwrap() {
                AnalysisEvent::Complete(p) if p.priority == PriorityTier::Security => break,
                _ => {}
            }
        }

        // While paused, nothing but heartbeats flows.
        for _ in 0..3 {
            match timeout(Duration::from_secs(20), event_rx.recv()).await {
                Ok(Some(AnalysisEvent::Heartbeat)) => {}
                Ok(Some(other)) => panic!("unexpected event before approval: {:?}", other),
                _ => panic!("stream ended while awaiting approval"),
            }
        }

        approval_tx
            .send(ApprovalSignal {
                tier: PriorityTier::Security,
                decision: ApprovalDecision::Approve,
            })
            .await
            .unwrap();

        // The next non-heartbeat event opens tier 2.
        let first = loop {
            match event_rx.recv().await.unwrap() {
                AnalysisEvent::Heartbeat => continue,
                event => break event,
            }
        };
        assert!(matches!(first, AnalysisEvent::Status(_)));

        loop {
            match event_rx.recv().await.unwrap() {
                AnalysisEvent::Complete(p) if p.priority == PriorityTier::CoreLogic => break,
                _ => {}
            }
        }
        approval_tx
            .send(ApprovalSignal {
                tier: PriorityTier::CoreLogic,
                decision: ApprovalDecision::Stop,
            })
            .await
            .unwrap();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.tiers.len(), 2);
        assert_eq!(summary.skipped_tiers, vec![PriorityTier::Supporting]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_approval_signal_ignored() {
        let host = Arc::new(FakeHost::new(&[(".env", "API_KEY=sk-live")]));
        let backend = Arc::new(FakeBackend::new(ISSUE_JSON));
        let orchestrator = build(host, backend);

        let (event_tx, mut event_rx) = mpsc::channel(stream::EVENT_CHANNEL_CAPACITY);
        let (approval_tx, approval_rx) = mpsc::channel(4);
        let runner = orchestrator.clone();
        let handle =
            tokio::spawn(async move { runner.run(request(), event_tx, approval_rx).await });

        loop {
            match event_rx.recv().await.unwrap() {
                AnalysisEvent::Complete(p) if p.priority == PriorityTier::Security => break,
                _ => {}
            }
        }

        // A verdict for the wrong tier does not unblock the gate.
        approval_tx
            .send(ApprovalSignal {
                tier: PriorityTier::Supporting,
                decision: ApprovalDecision::Approve,
            })
            .await
            .unwrap();
        match timeout(Duration::from_secs(20), event_rx.recv()).await {
            Ok(Some(AnalysisEvent::Heartbeat)) => {}
            other => panic!("expected a heartbeat, got {:?}", other),
        }

        approval_tx
            .send(ApprovalSignal {
                tier: PriorityTier::Security,
                decision: ApprovalDecision::Stop,
            })
            .await
            .unwrap();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.tiers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_event_receiver_cancels_run() {
        let host = Arc::new(FakeHost::new(&[(".env", "API_KEY=sk-live")]));
        let backend = Arc::new(FakeBackend::new(ISSUE_JSON));
        let orchestrator = build(host, backend.clone());

        let (event_tx, event_rx) = mpsc::channel(1);
        let (_approval_tx, approval_rx) = mpsc::channel(4);
        drop(event_rx);

        let err = orchestrator
            .run(request(), event_tx, approval_rx)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        // Cancellation observed before any AI work started.
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repo_not_found_is_terminal_error_event() {
        struct MissingHost;

        #[async_trait]
        impl HostingProvider for MissingHost {
            async fn get_metadata(&self, repo: &RepoRef) -> Result<RepoMetadata> {
                Err(LensError::RepoNotFound {
                    owner: repo.owner.clone(),
                    name: repo.name.clone(),
                })
            }
            async fn get_tree(&self, _: &RepoRef, _: &str) -> Result<Vec<FileTreeEntry>> {
                unreachable!()
            }
            async fn get_file_content(&self, _: &RepoRef, _: &str) -> Result<String> {
                unreachable!()
            }
            fn has_credential(&self) -> bool {
                false
            }
        }

        let gateway = Arc::new(ContentGateway::new(Arc::new(MissingHost)));
        let engine = AnalysisEngine::new(
            Arc::new(FakeBackend::new(ISSUE_JSON)),
            PricingModel::default(),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            gateway,
            engine,
            Classifier::new(),
            PricingModel::default(),
        ));

        let (events, summary) = drive(orchestrator, true).await;
        assert!(matches!(summary, Err(LensError::RepoNotFound { .. })));

        let errors: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AnalysisEvent::Error(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "repository_not_found");
        assert!(!errors[0].retryable);
    }
}
