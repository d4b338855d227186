//! Provider orchestrator: runs the decision table for one request, falls
//! back on failure and turns the first extracted text into a suggestion.

use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::decision::{decide, reached_service, Blocker, CloudAvailability, Facts, Plan, Step};
use super::status::{LogStatus, StatusSink, TokenProgress};
use super::token::RequestTokens;
use crate::error::{StoreError, StrategyError};
use crate::memory::{JsonVendorStore, MemoryVendorStore, VendorMemory, VendorMemoryEntry, VendorStore};
use crate::models::config::RcptConfig;
use crate::models::receipt::{
    ExtractionMode, ExtractionRequest, MediaKind, OcrSuggestion, Provider, ProviderDecision,
    RequestToken,
};
use crate::ocr::{CloudDocument, CloudOcr, DocumentPayload, HttpCloudOcr, LocalOcr, TextNormalizer};
use crate::pdf::{join_pages, PdfExtractor, TextLayer};
use crate::quota::{JsonQuotaStore, MemoryQuotaStore, QuotaState, QuotaStore, QuotaTracker};
use crate::receipt::{ReceiptParser, VendorSource};

/// One strategy attempt of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    pub token: RequestToken,
    pub decision: ProviderDecision,
    /// `None` when text was extracted but no field was found.
    pub suggestion: Option<OcrSuggestion>,
    pub category: String,
    pub vendor_source: Option<VendorSource>,
    /// Text the fields were extracted from.
    pub text: String,
    /// Quota after this run's cloud call, if one completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaState>,
    pub attempts: Vec<Attempt>,
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RunOutcome {
    Completed(PipelineResult),
    /// Every strategy failed or none could run.
    Failed {
        token: RequestToken,
        decision: ProviderDecision,
        blocker: Blocker,
        attempts: Vec<Attempt>,
    },
    /// A newer request was issued before this one finished. Nothing of
    /// this run was applied.
    Superseded { token: RequestToken },
}

impl RunOutcome {
    pub fn token(&self) -> RequestToken {
        match self {
            RunOutcome::Completed(result) => result.token,
            RunOutcome::Failed { token, .. } | RunOutcome::Superseded { token } => *token,
        }
    }

    pub fn completed(&self) -> Option<&PipelineResult> {
        match self {
            RunOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }
}

enum StepFailure {
    Superseded,
    Failed(StrategyError),
}

impl From<StrategyError> for StepFailure {
    fn from(err: StrategyError) -> Self {
        StepFailure::Failed(err)
    }
}

struct Extracted {
    text: String,
    hints: Option<CloudDocument>,
}

type Prepared = (DynamicImage, DocumentPayload);

/// The suggestion pipeline.
///
/// Shared state (quota, vendor memory, status) is only mutated while the
/// run's token is current.
pub struct Pipeline {
    document_type: String,
    cloud: Option<Arc<dyn CloudOcr>>,
    local: Option<Arc<dyn LocalOcr>>,
    text_layer: Option<Arc<dyn TextLayer>>,
    normalizer: TextNormalizer,
    parser: ReceiptParser,
    quota: QuotaTracker,
    memory: Mutex<VendorMemory>,
    vendor_store: Arc<dyn VendorStore>,
    tokens: Arc<RequestTokens>,
    status: Arc<dyn StatusSink>,
}

impl Pipeline {
    pub fn builder(config: RcptConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn tokens(&self) -> &RequestTokens {
        &self.tokens
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    /// Snapshot of the vendor memory.
    pub async fn memory_entries(&self) -> Vec<VendorMemoryEntry> {
        self.memory.lock().await.entries().to_vec()
    }

    /// Create a request for `file`, superseding every earlier request.
    pub fn new_request(&self, file: impl Into<PathBuf>, mode: ExtractionMode) -> ExtractionRequest {
        let file = file.into();
        ExtractionRequest {
            media: MediaKind::from_path(&file),
            token: self.tokens.issue(),
            file,
            mode,
        }
    }

    /// Issue a request for `file` and run it.
    pub async fn suggest(&self, file: impl Into<PathBuf>, mode: ExtractionMode) -> RunOutcome {
        let request = self.new_request(file, mode);
        self.run(&request).await
    }

    pub fn cloud_availability(&self) -> CloudAvailability {
        match &self.cloud {
            None => CloudAvailability::NotConfigured,
            Some(cloud) if !cloud.is_enabled() => CloudAvailability::Disabled,
            Some(cloud) if !cloud.is_configured() => CloudAvailability::NotConfigured,
            Some(_) => {
                let state = self.quota.status(None);
                if state.is_exhausted() {
                    CloudAvailability::QuotaExhausted {
                        used: state.used,
                        limit: state.limit,
                    }
                } else {
                    CloudAvailability::Available
                }
            }
        }
    }

    fn facts(&self, request: &ExtractionRequest) -> Facts {
        Facts {
            mode: request.mode,
            media: request.media,
            pdf_text: self.text_layer.as_ref().is_some_and(|t| t.is_available()),
            cloud: self.cloud_availability(),
            local: self.local.as_ref().is_some_and(|l| l.is_available()),
        }
    }

    fn is_current(&self, token: RequestToken) -> bool {
        self.tokens.is_current(token)
    }

    fn report(&self, token: RequestToken, message: &str) {
        if self.is_current(token) {
            self.status.status(token, message);
        }
    }

    fn superseded(&self, token: RequestToken) -> RunOutcome {
        debug!("{} superseded, discarding result", token);
        RunOutcome::Superseded { token }
    }

    /// Run one request through the decision table.
    pub async fn run(&self, request: &ExtractionRequest) -> RunOutcome {
        let token = request.token;
        if !self.is_current(token) {
            return self.superseded(token);
        }

        let data = tokio::fs::read(&request.file).await;
        if !self.is_current(token) {
            return self.superseded(token);
        }
        let data = match data {
            Ok(data) => data,
            Err(e) => {
                let blocker = Blocker::FileUnreadable(e.to_string());
                return self.fail(token, blocker, Vec::new());
            }
        };

        let facts = self.facts(request);
        let (rule, plan) = decide(&facts);
        info!(
            "{} {}: rule '{}' -> {:?}",
            token,
            request.file.display(),
            rule.name,
            plan.steps
        );

        let mut attempts = Vec::new();
        let mut blocker = plan.exhausted.clone();
        let mut prepared: Option<Prepared> = None;

        for &step in &plan.steps {
            let provider = Provider::from(step);
            self.report(token, &format!("Running {} ({})", provider, plan.reason));

            let result = match step {
                Step::PdfText => self.extract_pdf_text(token, &data).await,
                Step::CloudOcr => self.extract_cloud(request.media, &data, &mut prepared).await,
                Step::LocalOcr => self.extract_local(token, &data, &mut prepared).await,
            };
            if !self.is_current(token) {
                return self.superseded(token);
            }

            match result {
                Ok(extracted) => {
                    return self.complete(token, step, &plan, extracted, attempts).await;
                }
                Err(StepFailure::Superseded) => return self.superseded(token),
                Err(StepFailure::Failed(error)) => {
                    if step == Step::CloudOcr && reached_service(&error) {
                        self.quota.increment(None);
                    }
                    warn!("{} {} failed: {}", token, provider, error);
                    self.report(token, &format!("{} failed: {}", provider, error));
                    blocker = plan.blocker_for(step, &error);
                    attempts.push(Attempt {
                        provider,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        self.fail(token, blocker, attempts)
    }

    fn fail(&self, token: RequestToken, blocker: Blocker, attempts: Vec<Attempt>) -> RunOutcome {
        warn!("{} no text extracted: {}", token, blocker);
        self.report(token, &blocker.to_string());
        RunOutcome::Failed {
            token,
            decision: ProviderDecision::new(Provider::None, blocker.to_string()),
            blocker,
            attempts,
        }
    }

    async fn complete(
        &self,
        token: RequestToken,
        step: Step,
        plan: &Plan,
        extracted: Extracted,
        mut attempts: Vec<Attempt>,
    ) -> RunOutcome {
        let provider = Provider::from(step);

        let mut memory = self.memory.lock().await;
        if !self.is_current(token) {
            return self.superseded(token);
        }

        let parsed = self
            .parser
            .parse_with_hints(&extracted.text, extracted.hints.as_ref(), &memory);

        let quota = (step == Step::CloudOcr).then(|| self.quota.increment(None));

        if let Some(found) = &parsed.memory_match {
            if let Some(entry) = memory.remember(&extracted.text, &found.name).cloned() {
                if let Err(e) = self.vendor_store.upsert(&entry) {
                    warn!("Failed to persist vendor '{}': {}", entry.key, e);
                }
            }
        }
        drop(memory);

        attempts.push(Attempt {
            provider,
            error: None,
        });
        self.report(token, &format!("Suggested fields via {}", provider));

        RunOutcome::Completed(PipelineResult {
            token,
            decision: ProviderDecision::new(provider, plan.reason),
            suggestion: parsed.suggestion,
            category: parsed.category,
            vendor_source: parsed.vendor_source,
            text: extracted.text,
            quota,
            attempts,
        })
    }

    /// Record a user-accepted vendor for this text in memory.
    pub async fn confirm_vendor(
        &self,
        text: &str,
        vendor: &str,
    ) -> Result<Option<VendorMemoryEntry>, StoreError> {
        let mut memory = self.memory.lock().await;
        let Some(entry) = memory.remember(text, vendor).cloned() else {
            return Ok(None);
        };
        self.vendor_store.upsert(&entry)?;
        info!("Confirmed vendor '{}' (seen {} times)", entry.name, entry.count);
        Ok(Some(entry))
    }

    fn prepare<'a>(
        &self,
        data: &[u8],
        cache: &'a mut Option<Prepared>,
    ) -> Result<&'a Prepared, StrategyError> {
        let prepared = match cache.take() {
            Some(prepared) => prepared,
            None => self.normalizer.prepare(data)?,
        };
        Ok(cache.insert(prepared))
    }

    async fn extract_pdf_text(
        &self,
        token: RequestToken,
        data: &[u8],
    ) -> Result<Extracted, StepFailure> {
        let layer = self.text_layer.clone().ok_or_else(|| {
            StrategyError::UnsupportedInput("PDF text layer unavailable".to_string())
        })?;
        let bytes = data.to_vec();
        let mut source = off_executor(move || layer.open(&bytes))
            .await?
            .map_err(StrategyError::from)?;

        let mut pages = Vec::new();
        for page in 1..=source.page_count() {
            tokio::task::yield_now().await;
            if !self.is_current(token) {
                return Err(StepFailure::Superseded);
            }
            let (returned, text) = off_executor(move || {
                let text = source.page_text(page);
                (source, text)
            })
            .await?;
            source = returned;

            match text {
                Ok(text) => pages.push(text),
                Err(e) => warn!("{} page {} unreadable: {}", token, page, e),
            }
        }

        let text = join_pages(&pages);
        if text.is_empty() {
            return Err(StrategyError::EmptyResult.into());
        }
        debug!("{} PDF text layer: {} chars", token, text.len());
        Ok(Extracted { text, hints: None })
    }

    async fn extract_cloud(
        &self,
        media: MediaKind,
        data: &[u8],
        prepared: &mut Option<Prepared>,
    ) -> Result<Extracted, StepFailure> {
        let cloud = self
            .cloud
            .as_ref()
            .ok_or_else(|| StrategyError::Configuration("no cloud OCR client".to_string()))?;

        if let CloudAvailability::QuotaExhausted { used, limit } = self.cloud_availability() {
            return Err(StrategyError::QuotaExceeded { used, limit }.into());
        }

        let payload = match media {
            MediaKind::Pdf => DocumentPayload::pdf(data.to_vec()),
            MediaKind::Image => self.prepare(data, prepared)?.1.clone(),
        };

        let document = cloud.analyze(&payload, &self.document_type).await?;
        let text = document.text();
        if text.trim().is_empty() {
            return Err(StrategyError::EmptyResult.into());
        }
        Ok(Extracted {
            text,
            hints: Some(document),
        })
    }

    async fn extract_local(
        &self,
        token: RequestToken,
        data: &[u8],
        prepared: &mut Option<Prepared>,
    ) -> Result<Extracted, StepFailure> {
        let local = self
            .local
            .as_ref()
            .ok_or_else(|| StrategyError::UnsupportedInput("no local OCR engine".to_string()))?;
        let (image, _) = self.prepare(data, prepared)?;

        let progress = TokenProgress {
            sink: self.status.as_ref(),
            tokens: self.tokens.as_ref(),
            token,
        };
        let text = local
            .recognize(image, &progress)
            .await
            .map_err(StrategyError::from)?;

        if text.trim().is_empty() {
            return Err(StrategyError::EmptyResult.into());
        }
        Ok(Extracted { text, hints: None })
    }
}

/// Run CPU-bound parsing on the blocking thread pool.
async fn off_executor<T, F>(work: F) -> Result<T, StrategyError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StrategyError::Transport(format!("worker task failed: {}", e)))
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    config: RcptConfig,
    cloud: Option<Arc<dyn CloudOcr>>,
    local: Option<Arc<dyn LocalOcr>>,
    text_layer: Option<Arc<dyn TextLayer>>,
    quota_store: Option<Arc<dyn QuotaStore>>,
    vendor_store: Option<Arc<dyn VendorStore>>,
    tokens: Option<Arc<RequestTokens>>,
    status: Option<Arc<dyn StatusSink>>,
}

impl PipelineBuilder {
    pub fn new(config: RcptConfig) -> Self {
        Self {
            config,
            cloud: None,
            local: None,
            text_layer: None,
            quota_store: None,
            vendor_store: None,
            tokens: None,
            status: None,
        }
    }

    /// Wire the HTTP cloud client, the PDF text layer, the local engine
    /// (when enabled) and JSON stores under `storage.data_dir`.
    pub fn from_config(config: RcptConfig) -> crate::Result<Self> {
        std::fs::create_dir_all(&config.storage.data_dir)?;

        let mut builder = Self::new(config.clone())
            .cloud(Arc::new(HttpCloudOcr::from_config(&config.cloud)))
            .text_layer(Arc::new(PdfExtractor::new(config.pdf.clone())))
            .quota_store(Arc::new(JsonQuotaStore::new(config.storage.quota_path())))
            .vendor_store(Arc::new(JsonVendorStore::new(config.storage.vendors_path())));

        #[cfg(feature = "native")]
        if config.local.enabled {
            builder = builder.local(Arc::new(crate::ocr::PureOcrEngine::new(config.local.clone())));
        }

        Ok(builder)
    }

    pub fn cloud(mut self, cloud: Arc<dyn CloudOcr>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    pub fn local(mut self, local: Arc<dyn LocalOcr>) -> Self {
        self.local = Some(local);
        self
    }

    pub fn text_layer(mut self, text_layer: Arc<dyn TextLayer>) -> Self {
        self.text_layer = Some(text_layer);
        self
    }

    pub fn quota_store(mut self, store: Arc<dyn QuotaStore>) -> Self {
        self.quota_store = Some(store);
        self
    }

    pub fn vendor_store(mut self, store: Arc<dyn VendorStore>) -> Self {
        self.vendor_store = Some(store);
        self
    }

    /// Share a token source with other pipelines or callers.
    pub fn tokens(mut self, tokens: Arc<RequestTokens>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = Some(status);
        self
    }

    /// Build the pipeline, loading vendor memory from the store. A store
    /// that cannot be read starts the session with empty memory.
    pub fn build(self) -> Pipeline {
        let quota_store = self
            .quota_store
            .unwrap_or_else(|| Arc::new(MemoryQuotaStore::new()));
        let vendor_store = self
            .vendor_store
            .unwrap_or_else(|| Arc::new(MemoryVendorStore::new()));

        let entries = vendor_store.load_all().unwrap_or_else(|e| {
            warn!("Failed to load vendor memory: {}", e);
            Vec::new()
        });
        debug!("Loaded {} vendor memory entries", entries.len());

        Pipeline {
            document_type: self.config.cloud.document_type.clone(),
            cloud: self.cloud,
            local: self.local,
            text_layer: self.text_layer,
            normalizer: TextNormalizer::new(self.config.normalizer.clone()),
            parser: ReceiptParser::new(),
            quota: QuotaTracker::new(self.config.cloud.monthly_limit, quota_store),
            memory: Mutex::new(VendorMemory::new(entries)),
            vendor_store,
            tokens: self.tokens.unwrap_or_default(),
            status: self.status.unwrap_or_else(|| Arc::new(LogStatus)),
        }
    }
}
