//! User-facing status reporting.

use tracing::info;

use super::token::RequestTokens;
use crate::models::receipt::RequestToken;
use crate::ocr::ProgressObserver;

/// Receives status text and progress for a run. The orchestrator only
/// calls it while the run's token is current.
pub trait StatusSink: Send + Sync {
    fn status(&self, token: RequestToken, message: &str);

    fn progress(&self, _token: RequestToken, _percent: u8) {}
}

/// Sink that writes status lines to the log.
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn status(&self, token: RequestToken, message: &str) {
        info!("[{}] {}", token, message);
    }
}

/// Forwards engine progress to a sink while the token stays current.
pub(crate) struct TokenProgress<'a> {
    pub(crate) sink: &'a dyn StatusSink,
    pub(crate) tokens: &'a RequestTokens,
    pub(crate) token: RequestToken,
}

impl ProgressObserver for TokenProgress<'_> {
    fn progress(&self, percent: u8) {
        if self.tokens.is_current(self.token) {
            self.sink.progress(self.token, percent.min(100));
        }
    }
}
