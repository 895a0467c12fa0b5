//! Error reporting sink

use async_trait::async_trait;

/// Receives every user-facing error produced by an orchestration pass
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report_error(&self, message: String);
}

/// Logs reported errors at `error` level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait]
impl ErrorReporter for TracingReporter {
    async fn report_error(&self, message: String) {
        tracing::error!("{}", message);
    }
}

/// Adapts a plain closure into an [`ErrorReporter`]
pub struct FnReporter<F>(F);

impl<F> FnReporter<F>
where
    F: Fn(String) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> ErrorReporter for FnReporter<F>
where
    F: Fn(String) + Send + Sync,
{
    async fn report_error(&self, message: String) {
        (self.0)(message)
    }
}
