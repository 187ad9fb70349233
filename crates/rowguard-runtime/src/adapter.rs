use async_trait::async_trait;

/// One physical database connection able to run SQL text.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    type Output: Send;

    /// Run a single statement. Must not rewrite or retry on its own.
    async fn execute(&self, sql: &str) -> anyhow::Result<Self::Output>;

    /// Whether a failure of a rewritten statement may be retried with the
    /// original text. Backends can restrict this to errors caused by the
    /// replacement objects (missing view, unknown column).
    fn is_recoverable(&self, _error: &anyhow::Error) -> bool {
        true
    }
}
