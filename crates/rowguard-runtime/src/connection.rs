//! Fortified connection.
//!
//! Wraps a [`StatementExecutor`] and applies the fortification contract on
//! every statement: the init command is applied to the connection before
//! the first rewritten statement reaches it, and a rewritten statement that
//! fails is retried once with its original text.

use rowguard_core::Configuration;
use rowguard_rewrite::{Sql, fortify, recover_original};

use crate::adapter::StatementExecutor;

pub struct FortifiedConnection<E: StatementExecutor> {
    executor: E,
    /// Init command last applied to this connection.
    applied_init_command: Option<String>,
    enabled: bool,
}

impl<E: StatementExecutor> FortifiedConnection<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            applied_init_command: None,
            enabled: true,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    /// When disabled, statements are passed to the executor unchanged.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Init command currently applied to the connection, if any.
    pub fn applied_init_command(&self) -> Option<&str> {
        self.applied_init_command.as_deref()
    }

    /// Fortify `sql` and make sure the connection carries the session
    /// variables a rewritten statement depends on.
    pub async fn prepare(
        &mut self,
        config: &Configuration,
        sql: impl Into<Sql>,
    ) -> anyhow::Result<Sql> {
        let sql = sql.into();
        if !self.enabled {
            return Ok(sql);
        }

        let mut rewriting = false;
        let fortified = fortify(sql, config, |_| rewriting = true);
        // Already fortified input skips the hook but still needs the variables
        // on this connection.
        if rewriting || fortified.is_changed() {
            self.ensure_session_variables(config).await?;
        }
        Ok(fortified)
    }

    /// Fortify and run `sql`, falling back to the original text once if the
    /// rewritten statement fails.
    ///
    /// The configuration's error hook sees the failure before the retry. An
    /// error returned by the hook aborts the retry and is returned instead.
    pub async fn execute(
        &mut self,
        config: &Configuration,
        sql: impl Into<Sql>,
    ) -> anyhow::Result<E::Output> {
        let prepared = self.prepare(config, sql).await?;

        let error = match self.executor.execute(&prepared).await {
            Ok(output) => return Ok(output),
            Err(error) => error,
        };

        let Some(original) = recover_original(&prepared) else {
            return Err(error);
        };
        if !self.executor.is_recoverable(&error) {
            return Err(error);
        }

        tracing::warn!(error = %error, "Rewritten statement failed, retrying with the original");
        if let Some(hook) = config.error_hook() {
            hook(&error)?;
        }
        self.executor.execute(original).await
    }

    /// Apply the configuration's init command unless this connection already
    /// carries it. Safe to call any number of times.
    ///
    /// Clearing the session variables does not unset the `@variables` already
    /// applied to the connection.
    pub async fn ensure_session_variables(&mut self, config: &Configuration) -> anyhow::Result<()> {
        let init_command = config.init_command();
        if self.applied_init_command.as_deref() == Some(init_command) {
            return Ok(());
        }
        if !init_command.is_empty() {
            tracing::debug!(variables = config.session_variables().len(), "Applying session variables to connection");
            self.executor.execute(init_command).await?;
        }
        self.applied_init_command = Some(init_command.to_string());
        Ok(())
    }

    /// Forget the applied init command, e.g. after the physical connection
    /// was re-established.
    pub fn reset_session(&mut self) {
        self.applied_init_command = None;
    }
}
