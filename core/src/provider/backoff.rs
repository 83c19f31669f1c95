use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::context::Context;
use crate::error::Result;
use crate::retry::{BackOff, ExponentialBackOff, retry_notify};

use super::{Provider, Transaction};

/// Retries a flaky provider, typically one backed by a remote store.
///
/// The default schedule is exponential, starting at two seconds and giving
/// up once thirty seconds have elapsed.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cmdkit_core::{BackOffProvider, Command, ConstantBackOff, Context};
///
/// let remote = |_: &mut Context<'_>| -> cmdkit_core::Result<()> { Ok(()) };
/// let app = Command::new("app").with_provider(
///     BackOffProvider::new(remote)
///         .with_backoff(ConstantBackOff::new(Duration::from_millis(100)).with_max_retries(3)),
/// );
/// # let _ = app;
/// ```
pub struct BackOffProvider {
    provider: Box<dyn Provider>,
    backoff: Arc<dyn BackOff>,
}

impl BackOffProvider {
    pub fn new(provider: impl Provider + 'static) -> Self {
        let backoff = ExponentialBackOff::new(Duration::from_secs(2))
            .with_max_elapsed_time(Some(Duration::from_secs(30)));
        Self {
            provider: Box::new(provider),
            backoff: Arc::new(backoff),
        }
    }

    pub fn with_backoff(mut self, backoff: impl BackOff + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }
}

impl Provider for BackOffProvider {
    fn provide(&self, ctx: &mut Context<'_>) -> Result<()> {
        let command = ctx.command().name.clone();
        let mut attempt: u32 = 0;

        retry_notify(
            self.backoff.as_ref(),
            || {
                attempt += 1;
                info!(command = %command, attempt, "providing the application arguments");
                self.provider.provide(ctx)
            },
            |err, delay| {
                warn!(
                    command = %command,
                    error = %err,
                    retry_in = ?delay,
                    "providing the application arguments not successful"
                );
            },
        )
        .inspect_err(|err| {
            error!(command = %command, error = %err, "providing the application arguments failed");
        })
    }

    fn as_transaction(&self) -> Option<&dyn Transaction> {
        self.provider.as_transaction()
    }
}
