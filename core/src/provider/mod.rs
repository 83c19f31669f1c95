//! Sources of flag values.
//!
//! Every command runs a chain of providers before dispatch. The built-in
//! chain is [`DefaultsProvider`], [`FileProvider`], [`EnvProvider`] and
//! [`ArgsProvider`]; user providers are appended after it, so later sources
//! override earlier ones: defaults < files < environment < command line <
//! remote. Each provider visits the command's flags in declaration order and
//! writes through a fresh [`FlagAccessor`](crate::FlagAccessor), so sequence
//! flags reset once per provider that writes them.
//!
//! # Example
//!
//! ```
//! use cmdkit_core::{Buffer, Command, Context, Error, Invocation, StringFlag};
//!
//! let mut app = Command::new("app")
//!     .with_flag(StringFlag::new("token"))
//!     .with_provider(|ctx: &mut Context<'_>| -> cmdkit_core::Result<()> {
//!         if let Some(mut token) = ctx.flag("token") {
//!             token.set("from-vault").map_err(|err| Error::flag("vault", "token", err))?;
//!         }
//!         Ok(())
//!     })
//!     .with_action(|ctx| {
//!         assert_eq!(ctx.string("token"), "from-vault");
//!         Ok(())
//!     });
//!
//! app.run(Invocation::new(["--token", "ignored"]).with_writer(Buffer::default())).unwrap();
//! ```

mod args;
mod backoff;
mod defaults;
mod env;
mod file;

use tracing::debug;

use crate::context::Context;
use crate::error::{Error, ExitErrorCollector, Result};

pub use args::ArgsProvider;
pub use backoff::BackOffProvider;
pub use defaults::DefaultsProvider;
pub use env::EnvProvider;
pub use file::FileProvider;

/// A source of flag values for the context's command.
pub trait Provider: Send + Sync {
    fn provide(&self, ctx: &mut Context<'_>) -> Result<()>;

    /// Providers that can undo their writes return themselves here.
    fn as_transaction(&self) -> Option<&dyn Transaction> {
        None
    }
}

/// A provider whose writes can be undone when a later provider fails.
pub trait Transaction: Provider {
    fn rollback(&self, ctx: &mut Context<'_>) -> Result<()>;
}

impl<F> Provider for F
where
    F: Fn(&mut Context<'_>) -> Result<()> + Send + Sync,
{
    fn provide(&self, ctx: &mut Context<'_>) -> Result<()> {
        self(ctx)
    }
}

/// Runs `providers` in order through `invoke`, stopping at the first error.
///
/// On failure the transactional providers that already ran are rolled back
/// in reverse order; their errors follow the provider's error in the
/// returned collector.
pub(crate) fn run_chain<I>(
    providers: &[Box<dyn Provider>],
    ctx: &mut Context<'_>,
    mut invoke: I,
) -> Result<()>
where
    I: FnMut(&dyn Provider, &mut Context<'_>) -> Result<()>,
{
    for (index, provider) in providers.iter().enumerate() {
        let Err(err) = invoke(provider.as_ref(), ctx) else {
            continue;
        };

        debug!(
            command = %ctx.command().name,
            provider = index,
            error = %err,
            "provider failed, rolling back"
        );

        let mut errors = ExitErrorCollector::new();
        errors.push(err);
        for done in providers[..index].iter().rev() {
            if let Some(transaction) = done.as_transaction() {
                if let Err(err) = transaction.rollback(ctx) {
                    errors.push(err);
                }
            }
        }
        return Err(collapse(errors));
    }
    Ok(())
}

/// A collector holding one error is returned as that error.
fn collapse(errors: ExitErrorCollector) -> Error {
    match errors.unwrap() {
        Some(err) => err.clone(),
        None => Error::Collected(errors),
    }
}
