use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::flag::Value;

use super::{Provider, Transaction};

/// Records each flag's declared default so a failed chain can restore it.
///
/// The first run records; later runs of the same tree start by restoring
/// the recorded defaults, so values never leak from one run into the next.
#[derive(Debug, Default)]
pub struct DefaultsProvider {
    snapshot: Mutex<Option<HashMap<String, Value>>>,
}

impl DefaultsProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Provider for DefaultsProvider {
    fn provide(&self, ctx: &mut Context<'_>) -> Result<()> {
        let recorded = self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        if recorded {
            return self.rollback(ctx);
        }

        let snapshot: HashMap<String, Value> = ctx
            .flags()
            .iter()
            .map(|accessor| (accessor.name().to_string(), accessor.value()))
            .collect();
        debug!(command = %ctx.command().name, flags = snapshot.len(), "recorded defaults");
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        Ok(())
    }

    fn as_transaction(&self) -> Option<&dyn Transaction> {
        Some(self)
    }
}

impl Transaction for DefaultsProvider {
    fn rollback(&self, ctx: &mut Context<'_>) -> Result<()> {
        let snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(snapshot) = snapshot.as_ref() else {
            return Ok(());
        };
        for mut accessor in ctx.flags() {
            if let Some(value) = snapshot.get(accessor.name()) {
                accessor
                    .restore(value.clone())
                    .map_err(|err| Error::flag("defaults", accessor.primary_name(), err))?;
            }
        }
        debug!(command = %ctx.command().name, "restored defaults");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::command::Command;
    use crate::context::Invocation;
    use crate::flag::{IntFlag, StringSliceFlag};

    use super::*;

    #[test]
    fn test_rollback_restores_defaults() {
        let app = Command::new("app")
            .with_flag(IntFlag::new("port").with_value(80))
            .with_flag(StringSliceFlag::new("user").with_value(vec!["root".to_string()]));
        let mut ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));

        let defaults = DefaultsProvider::new();
        defaults.provide(&mut ctx).unwrap();

        for mut accessor in ctx.flags() {
            let token = if accessor.is_sequence() { "alice" } else { "9000" };
            accessor.set(token).unwrap();
        }
        assert_eq!(ctx.int("port"), 9000);

        defaults.rollback(&mut ctx).unwrap();
        assert_eq!(ctx.int("port"), 80);
        assert_eq!(ctx.string_slice("user"), ["root"]);
    }

    #[test]
    fn test_later_runs_start_from_defaults() {
        let mut app = Command::new("app")
            .with_flag(IntFlag::new("port").with_value(80))
            .with_action(|_| Ok(()));

        app.run(Invocation::new(["--port", "9000"])).unwrap();
        app.run(Invocation::new(Vec::<String>::new())).unwrap();

        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.int("port"), 80);
    }
}
