//! Execution of a prepared command tree.
//!
//! For every command on the path the dispatcher runs, in order:
//!
//! 1. BeforeInit, the provider chain and AfterInit (skipped entirely with
//!    `skip_flag_parsing`). A failure goes through the usage-error hook and,
//!    unless suppressed, prints `Incorrect Usage` and the command's help.
//! 2. The fork: `--help` or `--version` hand over to the built-in
//!    subcommands; a positional argument naming a subcommand recurses into
//!    it; an unknown name falls through to help when the command has
//!    subcommands and reaches the action otherwise.
//! 3. Before, flag validation, the action or chosen subcommand, and After.
//!    After runs even when an earlier step failed; all errors are collected.
//!    A strategy on this command retries the action or the subcommand's
//!    whole run.
//!
//! Built-in help and version subcommands run without the parent's hooks
//! and validation.

use std::io::Write;

use tracing::{debug, error, warn};

use crate::accessor::lock;
use crate::command::{Builtin, Command, HookFn};
use crate::context::Context;
use crate::error::{Error, ExitErrorCollector, Result};
use crate::flag;
use crate::provider;
use crate::retry::retry_notify;

impl Command {
    /// Runs this command with a context built by the caller. The tree must
    /// already be prepared.
    pub(crate) fn execute(&self, mut ctx: Context<'_>) -> Result<()> {
        if let Err(err) = self.provide(&mut ctx) {
            if let Some(err) = self.usage_error(&ctx, err) {
                return Err(err);
            }
        }
        self.fork(&ctx)
    }

    fn provide(&self, ctx: &mut Context<'_>) -> Result<()> {
        if self.skip_flag_parsing {
            return Ok(());
        }

        let mut errors = ExitErrorCollector::new();

        let initialized = match &self.before_init {
            Some(hook) => match self.call(hook, "before_init", ctx) {
                Ok(()) => true,
                Err(err) => {
                    errors.push(err);
                    false
                }
            },
            None => true,
        };

        if initialized {
            debug!(command = %self.name, providers = self.providers.len(), "running providers");
            let chain = provider::run_chain(&self.providers, ctx, |provider, ctx| {
                self.retry("provider", || provider.provide(ctx))
            });
            if let Err(err) = chain {
                errors.push(err);
            }
        }

        if let Some(hook) = &self.after_init {
            if let Err(err) = self.call(hook, "after_init", ctx) {
                errors.push(err);
            }
        }

        errors.into_result()
    }

    fn fork(&self, ctx: &Context<'_>) -> Result<()> {
        if ctx.bool("help") {
            if let Some(help) = self.builtin_child(Builtin::Help) {
                debug!(command = %self.name, "help requested");
                return help.execute(ctx.child(help, Vec::new()));
            }
        }

        if ctx.bool("version") {
            if let Some(version) = self.builtin_child(Builtin::Version) {
                debug!(command = %self.name, "version requested");
                return version.execute(ctx.child(version, Vec::new()));
            }
        }

        let Some(name) = ctx.args().first() else {
            return self.leaf(ctx);
        };

        if let Some(child) = self.find(name) {
            debug!(command = %self.name, child = %child.name, "dispatching to subcommand");
            let args = ctx.args()[1..].to_vec();
            if child.builtin.is_some() {
                return child.execute(ctx.child(child, args));
            }
            return self.exec(ctx, Some((child, args)));
        }

        if self.has_user_commands() {
            debug!(command = %self.name, name = %name, "subcommand not found");
            if let Some(hook) = &self.on_command_not_found {
                hook(ctx, name);
            }
            return match self.builtin_child(Builtin::Help) {
                Some(help) => help.execute(ctx.child(help, vec![name.clone()])),
                None => Err(Error::not_found_command(name)),
            };
        }

        self.leaf(ctx)
    }

    /// No subcommand was chosen: run the action, or show help without one.
    fn leaf(&self, ctx: &Context<'_>) -> Result<()> {
        if self.action.is_none() {
            if let Some(help) = self.builtin_child(Builtin::Help) {
                return help.execute(ctx.child(help, Vec::new()));
            }
        }
        self.exec(ctx, None)
    }

    /// Before, validation, the action or `next`, then After.
    fn exec(&self, ctx: &Context<'_>, next: Option<(&Command, Vec<String>)>) -> Result<()> {
        let mut errors = ExitErrorCollector::new();

        let ready = match &self.before {
            Some(hook) => match self.call(hook, "before", ctx) {
                Ok(()) => true,
                Err(err) => {
                    errors.push(err);
                    false
                }
            },
            None => true,
        };

        if ready && self.validate(ctx, &mut errors) {
            let outcome = match next {
                Some((child, args)) => self.retry("subcommand", || {
                    child.execute(ctx.child(child, args.clone()))
                }),
                None => match &self.action {
                    Some(action) => self.call(action, "action", ctx),
                    None => Ok(()),
                },
            };
            if let Err(err) = outcome {
                errors.push(err);
            }
        }

        if let Some(hook) = &self.after {
            if let Err(err) = self.call(hook, "after", ctx) {
                errors.push(err);
            }
        }

        errors.into_result()
    }

    /// Validates every flag. Returns `false` when an error survived the
    /// usage-error hook; suppressed errors move on to the next flag.
    fn validate(&self, ctx: &Context<'_>, errors: &mut ExitErrorCollector) -> bool {
        for slot in self.flag_slots() {
            let (name, required, value, validator) = {
                let flag = lock(slot);
                (
                    flag::primary_name(flag.name()).to_string(),
                    flag.required(),
                    flag.value(),
                    flag.validator(),
                )
            };

            if let Err(err) = flag::check(&name, required, &value, validator.as_deref(), ctx) {
                if let Some(err) = self.usage_error(ctx, err) {
                    errors.push(err);
                    return false;
                }
            }
        }
        true
    }

    /// Routes an error through the usage-error hook. A surviving error is
    /// printed with the command's help and returned.
    fn usage_error(&self, ctx: &Context<'_>, err: Error) -> Option<Error> {
        let err = match &self.on_usage_error {
            Some(hook) => hook(ctx, err)?,
            None => err,
        };

        debug!(command = %self.name, error = %err, "usage error");
        let mut writer = ctx.writer();
        let _ = write!(writer, "Incorrect Usage: {err}\n\n");

        if let Some(help) = self.builtin_child(Builtin::Help) {
            let _ = help.execute(ctx.child(help, Vec::new()));
        }
        Some(err)
    }

    /// Invokes a hook or action under the retry policy.
    fn call(&self, hook: &HookFn, step: &str, ctx: &Context<'_>) -> Result<()> {
        self.retry(step, || hook(ctx).map_err(Error::from_boxed))
    }

    fn retry<F>(&self, step: &str, mut op: F) -> Result<()>
    where
        F: FnMut() -> Result<()>,
    {
        let Some(strategy) = &self.strategy else {
            return op();
        };

        retry_notify(strategy.as_ref(), op, |err, delay| {
            warn!(
                command = %self.name,
                step,
                error = %err,
                retry_in = ?delay,
                "executing the command not successful"
            );
        })
        .inspect_err(|err| {
            error!(command = %self.name, step, error = %err, "executing the command failed");
        })
    }
}
