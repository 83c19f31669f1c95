use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::flag::{split, unquote};

use super::Provider;

/// Reads each flag's `env_var` keys from the context's [`Environment`](crate::Environment).
///
/// Empty values count as unset and one pair of surrounding single quotes is
/// stripped. Document flags get the raw value; other flags get each
/// comma-separated token. Scalars stop at the first key that produced a
/// value, sequences keep appending across keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvProvider;

impl Provider for EnvProvider {
    fn provide(&self, ctx: &mut Context<'_>) -> Result<()> {
        let env = ctx.env().clone();

        for mut accessor in ctx.flags() {
            let keys: Vec<String> = split(accessor.env_var()).map(str::to_string).collect();

            for key in &keys {
                let Some(raw) = env.get(key) else {
                    continue;
                };
                let value = unquote(&raw);
                if value.is_empty() {
                    continue;
                }

                debug!(flag = accessor.primary_name(), key = %key, "reading flag from environment");
                let mut written = false;
                if accessor.is_document() {
                    accessor
                        .set(value)
                        .map_err(|err| Error::flag("env", accessor.primary_name(), err))?;
                    written = true;
                } else {
                    for token in split(value) {
                        accessor
                            .set(token)
                            .map_err(|err| Error::flag("env", accessor.primary_name(), err))?;
                        written = true;
                    }
                }

                if written && !accessor.is_sequence() {
                    break;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::command::Command;
    use crate::context::{Environment, Invocation};
    use crate::flag::{DocumentFlag, IntFlag, StringFlag, StringSliceFlag};

    use super::*;

    fn run(app: &Command, vars: &[(&str, &str)]) -> Result<()> {
        let invocation =
            Invocation::new(Vec::<String>::new()).with_env(Environment::fixed(vars.iter().copied()));
        let mut ctx = Context::new(app, invocation);
        EnvProvider.provide(&mut ctx)
    }

    #[test]
    fn test_scalar_takes_first_key_with_value() {
        let app = Command::new("app")
            .with_flag(StringFlag::new("level").with_env_var("LOG_LEVEL, LOG_LVL").with_value("info"));
        run(&app, &[("LOG_LEVEL", ""), ("LOG_LVL", "'debug'")]).unwrap();
        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.string("level"), "debug");
    }

    #[test]
    fn test_sequence_appends_across_keys() {
        let app = Command::new("app")
            .with_flag(StringSliceFlag::new("user").with_env_var("USERS,ADMINS").with_value(vec!["root".to_string()]));
        run(&app, &[("USERS", "alice,bob"), ("ADMINS", "carol")]).unwrap();
        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.string_slice("user"), ["alice", "bob", "carol"]);
    }

    #[test]
    fn test_document_receives_raw_value() {
        let app = Command::new("app").with_flag(DocumentFlag::new("config").with_env_var("CONFIG"));
        run(&app, &[("CONFIG", r#"{"ports": [1, 2]}"#)]).unwrap();
        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));
        assert_eq!(ctx.document("config"), json!({"ports": [1, 2]}));
    }

    #[test]
    fn test_parse_failure_names_provider() {
        let app = Command::new("app").with_flag(IntFlag::new("port").with_env_var("PORT"));
        let err = run(&app, &[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().starts_with("provider 'env' failed to set a flag 'port':"));
        assert_eq!(err.code(), crate::error::EXIT_CODE_FLAG_PROCESSING);
    }
}
