//! Property-based tests for flag parsing, the provider chain and error
//! codes.

use std::fs;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use tempfile::TempDir;

use cmdkit_core::{
    Buffer, Command, Context, DurationFlag, Environment, Error, ExitErrorCollector, Flag,
    Float64Flag, Int64Flag, Invocation, StringFlag, StringSliceFlag, UInt64Flag,
};

fn token() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}"
}

/// Positional words that never name the built-in help command.
fn word() -> impl Strategy<Value = String> {
    "x[a-z0-9]{0,6}"
}

fn value_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9=:,. _-]{0,16}"
}

fn run_with(app: &mut Command, args: &[String], env: &[(String, String)]) -> cmdkit_core::Result<()> {
    app.run(
        Invocation::new(args.iter().cloned())
            .with_writer(Buffer::default())
            .with_err_writer(Buffer::default())
            .with_env(Environment::fixed(env.iter().cloned())),
    )
}

fn capturing_app(flag: impl Flag + 'static, name: &'static str) -> (Command, Arc<Mutex<String>>) {
    let seen = Arc::new(Mutex::new(String::new()));
    let sink = seen.clone();
    let app = Command::new("app").with_flag(flag).with_action(move |ctx| {
        *sink.lock().unwrap() = ctx.get(name).map(|value| value.to_string()).unwrap_or_default();
        Ok(())
    });
    (app, seen)
}

proptest! {
    /// Rendering a parsed value and parsing it again changes nothing.
    #[test]
    fn int64_render_roundtrip(n in any::<i64>()) {
        let mut flag = Int64Flag::new("n");
        flag.set(&n.to_string()).unwrap();
        let rendered = flag.render();
        let mut again = Int64Flag::new("n");
        again.set(&rendered).unwrap();
        prop_assert_eq!(again.value, n);
    }

    #[test]
    fn uint64_render_roundtrip(n in any::<u64>()) {
        let mut flag = UInt64Flag::new("n");
        flag.set(&n.to_string()).unwrap();
        let mut again = UInt64Flag::new("n");
        again.set(&flag.render()).unwrap();
        prop_assert_eq!(again.value, n);
    }

    #[test]
    fn float64_render_roundtrip(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
        let mut flag = Float64Flag::new("x");
        flag.set(&x.to_string()).unwrap();
        let mut again = Float64Flag::new("x");
        again.set(&flag.render()).unwrap();
        prop_assert_eq!(again.value, x);
    }

    #[test]
    fn duration_render_roundtrip(nanos in -1_000_000_000_000_000i64..1_000_000_000_000_000i64) {
        let duration = chrono::Duration::nanoseconds(nanos);
        let flag = DurationFlag::new("d").with_value(duration);
        let mut again = DurationFlag::new("d");
        again.set(&flag.render()).unwrap();
        prop_assert_eq!(again.value, duration);
    }

    /// A phase writing N tokens leaves N elements; the next phase replaces
    /// them.
    #[test]
    fn sequence_resets_once_per_phase(
        first in prop::collection::vec(token(), 1..6),
        second in prop::collection::vec(token(), 1..6),
    ) {
        let app = Command::new("app")
            .with_flag(StringSliceFlag::new("user").with_value(vec!["root".to_string()]));
        let ctx = Context::new(&app, Invocation::new(Vec::<String>::new()));

        {
            let mut accessor = ctx.flag("user").unwrap();
            for item in &first {
                accessor.set(item).unwrap();
            }
        }
        prop_assert_eq!(ctx.string_slice("user"), first);

        {
            let mut accessor = ctx.flag("user").unwrap();
            for item in &second {
                accessor.set(item).unwrap();
            }
        }
        prop_assert_eq!(ctx.string_slice("user"), second);
    }

    /// `--flag=value` and `--flag value` are the same invocation.
    #[test]
    fn inline_and_separate_values_agree(value in value_text(), rest in prop::collection::vec(word(), 0..3)) {
        let (mut inline_app, inline_seen) = capturing_app(StringFlag::new("name"), "name");
        let mut inline_args = vec![format!("--name={value}")];
        inline_args.extend(rest.iter().cloned());
        run_with(&mut inline_app, &inline_args, &[]).unwrap();

        let (mut split_app, split_seen) = capturing_app(StringFlag::new("name"), "name");
        let mut split_args = vec!["--name".to_string(), value.clone()];
        split_args.extend(rest.iter().cloned());
        run_with(&mut split_app, &split_args, &[]).unwrap();

        prop_assert_eq!(inline_seen.lock().unwrap().clone(), split_seen.lock().unwrap().clone());
        prop_assert_eq!(inline_seen.lock().unwrap().clone(), value);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Command line over environment over file over default.
    #[test]
    fn provider_precedence(
        file in prop::option::of(token()),
        env in prop::option::of(token()),
        cli in prop::option::of(token()),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("addr");
        if let Some(file) = &file {
            fs::write(&path, file).unwrap();
        }

        let flag = StringFlag::new("addr")
            .with_value("default")
            .with_env_var("ADDR")
            .with_file_path(path.to_string_lossy());
        let (mut app, seen) = capturing_app(flag, "addr");

        let args: Vec<String> = cli.iter().map(|value| format!("--addr={value}")).collect();
        let vars: Vec<(String, String)> = env.iter().map(|value| ("ADDR".to_string(), value.clone())).collect();
        run_with(&mut app, &args, &vars).unwrap();

        let expected = cli.or(env).or(file).unwrap_or_else(|| "default".to_string());
        prop_assert_eq!(seen.lock().unwrap().clone(), expected);
    }

    /// The collected code is the first classified one, else 1001.
    #[test]
    fn first_classified_code_wins(codes in prop::collection::vec(prop::option::of(1i32..200), 1..6)) {
        let collector: ExitErrorCollector = codes
            .iter()
            .map(|code| match code {
                Some(code) => Error::new("classified", *code),
                None => Error::from_boxed("foreign".into()),
            })
            .collect();
        let expected = codes.iter().flatten().next().copied().unwrap_or(1001);
        prop_assert_eq!(collector.code(), expected);
    }
}
