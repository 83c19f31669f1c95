use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use cmdkit_codec::{CodecError, Format, YamlCodec, decode_file, document_flag};
use cmdkit_core::{Buffer, Command, DocumentFlag, EXIT_CODE_FLAG_PROCESSING, Invocation};
use serde::Deserialize;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, PartialEq)]
struct Settings {
    name: String,
    replicas: u32,
    regions: Vec<String>,
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn quiet(args: &[&str]) -> Invocation {
    Invocation::new(args.iter().copied())
        .with_writer(Buffer::default())
        .with_err_writer(Buffer::default())
}

// ---------------------------------------------------------------------------
// File decoding
// ---------------------------------------------------------------------------

#[test]
fn test_decode_yaml_and_json_files_agree() {
    let dir = TempDir::new().unwrap();
    let yaml = write(
        dir.path(),
        "app.yml",
        "name: api\nreplicas: 3\nregions:\n  - eu\n  - us\n",
    );
    let json = write(
        dir.path(),
        "app.json",
        r#"{"name": "api", "replicas": 3, "regions": ["eu", "us"]}"#,
    );

    assert_eq!(decode_file(&yaml).unwrap(), decode_file(&json).unwrap());
}

#[test]
fn test_decode_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = decode_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, CodecError::IoError(_)));
}

#[test]
fn test_decode_unknown_extension_is_rejected_before_reading() {
    let err = decode_file("/definitely/not/here/app.toml").unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedExtension(_)));
}

#[test]
fn test_malformed_yaml_reports_yaml_error() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "broken.yaml", "name: [api\n");
    assert!(matches!(decode_file(&path).unwrap_err(), CodecError::YamlError(_)));
}

// ---------------------------------------------------------------------------
// Document flags
// ---------------------------------------------------------------------------

#[test]
fn test_document_flag_reads_yaml_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "settings.yaml",
        "name: worker\nreplicas: 2\nregions: [eu]\n",
    );

    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let mut app = Command::new("app")
        .with_flag(document_flag("settings", &path).unwrap())
        .with_action(move |ctx| {
            *sink.lock().unwrap() = Some(ctx.document_as::<Settings>("settings")?);
            Ok(())
        });

    app.run(quiet(&[])).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        Some(Settings {
            name: "worker".to_string(),
            replicas: 2,
            regions: vec!["eu".to_string()],
        })
    );
}

#[test]
fn test_yaml_codec_decodes_command_line_value() {
    let seen = Arc::new(Mutex::new(serde_json::Value::Null));
    let sink = seen.clone();
    let mut app = Command::new("app")
        .with_flag(DocumentFlag::new("labels").with_codec(YamlCodec))
        .with_action(move |ctx| {
            *sink.lock().unwrap() = ctx.document("labels");
            Ok(())
        });

    app.run(quiet(&["--labels", "{tier: web, zone: a}"])).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        serde_json::json!({"tier": "web", "zone": "a"})
    );
}

#[test]
fn test_invalid_yaml_value_is_flag_processing_error() {
    let mut app = Command::new("app")
        .with_flag(DocumentFlag::new("labels").with_codec(Format::Yaml))
        .with_action(|_| Ok(()));

    let err = app.run(quiet(&["--labels", "{tier: [web"])).unwrap_err();
    assert_eq!(err.code(), EXIT_CODE_FLAG_PROCESSING);
}
