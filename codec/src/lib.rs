//! Document codecs for cmdkit document flags.
//!
//! The core ships JSON decoding; this crate adds [`YamlCodec`] and picks a
//! codec from a file's extension so a document flag can read either format.
//!
//! # Quick start
//!
//! ```
//! use std::io::Write;
//! use cmdkit_codec::document_flag;
//! use cmdkit_core::{Buffer, Command, Invocation};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("db.yaml");
//! std::fs::write(&path, "host: db.local\nport: 5432\n").unwrap();
//!
//! let out = Buffer::default();
//! let mut app = Command::new("app")
//!     .with_flag(document_flag("database", &path).unwrap())
//!     .with_action(|ctx| {
//!         let db = ctx.document("database");
//!         writeln!(ctx.writer(), "{}:{}", db["host"].as_str().unwrap_or_default(), db["port"])?;
//!         Ok(())
//!     });
//!
//! app.run(Invocation::new(Vec::<String>::new()).with_writer(out.clone())).unwrap();
//! assert_eq!(out.contents(), "db.local:5432\n");
//! ```

mod error;
mod format;
mod yaml;

pub use error::{CodecError, Result};
pub use format::{Format, codec_for_path, decode_file, document_flag};
pub use yaml::YamlCodec;
