use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;
use tracing::debug;
use walkdir::WalkDir;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::flag::split;

use super::Provider;

/// Feeds the contents of the files named by each flag's `file_path`.
///
/// Entries may be plain paths or glob patterns (`conf.d/*.cfg`); every
/// matching non-empty file is passed to the flag verbatim, in path order.
/// Missing or unreadable files are skipped. An invalid pattern fails with
/// code 1002.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileProvider;

impl Provider for FileProvider {
    fn provide(&self, ctx: &mut Context<'_>) -> Result<()> {
        for mut accessor in ctx.flags() {
            let patterns: Vec<String> = split(accessor.file_path()).map(str::to_string).collect();

            for pattern in &patterns {
                let paths = resolve(pattern)
                    .map_err(|err| Error::flag("file", accessor.primary_name(), err))?;

                for path in paths {
                    let Ok(content) = fs::read_to_string(&path) else {
                        continue;
                    };
                    if content.is_empty() {
                        continue;
                    }

                    debug!(flag = accessor.primary_name(), path = %path.display(), "reading flag file");
                    accessor
                        .set(&content)
                        .map_err(|err| Error::flag("file", accessor.primary_name(), err))?;
                }
            }
        }
        Ok(())
    }
}

fn has_meta(text: &str) -> bool {
    text.contains(['*', '?', '[', '{'])
}

/// Expands a pattern into existing paths. Plain paths are returned as-is.
fn resolve(pattern: &str) -> std::result::Result<Vec<PathBuf>, globset::Error> {
    if !has_meta(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher();

    let mut base = PathBuf::new();
    let mut depth = 0;
    let mut recursive = false;
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if depth == 0 && !has_meta(&text) {
            base.push(component);
            continue;
        }
        recursive |= text.contains("**");
        depth += 1;
    }

    let relative = base.as_os_str().is_empty();
    let root = if relative { PathBuf::from(".") } else { base };
    let mut walker = WalkDir::new(&root).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(depth);
    }

    let paths = walker
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let path = entry.into_path();
            if relative {
                strip_current_dir(&path)
            } else {
                path
            }
        })
        .filter(|path| matcher.is_match(path))
        .collect();
    Ok(paths)
}

fn strip_current_dir(path: &Path) -> PathBuf {
    path.components()
        .skip_while(|component| matches!(component, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_path_is_literal() {
        let paths = resolve("does/not/exist.cfg").unwrap();
        assert_eq!(paths, [PathBuf::from("does/not/exist.cfg")]);
    }

    #[test]
    fn test_resolve_glob_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("conf.d")).unwrap();
        fs::write(dir.path().join("conf.d/b.cfg"), "b").unwrap();
        fs::write(dir.path().join("conf.d/a.cfg"), "a").unwrap();
        fs::write(dir.path().join("conf.d/c.txt"), "c").unwrap();
        fs::create_dir(dir.path().join("conf.d/nested")).unwrap();
        fs::write(dir.path().join("conf.d/nested/d.cfg"), "d").unwrap();

        let pattern = format!("{}/conf.d/*.cfg", dir.path().display());
        let paths = resolve(&pattern).unwrap();
        assert_eq!(
            paths,
            [
                dir.path().join("conf.d/a.cfg"),
                dir.path().join("conf.d/b.cfg")
            ]
        );

        let pattern = format!("{}/conf.d/**/*.cfg", dir.path().display());
        assert_eq!(resolve(&pattern).unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_rejects_bad_pattern() {
        assert!(resolve("conf.d/[.cfg").is_err());
    }
}
