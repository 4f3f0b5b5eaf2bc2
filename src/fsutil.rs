//! Small filesystem utilities.

use globset::GlobBuilder;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{KernTraceError, KernTraceResult};

/// Write `bytes` to `path` through a temp file in the same directory, so a
/// failed write never leaves a truncated file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> KernTraceResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| KernTraceError::io_at(&parent, e))?;

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| KernTraceError::InvalidArgument(format!("not a file path: {}", path.display())))?;
    let tmp = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let result = std::fs::File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        })
        .and_then(|()| std::fs::rename(&tmp, path));
    if let Err(err) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(KernTraceError::io_at(path, err));
    }
    Ok(())
}

/// Expand merge inputs. Literal paths pass through in the given order; glob
/// patterns expand to their sorted matches.
pub fn expand_inputs(patterns: &[String]) -> KernTraceResult<Vec<PathBuf>> {
    expand_inputs_in(Path::new("."), patterns)
}

/// Like [`expand_inputs`], with relative globs resolved against `base`.
pub fn expand_inputs_in(base: &Path, patterns: &[String]) -> KernTraceResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for pattern in patterns {
        if !has_glob_meta(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let matches = find_matching_files(base, pattern)?;
        if matches.is_empty() {
            return Err(KernTraceError::InvalidArgument(format!(
                "no files match {pattern:?}"
            )));
        }
        out.extend(matches);
    }
    Ok(out)
}

fn find_matching_files(base: &Path, pattern: &str) -> KernTraceResult<Vec<PathBuf>> {
    // Walked paths are matched relative to `base`, which never carries `./`.
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.trim_start_matches('/');
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| KernTraceError::InvalidArgument(format!("invalid glob {pattern:?}: {e}")))?
        .compile_matcher();

    let (root, rest) = split_glob_root(pattern);
    let absolute = root.is_absolute();
    let walk_root = if root == Path::new(".") {
        base.to_path_buf()
    } else {
        base.join(&root)
    };
    let mut walker = WalkDir::new(&walk_root).follow_links(false).min_depth(1);
    if !rest.contains("**") {
        walker = walker.max_depth(rest.split('/').count());
    }

    let mut out = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let msg = e.to_string();
            KernTraceError::Io(e.into_io_error().unwrap_or_else(|| std::io::Error::other(msg)))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let p = entry.path();
        let rel = if absolute {
            p
        } else {
            p.strip_prefix(base).unwrap_or(p)
        };
        if matcher.is_match(rel) {
            out.push(p.strip_prefix(".").unwrap_or(p).to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}

/// Directory to walk for `pattern` and the pattern remainder below it.
fn split_glob_root(pattern: &str) -> (PathBuf, &str) {
    let meta = pattern.find(is_glob_meta).unwrap_or(pattern.len());
    match pattern[..meta].rfind('/') {
        Some(0) => (PathBuf::from("/"), &pattern[1..]),
        Some(slash) => (PathBuf::from(&pattern[..slash]), &pattern[slash + 1..]),
        None => (PathBuf::from("."), pattern),
    }
}

fn is_glob_meta(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | ']' | '{' | '}')
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(is_glob_meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kerntrace-fsutil-{name}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[test]
    fn glob_expands_sorted_and_skips_subdirs() {
        let root = temp_dir("glob");
        for name in ["timeline_storer.json", "timeline_consumer.json", "other.json"] {
            std::fs::write(root.join(name), b"[]").expect("write");
        }
        std::fs::create_dir_all(root.join("nested")).expect("mkdir");
        std::fs::write(root.join("nested").join("timeline_loader.json"), b"[]").expect("write");

        let pattern = format!("{}/timeline_*.json", root.display());
        let got = expand_inputs(&[pattern]).expect("expand");
        assert_eq!(
            got,
            vec![root.join("timeline_consumer.json"), root.join("timeline_storer.json")]
        );
    }

    #[test]
    fn dot_slash_glob_matches_like_plain_glob() {
        let root = temp_dir("dotslash");
        for name in ["timeline_controller.json", "timeline_loader.json", "merged.json"] {
            std::fs::write(root.join(name), b"[]").expect("write");
        }
        let expected = vec![
            root.join("timeline_controller.json"),
            root.join("timeline_loader.json"),
        ];

        let plain = expand_inputs_in(&root, &["timeline_*.json".to_string()]).expect("plain");
        let dotted = expand_inputs_in(&root, &["./timeline_*.json".to_string()]).expect("dotted");
        assert_eq!(plain, expected);
        assert_eq!(dotted, expected);
    }

    #[test]
    fn literal_paths_keep_given_order() {
        let got = expand_inputs(&["b.json".to_string(), "a.json".to_string()]).expect("expand");
        assert_eq!(got, vec![PathBuf::from("b.json"), PathBuf::from("a.json")]);
    }

    #[test]
    fn glob_without_matches_is_an_error() {
        let root = temp_dir("nomatch");
        let pattern = format!("{}/*.json", root.display());
        assert!(matches!(
            expand_inputs(&[pattern]),
            Err(KernTraceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let root = temp_dir("atomic");
        let path = root.join("out.json");
        write_atomic(&path, b"[1]").expect("write");
        write_atomic(&path, b"[2]").expect("overwrite");
        assert_eq!(std::fs::read(&path).expect("read"), b"[2]");
        let entries = std::fs::read_dir(&root).expect("ls").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn split_root_handles_relative_and_absolute() {
        assert_eq!(split_glob_root("*.json"), (PathBuf::from("."), "*.json"));
        assert_eq!(split_glob_root("out/t_*.json"), (PathBuf::from("out"), "t_*.json"));
        assert_eq!(split_glob_root("/tmp/a/**/x.json"), (PathBuf::from("/tmp/a"), "**/x.json"));
    }
}
