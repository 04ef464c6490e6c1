//! Path helpers for mirroring stylesheet locations and building import URLs.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Converts a path to an absolute path without touching the filesystem.
///
/// Relative paths are joined onto the current working directory and the
/// result is normalized.
pub fn absolute_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        let cwd = std::env::current_dir().map_err(|e| Error::io(path, e))?;
        Ok(normalize_path(cwd.join(path)))
    }
}

/// Path from directory `base` to `target`, using `..` where needed.
///
/// Purely lexical; pass two absolute (or two relative) paths.
///
/// ```ignore
/// let rel = relative_to("/site/build/css", "/site/src/theme/colors.css");
/// assert_eq!(to_slash(rel), "../../src/theme/colors.css");
/// ```
pub fn relative_to(base: impl AsRef<Path>, target: impl AsRef<Path>) -> PathBuf {
    let base: Vec<Component<'_>> = base.as_ref().components().collect();
    let target: Vec<Component<'_>> = target.as_ref().components().collect();
    let shared = base
        .iter()
        .zip(&target)
        .take_while(|(b, t)| b == t)
        .count();

    let ups = std::iter::repeat_n(Component::ParentDir, base.len() - shared);
    let relative: PathBuf = ups.chain(target[shared..].iter().copied()).collect();
    if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative
    }
}

/// Resolves `.` and `..` lexically, without following symlinks.
///
/// A `..` that cannot be resolved (leading in a relative path) is kept.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        PathBuf::from(".")
    } else {
        parts.into_iter().collect()
    }
}

/// Drops leading `..` components so that joining the result onto a directory
/// can never leave that directory.
pub fn strip_parent_components(path: impl AsRef<Path>) -> PathBuf {
    path.as_ref()
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

/// Renders a path with forward slashes.
pub fn to_slash(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Builds the URL used in an `@import` from `from_dir` to `target`.
///
/// The result always starts with `./` or `../`.
pub fn to_import_url(from_dir: impl AsRef<Path>, target: impl AsRef<Path>) -> String {
    let relative = to_slash(relative_to(from_dir, target));
    if relative.starts_with("../") || relative.starts_with("./") {
        relative
    } else {
        format!("./{}", relative)
    }
}
