//! Path string normalization
//!
//! Pure string transformations over `/`-separated UTF-8 paths. Nothing in
//! this module touches the filesystem, so the results follow POSIX path
//! syntax only: `..` and symlinks are left alone.
//!
//! These are the building blocks for recursive directory creation in
//! [`crate::directory::create_directory`], which walks a path upward one
//! component at a time without relying on an OS-level `mkdir -p`.

const SEPARATOR: char = '/';

/// Normalize slashes in a path
///
/// The literal root `"/"` is returned unchanged. Otherwise, with
/// `compress` every run of consecutive `/` collapses to a single `/`, and
/// with `strip_trailing` one trailing `/` is removed from the result. A
/// result that has been reduced to the root (e.g. `"///"`) keeps its slash.
///
/// # Example
///
/// ```rust
/// use boundfs::path::fix_slashes;
///
/// assert_eq!(fix_slashes("/usr//local///bin/", true, true), "/usr/local/bin");
/// assert_eq!(fix_slashes("a//b/", false, true), "a//b");
/// assert_eq!(fix_slashes("/", true, true), "/");
/// ```
#[must_use]
pub fn fix_slashes(path: &str, compress: bool, strip_trailing: bool) -> String {
    if path == "/" {
        return path.to_string();
    }

    let mut result = if compress {
        let mut out = String::with_capacity(path.len());
        let mut previous_was_separator = false;
        for ch in path.chars() {
            let is_separator = ch == SEPARATOR;
            if !(is_separator && previous_was_separator) {
                out.push(ch);
            }
            previous_was_separator = is_separator;
        }
        out
    } else {
        path.to_string()
    };

    if strip_trailing && result.len() > 1 && result.ends_with(SEPARATOR) {
        result.pop();
    }

    result
}

/// [`fix_slashes`] with both compression and trailing-slash stripping
#[must_use]
pub fn normalize(path: &str) -> String {
    fix_slashes(path, true, true)
}

/// Byte index where the last component of `path` starts
///
/// Scans backward from the end and returns the index just past the last
/// `/`, or `0` when the path has no separator (a single relative component).
///
/// `path` must not end in `/`; run it through [`normalize`] first when
/// unsure. A trailing separator is a caller bug and trips a debug assertion.
#[must_use]
pub fn start_of_last_path_component(path: &str) -> usize {
    debug_assert!(
        !path.ends_with(SEPARATOR),
        "path must not end in a separator: {path:?}"
    );
    path.rfind(SEPARATOR).map_or(0, |idx| idx + 1)
}

/// The last component of a normalized path
///
/// Returns `"/"` for the root and `""` for the empty path.
#[must_use]
pub fn last_path_component(path: &str) -> &str {
    if path.is_empty() || path == "/" {
        return path;
    }
    &path[start_of_last_path_component(path)..]
}

/// Remove the last component of a path
///
/// The path is normalized first. The root maps to itself, a single
/// relative component has no parent and maps to `""`, and `/name` maps to
/// the root. Applying this repeatedly always ends at `""` or `"/"`.
///
/// # Example
///
/// ```rust
/// use boundfs::path::drop_last_path_component;
///
/// assert_eq!(drop_last_path_component("/a/b/c"), "/a/b");
/// assert_eq!(drop_last_path_component("/a"), "/");
/// assert_eq!(drop_last_path_component("a"), "");
/// ```
#[must_use]
pub fn drop_last_path_component(path: &str) -> String {
    let path = normalize(path);

    if path.is_empty() || path == "/" {
        return path;
    }

    match start_of_last_path_component(&path) {
        // relative path, single component
        0 => String::new(),
        // absolute path, single component
        1 => SEPARATOR.to_string(),
        start => path[..start - 1].to_string(),
    }
}
