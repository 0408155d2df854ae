/*!
 * Path Normalization
 * One canonical spelling per resource for keys and comparisons
 *
 * Keys are plain strings when the path is valid UTF-8. Other paths are
 * spelled as a NUL marker followed by the hex of their native encoding,
 * which no real path can collide with since paths never contain NUL.
 */

use path_clean::PathClean;
use std::ffi::OsString;
use std::fmt::Write;
use std::path::{Path, PathBuf};

const OPAQUE_MARKER: char = '\0';

/// Lexically clean `path` and drop trailing separators
///
/// `/a/./b/../c/` becomes `/a/c`. The root stays `/`.
pub fn normalize(path: &Path) -> PathBuf {
    path.clean().components().collect()
}

/// Dictionary key for `path`
///
/// Distinct normalized paths always get distinct keys.
pub fn canonical_key(path: &Path) -> String {
    let normalized = normalize(path);
    match normalized.to_str() {
        Some(text) => text.to_owned(),
        None => opaque_key(normalized.as_os_str()),
    }
}

/// Path a dictionary key was made from
pub fn path_from_key(key: &str) -> PathBuf {
    key.strip_prefix(OPAQUE_MARKER)
        .and_then(decode_opaque)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(key))
}

/// Whether two spellings name the same resource
pub fn paths_match(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

#[cfg(unix)]
fn opaque_key(raw: &std::ffi::OsStr) -> String {
    use std::os::unix::ffi::OsStrExt;
    let mut key = String::from(OPAQUE_MARKER);
    for byte in raw.as_bytes() {
        let _ = write!(key, "{:02x}", byte);
    }
    key
}

#[cfg(unix)]
fn decode_opaque(hex: &str) -> Option<OsString> {
    use std::os::unix::ffi::OsStringExt;
    if hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    Some(OsString::from_vec(bytes))
}

#[cfg(windows)]
fn opaque_key(raw: &std::ffi::OsStr) -> String {
    use std::os::windows::ffi::OsStrExt;
    let mut key = String::from(OPAQUE_MARKER);
    for unit in raw.encode_wide() {
        let _ = write!(key, "{:04x}", unit);
    }
    key
}

#[cfg(windows)]
fn decode_opaque(hex: &str) -> Option<OsString> {
    use std::os::windows::ffi::OsStringExt;
    if hex.len() % 4 != 0 {
        return None;
    }
    let units = (0..hex.len())
        .step_by(4)
        .map(|i| u16::from_str_radix(hex.get(i..i + 4)?, 16).ok())
        .collect::<Option<Vec<u16>>>()?;
    Some(OsString::from_wide(&units))
}
