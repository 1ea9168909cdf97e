//! Marker-region patching of the proxy configuration
//!
//! The proxy's dynamic configuration contains exactly one region delimited by two
//! sentinel lines, typically commented out so the file stays valid YAML:
//!
//! ```yaml
//! tls:
//!   certificates:
//! # >>>>>ohmycert-start<<<<<<
//!     - certFile: /etc/traefik/ssl/example.com.crt # example.com
//!       keyFile: /etc/traefik/ssl/example.com.key
//! # >>>>>ohmycert-end<<<<<<
//! ```
//!
//! Only the lines strictly between the two sentinel lines are replaced. The
//! sentinel lines themselves and everything outside them are kept byte-for-byte.

use crate::error::{Error, MarkerProblem, Result};
use crate::utils::write_atomic;
use camino::{Utf8Path, Utf8PathBuf};
use std::ops::Range;
use tracing::debug;

/// Sentinel opening the managed region
pub const START_MARKER: &str = ">>>>>ohmycert-start<<<<<<";

/// Sentinel closing the managed region
pub const END_MARKER: &str = ">>>>>ohmycert-end<<<<<<";

/// Locate the byte range strictly between the start-marker line and the end-marker line
pub fn locate_region(content: &str) -> std::result::Result<Range<usize>, MarkerProblem> {
    let starts: Vec<usize> = content.match_indices(START_MARKER).map(|(i, _)| i).collect();
    let ends: Vec<usize> = content.match_indices(END_MARKER).map(|(i, _)| i).collect();

    let start = match starts.as_slice() {
        [] => return Err(MarkerProblem::MissingStart),
        [only] => *only,
        _ => return Err(MarkerProblem::DuplicateStart),
    };
    let end = match ends.as_slice() {
        [] => return Err(MarkerProblem::MissingEnd),
        [only] => *only,
        _ => return Err(MarkerProblem::DuplicateEnd),
    };
    if end < start {
        return Err(MarkerProblem::EndBeforeStart);
    }

    let after_start = start + START_MARKER.len();
    let interior_start = match content[after_start..].find('\n') {
        Some(offset) => after_start + offset + 1,
        None => return Err(MarkerProblem::SameLine),
    };
    let interior_end = content[..end].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if interior_end < interior_start {
        return Err(MarkerProblem::SameLine);
    }

    Ok(interior_start..interior_end)
}

/// Replace the marker region's interior with `fragment`.
///
/// A fragment carrying either sentinel is rejected, since the patched file
/// would no longer contain exactly one region.
pub fn splice(content: &str, fragment: &str) -> std::result::Result<String, MarkerProblem> {
    if fragment.contains(START_MARKER) || fragment.contains(END_MARKER) {
        return Err(MarkerProblem::MarkerInFragment);
    }
    let region = locate_region(content)?;

    let mut patched = String::with_capacity(content.len() + fragment.len());
    patched.push_str(&content[..region.start]);
    patched.push_str(fragment);
    if !fragment.is_empty() && !fragment.ends_with('\n') {
        patched.push('\n');
    }
    patched.push_str(&content[region.end..]);
    Ok(patched)
}

/// Patches the marker region of one configuration file
#[derive(Debug, Clone)]
pub struct ConfigPatcher {
    path: Utf8PathBuf,
}

impl ConfigPatcher {
    /// Create a patcher for the given file
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the patched file
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Compute the patched content without writing it.
    ///
    /// Returns `None` when the file already contains exactly this fragment.
    pub fn plan(&self, fragment: &str) -> Result<Option<String>> {
        let content = std::fs::read_to_string(&self.path)?;
        let patched = splice(&content, fragment)
            .map_err(|problem| Error::patch_structure(&self.path, problem))?;

        if patched == content {
            Ok(None)
        } else {
            Ok(Some(patched))
        }
    }

    /// Replace the marker region with `fragment`.
    ///
    /// Returns whether the file was rewritten. A malformed region leaves the
    /// file untouched.
    pub fn apply(&self, fragment: &str) -> Result<bool> {
        match self.plan(fragment)? {
            Some(patched) => {
                write_atomic(&self.path, patched.as_bytes())
                    .map_err(|e| Error::write_failure(&self.path, e))?;
                debug!(path = %self.path, bytes = patched.len(), "marker region replaced");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
