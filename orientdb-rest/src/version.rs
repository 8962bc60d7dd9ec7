//! Server version parsing, comparison and compatibility fallback

use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;
use tracing::warn;

/// Baseline version assumed when the server does not report a usable one
pub const DEFAULT_SERVER_VERSION: &str = "1.0.0";

/// Strict `major.minor.patch` format, optionally followed by a suffix
/// such as `-SNAPSHOT`
fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^\d+\.\d+\.\d+([-.].*)?$").unwrap()
    })
}

/// Whether a reported version string is usable as-is
pub fn is_well_formed(version: &str) -> bool {
    version_pattern().is_match(version)
}

/// Accept the server's reported version, falling back to the baseline
///
/// A missing or malformed report degrades to [`DEFAULT_SERVER_VERSION`] with a
/// warning; older and nonstandard servers depend on this leniency.
pub fn accept_reported(reported: Option<&str>) -> String {
    match reported {
        Some(version) if is_well_formed(version) => version.to_string(),
        Some(version) => {
            warn!(version, "bad server version format, assuming baseline");
            DEFAULT_SERVER_VERSION.to_string()
        }
        None => DEFAULT_SERVER_VERSION.to_string(),
    }
}

/// Compare two dotted numeric version strings component-wise
///
/// Missing components count as 0, so `"1.0"` equals `"1.0.0"`. Non-numeric
/// trailing characters within a component are ignored past the leading digits
/// (`"5-rc2"` reads as 5).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<u64> = a.split('.').map(leading_number).collect();
    let right: Vec<u64> = b.split('.').map(leading_number).collect();
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

fn leading_number(component: &str) -> u64 {
    let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
