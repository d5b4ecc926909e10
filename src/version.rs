//! Parsing of a binary's self-reported version banner.
//!
//! Release binaries print a one-line banner on `--version`:
//!
//! ```text
//! syncthing v1.23.1-rc.1 "Fermium Flea" (go1.19.5 darwin-arm64) teamcity@build.syncthing.net 2023-01-12 03:30:17 UTC [stnoupgrade]
//! ```
//!
//! Three facts are recovered, left to right: the semantic version (without
//! any `-rc.N` style suffix), the runtime identifier and the build date.

use crate::error::ParseError;
use crate::record::VersionRecord;
use regex::Regex;
use std::sync::LazyLock;

static BANNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(v\d+\.\d+\.\d+).*?([A-Za-z]+\d+\.\d+(?:\.\d+)?).*?(\d{4}-\d{2}-\d{2})").unwrap()
});

/// Parse a version banner into a complete [`VersionRecord`].
///
/// The match is not anchored; surrounding text (product name, codename,
/// build host, tags) is ignored.
///
/// # Examples
///
/// ```
/// use histver::version::parse_self_report;
///
/// let r = parse_self_report(
///     r#"syncthing v1.23.1 "Fermium Flea" (go1.19.5 linux-amd64) builder 2023-01-12 03:30:17 UTC"#,
/// ).unwrap();
/// assert_eq!(r.runtime.as_deref(), Some("go1.19.5"));
/// ```
pub fn parse_self_report(text: &str) -> Result<VersionRecord, ParseError> {
    let caps = BANNER_RE
        .captures(text)
        .ok_or_else(|| ParseError::NoMatch(text.trim().to_string()))?;

    Ok(VersionRecord::new(&caps[1], &caps[2], &caps[3]))
}
