//! Date-token parsing and key derivation.
//!
//! Every file in a stack is keyed either by its acquisition date (epoch
//! products such as SLCs and geometry) or by its date pair (interferometric
//! products). Keys come from sidecar metadata when present and are otherwise
//! recovered from date tokens embedded in the file path.

use crate::types::{EpochKey, FileRecord, PairKey, StackError, StackKey, StackResult};
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn pair8_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{8})[-_](\d{8})").unwrap())
}

fn pair6_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{6})[-_](\d{6})").unwrap())
}

fn date8_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{8}").unwrap())
}

fn date6_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{6}").unwrap())
}

/// Parse an 8-digit `YYYYMMDD` or 6-digit `YYMMDD` date token.
///
/// Two-digit years pivot at 30: `31`..`99` map to 1931..1999, `00`..`30`
/// map to 2000..2030.
pub fn parse_date_token(token: &str) -> StackResult<EpochKey> {
    let token = token.trim();
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_date(token));
    }
    let expanded = match token.len() {
        8 => token.to_string(),
        6 => {
            let yy: u32 = token[..2].parse().map_err(|_| bad_date(token))?;
            if yy > 30 {
                format!("19{}", token)
            } else {
                format!("20{}", token)
            }
        }
        _ => return Err(bad_date(token)),
    };
    NaiveDate::parse_from_str(&expanded, "%Y%m%d")
        .map(EpochKey)
        .map_err(|_| bad_date(token))
}

/// Parse a `DATE12` tag: two date tokens joined by `-` or `_`.
pub fn parse_pair_tag(tag: &str) -> StackResult<PairKey> {
    let tag = tag.trim();
    let mut parts = tag.splitn(2, |c| c == '-' || c == '_');
    let (reference, secondary) = match (parts.next(), parts.next()) {
        (Some(a), Some(b)) => (parse_date_token(a)?, parse_date_token(b)?),
        _ => {
            return Err(StackError::InvalidFormat(format!(
                "cannot parse date pair from '{}'",
                tag
            )))
        }
    };
    Ok(PairKey {
        reference,
        secondary,
    })
}

/// Derive the epoch key of a record: sidecar date tag first, then date
/// tokens in the file name, then in ancestor directory names.
pub fn epoch_for_record(record: &FileRecord) -> Option<EpochKey> {
    if let Some(tag) = &record.date_tag {
        if let Ok(epoch) = parse_date_token(tag) {
            return Some(epoch);
        }
    }
    for name in path_components(&record.path) {
        if let Some(m) = date8_regex().find(&name) {
            if let Ok(epoch) = parse_date_token(m.as_str()) {
                return Some(epoch);
            }
        }
        if let Some(m) = date6_regex().find(&name) {
            if let Ok(epoch) = parse_date_token(m.as_str()) {
                return Some(epoch);
            }
        }
    }
    None
}

/// Derive the pair key of a record: sidecar `DATE12` tag first, then paired
/// date tokens in the file name, then in ancestor directory names.
pub fn pair_for_record(record: &FileRecord) -> Option<PairKey> {
    if let Some(tag) = &record.date_tag {
        if let Ok(pair) = parse_pair_tag(tag) {
            return Some(pair);
        }
    }
    for name in path_components(&record.path) {
        for re in [pair8_regex(), pair6_regex()] {
            if let Some(caps) = re.captures(&name) {
                if let (Ok(reference), Ok(secondary)) =
                    (parse_date_token(&caps[1]), parse_date_token(&caps[2]))
                {
                    return Some(PairKey {
                        reference,
                        secondary,
                    });
                }
            }
        }
    }
    None
}

/// Derive the key of a record according to its dataset kind: pair keys for
/// interferometric products, epoch keys for everything else.
pub fn key_for_record(record: &FileRecord) -> Option<StackKey> {
    if record.kind.is_pair_keyed() {
        pair_for_record(record).map(StackKey::Pair)
    } else {
        epoch_for_record(record).map(StackKey::Epoch)
    }
}

/// Acquisition date of a file keyed by its parent directory name, as
/// perpendicular-baseline files are.
pub fn parent_dir_date(path: &Path) -> Option<EpochKey> {
    let dir = path.parent()?.file_name()?.to_str()?;
    if let Some(m) = date8_regex().find(dir) {
        if let Ok(epoch) = parse_date_token(m.as_str()) {
            return Some(epoch);
        }
    }
    date6_regex()
        .find(dir)
        .and_then(|m| parse_date_token(m.as_str()).ok())
}

/// File name followed by ancestor directory names, innermost first.
fn path_components(path: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        names.push(name.to_string());
    }
    let mut current = path.parent();
    while let Some(dir) = current {
        if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
        current = dir.parent();
    }
    names
}

fn bad_date(token: &str) -> StackError {
    StackError::InvalidFormat(format!("cannot parse date from '{}'", token))
}
