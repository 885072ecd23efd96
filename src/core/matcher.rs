//! Cross-type file matching.
//!
//! One dataset kind acts as the primary: its files define which epochs or
//! pairs exist. Every other kind is then matched to each key by substring
//! search for the key's date tokens in the candidate paths. Candidate lists
//! are path-sorted, so ties resolve to the lexicographically first match.

use crate::core::keys::key_for_record;
use crate::types::{DatasetKind, FileRecord, PathIndex, StackError, StackKey, StackResult};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// All files matched to one epoch or pair key
#[derive(Debug, Clone)]
pub struct MatchedGroup {
    pub key: StackKey,
    pub records: BTreeMap<DatasetKind, FileRecord>,
}

impl MatchedGroup {
    pub fn path_of(&self, kind: DatasetKind) -> Option<&std::path::Path> {
        self.records.get(&kind).map(|r| r.path.as_path())
    }
}

/// Match every kind in the index against the keys defined by the primary
/// kind's files.
///
/// Epoch keys outside the `[start, end]` date window are dropped. Primary
/// files with no derivable key are skipped with a warning. A key missing a
/// file of some kind still produces a group; the gap is logged.
pub fn match_groups(
    index: &PathIndex,
    primary: DatasetKind,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> StackResult<Vec<MatchedGroup>> {
    let primary_records = index
        .get(&primary)
        .filter(|records| !records.is_empty())
        .ok_or(StackError::MissingDataset(primary))?;

    let mut groups: Vec<MatchedGroup> = Vec::new();
    for record in primary_records {
        let key = match key_for_record(record) {
            Some(key) => key,
            None => {
                log::warn!(
                    "skipping {}: no date key could be derived",
                    record.path.display()
                );
                continue;
            }
        };
        if let StackKey::Epoch(epoch) = key {
            let before = start.map_or(false, |s| epoch.0 < s);
            let after = end.map_or(false, |e| epoch.0 > e);
            if before || after {
                log::debug!("{} outside requested date window, dropped", epoch);
                continue;
            }
        }

        let tokens = key.date_tokens();
        let mut records = BTreeMap::new();
        // The defining record is its own match; token search covers the rest.
        records.insert(record.kind, record.clone());
        for (kind, candidates) in index.iter() {
            if *kind == primary {
                continue;
            }
            match find_candidate(candidates, &tokens) {
                Some(found) => {
                    records.insert(*kind, found.clone());
                }
                None => log::warn!("no {} file found for {}", kind.name(), key),
            }
        }
        groups.push(MatchedGroup { key, records });
    }

    log_match_table(index, &groups);
    Ok(groups)
}

/// First candidate whose path contains every date token.
///
/// The head of the list is tried before scanning: in well-organized archives
/// the sorted primary and candidate lists walk in lockstep, so the match is
/// usually right there.
fn find_candidate<'a>(candidates: &'a [FileRecord], tokens: &[String]) -> Option<&'a FileRecord> {
    let first = candidates.first()?;
    if contains_all(first, tokens) {
        return Some(first);
    }
    candidates.iter().find(|c| contains_all(c, tokens))
}

fn contains_all(record: &FileRecord, tokens: &[String]) -> bool {
    let path = record.path_str();
    tokens.iter().all(|t| path.contains(t.as_str()))
}

fn log_match_table(index: &PathIndex, groups: &[MatchedGroup]) {
    let mut counts: BTreeMap<DatasetKind, usize> = BTreeMap::new();
    for group in groups {
        for kind in group.records.keys() {
            *counts.entry(*kind).or_insert(0) += 1;
        }
    }
    log::info!("matched {} keys", groups.len());
    for kind in index.keys() {
        let n = counts.get(kind).copied().unwrap_or(0);
        log::info!("number of matched {:<16} files: {}", kind.name(), n);
    }
    if counts.values().any(|&n| n < groups.len()) {
        log::warn!("not every dataset kind has a file for every key; data may be missing");
    }
}
