//! Incremental-write decision.
//!
//! A stack already on disk is left alone only when it is provably a
//! superset of what this run would write: the spatial extent matches
//! exactly and every candidate key is already present. Anything else,
//! including a missing or unreadable manifest, means writing again.

use crate::io::store::PersistedStack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    Write,
    Skip,
}

/// Decide whether the named output needs to be written.
///
/// Band counts are not compared: a persisted stack holding more layers than
/// this run produces is still a valid superset.
pub fn decide(
    name: &str,
    candidate_shape: (usize, usize, usize),
    candidate_keys: &[String],
    existing: Option<&dyn PersistedStack>,
    update_mode: bool,
) -> WriteDecision {
    if !update_mode {
        return WriteDecision::Write;
    }
    let existing = match existing {
        Some(existing) => existing,
        None => {
            log::debug!("{}: no readable stack on disk, writing", name);
            return WriteDecision::Write;
        }
    };

    let (_, length, width) = candidate_shape;
    let (_, out_length, out_width) = existing.shape();
    if (length, width) != (out_length, out_width) {
        log::debug!(
            "{}: spatial size changed from {} x {} to {} x {}, writing",
            name,
            out_length,
            out_width,
            length,
            width
        );
        return WriteDecision::Write;
    }

    let missing = candidate_keys
        .iter()
        .filter(|k| !existing.keys().contains(*k))
        .count();
    if missing > 0 {
        log::debug!("{}: {} new keys to add, writing", name, missing);
        return WriteDecision::Write;
    }

    log::info!("skip writing {}: all keys already present, same size", name);
    WriteDecision::Skip
}
