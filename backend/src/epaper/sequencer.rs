// sequencer.rs
//
// Stateless shuffle bag. The client carries the remaining plan in its token;
// each request serves the head of the plan and hands back the tail, topping it
// up with a fresh permutation of the whole catalog when it runs low.

use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

use super::catalog::{CatalogSnapshot, FileEntry};
use super::token;

/// Upper bound on the forward-plan depth handed back to the client.
pub const PLAN_DEPTH: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("catalog is empty")]
    EmptyCatalog,
    #[error("index {index} is not in a catalog of {len} entries")]
    MissingEntry { index: usize, len: usize },
}

/// Result of advancing a plan by one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub served: usize,
    pub remaining: Vec<usize>,
    pub replenished: bool,
}

/// What a request should serve and the token to hand back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub entry: FileEntry,
    pub next_token: String,
}

pub fn min_buffer(catalog_len: usize) -> usize {
    PLAN_DEPTH.min(catalog_len)
}

/// Uniform random permutation of `0..catalog_len`.
pub fn fresh_batch<R: Rng + ?Sized>(catalog_len: usize, rng: &mut R) -> Vec<usize> {
    let mut batch: Vec<usize> = (0..catalog_len).collect();
    batch.shuffle(rng);
    batch
}

/// Advances a decoded plan by one serve.
///
/// `sequence` must already be filtered to `[0, catalog_len)`; stray indices
/// are dropped here as well so the head is always servable.
pub fn advance<R: Rng + ?Sized>(
    mut sequence: Vec<usize>,
    catalog_len: usize,
    rng: &mut R,
) -> Result<Step, SequenceError> {
    if catalog_len == 0 {
        return Err(SequenceError::EmptyCatalog);
    }
    sequence.retain(|&idx| idx < catalog_len);

    let min_buffer = min_buffer(catalog_len);
    let replenished = sequence.len() <= min_buffer;
    if replenished {
        let mut batch = fresh_batch(catalog_len, rng);
        // The old plan's last index is served right before the batch's first.
        if min_buffer > 1 {
            if let Some(&seam) = sequence.last() {
                if batch[0] == seam {
                    let last = batch.len() - 1;
                    batch.swap(0, last);
                }
            }
        }
        sequence.extend(batch);
    }

    let remaining = sequence.split_off(1);
    Ok(Step {
        served: sequence[0],
        remaining,
        replenished,
    })
}

/// Decodes `raw_token` against `snapshot`, advances the plan and resolves
/// the entry to serve.
pub fn select<R: Rng + ?Sized>(
    snapshot: &CatalogSnapshot,
    raw_token: &str,
    rng: &mut R,
) -> Result<Selection, SequenceError> {
    let len = snapshot.len();
    let sequence = token::decode(raw_token, len);
    let step = advance(sequence, len, rng)?;

    let entry = snapshot
        .get(step.served)
        .cloned()
        .ok_or(SequenceError::MissingEntry {
            index: step.served,
            len,
        })?;

    Ok(Selection {
        index: step.served,
        entry,
        next_token: token::encode(&step.remaining),
    })
}
