//! Shuffling primitives.
//!
//! The doctable and the intermediate occurrence array take a plain uniform
//! shuffle.  The within-document pass needs the n-gram-respecting variant:
//! multi-word windows must move as a unit and may never be torn apart or
//! internally reordered.

use rand::seq::SliceRandom;

use crate::posting::Posting;
use crate::rng::GenRng;

/// Uniform Fisher-Yates shuffle of any slice.
pub fn shuffle<T>(rng: &mut GenRng, items: &mut [T]) {
    items.shuffle(rng);
}

/// Shuffle a run of postings without breaking n-grams.
///
/// Rules, applied while walking left to right:
///
/// - a CONTINUATION posting is never the left side of a swap;
/// - a START posting drags its whole window, and only swaps into a target
///   window carrying no n-gram flags at all;
/// - a plain posting only swaps with another plain posting.
///
/// When the chosen target is unsuitable the swap is abandoned rather than
/// retried, so a single pass stays linear in the run length.
pub fn shuffle_respecting_ngrams(rng: &mut GenRng, arr: &mut [Posting]) {
    let n = arr.len();
    if n < 2 {
        return;
    }
    let last = n - 1;

    let mut i = 0;
    while i + 1 < n {
        if arr[i].is_ngram_cont() {
            i += 1;
            continue;
        }

        if arr[i].is_ngram_start() {
            // Measure the window.
            let mut gramlen = 1;
            let mut k = i + 1;
            while k < n && arr[k].is_ngram_cont() {
                k += 1;
                gramlen += 1;
            }
            // Last index at which a target window of the same width could
            // start without running off the end.
            let limit = match (last + 1).checked_sub(gramlen) {
                Some(l) => l,
                None => break,
            };
            if i + gramlen > limit {
                break; // no room beyond this n-gram for a full window
            }
            let j = if i + gramlen == limit {
                limit
            } else {
                rng.range_u64((i + gramlen) as u64, limit as u64) as usize
            };
            // The target window must be entirely flag-free.
            let clean = arr[j..j + gramlen].iter().all(|p| !p.is_ngram());
            if clean {
                for k in 0..gramlen {
                    arr.swap(i + k, j + k);
                }
            }
            i += gramlen;
            continue;
        }

        // Plain posting: pick any later position, but only swap with
        // another plain posting.
        let j = if i + 1 == last {
            last
        } else {
            rng.range_u64((i + 1) as u64, last as u64) as usize
        };
        if !arr[j].is_ngram() {
            arr.swap(i, j);
        }
        i += 1;
    }
}

/// Shuffle every document of the occurrence array in place.
///
/// Documents are the maximal runs delimited by FINAL flags.  The FINAL
/// flag is lifted off the old boundary before shuffling and pinned onto
/// the new last posting afterwards, so exactly one per document survives.
/// Runs shorter than four postings are left alone.
pub fn shuffle_within_docs(rng: &mut GenRng, occurrences: &mut [Posting]) -> u64 {
    let n = occurrences.len();
    let mut doc_ends_found = 0u64;
    let mut start = 0usize;
    while start < n {
        let mut end = start;
        while end < n && !occurrences[end].is_final() {
            end += 1;
        }
        if end < n {
            if end - start > 2 {
                occurrences[end].clear_final();
                shuffle_respecting_ngrams(rng, &mut occurrences[start..=end]);
                occurrences[end].set_final();
            }
            doc_ends_found += 1;
        }
        start = end + 1;
    }
    doc_ends_found
}
