//! Placement engine: scatters term occurrences across documents.
//!
//! The doctable is kept partitioned: entries below `non_full` still have
//! free slots, entries at or above it are full.  Random choices are made
//! among the non-full prefix only, so placement never dwells on finished
//! documents.  When a document fills it is swapped with the last non-full
//! entry and the partition boundary moves down.

use anyhow::{bail, ensure, Result};

use crate::displaylevel;
use crate::posting::{DoctableEntry, Posting};
use crate::rng::GenRng;
use crate::shuffle;

/// Upper bound on re-draws when a chosen document cannot hold a multi-word
/// term.  The partition ignores document length, so a handful of retries
/// can happen for wide n-grams late in placement; hitting the bound at all
/// indicates a pathological configuration.
pub const MAX_RANDOM_RETRIES: u32 = 5000;

/// What happened to one placement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed,
    /// Every document is full; nothing more can be placed.
    AllFull,
    /// No non-full document with enough room was found within the retry
    /// budget.
    RetriesExceeded,
}

pub struct PlacementEngine {
    doctable: Vec<DoctableEntry>,
    non_full: usize,
    num_full: u64,
}

impl PlacementEngine {
    /// Takes ownership of a doctable whose pointers have been plugged in.
    pub fn new(doctable: Vec<DoctableEntry>) -> PlacementEngine {
        let non_full = doctable.len();
        PlacementEngine {
            doctable,
            non_full,
            num_full: 0,
        }
    }

    pub fn num_docs(&self) -> usize {
        self.doctable.len()
    }

    /// Place one instance of a term into a randomly chosen document.
    ///
    /// `termids` is a single rank for a unigram or the ordered ranks of an
    /// n-gram; `is_ngram` controls the START/CONTINUATION flags.  On
    /// success the chosen document's pointer advances, its remaining count
    /// drops, and if it filled up the FINAL flag lands on its last posting
    /// and the partition shrinks.
    pub fn place_instance(
        &mut self,
        termids: &[u32],
        is_ngram: bool,
        occurrences: &mut [Posting],
        rng: &mut GenRng,
    ) -> Result<PlaceOutcome> {
        let term_len = termids.len() as u64;

        for _ in 0..MAX_RANDOM_RETRIES {
            if self.non_full == 0 {
                displaylevel!(2, "  --- All documents are full ---\n");
                return Ok(PlaceOutcome::AllFull);
            }
            let j = if self.non_full == 1 {
                0
            } else {
                rng.index(self.non_full)
            };
            let entry = self.doctable[j];
            let mut pointer = entry.pointer();
            let mut remaining = entry.remaining();
            if remaining < term_len {
                continue; // document too small for this term; redraw
            }

            for (k, &termid) in termids.iter().enumerate() {
                ensure!(
                    (pointer as usize) < occurrences.len(),
                    "pointer {} ran past the occurrence array ({} postings)",
                    pointer,
                    occurrences.len()
                );
                let mut posting = Posting::new(termid);
                if is_ngram {
                    if k == 0 {
                        posting.set_ngram_start();
                    } else {
                        posting.set_ngram_cont();
                    }
                }
                occurrences[pointer as usize] = posting;
                pointer += 1;
                remaining -= 1;
            }
            self.doctable[j] = DoctableEntry::pack(pointer, remaining);

            if remaining == 0 {
                occurrences[pointer as usize - 1].set_final();
                if self.non_full > 1 {
                    self.doctable.swap(j, self.non_full - 1);
                }
                self.non_full -= 1;
                self.num_full += 1;
            }
            return Ok(PlaceOutcome::Placed);
        }

        displaylevel!(
            1,
            "Warning: random retry limit of {} exceeded for termid {}\n",
            MAX_RANDOM_RETRIES,
            termids[0]
        );
        Ok(PlaceOutcome::RetriesExceeded)
    }

    /// Place all remaining unigram occurrences recorded in `tofs`.
    ///
    /// The occurrences are first expanded into an intermediate array (rank
    /// r appears TOFS[r-1] times) and globally shuffled, then placed one at
    /// a time.  The shuffle keeps high-frequency terms from monopolising
    /// whichever short documents are still open late in the run.
    pub fn place_unigrams(
        &mut self,
        tofs: &[u64],
        occurrences: &mut [Posting],
        rng: &mut GenRng,
    ) -> Result<u64> {
        let still_to_generate: u64 = tofs.iter().sum();
        let mut intermediate: Vec<u32> = Vec::with_capacity(still_to_generate as usize);
        for (i, &tf) in tofs.iter().enumerate() {
            let rank = (i + 1) as u32;
            for _ in 0..tf {
                intermediate.push(rank);
            }
        }
        ensure!(
            intermediate.len() as u64 == still_to_generate,
            "intermediate array holds {} occurrences, expected {}",
            intermediate.len(),
            still_to_generate
        );
        displaylevel!(
            3,
            "Intermediate array of {} term instances filled\n",
            intermediate.len()
        );
        shuffle::shuffle(rng, &mut intermediate);
        displaylevel!(3, "Intermediate array shuffled\n");

        for (t, &rank) in intermediate.iter().enumerate() {
            let outcome = self.place_instance(&[rank], false, occurrences, rng)?;
            if outcome != PlaceOutcome::Placed {
                bail!(
                    "unigram placement failed at occurrence {}/{} ({:?}); \
                     the doctable no longer matches the posting budget",
                    t,
                    intermediate.len(),
                    outcome
                );
            }
        }
        displaylevel!(3, "Documents filled so far: {}\n", self.num_full);
        Ok(still_to_generate)
    }

    /// Post-placement census of the occurrence array: no slot may be
    /// unwritten and the FINAL count must equal the document count.
    pub fn check_occurrence_array(&self, occurrences: &[Posting]) -> Result<()> {
        let mut zeroes = 0u64;
        let mut end_markers = 0u64;
        for p in occurrences {
            if p.is_final() {
                end_markers += 1;
            }
            if p.rank() == 0 {
                zeroes += 1;
            }
        }
        ensure!(
            zeroes == 0,
            "{} occurrence-array slots were never written",
            zeroes
        );
        ensure!(
            end_markers == self.doctable.len() as u64,
            "found {} end-of-doc markers, expected {}",
            end_markers,
            self.doctable.len()
        );
        Ok(())
    }

    /// Documents that never filled.  Zero once placement has consumed the
    /// whole posting budget.
    pub fn remaining_non_full(&self) -> usize {
        self.non_full
    }
}
