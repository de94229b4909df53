//! N-gram table loading and pre-placement.
//!
//! N-grams are placed before unigrams: a partially filled short document
//! may no longer have room for a multi-word tuple, so the wide terms go in
//! while every document is still open.  Each placed instance debits the
//! TOFS entries of its participant terms and the frequencies of every
//! n-gram it subsumes, keeping the overall posting budget intact.

pub mod subsume;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::displaylevel;
use crate::place::{PlaceOutcome, PlacementEngine};
use crate::posting::Posting;
use crate::rng::GenRng;
use self::subsume::SubsumptionIndex;

/// Tuples wider than this are truncated on input.
pub const MAX_NGRAM_ARITY: usize = 6;

/// One record of the n-gram table.
#[derive(Debug, Clone)]
pub struct NgramRow {
    pub arity: usize,
    ids: [u32; MAX_NGRAM_ARITY],
    pub freq: u64,
}

impl NgramRow {
    pub fn termids(&self) -> &[u32] {
        &self.ids[..self.arity]
    }

    /// Sort key: descending arity, then the padded tuple ascending.
    fn key(&self) -> (std::cmp::Reverse<usize>, [u32; MAX_NGRAM_ARITY]) {
        (std::cmp::Reverse(self.arity), self.ids)
    }
}

/// Parse one `N(t1,...,ta):freq` line.  Returns None for lines that are
/// not n-gram records (other record kinds and comments are skipped).
fn parse_ngram_line(line: &str, vocab_size: usize) -> Result<Option<NgramRow>> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || bytes[0] != b'N' || bytes[1] != b'(' || !bytes[2].is_ascii_digit() {
        return Ok(None);
    }
    let body = &line[2..];
    let close = body
        .find(')')
        .with_context(|| format!("unterminated termid tuple in '{line}'"))?;
    let mut ids = [0u32; MAX_NGRAM_ARITY];
    let mut arity = 0usize;
    for piece in body[..close].split(',') {
        let termid: u32 = piece
            .trim()
            .parse()
            .with_context(|| format!("bad termid '{piece}' in '{line}'"))?;
        ensure!(
            termid >= 1 && termid as usize <= vocab_size,
            "termid {} out of range [1, {}] in '{}'",
            termid,
            vocab_size,
            line
        );
        if arity < MAX_NGRAM_ARITY {
            ids[arity] = termid;
            arity += 1;
        }
        // Ids beyond the arity cap are dropped.
    }
    let rest = &body[close + 1..];
    let freq: u64 = match rest.strip_prefix(':') {
        Some(f) => f
            .trim()
            .parse()
            .with_context(|| format!("bad frequency in '{line}'"))?,
        None => bail!("missing ':freq' in '{line}'"),
    };
    if arity < 2 {
        return Ok(None); // a 1-gram carries no dependence information
    }
    Ok(Some(NgramRow { arity, ids, freq }))
}

/// Load the n-grams file and sort rows by descending arity, then by
/// termid tuple.
pub fn load_ngrams_file(path: &Path, vocab_size: usize) -> Result<Vec<NgramRow>> {
    let file = File::open(path).with_context(|| format!("can't read {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(row) = parse_ngram_line(&line, vocab_size)? {
            rows.push(row);
        }
    }
    rows.sort_by_key(|r| r.key());
    displaylevel!(2, "Loaded and sorted {} n-gram rows from {}\n", rows.len(), path.display());
    Ok(rows)
}

/// Per-term repetition counts within one tuple.  `reps[i]` counts how
/// often `termids[i]` appears; the count is exact for the first occurrence
/// of a repeated term, which is the only position the exhaustion check
/// consults.
fn count_term_repetitions(termids: &[u32]) -> [u64; MAX_NGRAM_ARITY] {
    let mut reps = [0u64; MAX_NGRAM_ARITY];
    for (a, &tid) in termids.iter().enumerate() {
        reps[a] = 1 + termids[1..].iter().filter(|&&t| t == tid).count() as u64;
    }
    reps
}

/// Statistics returned by the pre-placer.
#[derive(Debug, Default)]
pub struct NgramStats {
    pub instances_emitted: u64,
    pub instances_suppressed: u64,
    pub subsumptions_found: u64,
    pub postings_placed: u64,
}

/// Place every n-gram instance, highest arity first, debiting TOFS and
/// subsumed-row frequencies as instances go in.
///
/// An instance is suppressed (and the remainder of its row abandoned)
/// when any subsumed row has no frequency left or any participant's TOFS
/// entry would drop below its repetition count.
pub fn place_ngrams(
    rows: &mut [NgramRow],
    tofs: &mut [u64],
    engine: &mut PlacementEngine,
    occurrences: &mut [Posting],
    rng: &mut GenRng,
) -> Result<NgramStats> {
    let mut stats = NgramStats::default();
    if rows.is_empty() {
        return Ok(stats);
    }

    let index = SubsumptionIndex::build(rows);
    let mut tofs_subtracted = 0u64;

    for line in 0..rows.len() {
        let arity = rows[line].arity;
        let freq = rows[line].freq;
        let termids: Vec<u32> = rows[line].termids().to_vec();

        let subsumed = if arity > 2 {
            let refs = index.find_subsumed(&termids, rows);
            if refs.len() >= arity {
                displaylevel!(
                    4,
                    "{} subsumptions found for a {}-gram starting with termid {}\n",
                    refs.len(),
                    arity,
                    termids[0]
                );
            }
            stats.subsumptions_found += refs.len() as u64;
            refs
        } else {
            Vec::new()
        };

        let reps = count_term_repetitions(&termids);

        for i in 0..freq {
            let sub_exhausted = subsumed.iter().any(|&r| rows[r].freq == 0);
            let term_exhausted = termids
                .iter()
                .enumerate()
                .any(|(j, &tid)| tofs[tid as usize - 1] < reps[j]);
            if sub_exhausted || term_exhausted {
                stats.instances_suppressed += freq - i;
                break;
            }

            let outcome = engine.place_instance(&termids, true, occurrences, rng)?;
            if outcome != PlaceOutcome::Placed {
                displaylevel!(
                    1,
                    "Warning: placement of {}-gram with frequency {} and first term {} failed\n",
                    arity,
                    freq,
                    termids[0]
                );
                continue;
            }
            stats.postings_placed += arity as u64;

            for &r in &subsumed {
                rows[r].freq -= 1;
            }
            for &tid in &termids {
                ensure!(
                    tofs[tid as usize - 1] > 0,
                    "TOFS underflow for termid {} while placing an {}-gram",
                    tid,
                    arity
                );
                tofs[tid as usize - 1] -= 1;
                tofs_subtracted += 1;
            }
            ensure!(
                stats.postings_placed == tofs_subtracted,
                "postings placed ({}) diverged from TOFS decrements ({})",
                stats.postings_placed,
                tofs_subtracted
            );
            stats.instances_emitted += 1;
        }
    }

    displaylevel!(2, "N-gram instances emitted: {}\n", stats.instances_emitted);
    displaylevel!(
        2,
        "N-gram instances suppressed due to overlap: {}\n",
        stats.instances_suppressed
    );
    displaylevel!(2, "Total subsumptions found: {}\n", stats.subsumptions_found);
    Ok(stats)
}
