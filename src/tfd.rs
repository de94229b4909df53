//! Term-frequency-distribution synthesizer.
//!
//! Turns a [`ZipfModel`] plus a posting budget into the TOFS array: one
//! occurrence frequency per term rank.  Three goals compete:
//!
//!   A - the requested number of postings,
//!   B - the requested vocabulary size,
//!   C - the requested number of singleton terms.
//!
//! A and B take priority over C, because the occurrence and vocabulary
//! arrays are sized from the request and may neither overflow nor come up
//! short.  After synthesis both A and B are enforced exactly.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::displaylevel;
use crate::model::ZipfModel;

/// How many leading entries the tail patch-up may borrow postings from.
const MAX_REDISTRIBUTION_TERMS: usize = 1000;

/// Trial middle-region allocation under `fudge`, reproducing the rounding
/// and carry behaviour of the real emission.  Returns the total number of
/// postings the middle region would receive.
fn trial_middle_allocation(model: &ZipfModel, num_postings: f64, fudge: f64) -> f64 {
    let mut postings = 0.0f64;
    let mut carry = 0.0f64;
    for seg in &model.mid_segments {
        let first = seg.first as u64;
        let last = seg.last as u64;
        let mut rank = first;
        while rank <= last && last > 0 {
            let area = seg.unit_area(rank) * fudge;
            let mut tf = num_postings * area + carry;
            if tf < 0.0 {
                tf = -tf;
            }
            let tf0 = tf.floor();
            carry = tf - tf0;
            postings += tf0;
            rank += 1;
        }
    }
    postings
}

/// Calibrate the multiplicative fudge factor that compensates for
/// per-rank rounding in the middle region.  A trial allocation yields M'
/// postings; the ratio M/M' feeds the next trial, iterated to a fixed
/// point.
fn calibrate_middle_fudge(model: &ZipfModel, middle_postings: f64, num_postings: f64) -> f64 {
    let mut fudge = 1.0f64;
    for _ in 0..=20 {
        let trial = trial_middle_allocation(model, num_postings, fudge);
        if trial <= 0.0 {
            break;
        }
        fudge *= middle_postings / trial;
    }
    displaylevel!(3, "Middle fudge factor: {:.10}\n", fudge);
    fudge
}

/// Synthesize the TOFS array.
///
/// Postconditions (fatal when violated): the array sums to exactly
/// `num_postings` and every one of the `vocab_size` entries is non-zero.
/// The singleton count approximates `model.tail_perc` percent of the
/// vocabulary but is not guaranteed.
pub fn synthesize_tofs(model: &ZipfModel, num_postings: u64, vocab_size: usize) -> Result<Vec<u64>> {
    ensure!(vocab_size > 0, "vocabulary size must be positive");
    ensure!(
        num_postings >= vocab_size as u64,
        "cannot fit {} distinct terms into {} postings",
        vocab_size,
        num_postings
    );

    let dnum_postings = num_postings as f64;
    let limit = num_postings;
    let mut tofs = vec![0u64; vocab_size];

    // Region sizing.
    let head_postings = model.head_prob() * dnum_postings;
    let tail_postings = if model.tail_perc > 0.0 {
        model.tail_perc * vocab_size as f64 / 100.0
    } else {
        0.0
    };
    let middle_postings = dnum_postings - head_postings - tail_postings;
    displaylevel!(
        3,
        "Aiming for {:.1} head, {:.1} middle, {:.1} tail postings\n",
        head_postings,
        middle_postings,
        tail_postings
    );

    let mut posting = 0u64; // postings allocated so far
    let mut next_rank = 1u64; // first rank not yet assigned
    let mut non_tail_singletons = 0u64;

    // ---- Head region: explicit cumulative probabilities. ----
    for (ht, cumprob) in model.head_cumprobs.iter().enumerate() {
        let posting_limit = ((cumprob * dnum_postings).floor() as u64).min(limit);
        if posting_limit <= posting {
            bail!(
                "head term {} has no postings left (cumprob {:.4})",
                ht + 1,
                cumprob
            );
        }
        let tf = posting_limit - posting;
        tofs[ht] = tf;
        posting += tf;
        if tf == 1 {
            non_tail_singletons += 1;
        }
        next_rank += 1;
    }

    // ---- Middle region: per-rank analytic areas with carry. ----
    let fudge = calibrate_middle_fudge(model, middle_postings, dnum_postings);
    let mut carry = 0.0f64;
    for seg in &model.mid_segments {
        let first = seg.first as u64;
        let last = seg.last as u64;
        let mut rank = first;
        while rank <= last && last > 0 {
            let area = seg.unit_area(rank) * fudge;
            let mut tf = dnum_postings * area + carry;
            if tf < 0.0 {
                tf = -tf;
            }
            let mut tf0 = tf.floor() as u64;
            carry = tf - tf.floor();
            if posting + tf0 > limit {
                tf0 = limit - posting;
            }
            if tf0 == 0 {
                displaylevel!(2, "Warning: middle tf is zero for rank {}\n", rank);
            }
            if tf0 == 1 {
                non_tail_singletons += 1;
            }
            tofs[rank as usize - 1] = tf0;
            posting += tf0;
            next_rank = rank + 1;
            rank += 1;
        }
    }
    displaylevel!(
        3,
        "Head+middle generated {} occurrences up to rank {}\n",
        posting,
        next_rank - 1
    );

    // ---- Tail region: remaining postings over remaining ranks. ----
    let mut tail_postings_needed = num_postings - posting;
    let tail_vocab_needed = vocab_size as u64 - (next_rank - 1);

    if tail_vocab_needed > tail_postings_needed {
        // Unless postings are clawed back from the front of the
        // distribution, the vocabulary would come up short.
        displaylevel!(
            2,
            "Warning: tail adjustment of {} needed to reach the requested vocabulary size\n",
            tail_vocab_needed - tail_postings_needed
        );
        let terms_to_alter =
            MAX_REDISTRIBUTION_TERMS.min(vocab_size / 100 + 1).min((next_rank - 1) as usize);
        ensure!(
            terms_to_alter > 0,
            "no head or middle terms available for tail redistribution"
        );
        'sweep: loop {
            let mut progressed = false;
            for entry in tofs.iter_mut().take(terms_to_alter) {
                if *entry > 1 {
                    *entry -= 1;
                    posting -= 1;
                    tail_postings_needed += 1;
                    progressed = true;
                    if tail_postings_needed >= tail_vocab_needed {
                        break 'sweep;
                    }
                }
            }
            ensure!(
                progressed,
                "tail redistribution stalled: cannot free enough postings for {} tail terms",
                tail_vocab_needed
            );
        }
    }

    if tail_vocab_needed > 0 {
        displaylevel!(
            3,
            "Tail segment: {} more postings over {} new words\n",
            tail_postings_needed,
            tail_vocab_needed
        );
        let ave_tail_tf = tail_postings_needed as f64 / tail_vocab_needed as f64;
        let mut carry = 0.0f64;
        let mut tail_singletons = 0u64;
        let mut rank = next_rank;
        while rank <= vocab_size as u64 {
            let tf = ave_tail_tf + carry;
            let mut tf0 = tf.floor() as u64;
            carry = tf - tf.floor();
            if posting + tf0 > limit {
                tf0 = limit - posting;
            }
            if tf0 == 0 {
                displaylevel!(2, "Warning: tail tf is zero for rank {}\n", rank);
            }
            tofs[rank as usize - 1] = tf0;
            posting += tf0;
            if tf0 == 1 {
                tail_singletons += 1;
            }
            rank += 1;
        }
        // Any residual shortfall goes to the last assigned rank.
        if num_postings > posting {
            displaylevel!(3, "Final tail patch-up by {}\n", num_postings - posting);
            tofs[vocab_size - 1] += num_postings - posting;
            posting = num_postings;
        }
        displaylevel!(
            3,
            "Singletons: tail {} + non-tail {} = {} ({:.1}% of vocab, {:.1}% requested)\n",
            tail_singletons,
            non_tail_singletons,
            tail_singletons + non_tail_singletons,
            (tail_singletons + non_tail_singletons) as f64 * 100.0 / vocab_size as f64,
            model.tail_perc
        );
    } else if num_postings > posting {
        // No tail ranks: the shortfall lands on the last middle rank.
        tofs[vocab_size - 1] += num_postings - posting;
        posting = num_postings;
    }

    // ---- Postconditions. ----
    let sum: u64 = tofs.iter().sum();
    ensure!(
        sum == num_postings && posting == num_postings,
        "TOFS synthesis produced {} postings, {} requested",
        sum,
        num_postings
    );
    let non_zero = tofs.iter().filter(|&&tf| tf > 0).count();
    ensure!(
        non_zero == vocab_size,
        "TOFS synthesis produced {} non-zero entries, {} requested",
        non_zero,
        vocab_size
    );
    Ok(tofs)
}

/// Read an exact TOFS array from a vocabulary file, for runs that emulate
/// the base corpus's term frequencies verbatim.
///
/// The file is tab-separated with the frequency in the second field and is
/// assumed sorted by descending frequency.  The line count must equal the
/// vocabulary size and the frequencies must sum to the posting budget.
pub fn read_tofs_from_file(
    path: &Path,
    num_postings: u64,
    vocab_size: usize,
) -> Result<Vec<u64>> {
    displaylevel!(2, "Reading TOFS from {}\n", path.display());
    let file = File::open(path).with_context(|| format!("can't open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut tofs = Vec::with_capacity(vocab_size);
    let mut total: u64 = 0;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read failure in {}", path.display()))?;
        let freq_field = match line.split('\t').nth(1) {
            Some(f) => f,
            None => bail!("TAB not found in line {} of {}", lineno + 1, path.display()),
        };
        let freq: u64 = freq_field
            .trim()
            .parse()
            .with_context(|| format!("bad frequency in line {} of {}", lineno + 1, path.display()))?;
        ensure!(
            tofs.len() < vocab_size,
            "{} has more than {} lines",
            path.display(),
            vocab_size
        );
        tofs.push(freq);
        total += freq;
    }

    ensure!(
        tofs.len() == vocab_size,
        "{} has {} lines, expected {}",
        path.display(),
        tofs.len(),
        vocab_size
    );
    ensure!(
        total == num_postings,
        "{} holds {} postings, expected {}",
        path.display(),
        total,
        num_postings
    );
    Ok(tofs)
}
