//! Rank-length assignment for Markov-generated vocabularies.
//!
//! With an end-of-word symbol the sampler's output lengths follow the
//! letter model, not the rank-length correlation observed in the training
//! corpus.  This pass restores the correlation: sort the words by
//! (optionally penalized) length, record which span of the sorted order
//! each length occupies, then walk the ranks drawing a length for each
//! from its rank bucket's observed distribution and handing out the next
//! word of that length.

use anyhow::{bail, Result};

use crate::displaylevel;
use crate::markov::{rank_bucket, LenProbMatrix, LengthStats, MAX_TERM_LEN, NUM_RANK_BUCKETS};
use crate::rng::GenRng;

const UNPRONOUNCEABLE_PENALTY: usize = 2;

/// Crude pronounceability score: 0 for vowel-less strings, 2 for a
/// comfortable consonant/vowel balance, 1 otherwise.
pub fn pronounceability(word: &[u8]) -> u32 {
    let mut vowels = 0i64;
    let mut consonants = 0i64;
    for &b in word {
        if matches!(b, b'a' | b'e' | b'i' | b'o' | b'u') {
            vowels += 1;
        } else {
            consonants += 1;
        }
    }
    if vowels == 0 {
        0
    } else if (consonants - vowels).abs() <= 2 {
        2
    } else {
        1
    }
}

/// Word length in bytes, with the penalty for unpronounceable strings
/// applied when requested, capped at [`MAX_TERM_LEN`].
pub fn penalized_len(word: &[u8], favour_pronounceable: bool) -> usize {
    let mut l = word.len();
    if favour_pronounceable && pronounceability(word) == 0 {
        l += UNPRONOUNCEABLE_PENALTY;
    }
    l.min(MAX_TERM_LEN)
}

/// Pick an index from a row of cumulative probabilities; an all-zero row
/// falls back to a uniform pick.
pub fn biased_random_pick(probvec: &[f64], rng: &mut GenRng) -> usize {
    let r = rng.unit();
    for (e, &cum) in probvec.iter().enumerate() {
        if r < cum {
            return e;
        }
    }
    (r * probvec.len() as f64).floor() as usize
}

/// Allocation cursor for one bucket: the next position to hand out and
/// the last position the bucket owns.  `next > max` means exhausted.
#[derive(Clone, Copy, Debug)]
struct BucketSpan {
    next: usize,
    max: usize,
}

/// Spans of the length-sorted word list, one per word length.
fn setup_length_buckets(lens: &[usize]) -> Result<[BucketSpan; MAX_TERM_LEN]> {
    // Absent lengths get an empty span so the outward search skips them.
    let mut buckets = [BucketSpan { next: 1, max: 0 }; MAX_TERM_LEN];
    let mut prevlen = 0usize;
    for (i, &len) in lens.iter().enumerate() {
        let r = i + 1;
        if len < prevlen {
            bail!("length-bucket setup requires words sorted by increasing length");
        }
        if len > prevlen {
            buckets[len - 1].next = r;
            prevlen = len;
        }
        buckets[len - 1].max = r;
    }
    displaylevel!(4, "Length buckets set up: {:?}\n", &buckets[..]);
    Ok(buckets)
}

/// The drawn length's bucket is empty; search outward for one with words
/// left, upward first, then downward.
fn find_a_better_length_bucket(
    useless_len: usize,
    buckets: &[BucketSpan; MAX_TERM_LEN],
    num_terms: usize,
) -> Result<usize> {
    let mut len = useless_len + 1;
    while len <= MAX_TERM_LEN {
        let b = buckets[len - 1];
        if b.next <= b.max && b.next <= num_terms {
            return Ok(len);
        }
        len += 1;
    }
    let mut len = useless_len;
    while len >= 1 {
        let b = buckets[len - 1];
        if b.next <= b.max && b.next <= num_terms {
            return Ok(len);
        }
        len -= 1;
    }
    bail!("no length bucket has words left (came in with length {useless_len})");
}

/// Rank-bucket allocation cursors for by-length assignment: bucket b owns
/// ranks 10^b ..= 10^(b+1)-1.
fn setup_rank_buckets() -> [BucketSpan; NUM_RANK_BUCKETS] {
    let mut buckets = [BucketSpan { next: 1, max: 0 }; NUM_RANK_BUCKETS];
    let mut f = 1usize;
    for bucket in buckets.iter_mut() {
        bucket.next = f;
        f = f.saturating_mul(10);
        bucket.max = f - 1;
    }
    buckets
}

fn find_a_better_rank_bucket(
    useless_bucket: usize,
    buckets: &[BucketSpan; NUM_RANK_BUCKETS],
    num_terms: usize,
) -> Result<usize> {
    let mut b = useless_bucket + 1;
    while b < NUM_RANK_BUCKETS {
        if buckets[b].next <= buckets[b].max && buckets[b].next <= num_terms {
            return Ok(b);
        }
        b += 1;
    }
    let mut b = useless_bucket as i64;
    while b >= 0 {
        let bucket = buckets[b as usize];
        if bucket.next <= bucket.max && bucket.next <= num_terms {
            return Ok(b as usize);
        }
        b -= 1;
    }
    bail!("no rank bucket has room left (came in with bucket {useless_bucket})");
}

/// Reorder length-sorted `words` so that rank correlates with length.
///
/// By-rank mode walks the ranks, draws a length from the rank bucket's
/// length distribution and takes the next word of that length.  By-length
/// mode walks the words and draws a rank bucket from the length's rank
/// distribution.
pub fn assign_words_to_ranks(
    words: Vec<Vec<u8>>,
    lenprob: &LenProbMatrix,
    favour_pronounceable: bool,
    rng: &mut GenRng,
) -> Result<Vec<Vec<u8>>> {
    let num_terms = words.len();
    let lens: Vec<usize> = words
        .iter()
        .map(|w| penalized_len(w, favour_pronounceable))
        .collect();

    if lenprob.by_rank() {
        let mut words = words;
        let mut buckets = setup_length_buckets(&lens)?;
        let mut out: Vec<Vec<u8>> = vec![Vec::new(); num_terms];
        for rank in 1..=num_terms {
            let lbuk = rank_bucket(rank as u64);
            let row = lenprob.row(lbuk);
            let mut len = biased_random_pick(row, rng) + 1;
            {
                let b = buckets[len - 1];
                if b.next > b.max || b.next > num_terms {
                    len = find_a_better_length_bucket(len, &buckets, num_terms)?;
                }
            }
            let chosen = buckets[len - 1].next - 1;
            buckets[len - 1].next += 1;
            debug_assert!(!words[chosen].is_empty(), "word {} handed out twice", chosen);
            out[rank - 1] = std::mem::take(&mut words[chosen]);
        }
        Ok(out)
    } else {
        let mut buckets = setup_rank_buckets();
        for bucket in buckets.iter_mut() {
            bucket.max = bucket.max.min(num_terms);
        }
        let mut out: Vec<Vec<u8>> = vec![Vec::new(); num_terms];
        for (i, word) in words.into_iter().enumerate() {
            let len = lens[i];
            let row = lenprob.row(len - 1);
            let mut lbuk = biased_random_pick(row, rng).min(NUM_RANK_BUCKETS - 1);
            if buckets[lbuk].next > buckets[lbuk].max || buckets[lbuk].next > num_terms {
                lbuk = find_a_better_rank_bucket(lbuk, &buckets, num_terms)?;
            }
            let slot = buckets[lbuk].next - 1;
            buckets[lbuk].next += 1;
            out[slot] = word;
        }
        Ok(out)
    }
}

/// Accumulate the length statistics of the finished vocabulary, for
/// comparison against the training corpus.
pub fn bucketed_length_stats(words: &[Vec<u8>]) -> LengthStats {
    let mut stats = LengthStats::default();
    for (i, word) in words.iter().enumerate() {
        if !word.is_empty() {
            stats.accumulate(rank_bucket(i as u64 + 1), word.len());
        }
    }
    stats.finalize();
    stats
}

/// Print the base-vs-mimic mean word length table.
pub fn compare_length_distributions(base: &LengthStats, mimic: &LengthStats) {
    displaylevel!(
        2,
        "\nMean word lengths for logarithmic rank buckets\n\
         Bucket         Base mean    St.dev.   |   Mimic mean    St.dev.\n"
    );
    for b in 0..NUM_RANK_BUCKETS {
        displaylevel!(
            2,
            "{:6}   {:12.3} {:10.3}  | {:12.3} {:10.3}\n",
            b,
            base.means[b],
            base.stdevs[b],
            mimic.means[b],
            mimic.stdevs[b]
        );
    }
}
