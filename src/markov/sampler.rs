//! Markov word sampling with uniqueness guarantee.
//!
//! Words are generated letter by letter from the trained cumulative rows,
//! optionally smoothing each step to the backoff row with probability
//! lambda.  A hash set of everything generated so far rejects duplicates;
//! per-length retry budgets grow geometrically with the length, and when a
//! length is exhausted it is disabled and the target length bumped.

use std::collections::HashSet;

use anyhow::{bail, ensure, Result};
use xxhash_rust::xxh64::Xxh64Builder;

use crate::displaylevel;
use crate::markov::alphabet::{EOW, MAX_MARKOV_K, MAX_TERM_LEN};
use crate::markov::trainer::{rank_bucket, MarkovModel};
use crate::rng::GenRng;

/// Retry budgets stop growing past this point; the budget is already far
/// beyond anything a run will spend.
const MAX_TRIES_CEILING: u64 = 10_000_000_000;

pub struct UniqueWordSampler<'a> {
    model: &'a MarkovModel,
    words_generated: HashSet<Vec<u8>, Xxh64Builder>,
    max_tries: [u64; MAX_TERM_LEN + 1],
}

impl<'a> UniqueWordSampler<'a> {
    pub fn new(model: &'a MarkovModel, seed: u64) -> UniqueWordSampler<'a> {
        let a = model.alphabet.a_size() as u64;
        let mut max_tries = [0u64; MAX_TERM_LEN + 1];
        let mut t = 1u64;
        for entry in max_tries.iter_mut() {
            *entry = t;
            if t <= MAX_TRIES_CEILING {
                t *= a;
            }
        }
        UniqueWordSampler {
            model,
            words_generated: HashSet::with_hasher(Xxh64Builder::new(seed)),
            max_tries,
        }
    }

    pub fn words_emitted(&self) -> usize {
        self.words_generated.len()
    }

    /// Generate one word never produced before.
    ///
    /// With EOW modelling the word self-terminates; otherwise the target
    /// length is drawn from the rank bucket's observed normal
    /// distribution, rejecting non-positive draws and capping at
    /// [`MAX_TERM_LEN`].
    pub fn sample(&mut self, rank: u32, rng: &mut GenRng) -> Result<Vec<u8>> {
        let mut target_len = if self.model.alphabet.uses_eow() {
            MAX_TERM_LEN
        } else {
            let bucket = rank_bucket(rank as u64);
            let mean = self.model.length_stats.means[bucket];
            let stdev = self.model.length_stats.stdevs[bucket];
            let mut l;
            loop {
                l = rng.normal(mean, stdev)?.ceil();
                if l > 0.0 {
                    break;
                }
            }
            (l as usize).min(MAX_TERM_LEN)
        };

        let mut tries = 0u64;
        loop {
            tries += 1;
            let word = self.generate_one(target_len, rng)?;

            if word.is_empty() {
                displaylevel!(2, "Warning: empty word generated but ignored\n");
            } else if !self.words_generated.contains(&word) {
                self.words_generated.insert(word.clone());
                return Ok(word);
            }

            if tries > self.max_tries[target_len] {
                if self.max_tries[target_len] > 1 {
                    displaylevel!(
                        3,
                        "Note: {} unsuccessful attempts at length {} for term {}; increasing length\n",
                        tries,
                        target_len,
                        rank
                    );
                }
                // Future attempts at this length are guaranteed to fail too.
                self.max_tries[target_len] = 0;
                target_len += 1;
                ensure!(
                    target_len <= MAX_TERM_LEN,
                    "term length grew above {} while hunting for a unique word",
                    MAX_TERM_LEN
                );
            }
        }
    }

    /// One letter-by-letter generation attempt.
    fn generate_one(&self, target_len: usize, rng: &mut GenRng) -> Result<Vec<u8>> {
        let model = self.model;
        let alphabet = &model.alphabet;
        let k = model.config.order;
        let a = alphabet.a_size();
        let mut context = [0u8; MAX_MARKOV_K];
        let mut word = Vec::with_capacity(target_len);

        for i in 0..target_len {
            let use_background =
                k > 0 && model.config.lambda > 0.0 && rng.unit() < model.config.lambda;
            let row = if !use_background {
                model.row(k, alphabet.row_index(&context[..k])?)
            } else if model.config.full_backoff {
                model.row(0, 0)
            } else {
                model.row(k - 1, alphabet.row_index(&context[1..k])?)
            };

            let mut randy = rng.unit();
            if i == 0 && alphabet.uses_eow() {
                // An end symbol in the first position would mean an empty
                // word; rescale the uniform to exclude it.
                randy *= row[a - 2];
            }

            let mut chosen = None;
            for (j, &cum) in row.iter().enumerate() {
                if randy <= cum {
                    chosen = Some(j);
                    break;
                }
            }
            let col = match chosen {
                Some(c) => c,
                None => bail!(
                    "unable to assign a letter: all-zero row in the order-{} matrix",
                    k
                ),
            };

            let ch = alphabet.col_char(col);
            if alphabet.uses_eow() && ch == EOW {
                if i > 0 {
                    break;
                }
                // Excluded by the rescale above; treat an occurrence as a
                // degenerate draw and retry the position.
                continue;
            }
            word.push(ch);

            if k > 0 {
                context.copy_within(1..k, 0);
                context[k - 1] = ch;
            }
        }
        Ok(word)
    }
}
