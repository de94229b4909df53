//! Markov model training.
//!
//! One pass over the training vocabulary accumulates, for every order k in
//! 0..=K, the frequency of each letter following each k-symbol context,
//! plus per-rank-bucket word-length statistics and the length/rank
//! probability matrix used later when assigning representations to ranks.
//! The matrices are then converted row by row to cumulative probabilities,
//! with empty rows inheriting from a backoff row.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::displaylevel;
use crate::markov::alphabet::{Alphabet, MAX_MARKOV_K, MAX_TERM_LEN};

/// Rank buckets are logarithmic: bucket b holds ranks in [10^b, 10^(b+1)).
/// Nine buckets allow a vocabulary of up to a billion terms.
pub const NUM_RANK_BUCKETS: usize = 9;

/// Training lines longer than this indicate a malformed vocabulary file.
const MAX_LINE_LEN: usize = 1000;

/// Row-sum threshold below which a row counts as unobserved.
const EMPTY_ROW_EPS: f64 = 1e-6;

/// Logarithmic rank bucket of a 1-based rank.
#[inline]
pub fn rank_bucket(rank: u64) -> usize {
    debug_assert!(rank >= 1);
    (rank as f64).log10().floor() as usize
}

/// Behavioural switches for training and sampling.
#[derive(Debug, Clone)]
pub struct MarkovConfig {
    /// Order K of the highest model; matrices for 0..=K are trained.
    pub order: usize,
    /// Model word endings with an explicit end-of-word symbol.
    pub use_eow: bool,
    /// Probability of sampling each letter from the backoff row.
    pub lambda: f64,
    /// Back off all the way to order zero rather than to order k-1.
    pub full_backoff: bool,
    /// Count each vocabulary entry once; otherwise weight by its corpus
    /// frequency.
    pub use_within_vocab_probs: bool,
    /// Length/rank matrix orientation: probabilities of lengths within a
    /// rank bucket (true) or of rank buckets for a length (false).
    pub assign_reps_by_rank: bool,
}

impl Default for MarkovConfig {
    fn default() -> MarkovConfig {
        MarkovConfig {
            order: 0,
            use_eow: false,
            lambda: 0.0,
            full_backoff: true,
            use_within_vocab_probs: true,
            assign_reps_by_rank: true,
        }
    }
}

/// Per-rank-bucket word-length mean and standard deviation.
#[derive(Debug, Clone, Default)]
pub struct LengthStats {
    pub counts: [f64; NUM_RANK_BUCKETS],
    pub means: [f64; NUM_RANK_BUCKETS],
    pub stdevs: [f64; NUM_RANK_BUCKETS],
}

impl LengthStats {
    pub fn accumulate(&mut self, bucket: usize, len: usize) {
        self.counts[bucket] += 1.0;
        self.means[bucket] += len as f64;
        self.stdevs[bucket] += (len * len) as f64;
    }

    /// Turn the raw sums into means and standard deviations.  Buckets with
    /// no observations inherit from the last bucket that had any.
    pub fn finalize(&mut self) {
        let mut mean = 0.0;
        let mut stdev = 0.0;
        for b in 0..NUM_RANK_BUCKETS {
            if self.counts[b] > 0.0 {
                mean = self.means[b] / self.counts[b];
                stdev = (self.stdevs[b] / self.counts[b] - mean * mean).max(0.0).sqrt();
            }
            self.means[b] = mean;
            self.stdevs[b] = stdev;
        }
    }
}

/// Length/rank probability matrix, stored row-major with rows converted to
/// cumulative probabilities after training.
pub struct LenProbMatrix {
    data: Vec<f64>,
    by_rank: bool,
}

impl LenProbMatrix {
    fn new(by_rank: bool) -> LenProbMatrix {
        LenProbMatrix {
            data: vec![0.0; NUM_RANK_BUCKETS * MAX_TERM_LEN],
            by_rank,
        }
    }

    #[inline]
    fn cols(&self) -> usize {
        if self.by_rank {
            MAX_TERM_LEN
        } else {
            NUM_RANK_BUCKETS
        }
    }

    pub fn rows(&self) -> usize {
        if self.by_rank {
            NUM_RANK_BUCKETS
        } else {
            MAX_TERM_LEN
        }
    }

    pub fn by_rank(&self) -> bool {
        self.by_rank
    }

    fn accumulate(&mut self, bucket: usize, len: usize, weight: f64) {
        let idx = if self.by_rank {
            bucket * MAX_TERM_LEN + (len - 1)
        } else {
            (len - 1) * NUM_RANK_BUCKETS + bucket
        };
        self.data[idx] += weight;
    }

    /// Cumulative-probability row for a rank bucket (by-rank orientation)
    /// or a word length (by-length orientation).
    pub fn row(&self, row: usize) -> &[f64] {
        let cols = self.cols();
        &self.data[row * cols..(row + 1) * cols]
    }

    /// Normalize each row and convert it to cumulative form.  Rows with no
    /// observations stay all-zero.  Applying this to an already-converted
    /// matrix is idempotent up to rounding.
    pub fn convert_rows_to_cumprobs(&mut self) {
        let cols = self.cols();
        for row in self.data.chunks_mut(cols) {
            convert_row_to_cumprobs(row);
        }
    }
}

/// Normalize one row of raw counts into cumulative probabilities in place.
/// All-zero rows are left alone.
pub fn convert_row_to_cumprobs(row: &mut [f64]) {
    let row_sum: f64 = row.iter().sum();
    if row_sum <= 0.0 {
        return;
    }
    let mut cumprob = 0.0;
    for cell in row.iter_mut() {
        cumprob += *cell / row_sum;
        *cell = cumprob;
    }
}

/// The trained model: transition matrices for orders 0..=K in one flat
/// buffer, plus the alphabet and length statistics.
pub struct MarkovModel {
    pub alphabet: Alphabet,
    pub config: MarkovConfig,
    pub length_stats: LengthStats,
    matrices: Vec<f64>,
    offsets: Vec<usize>,
    /// Words the trainer actually consumed (informational).
    pub words_trained: u64,
}

impl MarkovModel {
    /// Train matrices of order 0..=K from a `word TAB frequency` file
    /// sorted by descending frequency.  Also returns the length/rank
    /// probability matrix for later rank assignment.
    pub fn train(config: MarkovConfig, training_tsv: &Path) -> Result<(MarkovModel, LenProbMatrix)> {
        ensure!(
            config.order <= MAX_MARKOV_K,
            "Markov methods are only supported for 0 <= K <= {}; {} was specified",
            MAX_MARKOV_K,
            config.order
        );
        let alphabet = Alphabet::lowercase_ascii(config.use_eow);
        let a = alphabet.a_size();
        let e = alphabet.e_size();

        // Size the flat buffer: the order-k matrix has E^k rows of A
        // columns.  Checked arithmetic; a failure here is a configuration
        // the machine cannot hold anyway.
        let mut offsets = Vec::with_capacity(config.order + 1);
        let mut total: usize = 0;
        let mut elements = a;
        for k in 0..=config.order {
            offsets.push(total);
            displaylevel!(4, "Elements in order {} matrix: {}\n", k, elements);
            total = total
                .checked_add(elements)
                .context("transition matrix size overflows")?;
            elements = elements
                .checked_mul(e)
                .context("transition matrix size overflows")?;
        }
        displaylevel!(3, "Total elements in all matrices: {}\n", total);

        let mut model = MarkovModel {
            alphabet,
            config,
            length_stats: LengthStats::default(),
            matrices: vec![0.0; total],
            offsets,
            words_trained: 0,
        };
        let mut lenprob = LenProbMatrix::new(model.config.assign_reps_by_rank);

        let file = File::open(training_tsv)
            .with_context(|| format!("can't open {}", training_tsv.display()))?;
        let reader = BufReader::new(file);

        // The word buffer keeps MAX_MARKOV_K leading start symbols (byte
        // zero) so every context window is valid even at the first letter.
        let mut buf = [0u8; MAX_MARKOV_K + MAX_TERM_LEN];
        let mut total_weight = 0.0f64;

        for (lineno, line) in reader.lines().enumerate() {
            let rank = lineno as u64 + 1;
            let line =
                line.with_context(|| format!("read failure in {}", training_tsv.display()))?;
            ensure!(
                line.len() <= MAX_LINE_LEN,
                "line {} of {} is longer than {} bytes",
                rank,
                training_tsv.display(),
                MAX_LINE_LEN
            );
            let (word_field, freq_field) = match line.split_once('\t') {
                Some(parts) => parts,
                None => bail!("TAB not found in line {} of {}", rank, training_tsv.display()),
            };

            // Case-fold and drop anything that is not a letter.
            let mut len = 0usize;
            for byte in word_field.bytes() {
                if byte.is_ascii_alphabetic() {
                    ensure!(
                        len < MAX_TERM_LEN,
                        "unexpectedly long word in {} at line {}",
                        training_tsv.display(),
                        rank
                    );
                    buf[MAX_MARKOV_K + len] = byte.to_ascii_lowercase();
                    len += 1;
                }
            }
            if len == 0 {
                continue; // nothing left after squeezing
            }

            let bucket = rank_bucket(rank);
            ensure!(
                bucket < NUM_RANK_BUCKETS,
                "more than a billion words in the vocabulary (rank {})",
                rank
            );
            model.length_stats.accumulate(bucket, len);

            let weight = if model.config.use_within_vocab_probs {
                1.0
            } else {
                let f: f64 = freq_field.trim().parse().with_context(|| {
                    format!("invalid frequency value in line {} of {}", rank, training_tsv.display())
                })?;
                f
            };
            lenprob.accumulate(bucket, len, weight);
            total_weight += weight;

            model.accumulate_word(&buf, len, weight)?;
            model.words_trained += 1;
        }
        ensure!(
            model.words_trained > 0,
            "{} contains no usable words",
            training_tsv.display()
        );

        model.length_stats.finalize();
        model.convert_to_cumprobs()?;
        model.check_matrices()?;
        lenprob.convert_rows_to_cumprobs();
        displaylevel!(
            2,
            "Markov-{} and below models trained on {:.0} word instances\n",
            model.config.order,
            total_weight
        );
        Ok((model, lenprob))
    }

    /// Add one word's evidence to the letter frequencies and every
    /// transition matrix.
    fn accumulate_word(&mut self, buf: &[u8], len: usize, weight: f64) -> Result<()> {
        // Order-0 letter frequencies.
        for i in 0..len {
            let col = self
                .alphabet
                .col(buf[MAX_MARKOV_K + i])
                .context("letter fell outside the alphabet")?;
            self.matrices[self.offsets[0] + col] += weight;
        }
        if self.alphabet.uses_eow() {
            let col = self.alphabet.eow_col();
            self.matrices[self.offsets[0] + col] += weight;
        }

        // Orders 1..=K: each letter observed after its k-symbol context,
        // plus (with EOW) the end transition after the final context.
        for k in 1..=self.config.order {
            for i in 0..len {
                let ctx_start = MAX_MARKOV_K + i - k;
                let row = self.alphabet.row_index(&buf[ctx_start..ctx_start + k])?;
                let col = self
                    .alphabet
                    .col(buf[MAX_MARKOV_K + i])
                    .context("letter fell outside the alphabet")?;
                self.matrices[self.offsets[k] + row + col] += weight;
            }
            if self.alphabet.uses_eow() {
                let ctx_start = MAX_MARKOV_K + len - k;
                let row = self.alphabet.row_index(&buf[ctx_start..ctx_start + k])?;
                let col = self.alphabet.eow_col();
                self.matrices[self.offsets[k] + row + col] += weight;
            }
        }
        Ok(())
    }

    /// Number of rows in the order-k matrix.
    fn num_rows(&self, k: usize) -> usize {
        self.alphabet.e_size().pow(k as u32)
    }

    /// Convert every matrix to cumulative probabilities, in order of
    /// increasing k so backoff rows are already converted when an empty
    /// row needs to inherit from them.
    fn convert_to_cumprobs(&mut self) -> Result<()> {
        let a = self.alphabet.a_size();
        let e = self.alphabet.e_size();
        for k in 0..=self.config.order {
            let rows = self.num_rows(k);
            // Dropping the leftmost context digit maps row r of order k to
            // row r mod E^(k-1) of order k-1.
            let backoff_power = if k > 0 { e.pow(k as u32 - 1) } else { 1 };
            for i in 0..rows {
                let start = self.offsets[k] + i * a;
                let row_sum: f64 = self.matrices[start..start + a].iter().sum();
                if row_sum <= EMPTY_ROW_EPS && k > 0 {
                    let (bk, brow) = if self.config.full_backoff {
                        (0usize, 0usize)
                    } else {
                        (k - 1, i % backoff_power)
                    };
                    let bstart = self.offsets[bk] + brow * a;
                    for j in 0..a {
                        self.matrices[start + j] = self.matrices[bstart + j];
                    }
                } else {
                    let mut cumprob = 0.0;
                    for j in 0..a {
                        cumprob += self.matrices[start + j] / row_sum;
                        self.matrices[start + j] = cumprob;
                    }
                }
            }
            displaylevel!(4, "Order {} matrix converted ({} rows)\n", k, rows);
        }
        Ok(())
    }

    /// Verify the training invariant: every row's final cumulative
    /// probability is 1.0 within tolerance.
    fn check_matrices(&self) -> Result<()> {
        let a = self.alphabet.a_size();
        for k in 0..=self.config.order {
            for i in 0..self.num_rows(k) {
                let end_of_row = self.matrices[self.offsets[k] + i * a + a - 1];
                ensure!(
                    (0.999999..=1.000001).contains(&end_of_row),
                    "transition matrix {} row {} ends at {:.5}, not 1.0",
                    k,
                    i,
                    end_of_row
                );
            }
        }
        Ok(())
    }

    /// Cumulative-probability row of the order-k matrix, addressed by the
    /// element offset produced by [`Alphabet::row_index`].
    pub fn row(&self, k: usize, row_offset: usize) -> &[f64] {
        let a = self.alphabet.a_size();
        let start = self.offsets[k] + row_offset;
        &self.matrices[start..start + a]
    }
}
