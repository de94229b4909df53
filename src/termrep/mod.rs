//! Term-representation table: the byte strings that stand in for term
//! ranks in the output.
//!
//! The table is one contiguous allocation of V+1 fixed-width slots.  Each
//! slot holds the word bytes, a NUL, and a trailing length byte; the extra
//! slot at index V is the reserved UNKNOWN entry.  Several generation
//! methods are supported, from trivially enumerable (`tnum`, `base26`)
//! through digest-style (`bubble_babble`, `simpleWords`) to corpus-trained
//! (`markov-<k>[e]`), plus verbatim adoption of an input vocabulary
//! (`from_tsv`).

pub mod assign;
pub mod babble;
pub mod simple;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::displaylevel;
use crate::markov::{MarkovConfig, MarkovModel, MAX_MARKOV_K, MAX_TERM_LEN, UniqueWordSampler};
use crate::rng::GenRng;

/// Slot width: word bytes, NUL terminator, trailing length byte.
pub const TERM_ENTRY_LEN: usize = MAX_TERM_LEN + 2;

const TERM_LENGTH_INDEX: usize = MAX_TERM_LEN + 1;

const UNKNOWN: &[u8] = b"UNKNOWN";

/// How term representations are produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepMethod {
    /// 't' followed by the decimal rank digits.
    Tnum,
    /// The rank rendered in base-26 letters.
    Base26,
    /// Vowel/consonant digest of the rank.
    BubbleBabble,
    /// Base-24 letters with prime-driven decorations.
    SimpleWords,
    /// Adopt the words of an input vocabulary file.
    FromTsv,
    /// Markov model of the given order; `eow` selects end-of-word
    /// modelling.
    Markov { order: usize, eow: bool },
}

impl RepMethod {
    /// Parse a method name from the CLI (`markov-<k>` may carry a
    /// trailing `e` for the end-of-word variant).
    pub fn parse(name: &str) -> Result<RepMethod> {
        match name {
            "tnum" => Ok(RepMethod::Tnum),
            "base26" => Ok(RepMethod::Base26),
            "bubble_babble" => Ok(RepMethod::BubbleBabble),
            "simpleWords" => Ok(RepMethod::SimpleWords),
            "from_tsv" => Ok(RepMethod::FromTsv),
            _ => {
                if let Some(rest) = name.strip_prefix("markov-") {
                    let (digits, eow) = match rest.strip_suffix('e') {
                        Some(d) => (d, true),
                        None => (rest, false),
                    };
                    let order: usize = digits
                        .parse()
                        .with_context(|| format!("bad Markov order in method '{name}'"))?;
                    ensure!(
                        order <= MAX_MARKOV_K,
                        "Markov methods are only supported for 0 <= K <= {MAX_MARKOV_K}"
                    );
                    return Ok(RepMethod::Markov { order, eow });
                }
                bail!("unrecognized term representation method '{name}'")
            }
        }
    }
}

/// The filled table.
pub struct TermRepTable {
    storage: Vec<u8>,
    vocab_size: usize,
}

impl TermRepTable {
    fn with_capacity(vocab_size: usize) -> TermRepTable {
        TermRepTable {
            storage: vec![0u8; (vocab_size + 1) * TERM_ENTRY_LEN],
            vocab_size,
        }
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn set_slot(&mut self, index: usize, word: &[u8]) {
        let len = word.len().min(MAX_TERM_LEN);
        let slot = &mut self.storage[index * TERM_ENTRY_LEN..(index + 1) * TERM_ENTRY_LEN];
        slot[..len].copy_from_slice(&word[..len]);
        slot[len] = 0;
        slot[TERM_LENGTH_INDEX] = len as u8;
    }

    /// Representation for a 1-based term rank.  Out-of-range ranks map to
    /// the UNKNOWN entry.
    pub fn term(&self, rank: u32) -> &[u8] {
        let index = if rank as usize > self.vocab_size {
            self.vocab_size
        } else {
            rank.saturating_sub(1) as usize
        };
        let slot = &self.storage[index * TERM_ENTRY_LEN..(index + 1) * TERM_ENTRY_LEN];
        let len = slot[TERM_LENGTH_INDEX] as usize;
        &slot[..len]
    }

    /// Fatal scan for empty representations: every rank must render as at
    /// least one byte.
    pub fn check_for_null_words(&self) -> Result<()> {
        let mut null_words = 0u64;
        for rank in 1..=self.vocab_size as u32 {
            if self.term(rank).is_empty() {
                null_words += 1;
            }
        }
        ensure!(
            null_words == 0,
            "{} ranks have empty representations",
            null_words
        );
        Ok(())
    }
}

/// Build the table for `vocab_size` terms with the given method.  The
/// returned table may report a smaller vocabulary when `from_tsv` finds a
/// short input file.
pub fn make_term_rep_table(
    vocab_size: usize,
    method: &RepMethod,
    input_vocab: Option<&Path>,
    markov: &MarkovParams,
    rng: &mut GenRng,
) -> Result<TermRepTable> {
    displaylevel!(
        2,
        "Term representation method: {:?}.  Term table size: {}\n",
        method,
        (vocab_size + 1) * TERM_ENTRY_LEN
    );
    let mut table = TermRepTable::with_capacity(vocab_size);
    match method {
        RepMethod::Tnum => {
            for t in 0..vocab_size {
                table.set_slot(t, &tnum_word(t as u64));
            }
        }
        RepMethod::Base26 => {
            for t in 0..vocab_size {
                table.set_slot(t, &base26_word(t as u64));
            }
        }
        RepMethod::BubbleBabble => {
            for t in 0..vocab_size {
                table.set_slot(t, &babble::bubble_babble(t as u32));
            }
        }
        RepMethod::SimpleWords => {
            for t in 0..vocab_size {
                table.set_slot(t, &simple::simple_words(t as u64)?);
            }
        }
        RepMethod::FromTsv => {
            let path = input_vocab
                .context("term representation method from_tsv requires synth_input_vocab")?;
            fill_from_tsv(&mut table, path)?;
        }
        RepMethod::Markov { order, eow } => {
            let path = input_vocab
                .context("Markov term representation requires synth_input_vocab")?;
            fill_markov(&mut table, *order, *eow, path, markov, rng)?;
        }
    }
    table.set_slot(table.vocab_size, UNKNOWN);
    table.check_for_null_words()?;
    Ok(table)
}

/// Markov knobs forwarded from the CLI.
#[derive(Debug, Clone)]
pub struct MarkovParams {
    pub lambda: f64,
    pub full_backoff: bool,
    pub use_within_vocab_probs: bool,
    pub assign_reps_by_rank: bool,
    pub favour_pronounceable: bool,
    pub model_word_lens: bool,
}

impl Default for MarkovParams {
    fn default() -> MarkovParams {
        MarkovParams {
            lambda: 0.0,
            full_backoff: true,
            use_within_vocab_probs: true,
            assign_reps_by_rank: true,
            favour_pronounceable: true,
            model_word_lens: true,
        }
    }
}

/// 't' followed by the decimal digits of the rank, least significant
/// first.
fn tnum_word(mut t: u64) -> Vec<u8> {
    let mut word = Vec::with_capacity(8);
    word.push(b't');
    loop {
        if word.len() >= MAX_TERM_LEN {
            break;
        }
        word.push(b'0' + (t % 10) as u8);
        t /= 10;
        if t == 0 {
            break;
        }
    }
    word
}

/// The rank in base-26 letters, least significant first.
fn base26_word(mut t: u64) -> Vec<u8> {
    let mut word = Vec::with_capacity(8);
    loop {
        if word.len() >= MAX_TERM_LEN {
            break;
        }
        word.push(b'a' + (t % 26) as u8);
        t /= 26;
        if t == 0 {
            break;
        }
    }
    word
}

/// Adopt representations from a `word TAB ...` vocabulary file.
fn fill_from_tsv(table: &mut TermRepTable, path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("can't open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut rank0 = 0usize;
    for line in reader.lines() {
        let line = line?;
        let word = match line.split_once('\t') {
            Some((w, _)) => w,
            None => bail!("TAB not found in line {} of {}", rank0 + 1, path.display()),
        };
        table.set_slot(rank0, word.as_bytes());
        rank0 += 1;
        if rank0 >= table.vocab_size {
            break;
        }
    }
    if rank0 < table.vocab_size {
        displaylevel!(
            1,
            "Warning: requested vocab_size reduced to {} by {}\n",
            rank0,
            path.display()
        );
        table.vocab_size = rank0;
    }
    Ok(())
}

/// Train the Markov model, sample a unique word per rank, and (for the
/// EOW variant) re-assign words to ranks so length correlates with rank.
fn fill_markov(
    table: &mut TermRepTable,
    order: usize,
    eow: bool,
    training_tsv: &Path,
    params: &MarkovParams,
    rng: &mut GenRng,
) -> Result<()> {
    let config = MarkovConfig {
        order,
        use_eow: eow,
        lambda: params.lambda,
        full_backoff: params.full_backoff,
        use_within_vocab_probs: params.use_within_vocab_probs,
        assign_reps_by_rank: params.assign_reps_by_rank,
    };
    let (model, lenprob) = MarkovModel::train(config, training_tsv)?;
    let mut sampler = UniqueWordSampler::new(&model, rng.seed());

    displaylevel!(2, "Filling in the synthetic vocabulary\n");
    let mut words: Vec<Vec<u8>> = Vec::with_capacity(table.vocab_size);
    for t in 0..table.vocab_size {
        let word = sampler.sample(t as u32 + 1, rng)?;
        ensure!(
            !word.is_empty() && word.len() <= MAX_TERM_LEN,
            "generated word length {} out of range",
            word.len()
        );
        words.push(word);
        if (t + 1) % 10_000 == 0 {
            displaylevel!(3, "{:11} words generated\n", t + 1);
        }
    }

    if eow && params.model_word_lens {
        // The EOW model's lengths carry no rank correlation; sort by
        // (penalized) length and re-deal against the observed
        // distribution.
        words.sort_by_key(|w| assign::penalized_len(w, params.favour_pronounceable));
        words = assign::assign_words_to_ranks(
            words,
            &lenprob,
            params.favour_pronounceable,
            rng,
        )?;
    }

    for (t, word) in words.iter().enumerate() {
        table.set_slot(t, word);
    }

    let mimic = assign::bucketed_length_stats(&words);
    assign::compare_length_distributions(&model.length_stats, &mimic);
    Ok(())
}
