//! Command-line argument parsing.
//!
//! Every option has the form `-name=value` or `name=value`.  The parser
//! walks the argument list once, filling a [`GeneratorConfig`]; anything
//! unrecognized is a hard error whose message begins with `"bad usage: "`.
//! [`parse_args_from`] takes an explicit slice so tests can drive it
//! without touching `std::env`.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use crate::cli::constants::DEFAULT_OUTPUT;
use crate::termrep::RepMethod;

/// Complete set of options accepted by the generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Non-zero for reproducible output; zero seeds from the clock.
    pub rand_seed: u64,
    /// Number of word occurrences to generate.
    pub synth_postings: f64,
    /// Number of distinct words to generate.
    pub synth_vocab_size: f64,
    /// Mean of the Gaussian document-length model.
    pub synth_doc_length: Option<f64>,
    /// Standard deviation of document lengths; defaults to half the mean.
    pub synth_doc_length_stdev: Option<f64>,
    /// Shape parameter of the gamma document-length model.
    pub synth_dl_gamma_shape: Option<f64>,
    /// Scale parameter of the gamma document-length model.
    pub synth_dl_gamma_scale: Option<f64>,
    /// Piecewise-linear document-length model specification.
    pub synth_dl_segments: Option<String>,
    /// Path of a document-length histogram file to read instead.
    pub synth_dl_read_histo: Option<PathBuf>,
    /// Zipf slope; auto-fitted when absent.
    pub zipf_alpha: Option<f64>,
    /// Desired percentage of terms occurring exactly once.
    pub zipf_tail_perc: f64,
    /// Piecewise middle-segment specification for the Zipf curve.
    pub zipf_middle_pieces: Option<String>,
    /// Comma-separated head-term percentages, descending.
    pub head_term_percentages: Option<String>,
    /// Use exact term frequencies from the input vocabulary.
    pub tfd_use_base_vocab: bool,
    /// Input vocabulary (training TSV / exact frequencies / verbatim reps).
    pub synth_input_vocab: Option<PathBuf>,
    /// N-grams file of termid tuples to pre-place.
    pub synth_input_ngrams: Option<PathBuf>,
    /// Term representation method name.
    pub synth_term_repn_method: String,
    /// Probability of sampling a letter from the backoff model.
    pub markov_lambda: f64,
    /// Count each vocabulary word once rather than by corpus frequency.
    pub markov_use_vocab_probs: bool,
    /// Re-deal Markov words so length correlates with rank.
    pub markov_model_word_lens: bool,
    /// Back off to order zero rather than order k-1.
    pub markov_full_backoff: bool,
    /// Assign representations walking ranks rather than walking words.
    pub markov_assign_reps_by_rank: bool,
    /// Penalize unpronounceable words when sorting by length.
    pub markov_favour_pronouncable: bool,
    /// Emit a document-number column / header record.
    pub include_docnums: bool,
    /// Output file; a `.tsv` extension selects tab-separated form.
    pub file_synth_docs: PathBuf,
    /// Diagnostic verbosity (0-4).
    pub debug: u32,
}

impl Default for GeneratorConfig {
    fn default() -> GeneratorConfig {
        GeneratorConfig {
            rand_seed: 0,
            synth_postings: 10_000_000.0,
            synth_vocab_size: 1_000_000.0,
            synth_doc_length: None,
            synth_doc_length_stdev: None,
            synth_dl_gamma_shape: None,
            synth_dl_gamma_scale: None,
            synth_dl_segments: None,
            synth_dl_read_histo: None,
            zipf_alpha: None,
            zipf_tail_perc: 0.0,
            zipf_middle_pieces: None,
            head_term_percentages: None,
            tfd_use_base_vocab: false,
            synth_input_vocab: None,
            synth_input_ngrams: None,
            synth_term_repn_method: "base26".to_owned(),
            markov_lambda: 0.0,
            markov_use_vocab_probs: true,
            markov_model_word_lens: true,
            markov_full_backoff: true,
            markov_assign_reps_by_rank: true,
            markov_favour_pronouncable: true,
            include_docnums: true,
            file_synth_docs: PathBuf::from(DEFAULT_OUTPUT),
            debug: 2,
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "TRUE" | "yes" | "1" => Ok(true),
        "false" | "FALSE" | "no" | "0" => Ok(false),
        _ => bail!("bad usage: option {name} wants a boolean, got '{value}'"),
    }
}

fn parse_f64(name: &str, value: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| anyhow!("bad usage: option {name} wants a number, got '{value}'"))
}

fn parse_u64(name: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| anyhow!("bad usage: option {name} wants an integer, got '{value}'"))
}

/// Parse `std::env::args()` (skipping argv[0]).
pub fn parse_args() -> Result<GeneratorConfig> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    parse_args_from(&argv)
}

/// Parse an explicit argument list.
pub fn parse_args_from(argv: &[String]) -> Result<GeneratorConfig> {
    let mut cfg = GeneratorConfig::default();

    for argument in argv {
        if argument.is_empty() {
            continue;
        }
        let stripped = argument.strip_prefix('-').unwrap_or(argument);
        let (name, value) = match stripped.split_once('=') {
            Some(parts) => parts,
            None => bail!("bad usage: expected -name=value, got '{argument}'"),
        };

        match name {
            "debug" => cfg.debug = parse_u64(name, value)? as u32,
            "rand_seed" => cfg.rand_seed = parse_u64(name, value)?,
            "synth_postings" => cfg.synth_postings = parse_f64(name, value)?,
            "synth_vocab_size" => cfg.synth_vocab_size = parse_f64(name, value)?,
            "synth_doc_length" => cfg.synth_doc_length = Some(parse_f64(name, value)?),
            "synth_doc_length_stdev" => {
                cfg.synth_doc_length_stdev = Some(parse_f64(name, value)?)
            }
            "synth_dl_gamma_shape" => cfg.synth_dl_gamma_shape = Some(parse_f64(name, value)?),
            "synth_dl_gamma_scale" => cfg.synth_dl_gamma_scale = Some(parse_f64(name, value)?),
            "synth_dl_segments" => cfg.synth_dl_segments = Some(value.to_owned()),
            "synth_dl_read_histo" => cfg.synth_dl_read_histo = Some(PathBuf::from(value)),
            "zipf_alpha" => cfg.zipf_alpha = Some(parse_f64(name, value)?),
            "zipf_tail_perc" => cfg.zipf_tail_perc = parse_f64(name, value)?,
            "zipf_middle_pieces" => cfg.zipf_middle_pieces = Some(value.to_owned()),
            "head_term_percentages" => cfg.head_term_percentages = Some(value.to_owned()),
            "tfd_use_base_vocab" => cfg.tfd_use_base_vocab = parse_bool(name, value)?,
            "synth_input_vocab" => cfg.synth_input_vocab = Some(PathBuf::from(value)),
            "synth_input_ngrams" => cfg.synth_input_ngrams = Some(PathBuf::from(value)),
            "synth_term_repn_method" => cfg.synth_term_repn_method = value.to_owned(),
            "markov_lambda" => cfg.markov_lambda = parse_f64(name, value)?,
            "markov_use_vocab_probs" => cfg.markov_use_vocab_probs = parse_bool(name, value)?,
            "markov_model_word_lens" => cfg.markov_model_word_lens = parse_bool(name, value)?,
            "markov_full_backoff" => cfg.markov_full_backoff = parse_bool(name, value)?,
            "markov_assign_reps_by_rank" => {
                cfg.markov_assign_reps_by_rank = parse_bool(name, value)?
            }
            "markov_favour_pronouncable" => {
                cfg.markov_favour_pronouncable = parse_bool(name, value)?
            }
            "include_docnums" => cfg.include_docnums = parse_bool(name, value)?,
            "file_synth_docs" => cfg.file_synth_docs = PathBuf::from(value),
            _ => bail!("bad usage: unrecognized option '{name}'"),
        }
    }

    cfg.validate()?;
    Ok(cfg)
}

impl GeneratorConfig {
    /// Check cross-option invariants before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.synth_postings < 1.0 || self.synth_vocab_size < 1.0 {
            bail!("synth_postings and synth_vocab_size must both be at least 1");
        }
        if self.synth_vocab_size > self.synth_postings {
            bail!(
                "synth_vocab_size ({:.0}) cannot exceed synth_postings ({:.0})",
                self.synth_vocab_size,
                self.synth_postings
            );
        }
        if !(0.0..=100.0).contains(&self.zipf_tail_perc) {
            bail!("zipf_tail_perc must be a percentage in [0, 100]");
        }
        if self.tfd_use_base_vocab && self.synth_input_vocab.is_none() {
            bail!("tfd_use_base_vocab is true but synth_input_vocab not specified");
        }
        if self.synth_dl_gamma_shape.is_some() != self.synth_dl_gamma_scale.is_some() {
            bail!("synth_dl_gamma_shape and synth_dl_gamma_scale must be given together");
        }
        if self.synth_dl_read_histo.is_none()
            && self.synth_dl_segments.is_none()
            && self.synth_dl_gamma_shape.is_none()
            && self.synth_doc_length.is_none()
        {
            bail!(
                "no document length model: give synth_doc_length, \
                 synth_dl_gamma_shape/scale, synth_dl_segments or synth_dl_read_histo"
            );
        }

        // Method-name validity and its input requirements.
        let method = RepMethod::parse(&self.synth_term_repn_method)?;
        if matches!(method, RepMethod::FromTsv | RepMethod::Markov { .. })
            && self.synth_input_vocab.is_none()
        {
            bail!(
                "term representation method '{}' requires synth_input_vocab",
                self.synth_term_repn_method
            );
        }
        if !(0.0..=1.0).contains(&self.markov_lambda) {
            bail!("markov_lambda must be a probability in [0, 1]");
        }
        Ok(())
    }
}
