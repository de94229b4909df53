//! Synthetic text corpus generator.
//!
//! Given the statistical properties of a reference corpus (term-frequency
//! distribution, document-length distribution, vocabulary size, n-gram
//! co-occurrence structure, word-form morphology), this crate emits a
//! stream of documents whose statistics match the specified targets: the
//! total word count and per-document lengths are met exactly, the
//! term-frequency curve follows a piecewise Zipf model with a singleton
//! tail, n-gram instances appear with their observed frequencies, and
//! word forms can be generated from variable-order Markov models trained
//! on a real vocabulary.

pub mod cli;
pub mod doclen;
pub mod markov;
pub mod model;
pub mod ngram;
pub mod pipeline;
pub mod place;
pub mod posting;
pub mod rng;
pub mod shuffle;
pub mod termrep;
pub mod tfd;
pub mod writer;

pub use cli::{parse_args_from, GeneratorConfig};
pub use pipeline::{run, RunSummary};
pub use posting::{DoctableEntry, Posting};
pub use rng::GenRng;
