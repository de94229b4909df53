//! Variable-order Markov word-form models: alphabet handling, training
//! with cascading backoff, and uniqueness-guaranteed sampling.

pub mod alphabet;
pub mod sampler;
pub mod trainer;

pub use alphabet::{Alphabet, EOW, MAX_MARKOV_K, MAX_TERM_LEN, SOW};
pub use sampler::UniqueWordSampler;
pub use trainer::{
    convert_row_to_cumprobs, rank_bucket, LenProbMatrix, LengthStats, MarkovConfig, MarkovModel,
    NUM_RANK_BUCKETS,
};
