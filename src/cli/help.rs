//! Usage text: the option table with one-line descriptions.

use crate::cli::constants::PROGRAM_NAME;

/// (name, value kind, description) for every recognized option.
pub const ARG_TABLE: &[(&str, &str, &str)] = &[
    ("debug", "int", "Diagnostic verbosity.  0 - silent, 2 - normal, 4 - highest."),
    ("rand_seed", "int", "If non-zero allows for reproducible output.  Otherwise seed is based on time."),
    ("synth_postings", "float", "The number of random word occurrences to generate."),
    ("synth_vocab_size", "float", "The number of distinct random words to generate."),
    ("synth_doc_length", "float", "The average length of generated documents.  Gaussian distributed."),
    ("synth_doc_length_stdev", "float", "Standard deviation of document lengths.  Defaults to half the mean."),
    ("synth_dl_gamma_shape", "float", "Shape parameter for a gamma model of document lengths."),
    ("synth_dl_gamma_scale", "float", "Scale parameter for the gamma model of document lengths."),
    ("synth_dl_segments", "string", "Piecewise-linear model of document lengths, e.g. 4:1,0.33;10,0.5;200,0.67;5000,1.0"),
    ("synth_dl_read_histo", "string", "Path of a document length histogram file used as input."),
    ("zipf_alpha", "float", "Slope used in generating Zipf collections.  Usually between -0.1 and -2.0 but NOT -1.0.  Auto-fitted when not given."),
    ("zipf_tail_perc", "float", "The desired percentage of terms which occur only once."),
    ("zipf_middle_pieces", "string", "Percent-terminated alpha,F,L,probrange,cumprob tuples for the middle of the Zipf curve."),
    ("head_term_percentages", "string", "Comma-separated percentages of term instances taken by the head terms.  Descending order."),
    ("tfd_use_base_vocab", "bool", "If true, use exact term frequencies from synth_input_vocab."),
    ("synth_input_vocab", "string", "Path of a vocab.tsv file used as input when generating term representations."),
    ("synth_input_ngrams", "string", "Path of an ngrams file containing n-grams represented as termid tuples."),
    ("synth_term_repn_method", "string", "Term representation method: tnum, base26, bubble_babble, simpleWords, from_tsv, markov-<k>[e]."),
    ("markov_lambda", "float", "Markov smoothing: probability that the next letter comes from the backoff model."),
    ("markov_use_vocab_probs", "bool", "Transition probabilities from the vocab (true) or weighted by corpus frequency (false)."),
    ("markov_model_word_lens", "bool", "Re-deal generated words so length correlates with rank."),
    ("markov_full_backoff", "bool", "When backing off, drop all the way to order zero."),
    ("markov_assign_reps_by_rank", "bool", "Match representations to ranks in rank order rather than length order."),
    ("markov_favour_pronouncable", "bool", "Penalize unpronounceable words when sorting by length."),
    ("include_docnums", "bool", "Include a document-number column (TSV) or header record (archive)."),
    ("file_synth_docs", "string", "Output file for the synthetic collection.  A .tsv extension selects TSV output."),
];

/// Print usage and the full option table to stderr.
pub fn print_usage() {
    eprintln!("\nUsage: {PROGRAM_NAME} <options>\n");
    eprintln!("Options take the form -name=value or name=value:\n");
    for (name, kind, description) in ARG_TABLE {
        eprintln!("  {name:28} {kind:7} {description}");
    }
    eprintln!();
}
