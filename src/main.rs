//! Binary entry point for the `synthcorpus` command-line tool.
//!
//! Parses the `-name=value` option list, sets the display level, runs the
//! generation pipeline and maps the outcome to a process exit code: 0 on
//! success, 1 on any fatal error.  Running with no arguments prints the
//! usage text.

use synthcorpus::cli::constants::set_display_level;
use synthcorpus::cli::{help, parse_args};
use synthcorpus::displaylevel;

fn main() {
    if std::env::args().len() < 2 {
        help::print_usage();
        std::process::exit(1);
    }

    let cfg = match parse_args() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("synthcorpus: {e}");
            help::print_usage();
            std::process::exit(1);
        }
    };
    set_display_level(cfg.debug);

    match synthcorpus::run(&cfg) {
        Ok(summary) => {
            displaylevel!(
                2,
                "Done: {} docs, {} postings, vocab {} (seed {})\n",
                summary.docs_written,
                summary.num_postings,
                summary.vocab_size,
                summary.seed
            );
        }
        Err(e) => {
            eprintln!("synthcorpus: error: {e:#}");
            std::process::exit(1);
        }
    }
}
