//! The generation pipeline, start to finish.
//!
//! Stages run strictly in sequence and each reads only the finalized
//! output of its predecessors: term representations (possibly training a
//! Markov model), then the TOFS array, then the shuffled doctable with
//! pointers plugged in, then n-gram pre-placement, unigram placement, the
//! within-document shuffle, and finally the writer.  Nothing is written
//! to the output file until placement has fully succeeded.

use std::time::Instant;

use anyhow::{ensure, Context, Result};

use crate::cli::GeneratorConfig;
use crate::displaylevel;
use crate::doclen::{self, LengthModel};
use crate::model::{build_model, ModelSpec};
use crate::ngram;
use crate::place::PlacementEngine;
use crate::posting::Posting;
use crate::rng::GenRng;
use crate::shuffle;
use crate::termrep::{make_term_rep_table, MarkovParams, RepMethod};
use crate::tfd;
use crate::writer;

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub seed: u64,
    pub num_postings: u64,
    pub vocab_size: usize,
    pub num_docs: u64,
    pub docs_written: u64,
}

/// Resolve the configured document-length model.
fn length_model(cfg: &GeneratorConfig) -> Result<LengthModel> {
    if let Some(spec) = &cfg.synth_dl_segments {
        return doclen::parse_dl_segments(spec);
    }
    if let (Some(shape), Some(scale)) = (cfg.synth_dl_gamma_shape, cfg.synth_dl_gamma_scale) {
        return Ok(LengthModel::Gamma { shape, scale });
    }
    let mean = cfg
        .synth_doc_length
        .context("no document length model configured")?;
    let stdev = cfg.synth_doc_length_stdev.unwrap_or(mean / 2.0);
    Ok(LengthModel::Normal { mean, stdev })
}

/// Run the whole pipeline.
pub fn run(cfg: &GeneratorConfig) -> Result<RunSummary> {
    let very_start = Instant::now();
    let mut rng = GenRng::seeded(cfg.rand_seed);
    displaylevel!(2, "Random number generator seeded with {}\n", rng.seed());

    let num_postings = cfg.synth_postings as u64;
    let mut vocab_size = cfg.synth_vocab_size as usize;

    // ---- Term representations (may train the Markov model). ----
    let start = Instant::now();
    let method = RepMethod::parse(&cfg.synth_term_repn_method)?;
    let markov_params = MarkovParams {
        lambda: cfg.markov_lambda,
        full_backoff: cfg.markov_full_backoff,
        use_within_vocab_probs: cfg.markov_use_vocab_probs,
        assign_reps_by_rank: cfg.markov_assign_reps_by_rank,
        favour_pronounceable: cfg.markov_favour_pronouncable,
        model_word_lens: cfg.markov_model_word_lens,
    };
    let term_table = make_term_rep_table(
        vocab_size,
        &method,
        cfg.synth_input_vocab.as_deref(),
        &markov_params,
        &mut rng,
    )?;
    vocab_size = term_table.vocab_size();
    displaylevel!(
        2,
        "Representations for {} terms generated in {:.3} sec\n",
        vocab_size,
        start.elapsed().as_secs_f64()
    );

    // ---- Term occurrence frequencies. ----
    let start = Instant::now();
    let mut tofs = if cfg.tfd_use_base_vocab {
        let vocab = cfg
            .synth_input_vocab
            .as_deref()
            .context("tfd_use_base_vocab requires synth_input_vocab")?;
        tfd::read_tofs_from_file(vocab, num_postings, vocab_size)?
    } else {
        let model = build_model(&ModelSpec {
            postings: num_postings as f64,
            vocab_size: vocab_size as f64,
            alpha: cfg.zipf_alpha,
            tail_perc: cfg.zipf_tail_perc,
            head_percentages: cfg.head_term_percentages.as_deref(),
            middle_pieces: cfg.zipf_middle_pieces.as_deref(),
        })?;
        tfd::synthesize_tofs(&model, num_postings, vocab_size)?
    };
    displaylevel!(
        2,
        "TOFS array for {} terms filled in {:.3} sec\n",
        vocab_size,
        start.elapsed().as_secs_f64()
    );

    // ---- Doctable: lengths, shuffle, pointers. ----
    let start = Instant::now();
    let histo = match &cfg.synth_dl_read_histo {
        Some(path) => doclen::read_histogram(path, num_postings)?,
        None => doclen::generate_histogram(&length_model(cfg)?, num_postings, &mut rng)?,
    };
    let mut doctable = doclen::doctable_from_histogram(&histo, num_postings);
    let doctable_postings: u64 = doctable.iter().map(|e| e.remaining()).sum();
    ensure!(
        doctable_postings == num_postings,
        "doctable holds {} postings, budget is {}",
        doctable_postings,
        num_postings
    );
    shuffle::shuffle(&mut rng, &mut doctable);
    doclen::plug_in_pointers(&mut doctable);
    let num_docs = doctable.len() as u64;
    displaylevel!(
        2,
        "Doctable for {} docs built, shuffled and pointed in {:.3} sec\n",
        num_docs,
        start.elapsed().as_secs_f64()
    );

    // ---- Placement. ----
    let start = Instant::now();
    let mut occurrences = vec![Posting::EMPTY; num_postings as usize];
    let mut engine = PlacementEngine::new(doctable);

    let ngram_postings_placed = match &cfg.synth_input_ngrams {
        None => {
            displaylevel!(2, "No term dependence information available.\n");
            0
        }
        Some(path) => {
            let mut rows = ngram::load_ngrams_file(path, vocab_size)?;
            let stats =
                ngram::place_ngrams(&mut rows, &mut tofs, &mut engine, &mut occurrences, &mut rng)?;
            let still_to_generate: u64 = tofs.iter().sum();
            ensure!(
                still_to_generate + stats.postings_placed == num_postings,
                "posting counts don't add up after n-grams: {} placed + {} pending != {}",
                stats.postings_placed,
                still_to_generate,
                num_postings
            );
            stats.postings_placed
        }
    };

    let unigram_postings = engine.place_unigrams(&tofs, &mut occurrences, &mut rng)?;
    displaylevel!(
        2,
        "Total postings placed = {} ({} from n-grams) in {:.3} sec\n",
        ngram_postings_placed + unigram_postings,
        ngram_postings_placed,
        start.elapsed().as_secs_f64()
    );
    if engine.remaining_non_full() != 0 {
        displaylevel!(
            1,
            "Error: {} documents remain non-full\n",
            engine.remaining_non_full()
        );
    }
    if let Some(last) = occurrences.last_mut() {
        if !last.is_final() {
            displaylevel!(2, "Note: setting a missing FINAL flag on the last posting\n");
            last.set_final();
        }
    }
    engine.check_occurrence_array(&occurrences)?;

    // ---- Within-document shuffle. ----
    let start = Instant::now();
    let doc_ends = shuffle::shuffle_within_docs(&mut rng, &mut occurrences);
    displaylevel!(
        2,
        "Within-document shuffling of {} docs took {:.3} sec\n",
        doc_ends,
        start.elapsed().as_secs_f64()
    );

    // ---- Write. ----
    let start = Instant::now();
    let docs_written = if writer::is_tsv_output(&cfg.file_synth_docs) {
        writer::write_tsv(
            &cfg.file_synth_docs,
            &occurrences,
            &term_table,
            cfg.include_docnums,
        )?
    } else {
        writer::write_archive(
            &cfg.file_synth_docs,
            &occurrences,
            &term_table,
            cfg.include_docnums,
        )?
    };
    displaylevel!(
        2,
        "Synthetic docs written to {} in {:.3} sec\n",
        cfg.file_synth_docs.display(),
        start.elapsed().as_secs_f64()
    );

    let elapsed = very_start.elapsed().as_secs_f64();
    displaylevel!(
        2,
        "Total elapsed time: {:.1} sec.  Postings generated: {}.  Rate: {:.3} Mpostings/sec\n",
        elapsed,
        num_postings,
        num_postings as f64 / elapsed / 1.0e6
    );

    Ok(RunSummary {
        seed: rng.seed(),
        num_postings,
        vocab_size,
        num_docs,
        docs_written,
    })
}
