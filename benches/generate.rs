use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use synthcorpus::cli::constants::set_display_level;
use synthcorpus::doclen::{doctable_from_histogram, generate_histogram, plug_in_pointers, LengthModel};
use synthcorpus::model::{build_model, ModelSpec};
use synthcorpus::place::PlacementEngine;
use synthcorpus::posting::Posting;
use synthcorpus::rng::GenRng;
use synthcorpus::shuffle::shuffle_within_docs;
use synthcorpus::tfd::synthesize_tofs;

const POSTINGS: u64 = 200_000;
const VOCAB: usize = 20_000;

fn bench_tfd(c: &mut Criterion) {
    set_display_level(0);
    let model = build_model(&ModelSpec {
        postings: POSTINGS as f64,
        vocab_size: VOCAB as f64,
        alpha: Some(-0.9),
        tail_perc: 30.0,
        head_percentages: None,
        middle_pieces: None,
    })
    .unwrap();
    c.bench_function("tfd_synthesis", |b| {
        b.iter(|| synthesize_tofs(&model, POSTINGS, VOCAB).unwrap())
    });
}

fn bench_placement(c: &mut Criterion) {
    set_display_level(0);
    let model = build_model(&ModelSpec {
        postings: POSTINGS as f64,
        vocab_size: VOCAB as f64,
        alpha: Some(-0.9),
        tail_perc: 30.0,
        head_percentages: None,
        middle_pieces: None,
    })
    .unwrap();
    let tofs = synthesize_tofs(&model, POSTINGS, VOCAB).unwrap();
    let mut rng = GenRng::seeded(1);
    let histo = generate_histogram(
        &LengthModel::Normal { mean: 100.0, stdev: 30.0 },
        POSTINGS,
        &mut rng,
    )
    .unwrap();
    let mut doctable = doctable_from_histogram(&histo, POSTINGS);
    plug_in_pointers(&mut doctable);

    c.bench_function("unigram_placement", |b| {
        b.iter_batched(
            || (doctable.clone(), GenRng::seeded(2)),
            |(table, mut rng)| {
                let mut engine = PlacementEngine::new(table);
                let mut occurrences = vec![Posting::EMPTY; POSTINGS as usize];
                engine
                    .place_unigrams(&tofs, &mut occurrences, &mut rng)
                    .unwrap();
                occurrences
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_within_doc_shuffle(c: &mut Criterion) {
    set_display_level(0);
    let mut rng = GenRng::seeded(3);
    // One FINAL every 100 postings.
    let mut occurrences: Vec<Posting> = (0..POSTINGS as u32)
        .map(|i| {
            let mut p = Posting::new(i % 50 + 1);
            if i % 100 == 99 {
                p.set_final();
            }
            p
        })
        .collect();
    c.bench_function("within_doc_shuffle", |b| {
        b.iter(|| shuffle_within_docs(&mut rng, &mut occurrences))
    });
}

criterion_group!(benches, bench_tfd, bench_placement, bench_within_doc_shuffle);
criterion_main!(benches);
