// Markov training and sampling.

use std::collections::HashSet;
use std::io::Write;

use synthcorpus::cli::constants::set_display_level;
use synthcorpus::markov::{
    convert_row_to_cumprobs, rank_bucket, Alphabet, MarkovConfig, MarkovModel, UniqueWordSampler,
    MAX_TERM_LEN,
};
use synthcorpus::rng::GenRng;

fn quiet() {
    set_display_level(0);
}

fn write_training(lines: &[(&str, u64)]) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    for (word, freq) in lines {
        writeln!(f, "{word}\t{freq}").unwrap();
    }
    f.flush().unwrap();
    f
}

fn train(order: usize, use_eow: bool, lines: &[(&str, u64)]) -> MarkovModel {
    let f = write_training(lines);
    let config = MarkovConfig {
        order,
        use_eow,
        ..MarkovConfig::default()
    };
    let (model, _lenprob) = MarkovModel::train(config, f.path()).expect("training should succeed");
    model
}

// ── Scenario: order 2 on cat/car — "ca" row splits evenly on t and r ────────

#[test]
fn order_two_cat_car_splits_ca_row_evenly() {
    quiet();
    let model = train(2, false, &[("cat", 1), ("car", 1)]);
    let offset = model.alphabet.row_index(b"ca").expect("row index");
    let row = model.row(2, offset);

    let col_r = model.alphabet.col(b'r').unwrap();
    let col_t = model.alphabet.col(b't').unwrap();
    assert!(col_r < col_t);

    // Cumulative: zero before 'r', one half from 'r' to just before 't',
    // one from 't' onwards.
    assert!(row[col_r - 1].abs() < 1e-9);
    assert!((row[col_r] - 0.5).abs() < 1e-9);
    assert!((row[col_t - 1] - 0.5).abs() < 1e-9);
    assert!((row[col_t] - 1.0).abs() < 1e-9);
}

#[test]
fn order_two_cat_car_with_eow_includes_end_symbol() {
    quiet();
    let model = train(2, true, &[("cat", 1), ("car", 1)]);
    // Contexts "at" and "ar" each saw exactly one EOW transition.
    for context in [b"at".as_slice(), b"ar".as_slice()] {
        let offset = model.alphabet.row_index(context).expect("row index");
        let row = model.row(2, offset);
        let eow = model.alphabet.eow_col();
        assert!((row[eow] - 1.0).abs() < 1e-9);
        assert!(
            (row[eow] - row[eow - 1] - 1.0).abs() < 1e-9,
            "all mass on the end symbol"
        );
    }
}

// ── Matrix invariants after training ────────────────────────────────────────

#[test]
fn every_row_is_nondecreasing_and_ends_at_one() {
    quiet();
    let model = train(
        2,
        false,
        &[("the", 100), ("of", 80), ("and", 60), ("quick", 5), ("brown", 5)],
    );
    let e = model.alphabet.e_size();
    let a = model.alphabet.a_size();
    for k in 0..=2usize {
        for r in 0..e.pow(k as u32) {
            let row = model.row(k, r * a);
            let mut prev = 0.0;
            for &cum in row {
                assert!(cum >= prev - 1e-9, "row must be nondecreasing");
                prev = cum;
            }
            assert!((row[a - 1] - 1.0).abs() < 1e-6, "order {k} row {r} ends at {prev}");
        }
    }
}

#[test]
fn cumprob_conversion_is_stable_under_reapplication() {
    quiet();
    // One-hot rows are exactly idempotent.
    let mut one_hot = vec![0.0, 0.0, 7.0, 0.0];
    convert_row_to_cumprobs(&mut one_hot);
    let first = one_hot.clone();
    convert_row_to_cumprobs(&mut one_hot);
    assert_eq!(one_hot, first);

    // General rows stay valid cumulative distributions on reapplication.
    let mut row = vec![3.0, 1.0, 4.0, 1.0, 5.0];
    convert_row_to_cumprobs(&mut row);
    convert_row_to_cumprobs(&mut row);
    let mut prev = 0.0;
    for &cum in &row {
        assert!(cum >= prev);
        prev = cum;
    }
    assert!((row[4] - 1.0).abs() < 1e-6);
}

// ── Training rejections ─────────────────────────────────────────────────────

#[test]
fn training_rejects_missing_tab() {
    quiet();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "notab").unwrap();
    f.flush().unwrap();
    let config = MarkovConfig { order: 1, ..MarkovConfig::default() };
    assert!(MarkovModel::train(config, f.path()).is_err());
}

#[test]
fn training_rejects_overlong_words() {
    quiet();
    let f = write_training(&[("averyveryverylongword", 1)]);
    let config = MarkovConfig { order: 1, ..MarkovConfig::default() };
    assert!(MarkovModel::train(config, f.path()).is_err());
}

#[test]
fn training_folds_case_and_strips_nonletters() {
    quiet();
    let model = train(1, false, &[("C-A-T!", 1)]);
    // "cat": row for context 'c' has all mass on 'a'.
    let offset = model.alphabet.row_index(b"c").expect("row index");
    let row = model.row(1, offset);
    let col_a = model.alphabet.col(b'a').unwrap();
    assert!((row[col_a] - 1.0).abs() < 1e-9);
}

// ── Row-index arithmetic at the order cap ───────────────────────────────────

#[test]
fn order_seven_row_index_does_not_overflow() {
    let alphabet = Alphabet::lowercase_ascii(true);
    let offset = alphabet.row_index(b"zzzzzzz").expect("7-letter context");
    // Highest context maps inside E^7 rows of A columns.
    assert!(offset < 27usize.pow(7) * alphabet.a_size());
}

// ── Sampling ────────────────────────────────────────────────────────────────

#[test]
fn sampler_emits_unique_nonempty_words() {
    quiet();
    let model = train(
        2,
        false,
        &[
            ("the", 90),
            ("quick", 70),
            ("brown", 50),
            ("foxes", 40),
            ("jumped", 30),
            ("over", 20),
            ("lazy", 10),
            ("dogs", 5),
        ],
    );
    let mut sampler = UniqueWordSampler::new(&model, 99);
    let mut rng = GenRng::seeded(67);

    let mut seen = HashSet::new();
    for rank in 1..=500u32 {
        let word = sampler.sample(rank, &mut rng).expect("sampling should succeed");
        assert!(!word.is_empty(), "no zero-length words");
        assert!(word.len() <= MAX_TERM_LEN);
        assert!(word.iter().all(|b| b.is_ascii_lowercase()));
        assert!(seen.insert(word), "duplicate word emitted");
    }
}

#[test]
fn eow_sampler_terminates_words_by_itself() {
    quiet();
    // Without smoothing this vocabulary is a closed world (every reachable
    // context only continues into another training word), so lambda keeps
    // the unique-word supply open.
    let f = write_training(&[
        ("cat", 10),
        ("car", 8),
        ("cart", 5),
        ("care", 3),
        ("dog", 6),
        ("dig", 4),
    ]);
    let config = MarkovConfig {
        order: 2,
        use_eow: true,
        lambda: 0.3,
        ..MarkovConfig::default()
    };
    let (model, _lenprob) = MarkovModel::train(config, f.path()).expect("training should succeed");
    let mut sampler = UniqueWordSampler::new(&model, 7);
    let mut rng = GenRng::seeded(71);
    for rank in 1..=50u32 {
        let word = sampler.sample(rank, &mut rng).expect("sampling should succeed");
        assert!(!word.is_empty());
        assert!(word.len() <= MAX_TERM_LEN);
    }
}

// ── Order 0, lambda 0: sampled letter frequencies track training ────────────

#[test]
fn order_zero_letter_frequencies_match_training() {
    quiet();
    // Highly skewed single-letter vocabulary: e twice as common as t,
    // which is twice as common as a.
    let model = train(0, false, &[("e", 4), ("t", 2), ("a", 1)]);
    let row = model.row(0, 0);
    let mut rng = GenRng::seeded(73);

    // model trained with within-vocab counting: one count per word...
    // so expected probabilities are uniform over {a, e, t}.
    let mut counts = [0u64; 26];
    let trials = 300_000u64;
    for _ in 0..trials {
        let r = rng.unit();
        let col = row.iter().position(|&c| r <= c).expect("row covers [0,1]");
        counts[col] += 1;
    }

    let col_a = model.alphabet.col(b'a').unwrap();
    let col_e = model.alphabet.col(b'e').unwrap();
    let col_t = model.alphabet.col(b't').unwrap();
    let expected = trials as f64 / 3.0;
    let mut chi2 = 0.0;
    for col in [col_a, col_e, col_t] {
        let dev = counts[col] as f64 - expected;
        chi2 += dev * dev / expected;
    }
    assert!(chi2 < 30.0, "chi-squared {chi2} too large for 2 degrees of freedom");

    let stray: u64 = (0..26).filter(|c| ![col_a, col_e, col_t].contains(c)).map(|c| counts[c]).sum();
    assert_eq!(stray, 0, "letters outside the training set must never be drawn");
}

// ── Rank buckets ────────────────────────────────────────────────────────────

#[test]
fn rank_buckets_are_logarithmic() {
    assert_eq!(rank_bucket(1), 0);
    assert_eq!(rank_bucket(9), 0);
    assert_eq!(rank_bucket(10), 1);
    assert_eq!(rank_bucket(99), 1);
    assert_eq!(rank_bucket(100), 2);
    assert_eq!(rank_bucket(1_000_000), 6);
}
