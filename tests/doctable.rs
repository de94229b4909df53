// Document-length histograms and doctable construction.

use std::io::Write;

use synthcorpus::cli::constants::set_display_level;
use synthcorpus::doclen::{
    doctable_from_histogram, generate_histogram, parse_dl_segments, plug_in_pointers,
    read_histogram, LengthHistogram, LengthModel,
};
use synthcorpus::rng::GenRng;

fn quiet() {
    set_display_level(0);
}

// ── Scenario: posts=1000, doc-length=10 with no variance ────────────────────

#[test]
fn constant_lengths_make_exactly_one_hundred_docs() {
    quiet();
    let mut rng = GenRng::seeded(7);
    let model = LengthModel::Normal { mean: 10.0, stdev: 0.0 };
    let histo = generate_histogram(&model, 1000, &mut rng).expect("generation should succeed");

    assert_eq!(histo.num_docs, 100);
    assert_eq!(histo.max_len, 10);
    assert_eq!(histo.counts[9], 100);

    let doctable = doctable_from_histogram(&histo, 1000);
    assert_eq!(doctable.len(), 100);
    assert!(doctable.iter().all(|e| e.remaining() == 10));
}

// ── Budget equal to the sum of lengths: no truncation ───────────────────────

#[test]
fn exact_budget_truncates_nothing() {
    quiet();
    let histo = LengthHistogram {
        counts: vec![2, 1, 0, 1], // 2x1 + 1x2 + 1x4 = 8 postings
        max_len: 4,
        num_docs: 4,
    };
    let doctable = doctable_from_histogram(&histo, 8);
    let lengths: Vec<u64> = doctable.iter().map(|e| e.remaining()).collect();
    assert_eq!(lengths, vec![1, 1, 2, 4]);
}

#[test]
fn overfull_histogram_truncates_the_last_doc() {
    quiet();
    let histo = LengthHistogram {
        counts: vec![0, 0, 3], // 3 docs of length 3
        max_len: 3,
        num_docs: 3,
    };
    let doctable = doctable_from_histogram(&histo, 7);
    let lengths: Vec<u64> = doctable.iter().map(|e| e.remaining()).collect();
    assert_eq!(lengths, vec![3, 3, 1], "last doc shortened to fit the budget");
}

// ── Pointer plug-in is a prefix sum over lengths ────────────────────────────

#[test]
fn pointers_are_prefix_sums() {
    quiet();
    let histo = LengthHistogram {
        counts: vec![1, 1, 1], // lengths 1, 2, 3
        max_len: 3,
        num_docs: 3,
    };
    let mut doctable = doctable_from_histogram(&histo, 6);
    plug_in_pointers(&mut doctable);

    assert_eq!(doctable[0].pointer(), 0);
    assert_eq!(doctable[1].pointer(), 1);
    assert_eq!(doctable[2].pointer(), 3);
    let total: u64 = doctable.iter().map(|e| e.remaining()).sum();
    assert_eq!(total, 6, "sum of initial remaining equals the posting budget");
}

// ── Piecewise model parsing and drawing ─────────────────────────────────────

#[test]
fn dl_segments_parse_and_draw_within_range() {
    quiet();
    let model = parse_dl_segments("4:1,0.333333;10,0.500000;200,0.6666667;5000,1.000000")
        .expect("spec should parse");
    let mut rng = GenRng::seeded(11);
    let histo = generate_histogram(&model, 20_000, &mut rng).expect("generation should succeed");
    assert!(histo.max_len <= 5000);
    assert!(histo.num_docs > 0);
}

#[test]
fn dl_segments_reject_descending_points() {
    quiet();
    assert!(parse_dl_segments("2:10,0.5;5,1.0").is_err());
}

#[test]
fn dl_segments_reject_short_specs() {
    quiet();
    assert!(parse_dl_segments("1:10,1.0").is_err());
}

// ── Histogram file reading and scaling ──────────────────────────────────────

#[test]
fn histogram_file_scales_to_requested_postings() {
    quiet();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "# length histogram").unwrap();
    writeln!(f, "0\t5").unwrap(); // ignored: zero-length docs
    writeln!(f, "10\t10").unwrap(); // 100 postings represented
    f.flush().unwrap();

    let histo = read_histogram(f.path(), 200).expect("read should succeed");
    assert_eq!(histo.counts[9], 20, "counts double to reach 200 postings");
    assert_eq!(histo.num_docs, 20);

    let doctable = doctable_from_histogram(&histo, 200);
    let total: u64 = doctable.iter().map(|e| e.remaining()).sum();
    assert_eq!(total, 200);
}

// ── Gamma model produces sane lengths ───────────────────────────────────────

#[test]
fn gamma_lengths_are_positive_and_cover_the_budget() {
    quiet();
    let mut rng = GenRng::seeded(23);
    let model = LengthModel::Gamma { shape: 5.0, scale: 2.0 };
    let histo = generate_histogram(&model, 5000, &mut rng).expect("generation should succeed");
    let total: u64 = histo
        .counts
        .iter()
        .enumerate()
        .map(|(i, &c)| (i as u64 + 1) * c)
        .sum();
    assert!(total >= 5000);
}
