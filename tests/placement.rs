// Placement engine and n-gram pre-placement.

use std::io::Write;

use synthcorpus::cli::constants::set_display_level;
use synthcorpus::doclen::plug_in_pointers;
use synthcorpus::ngram::{load_ngrams_file, place_ngrams};
use synthcorpus::place::{PlaceOutcome, PlacementEngine};
use synthcorpus::posting::{DoctableEntry, Posting};
use synthcorpus::rng::GenRng;

fn quiet() {
    set_display_level(0);
}

fn doctable_of_lengths(lengths: &[u64]) -> Vec<DoctableEntry> {
    let mut doctable: Vec<DoctableEntry> =
        lengths.iter().map(|&l| DoctableEntry::from_len(l)).collect();
    plug_in_pointers(&mut doctable);
    doctable
}

// ── Packed record types ─────────────────────────────────────────────────────

#[test]
fn posting_flags_are_independent_of_rank() {
    let mut p = Posting::new(123_456);
    p.set_ngram_start();
    p.set_final();
    assert_eq!(p.rank(), 123_456);
    assert!(p.is_final() && p.is_ngram_start() && !p.is_ngram_cont());
    p.clear_final();
    assert!(!p.is_final());
    assert_eq!(p.rank(), 123_456);
}

#[test]
fn doctable_entry_round_trips_pointer_and_remaining() {
    let e = DoctableEntry::pack(987_654_321, 42);
    assert_eq!(e.pointer(), 987_654_321);
    assert_eq!(e.remaining(), 42);
    assert!(!e.is_full());
    assert!(DoctableEntry::pack(0, 0).is_full());
}

// ── Unigram placement fills every slot exactly once ─────────────────────────

#[test]
fn unigram_placement_covers_the_whole_array() {
    quiet();
    let mut rng = GenRng::seeded(5);
    let doctable = doctable_of_lengths(&[4, 7, 2, 7]); // 20 postings
    let mut engine = PlacementEngine::new(doctable);
    let mut occurrences = vec![Posting::EMPTY; 20];

    // Ranks 1..=5 with 4 occurrences each.
    let tofs = vec![4u64; 5];
    let placed = engine
        .place_unigrams(&tofs, &mut occurrences, &mut rng)
        .expect("placement should succeed");
    assert_eq!(placed, 20);
    assert_eq!(engine.remaining_non_full(), 0);

    engine
        .check_occurrence_array(&occurrences)
        .expect("census should pass");

    // Every slot written once; the multiset of ranks matches TOFS.
    let mut counts = [0u64; 6];
    for p in &occurrences {
        counts[p.rank() as usize] += 1;
    }
    assert_eq!(&counts[1..], &[4, 4, 4, 4, 4]);
    assert_eq!(occurrences.iter().filter(|p| p.is_final()).count(), 4);
}

// ── All lengths one: every posting is FINAL ─────────────────────────────────

#[test]
fn unit_length_docs_make_every_posting_final() {
    quiet();
    let mut rng = GenRng::seeded(9);
    let doctable = doctable_of_lengths(&[1; 12]);
    let mut engine = PlacementEngine::new(doctable);
    let mut occurrences = vec![Posting::EMPTY; 12];

    let tofs = vec![1u64; 12];
    engine
        .place_unigrams(&tofs, &mut occurrences, &mut rng)
        .expect("placement should succeed");
    assert!(occurrences.iter().all(|p| p.is_final()));
}

// ── Exhaustion reports all-full ─────────────────────────────────────────────

#[test]
fn placing_into_a_full_table_reports_all_full() {
    quiet();
    let mut rng = GenRng::seeded(3);
    let doctable = doctable_of_lengths(&[1]);
    let mut engine = PlacementEngine::new(doctable);
    let mut occurrences = vec![Posting::EMPTY; 1];

    let first = engine
        .place_instance(&[1], false, &mut occurrences, &mut rng)
        .unwrap();
    assert_eq!(first, PlaceOutcome::Placed);
    let second = engine
        .place_instance(&[2], false, &mut occurrences, &mut rng)
        .unwrap();
    assert_eq!(second, PlaceOutcome::AllFull);
}

// ── Scenario: N(3,5):4 with TOFS[2]=TOFS[4]=10 ──────────────────────────────

#[test]
fn ngram_preplacement_debits_tofs_and_flags_postings() {
    quiet();
    let mut rng = GenRng::seeded(17);

    let mut ngram_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(ngram_file, "N(3,5):4").unwrap();
    writeln!(ngram_file, "C(1,2):9").unwrap(); // other record kinds are skipped
    ngram_file.flush().unwrap();

    let mut tofs = vec![2u64, 2, 10, 2, 10]; // 26 postings, vocab 5
    let mut rows = load_ngrams_file(ngram_file.path(), 5).expect("load should succeed");
    assert_eq!(rows.len(), 1);

    let doctable = doctable_of_lengths(&[9, 9, 8]);
    let mut engine = PlacementEngine::new(doctable);
    let mut occurrences = vec![Posting::EMPTY; 26];

    let stats = place_ngrams(&mut rows, &mut tofs, &mut engine, &mut occurrences, &mut rng)
        .expect("pre-placement should succeed");

    assert_eq!(stats.instances_emitted, 4);
    assert_eq!(stats.postings_placed, 8);
    assert_eq!(tofs, vec![2, 2, 6, 2, 6]);

    // Each placed instance: START on rank 3 immediately followed by
    // CONTINUATION on rank 5.
    let mut starts = 0;
    for (i, p) in occurrences.iter().enumerate() {
        if p.is_ngram_start() {
            starts += 1;
            assert_eq!(p.rank(), 3);
            let next = occurrences[i + 1];
            assert!(next.is_ngram_cont(), "START must be followed by CONTINUATION");
            assert_eq!(next.rank(), 5);
        }
    }
    assert_eq!(starts, 4);

    // Remaining unigrams still fit exactly.
    engine
        .place_unigrams(&tofs, &mut occurrences, &mut rng)
        .expect("unigram placement should succeed");
    engine
        .check_occurrence_array(&occurrences)
        .expect("census should pass");
}

// ── Subsumed bigrams are debited alongside their parent ─────────────────────

#[test]
fn subsumed_bigram_frequency_tracks_parent_emission() {
    quiet();
    let mut rng = GenRng::seeded(29);

    let mut ngram_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(ngram_file, "N(1,2,3):2").unwrap();
    writeln!(ngram_file, "N(1,2):3").unwrap();
    writeln!(ngram_file, "N(2,3):2").unwrap();
    ngram_file.flush().unwrap();

    let mut tofs = vec![10u64, 10, 10];
    let mut rows = load_ngrams_file(ngram_file.path(), 3).expect("load should succeed");
    assert_eq!(rows.len(), 3);
    // Sorted by descending arity: the trigram leads.
    assert_eq!(rows[0].arity, 3);

    let doctable = doctable_of_lengths(&[10, 10, 10]);
    let mut engine = PlacementEngine::new(doctable);
    let mut occurrences = vec![Posting::EMPTY; 30];

    let stats = place_ngrams(&mut rows, &mut tofs, &mut engine, &mut occurrences, &mut rng)
        .expect("pre-placement should succeed");

    // The merge finds N(2,3) as subsumed (its row is reachable from the
    // highest list head); each trigram emission debits its frequency, so
    // N(2,3) arrives at its own turn with nothing left.  N(1,2) keeps its
    // full frequency and emits normally.
    assert_eq!(stats.subsumptions_found, 1);
    assert_eq!(stats.instances_emitted, 2 + 3 + 0);
    assert_eq!(stats.postings_placed, 2 * 3 + 3 * 2);
    // Trigram debits 1,2,3 twice each; N(1,2) debits 1,2 three times.
    assert_eq!(tofs, vec![5, 5, 8]);
}

// ── Out-of-range termids are fatal at load time ─────────────────────────────

#[test]
fn ngram_loader_rejects_termids_beyond_vocab() {
    quiet();
    let mut ngram_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(ngram_file, "N(3,99):4").unwrap();
    ngram_file.flush().unwrap();
    assert!(load_ngrams_file(ngram_file.path(), 5).is_err());
}

#[test]
fn ngram_loader_truncates_wide_tuples() {
    quiet();
    let mut ngram_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(ngram_file, "N(1,2,3,4,5,6,7,8):2").unwrap();
    ngram_file.flush().unwrap();
    let rows = load_ngrams_file(ngram_file.path(), 10).expect("load should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].arity, 6, "arities beyond 6 are truncated");
    assert_eq!(rows[0].termids(), &[1, 2, 3, 4, 5, 6]);
}
