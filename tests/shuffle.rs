// Shuffling: plain, n-gram-respecting, and the within-document driver.

use synthcorpus::cli::constants::set_display_level;
use synthcorpus::posting::Posting;
use synthcorpus::rng::GenRng;
use synthcorpus::shuffle::{shuffle, shuffle_respecting_ngrams, shuffle_within_docs};

fn quiet() {
    set_display_level(0);
}

fn plain(rank: u32) -> Posting {
    Posting::new(rank)
}

fn son(rank: u32) -> Posting {
    let mut p = Posting::new(rank);
    p.set_ngram_start();
    p
}

fn con(rank: u32) -> Posting {
    let mut p = Posting::new(rank);
    p.set_ngram_cont();
    p
}

fn fin(rank: u32) -> Posting {
    let mut p = Posting::new(rank);
    p.set_final();
    p
}

/// Collect (start-rank, window-ranks) for every n-gram in the run.
fn ngram_windows(arr: &[Posting]) -> Vec<Vec<u32>> {
    let mut windows = Vec::new();
    let mut i = 0;
    while i < arr.len() {
        if arr[i].is_ngram_start() {
            let mut w = vec![arr[i].rank()];
            let mut k = i + 1;
            while k < arr.len() && arr[k].is_ngram_cont() {
                w.push(arr[k].rank());
                k += 1;
            }
            windows.push(w);
            i = k;
        } else {
            i += 1;
        }
    }
    windows
}

// ── Plain shuffle preserves the multiset ────────────────────────────────────

#[test]
fn plain_shuffle_is_a_permutation() {
    quiet();
    let mut rng = GenRng::seeded(41);
    let mut items: Vec<u32> = (0..1000).collect();
    shuffle(&mut rng, &mut items);
    let mut sorted = items.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..1000).collect::<Vec<u32>>());
    assert_ne!(items, (0..1000).collect::<Vec<u32>>(), "1000 items should move");
}

// ── Scenario: [1, 2, (S)3, (C)4, 5] keeps 3-4 adjacent over 1000 shuffles ──

#[test]
fn ngram_window_survives_a_thousand_shuffles() {
    quiet();
    let mut rng = GenRng::seeded(43);
    let mut arr = vec![plain(1), plain(2), son(3), con(4), plain(5)];

    for _ in 0..1000 {
        shuffle_respecting_ngrams(&mut rng, &mut arr);
        let windows = ngram_windows(&arr);
        assert_eq!(windows, vec![vec![3, 4]], "n-gram torn apart: {arr:?}");

        let mut ranks: Vec<u32> = arr.iter().map(|p| p.rank()).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }
}

#[test]
fn multiple_ngrams_survive_shuffling() {
    quiet();
    let mut rng = GenRng::seeded(47);
    // A 2-gram, a 3-gram, and ten plain postings.
    let mut arr = vec![
        son(1),
        con(2),
        son(3),
        con(4),
        con(5),
        plain(6),
        plain(7),
        plain(8),
        plain(9),
        plain(10),
        plain(11),
        plain(12),
        plain(13),
        plain(14),
        plain(15),
    ];
    for _ in 0..50 {
        shuffle_respecting_ngrams(&mut rng, &mut arr);
        let mut windows = ngram_windows(&arr);
        windows.sort();
        assert_eq!(windows, vec![vec![1, 2], vec![3, 4, 5]]);
    }
}

// ── Within-document driver: FINAL stays on the boundary ─────────────────────

#[test]
fn within_doc_shuffle_keeps_one_final_per_doc() {
    quiet();
    let mut rng = GenRng::seeded(53);
    // Two documents: ranks 1..=6 then 7..=12.
    let mut arr: Vec<Posting> = (1..=5).map(plain).collect();
    arr.push(fin(6));
    arr.extend((7..=11).map(plain));
    arr.push(fin(12));

    for _ in 0..200 {
        let ends = shuffle_within_docs(&mut rng, &mut arr);
        assert_eq!(ends, 2);

        // FINAL sits exactly on positions 5 and 11.
        let finals: Vec<usize> = arr
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_final())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(finals, vec![5, 11]);

        // Documents keep their rank sets.
        let mut first: Vec<u32> = arr[..6].iter().map(|p| p.rank()).collect();
        let mut second: Vec<u32> = arr[6..].iter().map(|p| p.rank()).collect();
        first.sort_unstable();
        second.sort_unstable();
        assert_eq!(first, (1..=6).collect::<Vec<u32>>());
        assert_eq!(second, (7..=12).collect::<Vec<u32>>());
    }
}

#[test]
fn within_doc_shuffle_preserves_ngrams_inside_docs() {
    quiet();
    let mut rng = GenRng::seeded(59);
    let mut arr = vec![
        plain(1),
        son(2),
        con(3),
        plain(4),
        plain(5),
        fin(6),
        plain(7),
        plain(8),
        fin(9),
    ];
    for _ in 0..200 {
        shuffle_within_docs(&mut rng, &mut arr);
        let windows = ngram_windows(&arr[..6]);
        assert_eq!(windows, vec![vec![2, 3]]);
        assert!(arr[5].is_final());
        assert!(arr[8].is_final());
        assert_eq!(ngram_windows(&arr[6..]).len(), 0);
    }
}

// ── Tiny runs are left untouched ────────────────────────────────────────────

#[test]
fn short_docs_are_not_shuffled() {
    quiet();
    let mut rng = GenRng::seeded(61);
    let mut arr = vec![plain(1), plain(2), fin(3)];
    let before: Vec<u32> = arr.iter().map(|p| p.raw()).collect();
    shuffle_within_docs(&mut rng, &mut arr);
    let after: Vec<u32> = arr.iter().map(|p| p.raw()).collect();
    assert_eq!(before, after, "runs of three or fewer stay in place");
}
