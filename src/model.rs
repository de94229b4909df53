//! Piecewise-linear model of the term-frequency distribution.
//!
//! The distribution has three regions.  The head is a short list of ranks
//! with explicit probabilities.  The middle is one or more segments, each a
//! straight line in log-log space described by its slope alpha, first and
//! last rank, probability mass and ending cumulative probability.  The
//! tail holds the remaining ranks, nominally singletons, sized by a
//! percentage of the vocabulary.

use anyhow::{bail, ensure, Context, Result};

use crate::displaylevel;

/// One straight-line segment of the middle region, with the constants the
/// synthesizer needs precomputed.
///
/// The underlying function is x^alpha, whose integral is
/// x^(alpha+1) / (alpha+1).  The analytic area between F and L is scaled so
/// the segment's total probability comes out as `probrange`.
#[derive(Debug, Clone)]
pub struct MidSegment {
    pub alpha: f64,
    /// Rank of the first term covered by this segment.
    pub first: f64,
    /// Rank of the last term covered by this segment.
    pub last: f64,
    /// Sum of all term probabilities within this segment.
    pub probrange: f64,
    /// Cumulative term probability from rank 1 through `last`.
    pub cumprob: f64,
    pub ap1: f64,
    pub rap1: f64,
    pub area_scale: f64,
    pub area_to_first: f64,
}

impl MidSegment {
    pub fn new(alpha: f64, first: f64, last: f64, probrange: f64, cumprob: f64) -> MidSegment {
        let ap1 = alpha + 1.0;
        let area = (last.powf(ap1) - first.powf(ap1)) / ap1;
        let area_scale = 1.0 / area;
        MidSegment {
            alpha,
            first,
            last,
            probrange,
            cumprob,
            ap1,
            rap1: 1.0 / ap1,
            area_scale,
            area_to_first: area_scale * first.powf(ap1) / ap1,
        }
    }

    /// Analytic area of the unit-wide interval [rank-1, rank] under this
    /// segment, scaled into the segment's probability range.  The sign can
    /// flip with alpha; callers take the magnitude.
    pub fn unit_area(&self, rank: u64) -> f64 {
        let x0 = (rank - 1) as f64;
        let p0 = if rank == 1 { 0.0 } else { x0.powf(self.ap1) };
        let p1 = (rank as f64).powf(self.ap1);
        (p0 - p1) / self.ap1 * self.area_scale * self.probrange
    }
}

/// The full three-region model.
#[derive(Debug, Clone)]
pub struct ZipfModel {
    /// Cumulative probability at each head rank; empty when no explicit
    /// head terms were requested.
    pub head_cumprobs: Vec<f64>,
    pub mid_segments: Vec<MidSegment>,
    /// Desired percentage of the vocabulary occurring exactly once.
    pub tail_perc: f64,
}

impl ZipfModel {
    pub fn head_terms(&self) -> usize {
        self.head_cumprobs.len()
    }

    /// Cumulative probability consumed by the head region.
    pub fn head_prob(&self) -> f64 {
        self.head_cumprobs.last().copied().unwrap_or(0.0)
    }
}

/// Parse a comma-separated list of head-term percentages into cumulative
/// probabilities.  The list is expected in descending order of term
/// probability; each entry is a percentage of all term instances.
pub fn parse_head_percentages(spec: &str) -> Result<Vec<f64>> {
    let mut cumprobs = Vec::new();
    let mut total = 0.0f64;
    for (i, piece) in spec.split(',').enumerate() {
        let perc: f64 = piece
            .trim()
            .parse()
            .with_context(|| format!("bad head term percentage {} ('{}')", i + 1, piece))?;
        ensure!(perc >= 0.0, "head term percentage {} is negative", i + 1);
        total += perc / 100.0;
        cumprobs.push(total);
    }
    ensure!(
        total <= 1.0 + 1e-9,
        "head term percentages sum to more than 100%"
    );
    Ok(cumprobs)
}

/// Parse the middle-piece specification: a sequence of
/// `alpha,F,L,probrange,cumprob` tuples, each terminated by `%`.
pub fn parse_middle_pieces(spec: &str) -> Result<Vec<MidSegment>> {
    let mut segments = Vec::new();
    for (i, tuple) in spec.split_terminator('%').enumerate() {
        let fields: Vec<&str> = tuple.split(',').collect();
        ensure!(
            fields.len() == 5,
            "middle segment {} has {} fields, expected 5 (alpha,F,L,probrange,cumprob)",
            i + 1,
            fields.len()
        );
        let mut vals = [0.0f64; 5];
        for (f, field) in fields.iter().enumerate() {
            vals[f] = field.trim().parse().with_context(|| {
                format!("bad number '{}' in middle segment {}", field, i + 1)
            })?;
        }
        segments.push(MidSegment::new(vals[0], vals[1], vals[2], vals[3], vals[4]));
    }
    ensure!(!segments.is_empty(), "no middle segments in specification");
    Ok(segments)
}

/// Estimate Zipf alpha for a corpus of `postings` occurrences and `vocab`
/// distinct terms, assuming freq = c * rank^alpha.
///
/// Integrating gives postings = c * vocab^(alpha+1) / (alpha+1) with c
/// chosen so the last rank has frequency one; there is no closed form for
/// alpha so a binary chop on q = alpha + 1 is used.
pub fn find_alpha(postings: f64, vocab: f64) -> Result<f64> {
    displaylevel!(
        3,
        "Automatic calculation of Zipf alpha for N = {:.0} and |V| = {:.0}\n",
        postings,
        vocab
    );
    let mut hiq = -0.001f64;
    let mut loq = -5.0f64;
    let mut count = 0;
    loop {
        if count > 100 {
            bail!(
                "automatic calculation of Zipf alpha failed to converge; \
                 try different synth_postings and/or synth_vocab_size"
            );
        }
        let q = (hiq + loq) / 2.0;
        let alpha = q - 1.0;
        let c = -1.0 / vocab.powf(alpha);
        let estimated = c * vocab.powf(q) / q;
        let diff = estimated - postings;
        if diff.abs() <= 0.001 {
            return Ok(alpha);
        }
        if diff < 0.0 {
            loq = q;
        } else {
            hiq = q;
        }
        count += 1;
    }
}

/// Inputs needed to assemble a [`ZipfModel`].
pub struct ModelSpec<'a> {
    pub postings: f64,
    pub vocab_size: f64,
    pub alpha: Option<f64>,
    pub tail_perc: f64,
    pub head_percentages: Option<&'a str>,
    pub middle_pieces: Option<&'a str>,
}

/// Assemble the model.  When middle pieces are given they are parsed as
/// is; otherwise one middle segment is synthesized to span the ranks
/// between head and tail, with alpha auto-fitted if absent.
pub fn build_model(spec: &ModelSpec) -> Result<ZipfModel> {
    let head_cumprobs = match spec.head_percentages {
        Some(s) => parse_head_percentages(s)?,
        None => Vec::new(),
    };
    let head_prob = head_cumprobs.last().copied().unwrap_or(0.0);

    let mid_segments = match spec.middle_pieces {
        Some(s) => {
            let segs = parse_middle_pieces(s)?;
            displaylevel!(3, "Middle segments defined: {}.\n", segs.len());
            segs
        }
        None => {
            let alpha = match spec.alpha {
                Some(a) => a,
                None => {
                    let a = find_alpha(spec.postings, spec.vocab_size)?;
                    displaylevel!(2, "Set zipf_alpha to {:.4}. (It wasn't explicitly defined.)\n", a);
                    a
                }
            };
            let tail_frac = spec.tail_perc / 100.0;
            let first = head_cumprobs.len() as f64 + 1.0;
            let last = spec.vocab_size * (1.0 - tail_frac);
            let cumprob = 1.0 - (spec.vocab_size * tail_frac) / spec.postings;
            let seg = MidSegment::new(alpha, first, last, cumprob - head_prob, cumprob);
            displaylevel!(
                3,
                "Single middle segment: alpha={:.4}, F={:.0}, L={:.0}, cumprob={:.4}, probrange={:.4}\n",
                seg.alpha,
                seg.first,
                seg.last,
                seg.cumprob,
                seg.probrange
            );
            vec![seg]
        }
    };

    Ok(ZipfModel {
        head_cumprobs,
        mid_segments,
        tail_perc: spec.tail_perc,
    })
}
