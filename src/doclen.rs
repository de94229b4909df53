//! Document-length modelling and doctable construction.
//!
//! Lengths come from one of four sources: a histogram file extracted from
//! the reference corpus, a normal distribution, a gamma distribution, or a
//! piecewise-linear model.  Whatever the source, generation stops once the
//! cumulative length covers the posting budget, truncating the final
//! document if it would overflow.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::displaylevel;
use crate::posting::DoctableEntry;
use crate::rng::GenRng;

/// Hard cap on generated document lengths, in words.
pub const MAX_DOC_WORDS: u64 = 1 << 20;

/// How document lengths are drawn.
pub enum LengthModel {
    /// Normal(mean, stdev), non-positive draws rejected.
    Normal { mean: f64, stdev: f64 },
    /// Gamma(shape, scale), zero draws rejected.
    Gamma { shape: f64, scale: f64 },
    /// Piecewise-linear cumulative distribution over lengths.
    Piecewise { cumprobs: Vec<f64>, lengths: Vec<f64> },
}

/// Parse a piecewise document-length specification of the form
/// `k:len1,cum1;len2,cum2;...` with at least two points, both coordinates
/// ascending, and a final cumulative probability of 1.0.
pub fn parse_dl_segments(spec: &str) -> Result<LengthModel> {
    let (count_str, rest) = spec
        .split_once(':')
        .context("synth_dl_segments must start with '<count>:'")?;
    let count: usize = count_str
        .trim()
        .parse()
        .context("bad segment count in synth_dl_segments")?;
    ensure!(count >= 2, "need at least 2 points in synth_dl_segments");

    let mut lengths = Vec::with_capacity(count);
    let mut cumprobs = Vec::with_capacity(count);
    for (i, pair) in rest.split(';').enumerate() {
        let (len_str, cum_str) = pair
            .split_once(',')
            .with_context(|| format!("bad point {} in synth_dl_segments", i + 1))?;
        let len: f64 = len_str
            .trim()
            .parse()
            .with_context(|| format!("bad length in point {} of synth_dl_segments", i + 1))?;
        let cum: f64 = cum_str
            .trim()
            .parse()
            .with_context(|| format!("bad probability in point {} of synth_dl_segments", i + 1))?;
        if let (Some(&pl), Some(&pc)) = (lengths.last(), cumprobs.last()) {
            ensure!(
                len >= pl && cum >= pc,
                "synth_dl_segments points must be in ascending order"
            );
        }
        lengths.push(len);
        cumprobs.push(cum);
    }
    ensure!(
        lengths.len() == count,
        "synth_dl_segments declares {} points but lists {}",
        count,
        lengths.len()
    );
    let last = *cumprobs.last().unwrap();
    ensure!(
        last >= 1.0 - 1e-9,
        "last cumulative probability in synth_dl_segments must be 1.0, got {:.5}",
        last
    );
    Ok(LengthModel::Piecewise { cumprobs, lengths })
}

/// A document-length histogram: `counts[len - 1]` documents of length
/// `len`.
pub struct LengthHistogram {
    pub counts: Vec<u64>,
    pub max_len: usize,
    pub num_docs: u64,
}

/// Generate a length histogram by drawing from `model` until the total
/// length reaches `postings_required`.  Out-of-range draws are rejected
/// (below one) or clamped (above the cap).
pub fn generate_histogram(
    model: &LengthModel,
    postings_required: u64,
    rng: &mut GenRng,
) -> Result<LengthHistogram> {
    let mut counts: Vec<u64> = Vec::new();
    let mut total_length = 0u64;
    let mut num_docs = 0u64;
    let mut max_len = 0usize;

    while total_length < postings_required {
        let drawn = match model {
            LengthModel::Normal { mean, stdev } => rng.normal(*mean, *stdev)?.round(),
            LengthModel::Gamma { shape, scale } => rng.gamma(*shape, *scale)?.round(),
            LengthModel::Piecewise { cumprobs, lengths } => {
                rng.cumdist(cumprobs, lengths)?.ceil()
            }
        };
        if drawn < 1.0 {
            continue;
        }
        let length = (drawn as u64).min(MAX_DOC_WORDS) as usize;
        if length > counts.len() {
            counts.resize(length, 0);
        }
        counts[length - 1] += 1;
        max_len = max_len.max(length);
        total_length += length as u64;
        num_docs += 1;
    }

    displaylevel!(
        2,
        "Document length histogram generated: {} docs, max_length = {}\n",
        num_docs,
        max_len
    );
    Ok(LengthHistogram { counts, max_len, num_docs })
}

/// Read a length histogram file (`<length> TAB <count>` lines, `#`
/// comments) and scale the counts so the represented posting total matches
/// the request.
pub fn read_histogram(path: &Path, postings_required: u64) -> Result<LengthHistogram> {
    displaylevel!(2, "Reading document length histogram from {}\n", path.display());
    let file = File::open(path).with_context(|| format!("can't read {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut counts: Vec<u64> = Vec::new();
    let mut total_length = 0f64;
    let mut max_len = 0usize;
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split_whitespace();
        let len: usize = match fields.next().map(str::parse) {
            Some(Ok(l)) => l,
            _ => bail!("bad length field in {}", path.display()),
        };
        if len == 0 {
            continue; // zero-length documents carry no postings
        }
        let freq: u64 = match fields.next().map(str::parse) {
            Some(Ok(f)) => f,
            _ => bail!("bad count field in {}", path.display()),
        };
        if len > counts.len() {
            counts.resize(len, 0);
        }
        counts[len - 1] = freq;
        max_len = max_len.max(len);
        total_length += (freq * len as u64) as f64;
    }
    ensure!(total_length > 0.0, "{} holds no documents", path.display());

    let scaling = postings_required as f64 / total_length;
    displaylevel!(
        3,
        "Histogram represents {:.0} postings, {} requested; scaling by {:.5}\n",
        total_length,
        postings_required,
        scaling
    );
    let mut num_docs = 0u64;
    for count in counts.iter_mut() {
        *count = (*count as f64 * scaling).round() as u64;
        num_docs += *count;
    }
    Ok(LengthHistogram { counts, max_len, num_docs })
}

/// Walk the histogram in increasing length order and emit one doctable
/// entry (length only) per document, stopping once the posting budget is
/// covered.  The final document is shortened if it would overflow the
/// budget.
pub fn doctable_from_histogram(
    histo: &LengthHistogram,
    requested_postings: u64,
) -> Vec<DoctableEntry> {
    let mut doctable = Vec::with_capacity(histo.num_docs as usize);
    let mut postings_created = 0u64;

    'outer: for (i, &count) in histo.counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let len = (i + 1) as u64;
        for _ in 0..count {
            let len = len.min(requested_postings - postings_created);
            doctable.push(DoctableEntry::from_len(len));
            postings_created += len;
            if postings_created >= requested_postings {
                break 'outer;
            }
        }
    }

    displaylevel!(
        2,
        "Doctable of {} docs built, total postings {}\n",
        doctable.len(),
        postings_created
    );
    doctable
}

/// Convert the (shuffled) sequence of lengths into start offsets within
/// the occurrence array, by running prefix sum.
pub fn plug_in_pointers(doctable: &mut [DoctableEntry]) {
    let mut index = 0u64;
    for entry in doctable.iter_mut() {
        let len = entry.remaining();
        *entry = DoctableEntry::pack(index, len);
        index += len;
    }
    displaylevel!(
        3,
        "Pointers plugged in for {} doctable entries.  Highest index = {}\n",
        doctable.len(),
        index
    );
}
