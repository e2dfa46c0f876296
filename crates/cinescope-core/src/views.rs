//! The ten analytical views.
//!
//! Each function is a pure read over one normalized frame and returns a
//! derived table or keyed series. Empty input (or a frame missing the
//! columns a view keys on) degrades to an empty result, never an error.
//! Rows with a null in the column an aggregate keys on are dropped from
//! that aggregate by omission.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::f64::consts::PI;

use polars::prelude::*;
use serde::Serialize;

use crate::error::AnalyticsError;
use crate::schema::{genre_key, DURATION, GENRE, MOVIE_NAME, RATINGS, VOTING_COUNTS};

/// Rows kept by the top-movies view.
pub const TOP_MOVIES_LIMIT: usize = 10;
/// Equal-width bins in the rating histogram.
pub const RATING_BINS: usize = 20;

/// One-dimensional keyed numeric series, the display contract for the
/// bar/heatmap style views.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyedSeries {
    pub keys: Vec<String>,
    pub values: Vec<f64>,
}

impl KeyedSeries {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, f64)>) -> Self {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        for (key, value) in pairs {
            keys.push(key);
            values.push(value);
        }
        Self { keys, values }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Rating frequency histogram plus a smoothed density estimate.
///
/// `edges` has one more entry than `counts`; `density` is the gaussian
/// KDE evaluated at each bin center. All vectors are empty when no
/// rating is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingHistogram {
    pub edges: Vec<f64>,
    pub counts: Vec<u32>,
    pub density: Vec<f64>,
}

/// One pie slice of the vote-share view. `percent` is exact; one-decimal
/// rounding happens in [`VoteShare::label`], not here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteShare {
    pub genre: String,
    pub votes: f64,
    pub percent: f64,
}

impl VoteShare {
    pub fn label(&self) -> String {
        format!("{} ({:.1}%)", self.genre, self.percent)
    }
}

/// Single rows holding the shortest and longest movie; either side is a
/// zero-row frame when no duration is present.
#[derive(Debug, Clone)]
pub struct DurationExtremes {
    pub shortest: DataFrame,
    pub longest: DataFrame,
}

/// View 1: rows sorted descending by rating, ties broken by descending
/// vote count, first occurrence winning remaining ties; first ten rows,
/// projected to name/genre/rating/votes. Null ratings sort last.
pub fn top_movies(df: &DataFrame) -> Result<DataFrame, AnalyticsError> {
    let projection = [MOVIE_NAME, GENRE, RATINGS, VOTING_COUNTS];
    let (Some(ratings), Some(votes)) = (opt_f64(df, RATINGS), opt_f64(df, VOTING_COUNTS)) else {
        return Ok(DataFrame::empty());
    };
    if !has_columns(df, &projection) {
        return Ok(DataFrame::empty());
    }

    let mut order: Vec<usize> = (0..df.height()).collect();
    order.sort_by(|&a, &b| {
        rank_descending(ratings.get(a), ratings.get(b))
            .then_with(|| rank_descending(votes.get(a), votes.get(b)))
    });
    order.truncate(TOP_MOVIES_LIMIT);

    take_rows(df, &order)?
        .select(projection)
        .map_err(AnalyticsError::from)
}

/// View 2: row count per genre, ordered by descending count, ties by
/// genre name so the ordering is deterministic. Counts sum to the frame
/// height since blank genres get their own category.
pub fn genre_distribution(df: &DataFrame) -> KeyedSeries {
    let Some(genres) = opt_str(df, GENRE) else {
        return KeyedSeries::default();
    };

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for idx in 0..genres.len() {
        *counts
            .entry(genre_key(genres.get(idx)).to_string())
            .or_insert(0) += 1;
    }

    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    KeyedSeries::from_pairs(entries.into_iter().map(|(key, count)| (key, count as f64)))
}

/// View 3: mean duration per genre, ascending by mean. Rows with a null
/// duration are excluded from both numerator and denominator; genres with
/// no surviving rows are omitted.
pub fn avg_duration_by_genre(df: &DataFrame) -> KeyedSeries {
    sorted_means(mean_by_genre(df, DURATION))
}

/// View 4: mean vote count per genre, ascending by mean.
pub fn avg_votes_by_genre(df: &DataFrame) -> KeyedSeries {
    sorted_means(mean_by_genre(df, VOTING_COUNTS))
}

/// View 5: 20 equal-width bins over the observed rating range, final bin
/// right-closed, plus a KDE curve at the bin centers. A degenerate range
/// (every rating identical) collapses to a single bin.
pub fn rating_histogram(df: &DataFrame) -> RatingHistogram {
    let Some(ratings) = opt_f64(df, RATINGS) else {
        return RatingHistogram::default();
    };

    let sample: Vec<f64> = (0..ratings.len()).filter_map(|idx| ratings.get(idx)).collect();
    if sample.is_empty() {
        return RatingHistogram::default();
    }

    let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        return RatingHistogram {
            edges: vec![min, max],
            counts: vec![sample.len() as u32],
            density: gaussian_kde(&sample, &[min]),
        };
    }

    let width = (max - min) / RATING_BINS as f64;
    let edges: Vec<f64> = (0..=RATING_BINS).map(|i| min + width * i as f64).collect();

    let mut counts = vec![0u32; RATING_BINS];
    for &value in &sample {
        let bin = (((value - min) / width) as usize).min(RATING_BINS - 1);
        counts[bin] += 1;
    }

    let centers: Vec<f64> = (0..RATING_BINS)
        .map(|i| min + width * (i as f64 + 0.5))
        .collect();

    RatingHistogram {
        edges,
        counts,
        density: gaussian_kde(&sample, &centers),
    }
}

/// View 6: the highest-rated row of each genre, first occurrence winning
/// ties, projected to genre/name/rating and ordered by genre. Genres
/// whose ratings are all null are omitted.
pub fn genre_rating_leaders(df: &DataFrame) -> Result<DataFrame, AnalyticsError> {
    let projection = [GENRE, MOVIE_NAME, RATINGS];
    let (Some(genres), Some(ratings)) = (opt_str(df, GENRE), opt_f64(df, RATINGS)) else {
        return Ok(DataFrame::empty());
    };
    if !has_columns(df, &projection) {
        return Ok(DataFrame::empty());
    }

    let mut leaders: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for idx in 0..df.height() {
        let Some(rating) = ratings.get(idx) else {
            continue;
        };
        let key = genre_key(genres.get(idx)).to_string();
        match leaders.get(&key) {
            // Strict comparison keeps the earliest row on ties.
            Some(&(_, best)) if rating <= best => {}
            _ => {
                leaders.insert(key, (idx, rating));
            }
        }
    }

    let order: Vec<usize> = leaders.values().map(|&(idx, _)| idx).collect();
    take_rows(df, &order)?
        .select(projection)
        .map_err(AnalyticsError::from)
}

/// View 7: total votes per genre as pie slices whose percentages sum to
/// 100 across genres, ordered by descending vote total then genre name.
/// A zero grand total yields no slices.
pub fn vote_share_by_genre(df: &DataFrame) -> Vec<VoteShare> {
    let (Some(genres), Some(votes)) = (opt_str(df, GENRE), opt_f64(df, VOTING_COUNTS)) else {
        return Vec::new();
    };

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for idx in 0..genres.len() {
        let Some(count) = votes.get(idx) else {
            continue;
        };
        *totals
            .entry(genre_key(genres.get(idx)).to_string())
            .or_insert(0.0) += count;
    }

    let grand_total: f64 = totals.values().sum();
    if grand_total <= 0.0 {
        return Vec::new();
    }

    let mut entries: Vec<(String, f64)> = totals.into_iter().collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    entries
        .into_iter()
        .map(|(genre, total)| VoteShare {
            percent: total / grand_total * 100.0,
            genre,
            votes: total,
        })
        .collect()
}

/// View 8: the single shortest and single longest movie by duration,
/// first occurrence winning ties on both ends.
pub fn duration_extremes(df: &DataFrame) -> Result<DurationExtremes, AnalyticsError> {
    let projection = [MOVIE_NAME, GENRE, DURATION];
    let empty = || DurationExtremes {
        shortest: DataFrame::empty(),
        longest: DataFrame::empty(),
    };

    let Some(durations) = opt_f64(df, DURATION) else {
        return Ok(empty());
    };
    if !has_columns(df, &projection) {
        return Ok(empty());
    }

    let mut shortest: Option<(usize, f64)> = None;
    let mut longest: Option<(usize, f64)> = None;
    for idx in 0..durations.len() {
        let Some(minutes) = durations.get(idx) else {
            continue;
        };
        if shortest.is_none_or(|(_, best)| minutes < best) {
            shortest = Some((idx, minutes));
        }
        if longest.is_none_or(|(_, best)| minutes > best) {
            longest = Some((idx, minutes));
        }
    }

    let (Some((short_idx, _)), Some((long_idx, _))) = (shortest, longest) else {
        return Ok(empty());
    };

    Ok(DurationExtremes {
        shortest: take_rows(df, &[short_idx])?.select(projection)?,
        longest: take_rows(df, &[long_idx])?.select(projection)?,
    })
}

/// View 9: mean rating per genre keyed for a one-dimensional heatmap,
/// genre ascending. Values stay full precision; two-decimal display is a
/// presentation concern.
pub fn genre_rating_heatmap(df: &DataFrame) -> KeyedSeries {
    let mut means = mean_by_genre(df, RATINGS);
    means.sort_by(|a, b| a.0.cmp(&b.0));
    KeyedSeries::from_pairs(means)
}

/// View 10: raw (votes, rating, genre) projection of every row with both
/// numerics present, original order preserved. No aggregation.
pub fn rating_votes_scatter(df: &DataFrame) -> Result<DataFrame, AnalyticsError> {
    let projection = [VOTING_COUNTS, RATINGS, GENRE];
    let (Some(ratings), Some(votes)) = (opt_f64(df, RATINGS), opt_f64(df, VOTING_COUNTS)) else {
        return Ok(DataFrame::empty());
    };
    if !has_columns(df, &projection) {
        return Ok(DataFrame::empty());
    }

    let keep: Vec<usize> = (0..df.height())
        .filter(|&idx| ratings.get(idx).is_some() && votes.get(idx).is_some())
        .collect();

    take_rows(df, &keep)?
        .select(projection)
        .map_err(AnalyticsError::from)
}

fn opt_f64<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Float64Chunked> {
    df.column(name).ok().and_then(|column| column.f64().ok())
}

fn opt_str<'a>(df: &'a DataFrame, name: &str) -> Option<&'a StringChunked> {
    df.column(name).ok().and_then(|column| column.str().ok())
}

fn has_columns(df: &DataFrame, names: &[&str]) -> bool {
    names.iter().all(|&name| df.column(name).is_ok())
}

fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame, AnalyticsError> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    df.take(&idx).map_err(AnalyticsError::from)
}

/// Descending order over numeric-or-missing cells, nulls last.
fn rank_descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn mean_by_genre(df: &DataFrame, value_column: &str) -> Vec<(String, f64)> {
    let (Some(genres), Some(values)) = (opt_str(df, GENRE), opt_f64(df, value_column)) else {
        return Vec::new();
    };

    let mut accumulators: BTreeMap<String, (f64, u64)> = BTreeMap::new();
    for idx in 0..genres.len() {
        let Some(value) = values.get(idx) else {
            continue;
        };
        let entry = accumulators
            .entry(genre_key(genres.get(idx)).to_string())
            .or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    accumulators
        .into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

fn sorted_means(mut means: Vec<(String, f64)>) -> KeyedSeries {
    means.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    KeyedSeries::from_pairs(means)
}

/// Gaussian kernel density with the Silverman bandwidth, evaluated at the
/// given points. Bandwidth falls back to a fixed width when the sample
/// has zero spread.
fn gaussian_kde(sample: &[f64], points: &[f64]) -> Vec<f64> {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let mut bandwidth = 1.06 * variance.sqrt() * n.powf(-0.2);
    if !bandwidth.is_finite() || bandwidth <= 0.0 {
        bandwidth = 0.5;
    }

    let norm = 1.0 / (n * bandwidth * (2.0 * PI).sqrt());
    points
        .iter()
        .map(|&x| {
            sample
                .iter()
                .map(|&xi| (-0.5 * ((x - xi) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm
        })
        .collect()
}
