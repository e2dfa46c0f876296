//! The interactive filter chain.
//!
//! Four independent predicates combined by logical AND over one pass of
//! the frame. The result is always a stable row-subset: original column
//! set, original row order, recomputed in full from the parameters.

use std::collections::BTreeSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::schema::{genre_key, DURATION, GENRE, RATINGS, VOTING_COUNTS};

pub const DEFAULT_MIN_RATING: f64 = 7.0;
pub const DEFAULT_MIN_VOTES: u64 = 10_000;

/// Runtime bucket selector. `All` is a no-op and is the only bucket a row
/// with a missing duration can pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationBucket {
    #[default]
    All,
    /// Duration < 120 minutes.
    Under2h,
    /// 120 <= Duration <= 180 minutes.
    TwoToThreeH,
    /// Duration > 180 minutes.
    Over3h,
}

impl DurationBucket {
    pub fn admits(&self, duration: Option<f64>) -> bool {
        match self {
            DurationBucket::All => true,
            DurationBucket::Under2h => matches!(duration, Some(minutes) if minutes < 120.0),
            DurationBucket::TwoToThreeH => {
                matches!(duration, Some(minutes) if (120.0..=180.0).contains(&minutes))
            }
            DurationBucket::Over3h => matches!(duration, Some(minutes) if minutes > 180.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DurationBucket::All => "All",
            DurationBucket::Under2h => "< 2 hours",
            DurationBucket::TwoToThreeH => "2-3 hours",
            DurationBucket::Over3h => "> 3 hours",
        }
    }
}

/// Current filter-control state. A pure value: applying the same params
/// to the same frame always yields the same subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub duration: DurationBucket,
    pub min_rating: f64,
    pub min_votes: u64,
    /// Selected genre keys. The selectable universe is fixed at load time.
    pub genres: BTreeSet<String>,
}

impl FilterParams {
    /// Control defaults: every predicate a no-op except the rating and
    /// vote thresholds, with the genre universe taken from the loaded
    /// frame.
    pub fn defaults_for(df: &DataFrame) -> Self {
        Self {
            duration: DurationBucket::All,
            min_rating: DEFAULT_MIN_RATING,
            min_votes: DEFAULT_MIN_VOTES,
            genres: distinct_genres(df),
        }
    }
}

/// Distinct genre keys present in the frame, blank cells mapped to their
/// explicit category.
pub fn distinct_genres(df: &DataFrame) -> BTreeSet<String> {
    let Ok(column) = df.column(GENRE) else {
        return BTreeSet::new();
    };
    let Ok(genres) = column.str() else {
        return BTreeSet::new();
    };
    (0..genres.len())
        .map(|idx| genre_key(genres.get(idx)).to_string())
        .collect()
}

/// Applies the four predicates in one pass and returns the surviving
/// row-subset. Missing ratings, votes, or durations never satisfy their
/// respective comparison.
pub fn apply_filters(df: &DataFrame, params: &FilterParams) -> Result<DataFrame, AnalyticsError> {
    let height = df.height();
    if height == 0 {
        return Ok(df.clone());
    }

    let durations = df.column(DURATION).ok().and_then(|c| c.f64().ok());
    let ratings = df.column(RATINGS).ok().and_then(|c| c.f64().ok());
    let votes = df.column(VOTING_COUNTS).ok().and_then(|c| c.f64().ok());
    let genres = df.column(GENRE).ok().and_then(|c| c.str().ok());

    let min_votes = params.min_votes as f64;
    let mut keep = Vec::with_capacity(height);
    for idx in 0..height {
        let duration = durations.and_then(|cells| cells.get(idx));
        let rating = ratings.and_then(|cells| cells.get(idx));
        let vote_count = votes.and_then(|cells| cells.get(idx));
        let genre = genres.and_then(|cells| cells.get(idx));

        let admitted = params.duration.admits(duration)
            && rating.is_some_and(|value| value >= params.min_rating)
            && vote_count.is_some_and(|value| value >= min_votes)
            && params.genres.contains(genre_key(genre));
        keep.push(admitted);
    }

    let mask = BooleanChunked::from_slice("mask".into(), &keep);
    df.filter(&mask).map_err(AnalyticsError::from)
}
