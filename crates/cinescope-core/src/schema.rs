//! Column names of the movie relation and the genre key convention.

/// Title of the movie, free text.
pub const MOVIE_NAME: &str = "Movie name";
/// Categorical genre value, one per row.
pub const GENRE: &str = "Genre";
/// Rating on the 0-10 scale. Range is assumed, not enforced.
pub const RATINGS: &str = "Ratings";
/// Non-negative vote tally.
pub const VOTING_COUNTS: &str = "Voting counts";
/// Runtime in minutes.
pub const DURATION: &str = "Duration";

/// Columns coerced to numeric by the normalizer before any view runs.
pub const NUMERIC_COLUMNS: [&str; 3] = [RATINGS, VOTING_COUNTS, DURATION];

/// Explicit category for rows whose genre cell is null or blank.
pub const GENRE_NONE: &str = "(none)";

/// Maps a raw genre cell to its grouping key. Null and blank cells become
/// [`GENRE_NONE`] so they survive as their own category instead of being
/// dropped from genre aggregates.
pub fn genre_key(raw: Option<&str>) -> &str {
    match raw {
        Some(value) if !value.trim().is_empty() => value,
        _ => GENRE_NONE,
    }
}
