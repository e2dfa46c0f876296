use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cinescope_core::views::{self, KeyedSeries, RatingHistogram, VoteShare};
use cinescope_core::{
    apply_filters, read_csv_dataset, AnalyticsError, DurationBucket, FilterParams,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;

type ApiError = (StatusCode, String);

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub csv_text: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub rows: usize,
    pub columns: usize,
}

/// Parses the uploaded CSV and replaces the stored relation with it.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let df = read_csv_dataset(payload.csv_text.as_bytes())
        .map_err(|err| (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()))?;

    state.replace(&df).await.map_err(|err| {
        tracing::error!("upload failed: {err}");
        (StatusCode::BAD_GATEWAY, err.to_string())
    })?;

    Ok(Json(UploadResponse {
        rows: df.height(),
        columns: df.width(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ExtremesResponse {
    pub shortest: Vec<Value>,
    pub longest: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub top_movies: Vec<Value>,
    pub genre_distribution: KeyedSeries,
    pub avg_duration_by_genre: KeyedSeries,
    pub avg_votes_by_genre: KeyedSeries,
    pub rating_histogram: RatingHistogram,
    pub genre_rating_leaders: Vec<Value>,
    pub vote_share_by_genre: Vec<VoteShare>,
    pub duration_extremes: ExtremesResponse,
    pub genre_rating_heatmap: KeyedSeries,
    pub rating_votes_scatter: Vec<Value>,
}

/// Computes all ten views over the session dataset.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let df = state.dataset().await.map_err(internal)?;

    let extremes = views::duration_extremes(&df).map_err(internal)?;
    let response = DashboardResponse {
        top_movies: table_rows(&views::top_movies(&df).map_err(internal)?).map_err(internal)?,
        genre_distribution: views::genre_distribution(&df),
        avg_duration_by_genre: views::avg_duration_by_genre(&df),
        avg_votes_by_genre: views::avg_votes_by_genre(&df),
        rating_histogram: views::rating_histogram(&df),
        genre_rating_leaders: table_rows(&views::genre_rating_leaders(&df).map_err(internal)?)
            .map_err(internal)?,
        vote_share_by_genre: views::vote_share_by_genre(&df),
        duration_extremes: ExtremesResponse {
            shortest: table_rows(&extremes.shortest).map_err(internal)?,
            longest: table_rows(&extremes.longest).map_err(internal)?,
        },
        genre_rating_heatmap: views::genre_rating_heatmap(&df),
        rating_votes_scatter: table_rows(&views::rating_votes_scatter(&df).map_err(internal)?)
            .map_err(internal)?,
    };

    Ok(Json(response))
}

/// Filter controls; absent fields fall back to the load-time defaults.
#[derive(Debug, Default, Deserialize)]
pub struct FilterRequest {
    pub duration: Option<DurationBucket>,
    pub min_rating: Option<f64>,
    pub min_votes: Option<u64>,
    pub genres: Option<BTreeSet<String>>,
}

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub params: FilterParams,
    pub rows: Vec<Value>,
}

/// Reapplies the whole predicate chain and returns the surviving rows.
pub async fn filter_rows(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FilterRequest>,
) -> Result<Json<FilterResponse>, ApiError> {
    let df = state.dataset().await.map_err(internal)?;

    let defaults = FilterParams::defaults_for(&df);
    let params = FilterParams {
        duration: request.duration.unwrap_or(defaults.duration),
        min_rating: request.min_rating.unwrap_or(defaults.min_rating),
        min_votes: request.min_votes.unwrap_or(defaults.min_votes),
        genres: request.genres.unwrap_or(defaults.genres),
    };

    let filtered = apply_filters(&df, &params).map_err(internal)?;
    let rows = table_rows(&filtered).map_err(internal)?;

    Ok(Json(FilterResponse { params, rows }))
}

fn internal(err: impl std::fmt::Display) -> ApiError {
    tracing::error!("request failed: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// One JSON object per row; numeric columns stay numbers, everything else
/// is rendered as text, nulls stay null.
fn table_rows(df: &DataFrame) -> Result<Vec<Value>, AnalyticsError> {
    let mut rows = vec![serde_json::Map::new(); df.height()];

    for column in df.get_columns() {
        let name = column.name().to_string();
        match column.dtype() {
            DataType::Float64 => {
                let cells = column.f64()?;
                for (idx, row) in rows.iter_mut().enumerate() {
                    let value = cells.get(idx).map(Value::from).unwrap_or(Value::Null);
                    row.insert(name.clone(), value);
                }
            }
            _ => {
                let casted = column.cast(&DataType::String)?;
                let cells = casted.str()?;
                for (idx, row) in rows.iter_mut().enumerate() {
                    let value = cells
                        .get(idx)
                        .map(|text| Value::String(text.to_string()))
                        .unwrap_or(Value::Null);
                    row.insert(name.clone(), value);
                }
            }
        }
    }

    Ok(rows.into_iter().map(Value::Object).collect())
}
