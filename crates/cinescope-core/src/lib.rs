pub mod error;
pub mod filter;
pub mod normalize;
pub mod schema;
pub mod tabular;
pub mod views;

pub use error::AnalyticsError;
pub use filter::{apply_filters, distinct_genres, DurationBucket, FilterParams};
pub use normalize::normalize_numeric_columns;
pub use tabular::{read_csv_dataset, table_cells};
pub use views::KeyedSeries;
