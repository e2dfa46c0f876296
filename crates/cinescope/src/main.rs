use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cinescope_core::views::{self, KeyedSeries};
use cinescope_core::{
    apply_filters, read_csv_dataset, table_cells, DurationBucket, FilterParams,
};
use cinescope_store::{
    DatasetCache, MovieStore, PostgresStore, StoreConfig, DEFAULT_TABLE,
};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::Table;
use polars::prelude::DataFrame;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Movie dataset ingestion and analytics over Postgres", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct StoreArgs {
    #[arg(long, env = "CINESCOPE_DB_HOST", default_value = "localhost")]
    host: String,

    #[arg(long, env = "CINESCOPE_DB_PORT", default_value_t = 5432)]
    port: u16,

    #[arg(long, env = "CINESCOPE_DB_USER", default_value = "postgres")]
    user: String,

    #[arg(long, env = "CINESCOPE_DB_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    #[arg(long, env = "CINESCOPE_DB_NAME", default_value = "imdb_movies")]
    database: String,

    #[arg(long, env = "CINESCOPE_TABLE", default_value = DEFAULT_TABLE)]
    table: String,
}

impl StoreArgs {
    fn config(&self) -> StoreConfig {
        StoreConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            table: self.table.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a CSV file, replacing the whole stored relation.
    Ingest {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print every analytical view of the stored relation.
    Report,
    /// Apply the predicate chain and print the surviving rows.
    Filter {
        #[arg(long, value_enum, default_value_t = DurationArg::All)]
        duration: DurationArg,

        #[arg(long, default_value_t = 7.0)]
        min_rating: f64,

        #[arg(long, default_value_t = 10_000)]
        min_votes: u64,

        /// Genre to keep; repeat for several. Defaults to every genre
        /// present in the dataset.
        #[arg(long = "genre")]
        genres: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DurationArg {
    #[value(name = "all")]
    All,
    #[value(name = "under-2h")]
    Under2h,
    #[value(name = "2-3h")]
    TwoToThreeH,
    #[value(name = "over-3h")]
    Over3h,
}

impl From<DurationArg> for DurationBucket {
    fn from(value: DurationArg) -> Self {
        match value {
            DurationArg::All => DurationBucket::All,
            DurationArg::Under2h => DurationBucket::Under2h,
            DurationArg::TwoToThreeH => DurationBucket::TwoToThreeH,
            DurationArg::Over3h => DurationBucket::Over3h,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.store.config();

    match cli.command {
        Command::Ingest { file } => ingest(&config, &file).await,
        Command::Report => report(&config).await,
        Command::Filter {
            duration,
            min_rating,
            min_votes,
            genres,
        } => filter(&config, duration.into(), min_rating, min_votes, genres).await,
    }
}

async fn ingest(config: &StoreConfig, file: &PathBuf) -> Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let df = read_csv_dataset(&bytes).context("upload is not parseable as CSV")?;

    let store = PostgresStore::connect(config)
        .await
        .context("failed to connect to the database")?;
    store
        .replace(&df)
        .await
        .with_context(|| format!("failed to replace relation '{}'", config.table))?;

    info!(rows = df.height(), table = %config.table, "ingestion complete");
    println!(
        "Replaced '{}' with {} rows x {} columns.",
        config.table,
        df.height(),
        df.width()
    );
    Ok(())
}

async fn load_dataset(config: &StoreConfig) -> Result<DataFrame> {
    let store = PostgresStore::connect(config)
        .await
        .context("failed to connect to the database")?;
    let mut cache = DatasetCache::new();
    let df = cache
        .get_or_load(&store)
        .await
        .with_context(|| format!("failed to load relation '{}'", config.table))?;
    Ok(df)
}

async fn report(config: &StoreConfig) -> Result<()> {
    let df = load_dataset(config).await?;

    print_frame(
        "01. Top 10 Movies by Rating and Voting Counts",
        &views::top_movies(&df)?,
    )?;
    print_series(
        "02. Genre Distribution",
        &views::genre_distribution(&df),
        0,
    );
    print_series(
        "03. Average Duration by Genre (minutes)",
        &views::avg_duration_by_genre(&df),
        1,
    );
    print_series(
        "04. Average Voting Counts by Genre",
        &views::avg_votes_by_genre(&df),
        1,
    );

    let histogram = views::rating_histogram(&df);
    println!("\n05. Rating Distribution");
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Bin", "Count", "Density"]);
    for (idx, count) in histogram.counts.iter().enumerate() {
        table.add_row(vec![
            format!("{:.2} - {:.2}", histogram.edges[idx], histogram.edges[idx + 1]),
            count.to_string(),
            format!("{:.4}", histogram.density[idx]),
        ]);
    }
    println!("{table}");

    print_frame(
        "06. Top Rated Movie in Each Genre",
        &views::genre_rating_leaders(&df)?,
    )?;

    println!("\n07. Most Popular Genres by Total Votes");
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Genre", "Votes", "Share"]);
    for slice in views::vote_share_by_genre(&df) {
        table.add_row(vec![
            slice.genre.clone(),
            format!("{:.0}", slice.votes),
            format!("{:.1}%", slice.percent),
        ]);
    }
    println!("{table}");

    let extremes = views::duration_extremes(&df)?;
    print_frame("08. Shortest Movie", &extremes.shortest)?;
    print_frame("08. Longest Movie", &extremes.longest)?;

    print_series(
        "09. Average Ratings by Genre (heatmap values)",
        &views::genre_rating_heatmap(&df),
        2,
    );

    let scatter = views::rating_votes_scatter(&df)?;
    println!(
        "\n10. Ratings vs Voting Counts: {} scatter points",
        scatter.height()
    );
    print_frame("    First points", &scatter.head(Some(15)))?;

    Ok(())
}

async fn filter(
    config: &StoreConfig,
    duration: DurationBucket,
    min_rating: f64,
    min_votes: u64,
    genres: Vec<String>,
) -> Result<()> {
    let df = load_dataset(config).await?;

    let defaults = FilterParams::defaults_for(&df);
    let genres: BTreeSet<String> = if genres.is_empty() {
        defaults.genres
    } else {
        genres.into_iter().collect()
    };
    let params = FilterParams {
        duration,
        min_rating,
        min_votes,
        genres,
    };

    let filtered = apply_filters(&df, &params)?;
    println!(
        "Duration: {} | Rating >= {} | Votes >= {} | {} genre(s) selected",
        params.duration.label(),
        params.min_rating,
        params.min_votes,
        params.genres.len()
    );
    print_frame("Filtered Movies", &filtered)?;
    println!("{} of {} rows match.", filtered.height(), df.height());
    Ok(())
}

fn print_frame(title: &str, df: &DataFrame) -> Result<()> {
    let (names, rows) = table_cells(df)?;

    println!("\n{title}");
    if names.is_empty() {
        println!("(no data)");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(names);
    for row in rows {
        table.add_row(
            row.into_iter()
                .map(|cell| cell.unwrap_or_else(|| "-".to_string())),
        );
    }
    println!("{table}");
    Ok(())
}

fn print_series(title: &str, series: &KeyedSeries, decimals: usize) {
    println!("\n{title}");
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Key", "Value"]);
    for (key, value) in series.iter() {
        table.add_row(vec![key.to_string(), format!("{value:.decimals$}")]);
    }
    println!("{table}");
}
