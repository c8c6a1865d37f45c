//! Construction of the persisted rhyme database artifact
//!
//! The artifact is a self-contained SQLite file with three tables: one row
//! per surviving word (with its precomputed 2-4 character endings), one row
//! per (pattern, word) membership, and a metadata snapshot describing the
//! run. Equality indexes over the endings, the frequency and the patterns
//! are read-path optimizations for the consuming application; their absence
//! would change query cost, never query results.

use crate::{config::Config, stats::RhymeStats, words};
use rayon::prelude::*;
use sqlx::{sqlite::SqlitePoolOptions, QueryBuilder, Sqlite, SqlitePool};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Artifact schema version recorded in the metadata table
pub const ARTIFACT_VERSION: &str = "1.0";

/// Rows per batched INSERT statement
///
/// Keeps every statement comfortably below SQLite's bound parameter limit.
const INSERT_BATCH: usize = 500;

/// Fatal artifact construction failures
///
/// Either way the run aborts without publishing anything: the artifact only
/// ever appears at its destination path once it is fully written.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The staged artifact cannot be created or written
    #[error("cannot write artifact for {path:?}: {source}")]
    DestinationWriteFailure {
        /// Destination artifact path
        path: PathBuf,
        /// Underlying database failure
        #[source]
        source: sqlx::Error,
    },

    /// The finished artifact cannot be moved to its destination
    #[error("cannot publish artifact {path:?}: {source}")]
    PublishFailure {
        /// Destination artifact path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A staging leftover from an earlier aborted run cannot be removed
    #[error("cannot discard stale staging file {path:?}: {source}")]
    StaleStagingFailure {
        /// Staging file path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a successful artifact build
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BuildSummary {
    /// Unique words that survived the frequency cutoff
    pub unique_words: usize,

    /// Size of the published artifact in bytes
    pub artifact_bytes: u64,
}

/// Build the indexed artifact from the final aggregated statistics
///
/// The database is staged at "<output>.partial" and renamed over the
/// destination once fully written, so a failed run never leaves behind
/// something that could be mistaken for a complete artifact. Any prior
/// artifact at the destination is replaced wholesale, never merged into.
pub async fn build(config: &Config, stats: &RhymeStats) -> Result<BuildSummary, ArtifactError> {
    let staging = staging_path(&config.output);
    remove_stale(&staging)?;

    let write_failure = |source| ArtifactError::DestinationWriteFailure {
        path: config.output.clone(),
        source,
    };
    let pool = connect(&staging).await.map_err(&write_failure)?;
    let written = write_artifact(config, stats, &pool).await;
    pool.close().await;
    let unique_words = match written {
        Ok(unique_words) => unique_words,
        Err(source) => {
            // Leave no half-written file behind
            let _ = std::fs::remove_file(&staging);
            return Err(write_failure(source));
        }
    };

    std::fs::rename(&staging, &config.output).map_err(|source| ArtifactError::PublishFailure {
        path: config.output.clone(),
        source,
    })?;
    let artifact_bytes = std::fs::metadata(&config.output)
        .map_err(|source| ArtifactError::PublishFailure {
            path: config.output.clone(),
            source,
        })?
        .len();
    log::info!(
        "Published rhyme database {:?} with {unique_words} words ({artifact_bytes} bytes)",
        config.output
    );
    Ok(BuildSummary {
        unique_words,
        artifact_bytes,
    })
}

/// Write schema, data, indexes and metadata into the staged database
///
/// Returns the number of surviving words. Everything happens inside one
/// transaction, with the metadata snapshot written last.
async fn write_artifact(
    config: &Config,
    stats: &RhymeStats,
    pool: &SqlitePool,
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // Artifact schema
    for statement in [
        "CREATE TABLE words (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            word TEXT UNIQUE NOT NULL,
            frequency INTEGER NOT NULL,
            ending_2 TEXT,
            ending_3 TEXT,
            ending_4 TEXT
        )",
        "CREATE TABLE rhyme_patterns (
            pattern TEXT NOT NULL,
            word TEXT NOT NULL,
            pattern_length INTEGER NOT NULL,
            PRIMARY KEY (pattern, word)
        )",
        "CREATE TABLE metadata (
            key TEXT PRIMARY KEY,
            value TEXT
        )",
    ] {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    // Apply the frequency cutoff, then fix a deterministic output order so
    // that re-running on an unchanged corpus reproduces the tables exactly
    let min_frequency = config.min_frequency.get();
    let mut survivors = (stats.word_counts().iter())
        .filter(|(_word, &count)| count >= min_frequency)
        .map(|(word, &count)| (&**word, count))
        .collect::<Vec<_>>();
    survivors.par_sort_unstable_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));
    log::info!(
        "Frequency cutoff ({min_frequency}+) kept {} of {} unique words",
        survivors.len(),
        stats.word_counts().len()
    );

    // One row per surviving word, endings nullable by length
    for batch in survivors.chunks(INSERT_BATCH) {
        let mut insert = QueryBuilder::<Sqlite>::new(
            "INSERT INTO words (word, frequency, ending_2, ending_3, ending_4) ",
        );
        insert.push_values(batch, |mut row, (word, count)| {
            row.push_bind(*word)
                .push_bind(*count as i64)
                .push_bind(words::ending(word, 2))
                .push_bind(words::ending(word, 3))
                .push_bind(words::ending(word, 4));
        });
        insert.build().execute(&mut *tx).await?;
    }

    // Pattern membership is re-derived from the survivors: a pattern whose
    // members were all cut is simply absent from the artifact
    let pattern_rows = (survivors.iter())
        .flat_map(|(word, _count)| words::suffix_patterns(word).map(move |pattern| (pattern, *word)))
        .collect::<Vec<_>>();
    for batch in pattern_rows.chunks(INSERT_BATCH) {
        let mut insert =
            QueryBuilder::<Sqlite>::new("INSERT INTO rhyme_patterns (pattern, word, pattern_length) ");
        insert.push_values(batch, |mut row, (pattern, word)| {
            row.push_bind(*pattern)
                .push_bind(*word)
                .push_bind(pattern.len() as i64);
        });
        insert.build().execute(&mut *tx).await?;
    }

    // Read-path indexes for the consuming application
    for statement in [
        "CREATE INDEX idx_ending_2 ON words(ending_2)",
        "CREATE INDEX idx_ending_3 ON words(ending_3)",
        "CREATE INDEX idx_ending_4 ON words(ending_4)",
        "CREATE INDEX idx_frequency ON words(frequency DESC)",
        "CREATE INDEX idx_pattern ON rhyme_patterns(pattern)",
        "CREATE INDEX idx_pattern_length ON rhyme_patterns(pattern_length)",
    ] {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    // One metadata snapshot per artifact, written after everything else
    for (key, value) in [
        ("created_date", chrono::Utc::now().to_rfc3339()),
        (
            "total_songs_processed",
            stats.songs_accepted().to_string(),
        ),
        (
            "total_words_extracted",
            stats.words_extracted().to_string(),
        ),
        ("unique_words", survivors.len().to_string()),
        ("min_frequency", min_frequency.to_string()),
        ("year_filter", format!("{}+", config.min_year)),
        ("version", ARTIFACT_VERSION.to_owned()),
    ] {
        sqlx::query("INSERT INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(survivors.len())
}

/// Open a single-writer connection pool onto the staged database file
async fn connect(staging: &Path) -> Result<SqlitePool, sqlx::Error> {
    let db_url = format!("sqlite://{}?mode=rwc", staging.display());
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await
}

/// Staging location next to the destination artifact
fn staging_path(output: &Path) -> PathBuf {
    let mut staged = output.as_os_str().to_owned();
    staged.push(".partial");
    PathBuf::from(staged)
}

/// Discard a staging leftover from a previously aborted run
fn remove_stale(staging: &Path) -> Result<(), ArtifactError> {
    match std::fs::remove_file(staging) {
        Ok(()) => {
            log::warn!("Discarded stale staging file {staging:?} from an aborted run");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ArtifactError::StaleStagingFailure {
            path: staging.to_owned(),
            source,
        }),
    }
}
