//! Processing pipeline configuration

use crate::{date, Result, Year};
use clap::Parser;
use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    sync::Arc,
};

/// Turn a tabular song lyrics corpus into an indexed rhyme database
///
/// The input corpus is scanned once, in bounded-memory chunks. Songs outside
/// the recency window and words below the frequency cutoff never reach the
/// output artifact.
#[derive(Parser, Debug)]
#[command(version, author)]
pub struct Args {
    /// Path to the input corpus (CSV, optionally gzip-compressed)
    ///
    /// The corpus must carry a header row that names at least the release
    /// date column and the lyrics column.
    pub input: PathBuf,

    /// Path where the rhyme database artifact is written
    ///
    /// Any existing artifact at this path is fully replaced on success; runs
    /// never append to or merge with a prior artifact.
    #[arg(short, long, default_value = "rhyme_database.sqlite")]
    pub output: PathBuf,

    /// Name of the free-text release date column
    #[arg(long, default_value = "Release Date")]
    pub date_column: String,

    /// Name of the free-text lyrics column
    #[arg(long, default_value = "text")]
    pub lyrics_column: String,

    /// Number of corpus rows per in-memory chunk
    ///
    /// The corpus is streamed in chunks of this many rows so that corpora
    /// too large to hold in memory can still be processed. The chunk size is
    /// a performance tunable only: final word counts and pattern memberships
    /// are identical for any chunking of the same corpus.
    #[arg(long, default_value = "5000")]
    pub chunk_size: NonZeroUsize,

    /// Minimum accepted word occurrence count
    ///
    /// Words that occur fewer times across all accepted songs are noise
    /// rather than rhyme candidates, so they are dropped from the output
    /// artifact. This is the only place where low-signal words are removed;
    /// the aggregation pass itself retains everything.
    #[arg(short = 'm', long, default_value = "3")]
    pub min_frequency: NonZeroU64,

    /// Minimum accepted release year
    ///
    /// The rhyme database targets current vocabulary, so songs released
    /// before this year are excluded entirely. Songs whose release date
    /// contains no extractable year are excluded as well.
    #[arg(short = 'y', long, default_value = "2016")]
    pub min_year: Year,
}
//
impl Args {
    /// Decode and validate CLI arguments
    pub fn parse_and_check() -> Result<Self> {
        // Decode CLI arguments
        let args = Args::parse();

        // Check CLI arguments for basic sanity
        anyhow::ensure!(
            args.min_year <= date::MAX_EXTRACTABLE_YEAR,
            "requested minimum release year excludes every extractable year"
        );
        anyhow::ensure!(
            args.date_column != args.lyrics_column,
            "the release date column and the lyrics column must differ"
        );
        Ok(args)
    }
}

/// Final process configuration
///
/// This is the digested form of [`Args`] that all pipeline stages share.
/// Please refer to [`Args`] to know more about individual fields.
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub date_column: Box<str>,
    pub lyrics_column: Box<str>,
    pub chunk_size: NonZeroUsize,
    pub min_frequency: NonZeroU64,
    pub min_year: Year,
}
//
impl Config {
    /// Determine process configuration from decoded CLI arguments
    pub fn new(args: Args) -> Arc<Self> {
        let Args {
            input,
            output,
            date_column,
            lyrics_column,
            chunk_size,
            min_frequency,
            min_year,
        } = args;
        Arc::new(Self {
            input,
            output,
            date_column: date_column.into(),
            lyrics_column: lyrics_column.into(),
            chunk_size,
            min_frequency,
            min_year,
        })
    }
}
