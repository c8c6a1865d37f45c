//! Corpus-to-index pipeline entry point: stream the song corpus, aggregate
//! rhyme statistics, then build and publish the indexed artifact.

use anyhow::Context;
use log::LevelFilter;
use rhymebase::{
    config::{Args, Config},
    corpus::SongCorpus,
    db,
    progress::ProgressReport,
    stats::RhymeStats,
    Result,
};
use tokio::io::{AsyncWriteExt, BufWriter};

#[tokio::main]
async fn main() -> Result<()> {
    // Set up logging
    setup_logging().map_err(|e| anyhow::format_err!("{e}"))?;

    // Decode CLI arguments
    let args = Args::parse_and_check()?;
    let config = Config::new(args);

    // Set up progress reporting
    let report = ProgressReport::new();
    let rows = report.add_counter("Scanning corpus rows");

    // Stream the corpus and aggregate rhyme statistics, one chunk at a time
    let mut corpus = SongCorpus::open(&config)
        .await
        .context("opening the input corpus")?;
    let mut stats = RhymeStats::new(config.clone());
    let mut chunk_idx = 0u64;
    while let Some(chunk) = corpus
        .next_chunk()
        .await
        .context("reading the input corpus")?
    {
        chunk_idx += 1;
        let chunk_rows = chunk.len() as u64;
        let (songs, occurrences) = stats.add_chunk(chunk);
        rows.inc(chunk_rows);
        log::debug!("Chunk {chunk_idx}: accepted {songs} songs totaling {occurrences} words");
    }
    rows.finish();

    // Build and publish the artifact
    let summary = db::build(&config, &stats)
        .await
        .context("building the rhyme database")?;

    // Report the run on stdout
    {
        let stdout = tokio::io::stdout();
        let mut stdout = BufWriter::new(stdout);
        let lines = format!(
            "Corpus rows scanned:    {}\n\
             Songs accepted ({}+):   {}\n\
             Words extracted:        {}\n\
             Unique words kept (frequency >= {}): {}\n\
             Artifact: {} ({} bytes)\n",
            corpus.rows_read(),
            config.min_year,
            stats.songs_accepted(),
            stats.words_extracted(),
            config.min_frequency,
            summary.unique_words,
            config.output.display(),
            summary.artifact_bytes,
        );
        stdout.write_all(lines.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Set up logging
fn setup_logging() -> syslog::Result<()> {
    syslog::init(
        syslog::Facility::LOG_USER,
        if cfg!(feature = "log-trace") {
            LevelFilter::Trace
        } else if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        None,
    )
}
