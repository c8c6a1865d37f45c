//! Streaming ingestion of the tabular song corpus
//!
//! The corpus is addressed by column name, not by a fixed schema: which
//! columns hold the release date and the lyrics is a configuration input.
//! This module resolves those names against the header row once, then
//! reduces every row to a strongly typed [`SongRecord`] so that the rest of
//! the pipeline never touches a dynamic record shape.

use crate::config::Config;
use async_compression::tokio::bufread::GzipDecoder;
use csv_async::{AsyncReaderBuilder, StringRecord};
use futures::stream::{Stream, StreamExt};
use std::{path::PathBuf, pin::Pin};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncRead, BufReader},
};

/// One row of the input corpus, reduced to the fields the pipeline consumes
///
/// Produced by [`SongCorpus`], consumed exactly once by the aggregation
/// pass, and not retained afterwards.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SongRecord {
    /// Free-text release date, if the cell is present and non-empty
    pub release_date: Option<Box<str>>,

    /// Free-text lyrics, if the cell is present and non-empty
    pub lyrics: Option<Box<str>>,
}

/// Fatal corpus ingestion failures
///
/// Missing or empty date/lyrics cells within an otherwise well-formed row
/// are not failures: they become `None` fields of [`SongRecord`]. Only a
/// source that cannot be opened or read, or whose structural shape is
/// unreadable, aborts the run.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The input file cannot be opened
    #[error("cannot open corpus {path:?}: {source}")]
    SourceUnavailable {
        /// Offending input path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A configured column is absent from the corpus header row
    #[error("column {0:?} not found in corpus header")]
    MissingColumn(Box<str>),

    /// The row stream is structurally unreadable past this point
    #[error("malformed corpus row #{row}: {source}")]
    MalformedRow {
        /// 1-based index of the offending row (0 for the header)
        row: u64,
        /// Underlying CSV decoding failure
        #[source]
        source: csv_async::Error,
    },
}

/// Stream of raw corpus rows, type-erased over the input byte source
type RecordStream = Pin<Box<dyn Stream<Item = Result<StringRecord, csv_async::Error>> + Send>>;

/// Single-pass chunked reader over the song corpus
///
/// Yields bounded batches of [`SongRecord`]s so that corpora larger than
/// memory can be processed. A reader cannot be rewound mid-run; open a fresh
/// one to re-scan the corpus.
pub struct SongCorpus {
    /// Remaining raw corpus rows
    records: RecordStream,

    /// Position of the release date column in each row
    date_idx: usize,

    /// Position of the lyrics column in each row
    lyrics_idx: usize,

    /// Maximum number of records per yielded chunk
    chunk_size: usize,

    /// Number of rows pulled from the corpus so far
    rows_read: u64,
}
//
impl SongCorpus {
    /// Open the corpus and resolve the configured columns against its header
    pub async fn open(config: &Config) -> Result<Self, CorpusError> {
        // Open the input file, transparently decompressing gzipped corpora
        let file = File::open(&config.input)
            .await
            .map_err(|source| CorpusError::SourceUnavailable {
                path: config.input.clone(),
                source,
            })?;
        let buffered = BufReader::new(file);
        let bytes: Box<dyn AsyncRead + Send + Unpin> =
            if config.input.extension().is_some_and(|ext| ext == "gz") {
                Box::new(GzipDecoder::new(buffered))
            } else {
                Box::new(buffered)
            };

        // Apply CSV decoding to the uncompressed bytes
        //
        // Rows with missing trailing cells are tolerated (the cells become
        // absent fields); anything worse is a structural error.
        let mut reader = AsyncReaderBuilder::new().flexible(true).create_reader(bytes);

        // Resolve configured column names against the header row
        let headers = reader
            .headers()
            .await
            .map_err(|source| CorpusError::MalformedRow { row: 0, source })?;
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| CorpusError::MissingColumn(name.into()))
        };
        let date_idx = column(&config.date_column)?;
        let lyrics_idx = column(&config.lyrics_column)?;

        Ok(Self {
            records: Box::pin(reader.into_records()),
            date_idx,
            lyrics_idx,
            chunk_size: config.chunk_size.get(),
            rows_read: 0,
        })
    }

    /// Pull the next batch of at most `chunk_size` records
    ///
    /// Returns `None` once the corpus is exhausted. Any decoding error
    /// aborts the scan; there is no best-effort continuation across a
    /// structurally broken source.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<SongRecord>>, CorpusError> {
        let mut chunk = Vec::with_capacity(self.chunk_size);
        while let Some(record) = self.records.next().await {
            self.rows_read += 1;
            let record = record.map_err(|source| CorpusError::MalformedRow {
                row: self.rows_read,
                source,
            })?;
            chunk.push(self.song(&record));
            if chunk.len() == self.chunk_size {
                break;
            }
        }
        Ok((!chunk.is_empty()).then_some(chunk))
    }

    /// Number of corpus rows pulled so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Reduce a raw row to the fields of interest
    ///
    /// Missing and empty cells both map to absent fields.
    fn song(&self, record: &StringRecord) -> SongRecord {
        let cell = |idx: usize| {
            record
                .get(idx)
                .filter(|cell| !cell.is_empty())
                .map(Box::from)
        };
        SongRecord {
            release_date: cell(self.date_idx),
            lyrics: cell(self.lyrics_idx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        num::{NonZeroU64, NonZeroUsize},
        path::Path,
        sync::Arc,
    };
    use tempfile::TempDir;

    fn test_config(dir: &Path, chunk_size: usize) -> Arc<Config> {
        Arc::new(Config {
            input: dir.join("corpus.csv"),
            output: dir.join("rhyme_database.sqlite"),
            date_column: "Release Date".into(),
            lyrics_column: "text".into(),
            chunk_size: NonZeroUsize::new(chunk_size).expect("test chunk size should be nonzero"),
            min_frequency: NonZeroU64::new(3).expect("test cutoff should be nonzero"),
            min_year: 2016,
        })
    }

    fn write_corpus(config: &Config, contents: &str) {
        std::fs::write(&config.input, contents).expect("writing the test corpus should succeed");
    }

    #[tokio::test]
    async fn maps_configured_columns() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), 10);
        write_corpus(
            &config,
            "id,Release Date,text\n1,29th July 2022,hello world\n2,,no date here\n",
        );

        let mut corpus = SongCorpus::open(&config).await.unwrap();
        let chunk = corpus.next_chunk().await.unwrap().unwrap();
        assert_eq!(
            chunk,
            vec![
                SongRecord {
                    release_date: Some("29th July 2022".into()),
                    lyrics: Some("hello world".into()),
                },
                SongRecord {
                    release_date: None,
                    lyrics: Some("no date here".into()),
                },
            ]
        );
        assert_eq!(corpus.next_chunk().await.unwrap(), None);
        assert_eq!(corpus.rows_read(), 2);
    }

    #[tokio::test]
    async fn chunks_are_bounded() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), 2);
        write_corpus(
            &config,
            "Release Date,text\n2020,a\n2020,b\n2020,c\n2020,d\n2020,e\n",
        );

        let mut corpus = SongCorpus::open(&config).await.unwrap();
        let mut sizes = Vec::new();
        while let Some(chunk) = corpus.next_chunk().await.unwrap() {
            sizes.push(chunk.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(corpus.rows_read(), 5);
    }

    #[tokio::test]
    async fn short_rows_become_absent_fields() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), 10);
        write_corpus(&config, "id,Release Date,text\n1,2020\n");

        let mut corpus = SongCorpus::open(&config).await.unwrap();
        let chunk = corpus.next_chunk().await.unwrap().unwrap();
        assert_eq!(
            chunk,
            vec![SongRecord {
                release_date: Some("2020".into()),
                lyrics: None,
            }]
        );
    }

    #[tokio::test]
    async fn undecodable_rows_are_fatal() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), 10);
        std::fs::write(&config.input, b"Release Date,text\n2020,\xff\xfe\n")
            .expect("writing the test corpus should succeed");

        let mut corpus = SongCorpus::open(&config).await.unwrap();
        match corpus.next_chunk().await {
            Err(CorpusError::MalformedRow { row: 1, .. }) => {}
            other => panic!("expected a malformed row error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_column_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), 10);
        write_corpus(&config, "id,date,lyrics\n1,2020,hello\n");

        match SongCorpus::open(&config).await.map(|_corpus| ()) {
            Err(CorpusError::MissingColumn(name)) => assert_eq!(&*name, "Release Date"),
            other => panic!("expected a missing column error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_source_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), 10);

        assert!(matches!(
            SongCorpus::open(&config).await,
            Err(CorpusError::SourceUnavailable { .. })
        ));
    }
}
