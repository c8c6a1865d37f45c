//! Corpus-wide rhyme statistics accumulation
//!
//! One [`RhymeStats`] accumulator exists per pipeline run. It is exclusively
//! owned by the aggregation pass: nothing mutates it from outside, and the
//! index builder only reads the final state. Chunk contributions are
//! commutative (frequency is a sum, pattern membership is a union), so the
//! same corpus yields the same final statistics for any chunking and any
//! processing order.

use crate::{config::Config, corpus::SongRecord, date, words, Word, Year};
use rayon::prelude::*;
use std::{
    collections::{hash_map, HashMap, HashSet},
    sync::Arc,
};

/// Occurrence count per normalized word
///
/// Counts only ever increase while the corpus is being scanned; the minimum
/// frequency cutoff is applied later, by the index builder.
pub type WordCounts = HashMap<Word, u64>;

/// Words grouped by each of their own 2-4 character endings
///
/// Set semantics: a word appears at most once per pattern no matter how
/// often it occurs, and only under patterns derived from its own suffix.
pub type PatternIndex = HashMap<Box<str>, HashSet<Word>>;

/// Cumulative rhyme statistics over the accepted part of the corpus
#[derive(Debug)]
pub struct RhymeStats {
    /// Data collection configuration
    config: Arc<Config>,

    /// Songs that passed both the year filter and the has-usable-lyrics rule
    songs_accepted: u64,

    /// Total word occurrences across all accepted songs
    words_extracted: u64,

    /// Per-word occurrence counts
    word_counts: WordCounts,

    /// Rhyme pattern membership
    patterns: PatternIndex,
}
//
impl RhymeStats {
    /// Set up the accumulator
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            songs_accepted: 0,
            words_extracted: 0,
            word_counts: WordCounts::new(),
            patterns: PatternIndex::new(),
        }
    }

    /// Integrate one chunk of corpus records
    ///
    /// Returns how many songs were accepted and how many word occurrences
    /// were extracted from this chunk. Records are normalized in parallel;
    /// the subsequent reduction into the shared tables is sequential, which
    /// keeps the outcome deterministic.
    pub fn add_chunk(&mut self, chunk: Vec<SongRecord>) -> (u64, u64) {
        let min_year = self.config.min_year;
        let accepted_songs = chunk
            .par_iter()
            .filter_map(|record| song_words(record, min_year))
            .collect::<Vec<_>>();

        let mut songs = 0;
        let mut occurrences = 0;
        for song in accepted_songs {
            songs += 1;
            occurrences += song.len() as u64;
            for word in song {
                self.add_word(word);
            }
        }
        self.songs_accepted += songs;
        self.words_extracted += occurrences;
        (songs, occurrences)
    }

    /// Merge statistics accumulated by another shard
    ///
    /// Frequency counts are commutative sums and pattern membership is a
    /// commutative union, so shard merge order never changes the outcome.
    /// Both shards must have been built with the same configuration.
    pub fn merge(&mut self, other: Self) {
        debug_assert_eq!(
            self.config, other.config,
            "merged shards should share one configuration"
        );
        self.songs_accepted += other.songs_accepted;
        self.words_extracted += other.words_extracted;
        for (word, count) in other.word_counts {
            *self.word_counts.entry(word).or_insert(0) += count;
        }
        for (pattern, other_words) in other.patterns {
            match self.patterns.entry(pattern) {
                hash_map::Entry::Occupied(o) => o.into_mut().extend(other_words),
                hash_map::Entry::Vacant(v) => {
                    v.insert(other_words);
                }
            }
        }
    }

    /// Record one occurrence of a normalized word
    fn add_word(&mut self, word: Word) {
        for pattern in words::suffix_patterns(&word) {
            if let Some(members) = self.patterns.get_mut(pattern) {
                members.insert(word.clone());
            } else {
                self.patterns
                    .insert(pattern.into(), std::iter::once(word.clone()).collect());
            }
        }
        *self.word_counts.entry(word).or_insert(0) += 1;
    }

    /// Number of accepted songs so far
    pub fn songs_accepted(&self) -> u64 {
        self.songs_accepted
    }

    /// Number of word occurrences extracted so far
    pub fn words_extracted(&self) -> u64 {
        self.words_extracted
    }

    /// Per-word occurrence counts
    pub fn word_counts(&self) -> &WordCounts {
        &self.word_counts
    }

    /// Rhyme pattern membership
    pub fn patterns(&self) -> &PatternIndex {
        &self.patterns
    }
}

/// Extract the normalized words of one record, or reject the whole record
///
/// A record is rejected when its release year is absent or too old, and also
/// when no token of its lyrics survives normalization: a song that passed
/// the year filter but has no usable lyrics contributes to neither the
/// accepted-song count nor any word count.
fn song_words(record: &SongRecord, min_year: Year) -> Option<Vec<Word>> {
    let year = date::extract_year(record.release_date.as_deref())?;
    if year < min_year {
        log::trace!("Rejected {record:?} because it predates {min_year}");
        return None;
    }
    let song = record
        .lyrics
        .as_deref()?
        .split_whitespace()
        .filter_map(words::normalize)
        .collect::<Vec<Word>>();
    if song.is_empty() {
        log::trace!("Rejected {record:?} because no lyrics token survived normalization");
        return None;
    }
    Some(song)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::{NonZeroU64, NonZeroUsize};

    fn test_config(min_year: crate::Year) -> Arc<Config> {
        Arc::new(Config {
            input: "corpus.csv".into(),
            output: "rhyme_database.sqlite".into(),
            date_column: "Release Date".into(),
            lyrics_column: "text".into(),
            chunk_size: NonZeroUsize::new(5000).expect("test chunk size should be nonzero"),
            min_frequency: NonZeroU64::new(3).expect("test cutoff should be nonzero"),
            min_year,
        })
    }

    fn song(release_date: &str, lyrics: &str) -> SongRecord {
        SongRecord {
            release_date: Some(release_date.into()),
            lyrics: Some(lyrics.into()),
        }
    }

    #[test]
    fn small_corpus_example() {
        // One song predates the window, the other repeats "love"
        let mut stats = RhymeStats::new(test_config(2016));
        let (songs, occurrences) = stats.add_chunk(vec![
            song("2015", "old song lyrics"),
            song("2017", "love above love"),
        ]);

        assert_eq!((songs, occurrences), (1, 3));
        assert_eq!(stats.songs_accepted(), 1);
        assert_eq!(stats.words_extracted(), 3);
        assert_eq!(stats.word_counts().get("love"), Some(&2));
        assert_eq!(stats.word_counts().get("above"), Some(&1));
        assert_eq!(stats.word_counts().get("old"), None);
    }

    #[test]
    fn repetition_within_a_song_counts_per_occurrence() {
        let mut stats = RhymeStats::new(test_config(2016));
        stats.add_chunk(vec![song("2020", "la la la la")]);
        assert_eq!(stats.word_counts().get("la"), Some(&4));
    }

    #[test]
    fn year_filter_and_lyrics_rule_are_both_admission_criteria() {
        let mut stats = RhymeStats::new(test_config(2016));
        let (songs, occurrences) = stats.add_chunk(vec![
            // No extractable year
            song("unknown", "perfectly fine lyrics"),
            // In range, but nothing survives normalization
            song("2020", "!! ?? 123 a"),
            // Missing lyrics entirely
            SongRecord {
                release_date: Some("2020".into()),
                lyrics: None,
            },
        ]);
        assert_eq!((songs, occurrences), (0, 0));
        assert!(stats.word_counts().is_empty());
        assert!(stats.patterns().is_empty());
    }

    #[test]
    fn words_join_their_own_patterns_only() {
        let mut stats = RhymeStats::new(test_config(2016));
        stats.add_chunk(vec![song("2020", "light night go")]);

        let members = |pattern: &str| {
            stats
                .patterns()
                .get(pattern)
                .map(|words| {
                    let mut sorted = words.iter().map(|w| &**w).collect::<Vec<_>>();
                    sorted.sort_unstable();
                    sorted
                })
                .unwrap_or_default()
        };
        assert_eq!(members("ht"), vec!["light", "night"]);
        assert_eq!(members("ght"), vec!["light", "night"]);
        assert_eq!(members("ight"), vec!["light", "night"]);
        assert_eq!(members("go"), vec!["go"]);
        // A 2-letter word contributes no longer patterns
        assert!(stats.patterns().get("ogo").is_none());
    }

    #[test]
    fn chunking_does_not_change_the_outcome() {
        let records = vec![
            song("2016", "light bright night"),
            song("2018", "love above love dove"),
            song("2015", "excluded by the year filter"),
            song("2021", "light love"),
        ];

        let mut one_chunk = RhymeStats::new(test_config(2016));
        one_chunk.add_chunk(records.clone());

        let mut many_chunks = RhymeStats::new(test_config(2016));
        for record in records.clone() {
            many_chunks.add_chunk(vec![record]);
        }

        // And a sharded accumulation merged out of order
        let mut shard_a = RhymeStats::new(test_config(2016));
        let mut shard_b = RhymeStats::new(test_config(2016));
        shard_a.add_chunk(records[2..].to_vec());
        shard_b.add_chunk(records[..2].to_vec());
        shard_a.merge(shard_b);

        for other in [&many_chunks, &shard_a] {
            assert_eq!(one_chunk.songs_accepted(), other.songs_accepted());
            assert_eq!(one_chunk.words_extracted(), other.words_extracted());
            assert_eq!(one_chunk.word_counts(), other.word_counts());
            assert_eq!(one_chunk.patterns(), other.patterns());
        }
    }

    #[test]
    fn raising_the_year_bound_never_accepts_more() {
        let records = vec![
            song("2015", "older lyrics"),
            song("2017", "newer lyrics"),
            song("2020", "newest lyrics"),
        ];
        let mut permissive = RhymeStats::new(test_config(2016));
        permissive.add_chunk(records.clone());
        let mut strict = RhymeStats::new(test_config(2019));
        strict.add_chunk(records);
        assert!(strict.songs_accepted() <= permissive.songs_accepted());
    }
}
