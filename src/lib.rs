//! Corpus-to-index pipeline for a song lyrics dataset.
//!
//! The pipeline streams a large tabular corpus of songs (one CSV row per
//! song, with free-text release date and lyrics columns), keeps the songs
//! released inside a recency window, normalizes their lyrics into words, and
//! aggregates word frequencies together with 2-4 character word-ending
//! ("rhyme pattern") membership. The final state is persisted as an indexed
//! SQLite artifact that a downstream application queries for "words rhyming
//! with X" lookups.

pub mod config;
pub mod corpus;
pub mod date;
pub mod db;
pub mod progress;
pub mod stats;
pub mod words;

/// Use anyhow for Result type erasure
pub use anyhow::Result;

/// Year of Gregorian Calendar
pub type Year = i16;

/// Canonical lowercase ASCII word extracted from a lyrics field
pub type Word = Box<str>;
