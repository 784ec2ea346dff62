use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about, allow_negative_numbers = true)]
pub struct Cli {
    /// Novel title used in archive titles and output filenames.
    pub title: String,

    /// URL of the index page listing every chapter as an `<option>`.
    pub url: String,

    /// Chapters per output archive.
    #[arg(default_value_t = 100)]
    pub chunk_size: usize,

    /// First chapter index (0-based) to include; 0 keeps the start of the list.
    #[arg(default_value_t = 0)]
    pub start_idx: i64,

    /// One past the last chapter index to include; 0 means no upper bound.
    /// Ignored unless `start_idx` is also set.
    #[arg(default_value_t = 0)]
    pub end_idx: i64,

    /// What to do when a chapter fails to sanitize.
    #[arg(long, value_enum, default_value_t = OnFailure::Placeholder)]
    pub on_failure: OnFailure,

    /// Pause between chapter fetches (politeness).
    #[arg(long, default_value_t = 1_000)]
    pub chapter_delay_ms: u64,

    /// Pause after each saved archive.
    #[arg(long, default_value_t = 60_000)]
    pub batch_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnFailure {
    /// Abort the whole run on the first bad chapter.
    Abort,
    /// Insert a marked "Skipping ..." page and keep going.
    Placeholder,
}
