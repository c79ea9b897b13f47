use crate::dictionary::TickerDictionary;
use crate::extractor::{Blacklist, MentionExtractor};
use crate::report::{render_top, MentionLog, MentionTally};
use crate::walker::walk;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use stonks_core::{ContentSource, CoreError, Settings};
use tracing::info;

pub const TOP_N: usize = 10;

/// Everything a run needs, built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub settings: Settings,
    pub extractor: MentionExtractor,
}

impl ScanContext {
    pub fn new(settings: Settings, extractor: MentionExtractor) -> Self {
        Self {
            settings,
            extractor,
        }
    }

    /// Loads the ticker lists named in `settings` and pairs them with the
    /// default blacklist.
    pub fn from_settings(settings: Settings) -> Result<Self, CoreError> {
        let dictionary =
            TickerDictionary::load(&settings.tickers_path, &settings.foreign_tickers_path)?;
        let extractor =
            MentionExtractor::new(dictionary, Blacklist::default(), settings.number_of_days);
        Ok(Self::new(settings, extractor))
    }

    pub fn mention_log(&self) -> MentionLog {
        MentionLog::new(&self.settings.output_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub timestamp: NaiveDateTime,
    pub posts_fetched: usize,
    pub posts_skipped: usize,
    pub mentions: usize,
    pub tally: MentionTally,
    pub rows_written: usize,
}

/// Walks every configured forum in order, prints the leaders and appends the
/// tally to the mention log.
pub async fn run<S>(
    ctx: &ScanContext,
    source: &S,
    now: DateTime<Utc>,
) -> Result<RunSummary, CoreError>
where
    S: ContentSource + ?Sized,
{
    let mut mentions: Vec<String> = Vec::new();
    let mut posts_fetched = 0;
    let mut posts_skipped = 0;

    for forum in &ctx.settings.subreddits {
        let scan = walk(
            source,
            &ctx.extractor,
            forum,
            ctx.settings.number_of_posts,
            now,
        )
        .await?;
        posts_fetched += scan.posts_fetched;
        posts_skipped += scan.posts_skipped;
        mentions.extend(scan.mentions);
    }

    let mention_count = mentions.len();
    let tally = MentionTally::from_mentions(mentions);

    println!("\n\nFound the following tickers:");
    print!("{}", render_top(&tally, TOP_N));

    let timestamp = now.with_timezone(&Local).naive_local();
    let rows_written = ctx.mention_log().append(&tally, timestamp)?;

    info!(
        "Run complete: {} posts fetched, {} skipped, {} mentions of {} tickers",
        posts_fetched,
        posts_skipped,
        mention_count,
        tally.len()
    );

    Ok(RunSummary {
        timestamp,
        posts_fetched,
        posts_skipped,
        mentions: mention_count,
        tally,
        rows_written,
    })
}
