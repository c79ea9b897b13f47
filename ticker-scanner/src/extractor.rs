use crate::dictionary::TickerDictionary;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use stonks_core::{CommentNode, ContentSource, CoreError, Post};
use tracing::trace;

/// Words that are valid ticker symbols but mostly appear as plain English or
/// forum slang.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "A", "AI", "ALL", "AM", "AN", "ANY", "APE", "APES", "ARE", "AT", "ATH", "BE", "BEST", "BIG",
    "BUY", "BY", "CALL", "CAN", "CASH", "CEO", "CFO", "CPI", "DD", "DO", "EDIT", "ELI", "EOD",
    "EPS", "ETF", "EU", "EV", "FAST", "FD", "FOMO", "FOR", "FREE", "FUD", "FUN", "GAIN", "GDP",
    "GO", "GOOD", "HAS", "HE", "HOLD", "IMO", "IPO", "IRS", "IT", "ITM", "LIFE", "LMAO", "LOL",
    "LOVE", "LOW", "MOON", "NEW", "NEXT", "NOW", "NYSE", "OG", "ON", "ONE", "OP", "OPEN", "OR",
    "OTM", "OUT", "PE", "PLAY", "PM", "PT", "PUT", "RE", "REAL", "RH", "RIP", "ROI", "RUN", "SEC",
    "SEE", "SELL", "SO", "TA", "TELL", "TLDR", "TO", "TV", "TWO", "UK", "UP", "USA", "USD", "VERY",
    "WELL", "WSB", "YOLO", "YOU",
];

#[derive(Debug, Clone)]
pub struct Blacklist {
    words: HashSet<String>,
}

impl Blacklist {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.words.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().copied())
    }
}

/// Why a post was passed over without looking at its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySeen,
    OutsideLookback,
}

#[derive(Debug, Clone)]
pub struct MentionExtractor {
    dictionary: TickerDictionary,
    blacklist: Blacklist,
    lookback: Duration,
}

impl MentionExtractor {
    pub fn new(dictionary: TickerDictionary, blacklist: Blacklist, lookback_days: u32) -> Self {
        Self {
            dictionary,
            blacklist,
            lookback: Duration::days(i64::from(lookback_days)),
        }
    }

    pub fn dictionary(&self) -> &TickerDictionary {
        &self.dictionary
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Known symbols in `text`, one entry per occurrence, blacklist removed.
    pub fn extract(&self, text: &str) -> Vec<String> {
        self.dictionary
            .find_all(text)
            .filter(|symbol| !self.blacklist.contains(symbol))
            .map(str::to_string)
            .collect()
    }

    pub fn skip_reason(&self, post: &Post, now: DateTime<Utc>) -> Option<SkipReason> {
        if post.seen {
            return Some(SkipReason::AlreadySeen);
        }
        if post.created_utc < now - self.lookback {
            return Some(SkipReason::OutsideLookback);
        }
        None
    }

    /// Mentions in the title, the top-level comments and their direct replies.
    ///
    /// Seen or stale posts return nothing and their comments are never fetched.
    /// Replies to replies are not scanned, and "load more" placeholders are
    /// skipped rather than expanded.
    pub async fn extract_from_post<S>(
        &self,
        source: &S,
        post: &Post,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, CoreError>
    where
        S: ContentSource + ?Sized,
    {
        if let Some(reason) = self.skip_reason(post, now) {
            trace!("Skipping post {}: {:?}", post.id, reason);
            return Ok(Vec::new());
        }

        let mut found = self.extract(&post.title);

        let comments = source.comment_tree(post).await?;
        for comment in comments.iter().filter(|node| !node.is_expandable()) {
            found.extend(self.extract_from_node(comment));

            for reply in comment.replies().iter().filter(|node| !node.is_expandable()) {
                found.extend(self.extract_from_node(reply));
            }
        }

        Ok(found)
    }

    fn extract_from_node(&self, node: &CommentNode) -> Vec<String> {
        node.body().map(|body| self.extract(body)).unwrap_or_default()
    }
}
