use crate::extractor::MentionExtractor;
use chrono::{DateTime, Utc};
use stonks_core::{ContentSource, CoreError};
use tracing::{debug, info};

const PROGRESS_EVERY: usize = 100;

/// Result of walking one forum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumScan {
    pub forum: String,
    pub posts_fetched: usize,
    pub posts_skipped: usize,
    pub mentions: Vec<String>,
}

/// Scans the newest `post_limit` posts of `forum`, one at a time.
///
/// The first error on any post ends the walk; nothing found so far is kept.
pub async fn walk<S>(
    source: &S,
    extractor: &MentionExtractor,
    forum: &str,
    post_limit: u32,
    now: DateTime<Utc>,
) -> Result<ForumScan, CoreError>
where
    S: ContentSource + ?Sized,
{
    info!("Reading r/{}", forum);
    let posts = source.newest_posts(forum, post_limit).await?;
    let total = posts.len();

    let mut scan = ForumScan {
        forum: forum.to_string(),
        posts_fetched: total,
        ..ForumScan::default()
    };

    for (index, post) in posts.iter().enumerate() {
        if extractor.skip_reason(post, now).is_some() {
            scan.posts_skipped += 1;
        }

        let found = extractor.extract_from_post(source, post, now).await?;
        debug!(
            "r/{} post {} ({}): {} mentions",
            forum,
            post.id,
            post.title,
            found.len()
        );
        scan.mentions.extend(found);

        let processed = index + 1;
        if processed % PROGRESS_EVERY == 0 {
            info!("r/{}: {}/{} posts processed", forum, processed, total);
        }
    }

    info!(
        "r/{}: {} posts, {} skipped, {} mentions",
        forum,
        total,
        scan.posts_skipped,
        scan.mentions.len()
    );
    Ok(scan)
}
