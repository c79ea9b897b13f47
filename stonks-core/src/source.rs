use crate::{CommentNode, CoreError, Post};

/// Read-only access to a forum host.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    /// Newest posts of `forum`, newest first, at most `limit` of them.
    async fn newest_posts(&self, forum: &str, limit: u32) -> Result<Vec<Post>, CoreError>;

    /// Comment forest of a post. Placeholders are returned as-is, never expanded.
    async fn comment_tree(&self, post: &Post) -> Result<Vec<CommentNode>, CoreError>;
}
