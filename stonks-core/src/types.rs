use chrono::{DateTime, Utc};

/// A forum post as seen by the scanner. Read-only; owned by the content source.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub created_utc: DateTime<Utc>,
    /// Already visited by the authenticated session.
    pub seen: bool,
    pub num_comments: u32,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub body: String,
    pub replies: Vec<CommentNode>,
}

/// One node of a comment forest: either a loaded comment or a deferred
/// "load more" placeholder that would need another request to expand.
#[derive(Debug, Clone)]
pub enum CommentNode {
    Comment(Comment),
    More { count: u32 },
}

impl CommentNode {
    pub fn comment(body: impl Into<String>, replies: Vec<CommentNode>) -> Self {
        Self::Comment(Comment {
            body: body.into(),
            replies,
        })
    }

    pub fn is_expandable(&self) -> bool {
        matches!(self, CommentNode::More { .. })
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            CommentNode::Comment(comment) => Some(&comment.body),
            CommentNode::More { .. } => None,
        }
    }

    pub fn replies(&self) -> &[CommentNode] {
        match self {
            CommentNode::Comment(comment) => &comment.replies,
            CommentNode::More { .. } => &[],
        }
    }
}
