pub mod dictionary;
pub mod extractor;
pub mod pipeline;
pub mod report;
pub mod walker;

pub use dictionary::TickerDictionary;
pub use extractor::{Blacklist, MentionExtractor, SkipReason, DEFAULT_BLACKLIST};
pub use pipeline::{run, RunSummary, ScanContext, TOP_N};
pub use report::{render_top, MentionLog, MentionTally, TIMESTAMP_FORMAT};
pub use walker::{walk, ForumScan};
