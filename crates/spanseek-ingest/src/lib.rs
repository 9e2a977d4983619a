//! spanseek Ingest — corpus loading and document chunking.

pub mod chunker;
pub mod corpus;
pub mod segment;

pub use chunker::TextSplitter;
pub use corpus::Corpus;
pub use segment::{RuleSegmenter, SentenceSegmenter};
