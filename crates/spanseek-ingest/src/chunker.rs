//! Document chunking: sentence strategy + multi-granularity recursive strategy.
//!
//! Every configured strategy is applied independently to the whole document
//! and the outputs are concatenated, each chunk tagged with the strategy
//! that produced it. The recursive strategy emits two tiers: coarse "large"
//! chunks and fine "small" chunks that keep a reference to their parent
//! large chunk's range.

use std::collections::VecDeque;

use tracing::warn;

use spanseek_core::{Chunk, Error, Granularity, Result};

use crate::segment::SentenceSegmenter;

/// Coarse tier separators, most-structural first.
const LARGE_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];
/// Fine tier adds sentence punctuation and common delimiters.
const SMALL_SEPARATORS: &[&str] = &["\n\n", "\n", ".", ",", "-", ":", ";", " ", ""];

const LARGE_CHUNK_SIZE: usize = 1000;
const LARGE_CHUNK_OVERLAP: usize = 200;
const SMALL_CHUNK_SIZE: usize = 50;
const SMALL_CHUNK_OVERLAP: usize = 10;

/// Chunks shorter than this are dropped by the usefulness filter.
const MIN_CHUNK_CHARS: usize = 5;

/// Slack added to the overlap when rewinding the search cursor, covering
/// separator characters swallowed by the splitter.
const CURSOR_SLACK: usize = 8;

const METHOD_BY_SENTENCE: &str = "by_sentence";
const METHOD_RECURSIVE: &str = "recursive_split";

/// Splits a document with one or more strategies.
pub struct TextSplitter {
    methods: Vec<String>,
    segmenter: Box<dyn SentenceSegmenter>,
    large: RecursiveSplitter,
    small: RecursiveSplitter,
    filtering: bool,
}

impl TextSplitter {
    /// Build a splitter for the given strategy names. Unknown names fail
    /// fast with a configuration error rather than being skipped.
    pub fn new(
        methods: &[String],
        segmenter: Box<dyn SentenceSegmenter>,
        filtering: bool,
    ) -> Result<Self> {
        if methods.is_empty() {
            return Err(Error::Config("no splitting methods configured".into()));
        }
        for method in methods {
            if method != METHOD_BY_SENTENCE && method != METHOD_RECURSIVE {
                return Err(Error::Config(format!(
                    "split method '{method}' not available"
                )));
            }
        }
        Ok(Self {
            methods: methods.to_vec(),
            segmenter,
            large: RecursiveSplitter::new(LARGE_CHUNK_SIZE, LARGE_CHUNK_OVERLAP, LARGE_SEPARATORS),
            small: RecursiveSplitter::new(SMALL_CHUNK_SIZE, SMALL_CHUNK_OVERLAP, SMALL_SEPARATORS),
            filtering,
        })
    }

    /// Split a document into chunks with every configured strategy.
    pub fn split(&self, text: &str) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for method in &self.methods {
            match method.as_str() {
                METHOD_BY_SENTENCE => chunks.extend(self.by_sentence(text)),
                METHOD_RECURSIVE => chunks.extend(self.recursive_split(text)),
                other => {
                    return Err(Error::Config(format!("split method '{other}' not available")))
                }
            }
        }

        if self.filtering {
            chunks.retain(|c| is_useful(&c.text));
        }
        Ok(chunks)
    }

    /// One chunk per detected sentence, ranges exact by contract with the
    /// segmenter.
    fn by_sentence(&self, text: &str) -> Vec<Chunk> {
        self.segmenter
            .segment(text)
            .into_iter()
            .map(|s| Chunk {
                text: s.text,
                range: (s.start, s.end),
                method: METHOD_BY_SENTENCE.to_string(),
                granularity: Granularity::Flat,
                parent_range: None,
            })
            .collect()
    }

    /// Multi-granularity chunking: large chunks over the whole document,
    /// then each large chunk independently re-split into small chunks that
    /// record their parent's range.
    fn recursive_split(&self, text: &str) -> Vec<Chunk> {
        let doc_chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();

        let large_texts = self.large.split_text(text);
        let mut locator = ChunkLocator::new(&doc_chars, LARGE_CHUNK_OVERLAP);

        for large_text in large_texts {
            let large_range = locator.locate(&large_text);
            chunks.push(Chunk {
                text: large_text.clone(),
                range: large_range,
                method: METHOD_RECURSIVE.to_string(),
                granularity: Granularity::Large,
                parent_range: None,
            });

            let parent_chars: Vec<char> = large_text.chars().collect();
            let mut small_locator = ChunkLocator::new(&parent_chars, SMALL_CHUNK_OVERLAP);
            for small_text in self.small.split_text(&large_text) {
                let (s, e) = small_locator.locate(&small_text);
                chunks.push(Chunk {
                    text: small_text,
                    // Offsets within the parent, shifted into document space.
                    range: (large_range.0 + s, large_range.0 + e),
                    method: METHOD_RECURSIVE.to_string(),
                    granularity: Granularity::Small,
                    parent_range: Some(large_range),
                });
            }
        }

        chunks
    }
}

/// Drop chunks that would only pollute the indexes: whitespace-only, very
/// short, or containing no alphanumeric character.
fn is_useful(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.chars().count() < MIN_CHUNK_CHARS {
        return false;
    }
    trimmed.chars().any(|c| c.is_alphanumeric())
}

/// Locates each emitted chunk inside its parent text.
///
/// Overlapping chunks are ambiguous substrings of their parent, so each
/// lookup scans forward from a monotonically advancing cursor instead of
/// the start of the parent. After a match the cursor rewinds by the overlap
/// budget (plus slack for swallowed separators), which is as far back as
/// the next chunk's true start can be, while never moving before the
/// current chunk's start. A chunk the splitter rewrote (e.g. trimmed
/// whitespace) falls back to a trimmed search, then to the cursor itself
/// as a best-effort anchor.
struct ChunkLocator<'a> {
    chars: &'a [char],
    overlap: usize,
    cursor: usize,
}

impl<'a> ChunkLocator<'a> {
    fn new(chars: &'a [char], overlap: usize) -> Self {
        Self {
            chars,
            overlap,
            cursor: 0,
        }
    }

    fn locate(&mut self, chunk: &str) -> (usize, usize) {
        let needle: Vec<char> = chunk.chars().collect();

        let range = if let Some(s) = find_chars(self.chars, &needle, self.cursor) {
            (s, s + needle.len())
        } else {
            let trimmed: Vec<char> = chunk.trim().chars().collect();
            if let Some(s) = find_chars(self.chars, &trimmed, self.cursor) {
                (s, s + trimmed.len())
            } else {
                warn!("chunk not found at/after cursor; anchoring at cursor position");
                let s = self.cursor.min(self.chars.len());
                (s, (s + needle.len()).min(self.chars.len()))
            }
        };

        let rewound = range.1.saturating_sub(self.overlap + CURSOR_SLACK);
        self.cursor = rewound.max(range.0 + 1).max(self.cursor);
        range
    }
}

/// Naive forward substring search over char slices starting at `from`.
fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let upper = haystack.len().checked_sub(needle.len())?;
    (from..=upper).find(|&i| haystack[i..i + needle.len()] == *needle)
}

/// Recursive character splitter with a hierarchical separator list and
/// overlap-aware merging.
///
/// Text is split on the first separator it contains; pieces longer than
/// the chunk size recurse into the finer separators. Adjacent pieces are
/// then merged back up to the chunk size, retaining a tail of pieces up to
/// the overlap budget so consecutive chunks share context.
struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl RecursiveSplitter {
    fn new(chunk_size: usize, chunk_overlap: usize, separators: &[&'static str]) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: separators.to_vec(),
        }
    }

    fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        // First separator the text actually contains; "" is the terminal
        // per-character fallback.
        let mut separator = *separators.last().unwrap_or(&"");
        let mut remaining: &[&'static str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(separator)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect()
        };

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<String> = Vec::new();

        for split in splits {
            if split.chars().count() < self.chunk_size {
                good_splits.push(split);
            } else {
                if !good_splits.is_empty() {
                    final_chunks.extend(self.merge_splits(&good_splits, separator));
                    good_splits.clear();
                }
                if remaining.is_empty() {
                    final_chunks.push(split);
                } else {
                    final_chunks.extend(self.split_recursive(&split, remaining));
                }
            }
        }
        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits, separator));
        }

        final_chunks
    }

    /// Merge small pieces into chunks up to `chunk_size`, keeping a tail of
    /// pieces within `chunk_overlap` chars between consecutive chunks.
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let sep_len = separator.chars().count();
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = split.chars().count();
            let joined_sep = if current.is_empty() { 0 } else { sep_len };

            if total + len + joined_sep > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        size = total,
                        limit = self.chunk_size,
                        "created a chunk longer than the configured size"
                    );
                }
                if !current.is_empty() {
                    if let Some(chunk) = join_pieces(&current, separator) {
                        chunks.push(chunk);
                    }
                    // Shed leading pieces until the retained tail fits the
                    // overlap budget and the new piece fits the chunk size.
                    while total > self.chunk_overlap
                        || (total + len + if current.is_empty() { 0 } else { sep_len }
                            > self.chunk_size
                            && total > 0)
                    {
                        let dropped = match current.pop_front() {
                            Some(d) => d,
                            None => break,
                        };
                        total -= dropped.chars().count()
                            + if current.is_empty() { 0 } else { sep_len };
                    }
                }
            }

            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back(split.as_str());
        }

        if let Some(chunk) = join_pieces(&current, separator) {
            chunks.push(chunk);
        }
        chunks
    }
}

fn join_pieces(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = pieces
        .iter()
        .copied()
        .collect::<Vec<_>>()
        .join(separator)
        .trim()
        .to_string();
    (!joined.is_empty()).then_some(joined)
}
