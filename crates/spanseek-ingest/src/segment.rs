//! Sentence boundary detection.
//!
//! The chunker treats the segmenter as a black box behind
//! [`SentenceSegmenter`]; the shipped implementation splits on sentence
//! punctuation and line breaks with exact char offsets.

/// One detected sentence: text plus half-open char offsets into the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Contract for an external sentence boundary detector.
///
/// Implementations guarantee `text[start..end] == sentence.text` in char
/// offsets for every returned sentence.
pub trait SentenceSegmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<Sentence>;
}

/// Rule-based segmenter: sentences end at `.`, `?`, `!` (consuming any run
/// of terminators) or at a line break.
#[derive(Debug, Default)]
pub struct RuleSegmenter;

impl RuleSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl SentenceSegmenter for RuleSegmenter {
    fn segment(&self, text: &str) -> Vec<Sentence> {
        let chars: Vec<char> = text.chars().collect();
        let mut sentences = Vec::new();
        let mut start = 0;

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if matches!(c, '.' | '?' | '!') {
                // Consume the whole terminator run (e.g. "?!", "...").
                let mut end = i + 1;
                while end < chars.len() && matches!(chars[end], '.' | '?' | '!') {
                    end += 1;
                }
                push_sentence(&chars, start, end, &mut sentences);
                start = end;
                i = end;
            } else if c == '\n' {
                push_sentence(&chars, start, i, &mut sentences);
                start = i + 1;
                i += 1;
            } else {
                i += 1;
            }
        }
        push_sentence(&chars, start, chars.len(), &mut sentences);

        sentences
    }
}

/// Emit `[start, end)` trimmed of surrounding whitespace; skip empty spans.
fn push_sentence(chars: &[char], start: usize, end: usize, out: &mut Vec<Sentence>) {
    let mut s = start;
    let mut e = end;
    while s < e && chars[s].is_whitespace() {
        s += 1;
    }
    while e > s && chars[e - 1].is_whitespace() {
        e -= 1;
    }
    if s < e {
        out.push(Sentence {
            text: chars[s..e].iter().collect(),
            start: s,
            end: e,
        });
    }
}
