//! Segmentation of long source text into bounded segments.
//!
//! The segment analyzer always receives already-chunked input; adapters
//! run their raw text through a [`Chunker`] before returning it.

use crate::config::ChunkingMode;

/// Splits text into segments of at most `max_words` words.
#[derive(Debug, Clone)]
pub struct Chunker {
    mode: ChunkingMode,
    max_words: usize,
}

impl Chunker {
    /// Create a chunker. A `max_words` of zero is treated as one.
    pub fn new(mode: ChunkingMode, max_words: usize) -> Self {
        Self {
            mode,
            max_words: max_words.max(1),
        }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Split text into non-empty segments, preserving order.
    pub fn split(&self, text: &str) -> Vec<String> {
        match self.mode {
            ChunkingMode::Words => self.split_words(text),
            ChunkingMode::Sentences => self.split_sentences(text),
        }
    }

    fn split_words(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        words
            .chunks(self.max_words)
            .map(|chunk| chunk.join(" "))
            .collect()
    }

    /// Pack whole sentences into segments. A sentence longer than the limit
    /// is split on word boundaries.
    fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for sentence in sentences(text) {
            let words: Vec<&str> = sentence.split_whitespace().collect();

            if words.len() > self.max_words {
                if !current.is_empty() {
                    segments.push(current.join(" "));
                    current.clear();
                }
                segments.extend(words.chunks(self.max_words).map(|c| c.join(" ")));
                continue;
            }

            if current.len() + words.len() > self.max_words && !current.is_empty() {
                segments.push(current.join(" "));
                current.clear();
            }
            current.extend(words);
        }

        if !current.is_empty() {
            segments.push(current.join(" "));
        }

        segments
    }
}

/// Split text after sentence-ending punctuation, keeping the punctuation.
fn sentences(text: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let end = idx + ch.len_utf8();
            let next_is_break = text[end..]
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace());
            if next_is_break {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    result.push(sentence);
                }
                start = end;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        result.push(tail);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_chunking() {
        let chunker = Chunker::new(ChunkingMode::Words, 3);
        let segments = chunker.split("one two three four five\n six  seven");

        assert_eq!(segments, vec!["one two three", "four five six", "seven"]);
    }

    #[test]
    fn test_empty_text_has_no_segments() {
        let chunker = Chunker::new(ChunkingMode::Words, 10);
        assert!(chunker.split("   \n ").is_empty());

        let chunker = Chunker::new(ChunkingMode::Sentences, 10);
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn test_sentence_packing() {
        let chunker = Chunker::new(ChunkingMode::Sentences, 6);
        let segments =
            chunker.split("Qubits hold superposition. Gates rotate them. Error correction is hard!");

        assert_eq!(
            segments,
            vec!["Qubits hold superposition. Gates rotate them.", "Error correction is hard!"]
        );
    }

    #[test]
    fn test_long_sentence_is_split_on_words() {
        let chunker = Chunker::new(ChunkingMode::Sentences, 2);
        let segments = chunker.split("Short. This sentence is far too long");

        assert_eq!(segments, vec!["Short.", "This sentence", "is far", "too long"]);
    }

    #[test]
    fn test_decimal_points_do_not_end_sentences() {
        let parts = sentences("Version 2.5 shipped. It works");
        assert_eq!(parts, vec!["Version 2.5 shipped.", "It works"]);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let chunker = Chunker::new(ChunkingMode::Words, 0);
        assert_eq!(chunker.max_words(), 1);
        assert_eq!(chunker.split("a b").len(), 2);
    }
}
