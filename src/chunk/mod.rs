//! Text chunking for the local corpus store
//!
//! Documents are split into windows of roughly `chunk_size` characters with
//! `chunk_overlap` characters shared between neighbours. Each window ends at
//! the strongest nearby break (paragraph, sentence, line, word) when one is
//! available.

mod boundaries;

pub use boundaries::*;

use blake3::Hasher;

/// Chunking parameters, measured in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl From<&crate::config::RagConfig> for ChunkConfig {
    fn from(config: &crate::config::RagConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// A text chunk with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: String,

    /// Character start position in the source text
    pub char_start: usize,

    /// Character end position (exclusive)
    pub char_end: usize,

    /// Chunk index (0-based)
    pub index: usize,

    /// Blake3 hash of the chunk text, salted with the document hash
    pub hash: String,
}

impl TextChunk {
    pub fn compute_hash(text: &str, doc_hash: &str) -> String {
        let mut hasher = Hasher::new();
        hasher.update(doc_hash.as_bytes());
        hasher.update(text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// Split `text` into overlapping chunks
pub fn chunk_text(text: &str, doc_hash: &str, config: ChunkConfig) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || config.chunk_size == 0 {
        return Vec::new();
    }

    let overlap = config.chunk_overlap.min(config.chunk_size.saturating_sub(1));
    let break_points = find_break_points(&chars);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let target = start + config.chunk_size;
        let end = if target >= chars.len() {
            chars.len()
        } else {
            // Only accept breaks in the last fifth of the window
            let min = start + (config.chunk_size * 4 / 5).max(overlap + 1);
            best_break_in(&break_points, min, target).unwrap_or(target)
        };

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                text: trimmed.to_string(),
                char_start: start,
                char_end: end,
                index: chunks.len(),
                hash: TextChunk::compute_hash(trimmed, doc_hash),
            });
        }

        if end >= chars.len() {
            break;
        }
        start = end - overlap;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkConfig {
        ChunkConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Live bovine animals", "doc", config(512, 100));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Live bovine animals");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", "doc", config(512, 100)).is_empty());
        assert!(chunk_text("   \n\n ", "doc", config(512, 100)).is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = "abcdefghij".repeat(10);
        let chunks = chunk_text(&text, "doc", config(30, 10));

        assert!(chunks.iter().all(|c| c.char_end - c.char_start <= 30));
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].char_start, pair[0].char_end - 10);
        }
        assert_eq!(chunks.last().unwrap().char_end, 100);
    }

    #[test]
    fn test_prefers_sentence_breaks() {
        let text = "Chapter one covers live animals. Chapter two covers meat and offal.";
        let chunks = chunk_text(text, "doc", config(40, 0));
        assert_eq!(chunks[0].text, "Chapter one covers live animals.");
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Живые животные – крупный рогатый скот. ".repeat(20);
        let chunks = chunk_text(&text, "doc", config(50, 10));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 50));
    }

    #[test]
    fn test_hash_depends_on_document() {
        let a = chunk_text("same text", "doc-a", config(512, 0));
        let b = chunk_text("same text", "doc-b", config(512, 0));
        assert_ne!(a[0].hash, b[0].hash);
    }

    #[test]
    fn test_overlap_larger_than_size_still_progresses() {
        let chunks = chunk_text(&"x".repeat(50), "doc", config(10, 20));
        assert!(chunks.len() >= 5);
        assert_eq!(chunks.last().unwrap().char_end, 50);
    }
}
