use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::scan_files::Document;

/// A window of one document's text, the unit that gets embedded and retrieved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    /// Position of this window within its document.
    pub index: usize,
    pub text: String,
}

/// Split `text` into windows of at most `chunk_size` characters.
///
/// Each window starts `chunk_overlap` characters before the previous one
/// ended, so neighbours share exactly that many characters. The last window
/// holds whatever remains and may be shorter. Text is never trimmed.
pub fn chunk_text(text: &str, cfg: &Config) -> Vec<String> {
    split_windows(text, cfg.chunk_size, cfg.chunk_overlap)
}

pub fn chunk_document(doc: &Document, cfg: &Config) -> Vec<Chunk> {
    chunk_text(&doc.text, cfg)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { source: doc.source.clone(), index, text })
        .collect()
}

fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if size == 0 || overlap >= size {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    let len_chars = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len_chars {
        let end = (start + size).min(len_chars);
        chunks.push(chars[start..end].iter().collect());
        if end == len_chars {
            break;
        }
        start = end - overlap;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(size: usize, overlap: usize) -> Config {
        let mut cfg = Config::with_api_key("sk-test");
        cfg.chunk_size = size;
        cfg.chunk_overlap = overlap;
        cfg
    }

    fn tail(s: &str, n: usize) -> String {
        let chars: Vec<char> = s.chars().collect();
        chars[chars.len() - n..].iter().collect()
    }

    fn head(s: &str, n: usize) -> String {
        s.chars().take(n).collect()
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let text = "Discipline means keeping commitments to yourself.";
        let chunks = chunk_text(text, &cfg(1000, 200));
        assert_eq!(chunks, vec!["Discipline means keeping commitments to yourself.".to_string()]);
    }

    #[test]
    fn neighbours_share_exactly_the_overlap() {
        let text: String = (0..500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text(&text, &cfg(100, 30));
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            assert_eq!(tail(&pair[0], 30), head(&pair[1], 30));
        }
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
    }

    #[test]
    fn keeps_trailing_content() {
        let text = "x".repeat(250);
        let chunks = chunk_text(&text, &cfg(100, 20));
        // starts at 0, 80, 160; the last window is the 90-char remainder
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].chars().count(), 90);
        let rebuilt: usize = chunks.iter().map(|c| c.chars().count()).sum::<usize>() - 20 * 2;
        assert_eq!(rebuilt, 250);
    }

    #[test]
    fn whitespace_is_preserved_at_boundaries() {
        let text = "ab  cd  ef  gh";
        let chunks = chunk_text(text, &cfg(4, 1));
        assert_eq!(chunks[0], "ab  ");
        assert!(chunks[1].starts_with(' '));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "éèêëàâäôöûüç".repeat(10);
        let chunks = chunk_text(&text, &cfg(25, 5));
        for pair in chunks.windows(2) {
            assert_eq!(tail(&pair[0], 5), head(&pair[1], 5));
        }
        assert!(chunks.iter().all(|c| c.chars().count() <= 25));
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", &cfg(10, 2)).is_empty());
    }

    #[test]
    fn document_chunks_are_numbered() {
        let doc = Document { source: "a.txt".to_string(), text: "y".repeat(30) };
        let chunks = chunk_document(&doc, &cfg(10, 2));
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(chunks.iter().all(|c| c.source == "a.txt"));
    }
}
