//! Length-based recursive splitting of loaded records into text windows.
//!
//! Window sizes are measured in characters, not tokens. Each window inherits
//! the metadata of the record it was split from (e.g. the PDF page number).

use crate::processing::types::{ChunkingError, PageRecord, TextWindow};
use text_splitter::{ChunkConfig, TextSplitter};

/// Split loaded records into overlapping windows of at most `chunk_size` characters.
///
/// Records that are empty or whitespace-only contribute no windows; callers
/// decide whether an overall empty result is an error.
pub fn split_records(
    records: &[PageRecord],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<TextWindow>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|_| ChunkingError::OverlapTooLarge {
            overlap,
            chunk_size,
        })?;
    let splitter = TextSplitter::new(config);

    let mut windows = Vec::new();
    for record in records {
        for piece in splitter.chunks(&record.text) {
            let text = piece.trim();
            if text.is_empty() {
                continue;
            }
            windows.push(TextWindow {
                text: text.to_string(),
                metadata: record.metadata.clone(),
            });
        }
    }
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn record(text: &str, page: i64) -> PageRecord {
        PageRecord {
            text: text.to_string(),
            metadata: doc! { "source": "doc.pdf", "page": page },
        }
    }

    #[test]
    fn windows_respect_the_size_limit() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let windows = split_records(&[record(text, 0)], 16, 0).unwrap();
        assert!(windows.len() > 1);
        for window in &windows {
            assert!(window.text.chars().count() <= 16);
        }
        // Nothing dropped: every word survives in order.
        let rejoined: Vec<&str> = windows
            .iter()
            .flat_map(|window| window.text.split_whitespace())
            .collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn overlap_repeats_trailing_content() {
        let text = "one two three four five six seven eight nine ten";
        let no_overlap = split_records(&[record(text, 0)], 20, 0).unwrap();
        let with_overlap = split_records(&[record(text, 0)], 20, 8).unwrap();
        assert!(with_overlap.len() >= no_overlap.len());
        // Adjacent windows share text when overlap is requested.
        let shares_tail = with_overlap.windows(2).any(|pair| {
            pair[0]
                .text
                .split_whitespace()
                .last()
                .is_some_and(|tail| pair[1].text.contains(tail))
        });
        assert!(shares_tail);
    }

    #[test]
    fn metadata_is_copied_onto_every_window() {
        let records = vec![record("first page text here", 0), record("second page", 1)];
        let windows = split_records(&records, 12, 0).unwrap();
        assert!(windows.len() >= 2);
        assert!(windows.iter().any(|w| w.metadata.get_i64("page") == Ok(0)));
        assert!(windows.iter().any(|w| w.metadata.get_i64("page") == Ok(1)));
        for window in &windows {
            assert_eq!(window.metadata.get_str("source").unwrap(), "doc.pdf");
        }
    }

    #[test]
    fn whitespace_records_yield_no_windows() {
        let windows = split_records(&[record("   \n\t  ", 0)], 100, 0).unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let error = split_records(&[record("text", 0)], 0, 0).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn overlap_must_fit_inside_the_window() {
        let error = split_records(&[record("text", 0)], 10, 10).unwrap_err();
        assert!(matches!(error, ChunkingError::OverlapTooLarge { .. }));
    }
}
