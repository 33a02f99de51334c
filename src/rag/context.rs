//! Retrieved-context formatting.

use super::store::SearchHit;

pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Joins hit texts in rank order (most similar first) with a blank line.
pub fn format_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.entry.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Distinct sources in first-seen order.
pub fn context_sources(hits: &[SearchHit]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for hit in hits {
        if !sources.contains(&hit.entry.source) {
            sources.push(hit.entry.source.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::IndexEntry;

    fn hit(content: &str, source: &str, score: f32) -> SearchHit {
        SearchHit {
            entry: IndexEntry {
                chunk_id: content.to_string(),
                content: content.to_string(),
                source: source.to_string(),
                metadata: None,
            },
            score,
        }
    }

    #[test]
    fn joins_in_given_order_with_blank_lines() {
        let hits = vec![hit("first", "a", 0.9), hit("second", "b", 0.5), hit("third", "a", 0.1)];
        assert_eq!(format_context(&hits), "first\n\nsecond\n\nthird");
        assert_eq!(context_sources(&hits), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_hits_give_empty_context() {
        assert_eq!(format_context(&[]), "");
    }
}
