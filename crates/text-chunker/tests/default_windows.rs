use file_agent_text_chunker::{Chunker, ChunkerConfig};

fn paragraph(n: usize) -> String {
    format!("Paragraph {n}: the quick brown fox jumps over the lazy dog near the river bank.\n")
}

#[test]
fn default_config_produces_1000_grapheme_windows_with_200_overlap() {
    let text: String = (0..60).map(paragraph).collect();
    let total = text.chars().count();
    assert!(total > 3000, "fixture too small: {total}");

    let chunker = Chunker::new(ChunkerConfig::default()).expect("valid default config");
    let spans = chunker.chunk(&text);

    assert!(spans.len() >= 4);
    for pair in spans.windows(2) {
        assert_eq!(pair[1].start - pair[0].start, 800);
        assert_eq!(pair[0].end - pair[1].start, 200, "overlap between consecutive spans");
    }
    for span in &spans[..spans.len() - 1] {
        assert_eq!(span.end - span.start, 1000);
    }
    assert_eq!(spans.last().expect("at least one span").end, total);
}

#[test]
fn rechunking_with_another_size_changes_identities() {
    let text: String = (0..20).map(paragraph).collect();
    let small = Chunker::new(ChunkerConfig {
        chunk_size: 200,
        chunk_overlap: 50,
    })
    .expect("valid config");
    let large = Chunker::new(ChunkerConfig::default()).expect("valid config");

    assert_ne!(small.chunk(&text).len(), large.chunk(&text).len());
}
