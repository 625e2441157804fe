use criterion::{Criterion, criterion_group, criterion_main};
use semantic_search::documents::Document;
use semantic_search::embeddings::{Chunker, ChunkingConfig};
use std::hint::black_box;

fn sample_text() -> String {
    let paragraph = "Retrieval quality depends on how text is split. Chunks that end \
                     mid-sentence lose meaning, while chunks that are too long dilute it.\n\
                     Overlap keeps the context that straddles a boundary.\n\n";
    paragraph.repeat(400)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let document = Document::new("bench.md", sample_text());
    let chunker = Chunker::new(ChunkingConfig::default());
    c.bench_function("chunking", |b| {
        b.iter(|| chunker.split(black_box(&document)))
    });

    let no_overlap = Chunker::new(ChunkingConfig {
        chunk_size: 1000,
        chunk_overlap: 0,
    });
    c.bench_function("chunking_no_overlap", |b| {
        b.iter(|| no_overlap.split(black_box(&document)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
