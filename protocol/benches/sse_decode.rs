use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use protocol::sse::SseDecoder;

fn sample_stream(events: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for i in 0..events {
        body.extend_from_slice(format!("id: {i}\nevent: token\ndata: {{\"delta\":\"chunk {i}\"}}\n\n").as_bytes());
    }
    body
}

fn bench_whole_body(c: &mut Criterion) {
    let body = sample_stream(512);
    c.bench_with_input(BenchmarkId::new("decode", "whole_body"), &body, |b, body| {
        b.iter(|| {
            let mut decoder = SseDecoder::default();
            decoder.push(black_box(body)).unwrap()
        });
    });
}

fn bench_small_chunks(c: &mut Criterion) {
    let body = sample_stream(512);
    c.bench_with_input(BenchmarkId::new("decode", "chunks_of_16"), &body, |b, body| {
        b.iter(|| {
            let mut decoder = SseDecoder::default();
            let mut count = 0;
            for chunk in body.chunks(16) {
                count += decoder.push(black_box(chunk)).unwrap().len();
            }
            count
        });
    });
}

fn sse_benches(c: &mut Criterion) {
    bench_whole_body(c);
    bench_small_chunks(c);
}

criterion_group!(benches, sse_benches);
criterion_main!(benches);
