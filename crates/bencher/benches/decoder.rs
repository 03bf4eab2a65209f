use bencher::{GET_LARGE, GET_SMALL, POST_WITH_BODY, TestCase, TestInput};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use httpfromtcp::codec::RequestDecoder;
use std::hint::black_box;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("get_small", TestInput::new(GET_SMALL)),
        TestCase::small("get_small_in_8_byte_pieces", TestInput::new(GET_SMALL).in_pieces(8)),
        TestCase::large("get_large", TestInput::new(GET_LARGE)),
        TestCase::large("get_large_in_64_byte_pieces", TestInput::new(GET_LARGE).in_pieces(64)),
        TestCase::small("post_with_body", TestInput::new(POST_WITH_BODY)),
    ]
}

fn benchmark_request_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("request_decoder");

    for case in create_test_cases() {
        group.throughput(Throughput::Bytes(case.input().content().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter_batched_ref(
                || (RequestDecoder::new(), BytesMut::with_capacity(case.input().content().len())),
                |(decoder, buffer)| {
                    let mut request = None;
                    for piece in case.input().pieces() {
                        buffer.extend_from_slice(piece);
                        request = decoder.decode(buffer).expect("input should be a valid http request");
                    }
                    black_box(request.expect("input should hold a complete request"));
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(decoder, benchmark_request_decoder);
criterion_main!(decoder);
