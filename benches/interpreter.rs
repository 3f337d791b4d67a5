use criterion::{black_box, criterion_group, criterion_main, Criterion};
use intcode::{
    network::{Config, Network, Ring},
    vm::{batch::run_batch, execute, Program},
};

const QUINE: &str = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";
const FEEDBACK: &str = "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5";
const ANNOUNCE: &str = "3,100,104,255,4,100,104,42,3,101,1008,101,-1,102,1005,102,8,3,103,1105,1,8,99";

/// Counts down from its input, printing every value.
fn countdown() -> Program {
    Program::new(vec![3, 100, 4, 100, 1001, 100, -1, 100, 1005, 100, 2, 99])
}

fn parse_image(c: &mut Criterion) {
    let text = (0..10_000).map(|n| (n * 7919 % 1000).to_string()).collect::<Vec<_>>().join(",");
    c.bench_function("parse 10k words", |b| b.iter(|| black_box(&text).parse::<Program>().unwrap()));
}

fn interpret(c: &mut Criterion) {
    let quine: Program = QUINE.parse().unwrap();
    c.bench_function("quine", |b| b.iter(|| execute(black_box(&quine), []).unwrap()));

    let countdown = countdown();
    c.bench_function("countdown 100k", |b| {
        b.iter(|| execute(black_box(&countdown), [100_000]).unwrap())
    });
}

fn batch(c: &mut Criterion) {
    let countdown = countdown();
    let inputs: Vec<Vec<i64>> = (1..=256).map(|n| vec![n * 10]).collect();
    c.bench_function("batch 256 countdowns", |b| {
        b.iter(|| run_batch(black_box(&countdown), &inputs))
    });
}

fn threaded(c: &mut Criterion) {
    let feedback: Program = FEEDBACK.parse().unwrap();
    c.bench_function("ring of 5", |b| {
        b.iter(|| Ring::new(feedback.clone(), [9, 8, 7, 6, 5]).run().unwrap())
    });

    let announce: Program = ANNOUNCE.parse().unwrap();
    let network = Network::new(Config::default().with_nodes(10));
    c.bench_function("network of 10", |b| b.iter(|| network.run(black_box(&announce)).unwrap()));
}

criterion_group!(benches, parse_image, interpret, batch, threaded);
criterion_main!(benches);
