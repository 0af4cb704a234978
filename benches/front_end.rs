//! Front-end performance benchmarks.
//!
//! Measures lex/parse/check throughput on representative sources.
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_check_hello_world(c: &mut Criterion) {
    let source = r#"
fn main() {
    print("Hello, world!")
}
"#;

    c.bench_function("check_hello_world", |b| {
        b.iter(|| librac::check_source("bench", black_box(source)))
    });
}

fn bench_check_declarations(c: &mut Criterion) {
    let source = r#"
struct Point { x, y: f32 }
struct Pair(i32, string)

interface Stringer { toString(): string }

fn (Point) toString(): string {
    return "point"
}

enum Shape { Circle(f32), Rect { w, h: f32 }, Dot }

fn area(s: Shape): f32 {
    return 1.0
}

fn main() {
    let p = Point { x: 1.0, y: 2.0 }
    let s: Stringer = p
    let shape: Shape = Shape.Circle(2.0)
    print(s.toString())
}
"#;

    c.bench_function("check_declarations", |b| {
        b.iter(|| librac::check_source("bench", black_box(source)))
    });
}

fn bench_parse_expressions(c: &mut Criterion) {
    let mut source = String::from("let x = 0\nmut acc = 0\n");
    for i in 0..200 {
        source.push_str(&format!("acc = acc + {i} * (x + {i}) % 7\n"));
    }

    c.bench_function("parse_expression_soup", |b| {
        b.iter(|| librac::parse_source("bench", black_box(&source)))
    });
}

criterion_group!(
    benches,
    bench_check_hello_world,
    bench_check_declarations,
    bench_parse_expressions
);
criterion_main!(benches);
