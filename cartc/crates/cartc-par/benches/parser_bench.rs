use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cartc_par::{Parser, ParserConfig};

fn sample_config() -> String {
    let mut source = String::from("base = 1\n");
    for axis in 0..6 {
        source.push_str(&format!("variants axis{axis}:\n"));
        for variant in 0..6 {
            source.push_str(&format!("    - v{variant}:\n"));
            source.push_str(&format!("        key{axis} = value{variant}\n"));
        }
    }
    source.push_str("only v0, v1, v2\n");
    source.push_str("no v1..v2\n");
    source
}

fn bench_parser(c: &mut Criterion) {
    let source = sample_config();
    c.bench_function("parse_sample_config", |b| {
        b.iter(|| {
            let mut parser = Parser::new(ParserConfig::default());
            parser
                .parse_string(black_box(&source))
                .expect("config parses");
            parser
        })
    });
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
