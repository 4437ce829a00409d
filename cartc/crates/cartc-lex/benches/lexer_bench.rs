use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cartc_lex::{Lexer, LineReader, TokenKind};

fn sample_config() -> String {
    let mut source = String::new();
    source.push_str("defaults = on\n");
    for axis in 0..8 {
        source.push_str(&format!("variants axis{axis}:\n"));
        for variant in 0..8 {
            source.push_str(&format!("  - v{variant}:\n"));
            source.push_str(&format!("      key{axis} = value{variant} with $subs\n"));
        }
    }
    source.push_str("only v0, v1\n");
    source
}

fn drain(source: &str) -> usize {
    let mut lexer = Lexer::new(LineReader::from_string(source));
    lexer.set_fast();
    lexer.set_prev_indent(-1);
    let mut count = 0;
    loop {
        match lexer.next_token() {
            Ok(token) if token.is(TokenKind::EndBlock) => return count,
            Ok(_) => count += 1,
            Err(_) => return count,
        }
    }
}

fn bench_lexer(c: &mut Criterion) {
    let source = sample_config();
    c.bench_function("lex_sample_config", |b| {
        b.iter(|| drain(black_box(&source)))
    });
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);
