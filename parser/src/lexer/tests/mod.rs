
use super::{Lexer, LexicalError, Token};

/// Scans `source` and asserts the resulting token stream, ignoring spans.
fn expect_valid_tokenization(source: &str, expected: Vec<Token>) {
    let tokens: Vec<Token> = Lexer::new(source)
        .tokenize()
        .expect("expected source to tokenize")
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert_eq!(expected, tokens);
}

/// Scans `source` and returns the error it must produce.
fn expect_scan_error(source: &str) -> LexicalError {
    Lexer::new(source)
        .tokenize()
        .expect_err("expected tokenization to fail")
}
