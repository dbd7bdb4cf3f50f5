pub mod error;
pub mod lexer;
pub mod token;

pub use error::{LexError, LexResult};
pub use lexer::Lexer;
pub use token::{lookup_keyword, Span, Token, TokenKind};

/// Eagerly drains a [`Lexer`] into a token vector plus any `Error` tokens
/// collected along the way, reported separately as [`LexError`]s. The
/// compiler itself consumes `Lexer` directly, one token at a time; this is
/// the convenience entry point for tests and tooling that want it all at once.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for token in lexer {
        if token.kind == TokenKind::Error {
            errors.push(LexError { message: token.lexeme.clone(), span: token.span });
        }
        tokens.push(token);
    }
    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(src);
        assert!(errors.is_empty(), "Unexpected errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_source() {
        let (tokens, errors) = tokenize("");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_punctuators() {
        let k = kinds("(){};,.-+/*");
        assert_eq!(
            k,
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Slash,
                TokenKind::Star,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_one_or_two_char_operators() {
        let k = kinds("! != = == < <= > >=");
        assert_eq!(
            k,
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_literals() {
        let k = kinds("123 3.14 0.5");
        assert_eq!(k[0], TokenKind::NumberLiteral(123.0));
        assert_eq!(k[1], TokenKind::NumberLiteral(3.14));
        assert_eq!(k[2], TokenKind::NumberLiteral(0.5));
    }

    #[test]
    fn test_trailing_dot_is_not_part_of_number() {
        // Lox numbers require a digit after the dot; a bare trailing `.`
        // is its own token so that `123.method()`-style calls still parse.
        let k = kinds("123.");
        assert_eq!(k[0], TokenKind::NumberLiteral(123.0));
        assert_eq!(k[1], TokenKind::Dot);
    }

    #[test]
    fn test_string_literal() {
        let (tokens, errors) = tokenize(r#""hello world""#);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("hello world".to_string()));
    }

    #[test]
    fn test_multiline_string_literal_tracks_line_count() {
        let (tokens, errors) = tokenize("\"a\nb\"\nprint");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("a\nb".to_string()));
        assert_eq!(tokens[1].line(), 3);
    }

    #[test]
    fn test_unterminated_string_error() {
        let (_tokens, errors) = tokenize("\"hello");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unterminated string.");
    }

    #[test]
    fn test_keywords() {
        let k = kinds(
            "and class else false for fun if nil or print return super this true var while",
        );
        assert_eq!(
            k,
            vec![
                TokenKind::And,
                TokenKind::Class,
                TokenKind::Else,
                TokenKind::False,
                TokenKind::For,
                TokenKind::Fun,
                TokenKind::If,
                TokenKind::Nil,
                TokenKind::Or,
                TokenKind::Print,
                TokenKind::Return,
                TokenKind::Super,
                TokenKind::This,
                TokenKind::True,
                TokenKind::Var,
                TokenKind::While,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_are_not_keywords() {
        let k = kinds("foo bar_baz _private printer");
        assert_eq!(k[0], TokenKind::Identifier);
        assert_eq!(k[1], TokenKind::Identifier);
        assert_eq!(k[2], TokenKind::Identifier);
        assert_eq!(k[3], TokenKind::Identifier); // not `print` + `er`
    }

    #[test]
    fn test_line_comment_skipped() {
        let k = kinds("var x = 1; // a comment\nvar y = 2;");
        assert_eq!(
            k,
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::NumberLiteral(1.0),
                TokenKind::Semicolon,
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::NumberLiteral(2.0),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character_error() {
        let (_tokens, errors) = tokenize("@");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unexpected character.");
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_lexer_is_an_iterator() {
        let tokens: Vec<Token> = Lexer::new("1 + 2").collect();
        assert_eq!(tokens.len(), 4); // 1, +, 2, Eof
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }
}
