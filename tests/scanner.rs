#[cfg(test)]
mod scanner_tests {
    use rox::error::LoxError;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn scan(source: &str) -> (Vec<Token>, Vec<LoxError>) {
        Scanner::new(source).scan_all()
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_two_char_operators_are_greedy() {
        assert_token_sequence(
            "!= == <= >= ! = < > /",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL, "="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<&LoxError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(errors.len(), 2, "Expected 2 error messages");

        assert_eq!(errors[0].to_string(), "[line 1] Error: Unexpected character: $");
        assert_eq!(errors[1].to_string(), "[line 1] Error: Unexpected character: #");

        fn assert_token_matches(
            result: &Result<Token, LoxError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(token.token_type, expected_type);
                    assert_eq!(token.lexeme, expected_lexeme);
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_multibyte_unexpected_character_is_skipped_whole() {
        let (tokens, errors) = scan("a é b");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unexpected character: é"));

        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["a", "b", ""]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_token_sequence(
            "and andy _x class superb super this9 nil",
            &[
                (TokenType::AND, "and"),
                (TokenType::IDENTIFIER, "andy"),
                (TokenType::IDENTIFIER, "_x"),
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "superb"),
                (TokenType::SUPER, "super"),
                (TokenType::IDENTIFIER, "this9"),
                (TokenType::NIL, "nil"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_number_literals() {
        let (tokens, errors) = scan("123 1.5 7.");

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 5);

        assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 123.0));
        assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 1.5));

        // A trailing dot is not part of the number.
        assert!(matches!(tokens[2].token_type, TokenType::NUMBER(n) if n == 7.0));
        assert_eq!(tokens[2].lexeme, "7");
        assert_eq!(tokens[3].token_type, TokenType::DOT);
    }

    #[test]
    fn test_comments_are_skipped_and_count_lines() {
        let (tokens, errors) = scan("// one\na /* two\nthree\n */ b // trailing");

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 3);

        assert_eq!(tokens[0].lexeme, "a");
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].lexeme, "b");
        assert_eq!(tokens[1].line, 4);
    }

    #[test]
    fn test_unterminated_block_comment_is_tolerated() {
        let (tokens, errors) = scan("1 /* never closed\n");

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].token_type, TokenType::EOF);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_multiline_string() {
        let (tokens, errors) = scan("\"a\nb\" x");

        assert!(errors.is_empty());
        assert!(matches!(&tokens[0].token_type, TokenType::STRING(s) if s == "a\nb"));
        assert_eq!(tokens[0].lexeme, "\"a\nb\"");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_unterminated_string_reports_and_continues() {
        let (tokens, errors) = scan("print \"abc\nd");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 2] Error: Unterminated string.");

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, TokenType::PRINT);
        assert_eq!(tokens[1].token_type, TokenType::EOF);
    }

    #[test]
    fn test_eof_carries_final_line() {
        let (tokens, _) = scan("a\nb\n");

        let eof = tokens.last().expect("eof token");
        assert_eq!(eof.token_type, TokenType::EOF);
        assert_eq!(eof.line, 3);
    }

    #[test]
    fn test_token_display() {
        let (tokens, _) = scan("var x = 3; \"hi\" 2.5");

        let printed: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(
            printed,
            vec![
                "VAR var null",
                "IDENTIFIER x null",
                "EQUAL = null",
                "NUMBER 3 3.0",
                "SEMICOLON ; null",
                "STRING \"hi\" hi",
                "NUMBER 2.5 2.5",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_token_serializes_to_json() {
        let (tokens, _) = scan("x");

        let json = serde_json::to_string(&tokens[0]).expect("serialize");

        assert_eq!(json, r#"{"token_type":"IDENTIFIER","lexeme":"x","line":1}"#);
    }
}
