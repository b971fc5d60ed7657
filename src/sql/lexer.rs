//! SQL lexer
//!
//! A single-pass character scanner producing a token stream with
//! line/column position tracking. Whitespace and `--` comments are
//! skipped.

use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// SQL lexer
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let (line, column) = (self.line, self.column);
        if self.is_at_end() {
            return Ok(Token::eof(line, column));
        }

        let ch = self.current_char();
        let kind = match ch {
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '.' => {
                self.advance();
                TokenKind::Dot
            }
            ';' => {
                self.advance();
                TokenKind::Semicolon
            }
            '*' => {
                self.advance();
                TokenKind::Asterisk
            }
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '-' => {
                self.advance();
                TokenKind::Minus
            }
            '/' => {
                self.advance();
                TokenKind::Slash
            }
            '=' => {
                self.advance();
                TokenKind::Eq
            }
            '!' => {
                self.advance();
                if self.current_is('=') {
                    self.advance();
                    TokenKind::Neq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                self.advance();
                if self.current_is('=') {
                    self.advance();
                    TokenKind::Lte
                } else if self.current_is('>') {
                    self.advance();
                    TokenKind::Neq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.advance();
                if self.current_is('=') {
                    self.advance();
                    TokenKind::Gte
                } else {
                    TokenKind::Gt
                }
            }
            '\'' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c => {
                return Err(Error::Syntax {
                    message: format!("unexpected character '{}'", c),
                    line,
                    column,
                    near: c.to_string(),
                    suggestion: "check SQL syntax".to_string(),
                });
            }
        };

        Ok(Token::new(kind, line, column))
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn current_is(&self, ch: char) -> bool {
        !self.is_at_end() && self.current_char() == ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            if self.input[self.position] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while !self.is_at_end() && self.current_char().is_whitespace() {
                self.advance();
            }
            // Comment runs to end of line
            if self.current_is('-') && self.peek_char() == Some('-') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    /// Read a single-quoted string literal. A backslash escapes an
    /// embedded quote; the stored value excludes the surrounding quotes.
    fn read_string(&mut self) -> TokenKind {
        self.advance(); // opening quote
        let mut value = String::new();
        while !self.is_at_end() && self.current_char() != '\'' {
            if self.current_char() == '\\' && self.peek_char() == Some('\'') {
                value.push('\'');
                self.advance();
                self.advance();
            } else {
                value.push(self.current_char());
                self.advance();
            }
        }
        self.advance(); // closing quote
        TokenKind::Str(value)
    }

    /// Read a numeric literal: a digit run with at most one decimal dot.
    fn read_number(&mut self) -> TokenKind {
        let mut value = String::new();
        let mut has_decimal = false;
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !has_decimal {
                has_decimal = true;
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Number(value)
    }

    fn read_identifier(&mut self) -> TokenKind {
        let mut value = String::new();
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::from_keyword(&value).unwrap_or(TokenKind::Identifier(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            kinds("SELECT * FROM users"),
            vec![
                TokenKind::Select,
                TokenKind::Asterisk,
                TokenKind::From,
                TokenKind::Identifier("users".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("select From WHERE"),
            vec![
                TokenKind::Select,
                TokenKind::From,
                TokenKind::Where,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a < b <= c > d >= e <> f != g = h"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Lt,
                TokenKind::Identifier("b".into()),
                TokenKind::Lte,
                TokenKind::Identifier("c".into()),
                TokenKind::Gt,
                TokenKind::Identifier("d".into()),
                TokenKind::Gte,
                TokenKind::Identifier("e".into()),
                TokenKind::Neq,
                TokenKind::Identifier("f".into()),
                TokenKind::Neq,
                TokenKind::Identifier("g".into()),
                TokenKind::Eq,
                TokenKind::Identifier("h".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literal_with_escape() {
        assert_eq!(
            kinds(r"SELECT 'it\'s a test'"),
            vec![
                TokenKind::Select,
                TokenKind::Str("it's a test".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("3 3.25 10.0.5"),
            vec![
                TokenKind::Number("3".into()),
                TokenKind::Number("3.25".into()),
                TokenKind::Number("10.0".into()),
                TokenKind::Dot,
                TokenKind::Number("5".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("SELECT -- this is a comment\n* FROM users"),
            vec![
                TokenKind::Select,
                TokenKind::Asterisk,
                TokenKind::From,
                TokenKind::Identifier("users".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_position_tracking() {
        let tokens = Lexer::new("SELECT id\nFROM users").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 8));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 1));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 6));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("SELECT @").tokenize().unwrap_err();
        match err {
            Error::Syntax { line, column, .. } => {
                assert_eq!(line, 1);
                assert_eq!(column, 8);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_punctuation_and_identifiers() {
        assert_eq!(
            kinds("u.id, _tmp1;"),
            vec![
                TokenKind::Identifier("u".into()),
                TokenKind::Dot,
                TokenKind::Identifier("id".into()),
                TokenKind::Comma,
                TokenKind::Identifier("_tmp1".into()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }
}
