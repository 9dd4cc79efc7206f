use std::str::Chars;

use peekmore::{PeekMore, PeekMoreIterator};

use crate::error::{Error, LexError};
use crate::token::{keyword_lookup, Kind, Location, Token};

/// Characters that may combine (maximal munch) into a symbolic operator.
const OPERATOR_CHARS: &str = "+-*<>&.@/:=~|$!#%^_[]{}\"`?";

pub struct Scanner<'a> {
    source: PeekMoreIterator<Chars<'a>>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column_offset: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source: source.chars().peekmore(),
            tokens: vec![],
            start: 0,
            current: 0,
            line: 0,
            column_offset: 0,
        }
    }

    /// Scans the whole source and returns its tokens, terminated by `EndOfFile`.
    pub fn scan_tokens(&mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token::new(Kind::EndOfFile, "", Location::new(self.line, 0)));

        std::mem::take(&mut self.tokens)
    }

    fn advance(&mut self) -> char {
        match self.source.next() {
            Some(c) => {
                self.current += 1;
                c
            }
            None => panic!("tried to advance past end of the file"),
        }
    }

    fn peek(&mut self) -> char {
        *self.source.peek().unwrap_or(&'\0')
    }

    fn peek_next(&mut self) -> char {
        *self.source.peek_next().unwrap_or(&'\0')
    }

    fn is_at_end(&mut self) -> bool {
        self.source.peek().is_none()
    }

    fn add_token(&mut self, kind: Kind, lexeme: String) {
        self.tokens.push(Token::new(kind, lexeme, Location::new(self.line, self.start - self.column_offset)));
    }

    fn string(&mut self, quote: char) {
        let start_col = self.start - self.column_offset;
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            if self.is_at_end() {
                LexError {
                    line: self.line,
                    column: start_col,
                    message: "unterminated string".to_string(),
                }
                .throw();
                return;
            }

            let c = self.peek();
            if c == quote {
                break;
            }

            self.advance();
            if c == '\\' {
                let escaped = self.advance();
                value.push(match escaped {
                    't' => '\t',
                    'n' => '\n',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    other => {
                        LexError {
                            line: self.line,
                            column: start_col,
                            message: format!("unknown escape sequence '\\{other}'"),
                        }
                        .throw();
                        other
                    }
                });
            } else {
                if c == '\n' {
                    self.line += 1;
                }
                value.push(c);
            }
        }

        self.advance(); // closing quote
        self.add_token(Kind::Str, value);
    }

    /// Both `"` and `'` delimit strings; maximal munch would otherwise
    /// swallow a lone `'` as a symbolic operator, so quotes are checked
    /// ahead of the general operator dispatch.
    fn is_quote(c: char) -> bool {
        c == '"' || c == '\''
    }

    fn integer(&mut self) {
        let mut value = String::new();
        while self.peek().is_ascii_digit() {
            value.push(self.advance());
        }
        self.add_token(Kind::Integer, value);
    }

    fn identifier(&mut self) {
        let mut value = String::new();
        while matches!(self.peek(), c if c.is_alphanumeric() || c == '_') {
            value.push(self.advance());
        }

        match keyword_lookup(&value) {
            Some(kw) => self.add_token(Kind::Keyword, kw.to_string()),
            None => self.add_token(Kind::Identifier, value),
        }
    }

    fn operator(&mut self) {
        let mut value = String::new();
        while OPERATOR_CHARS.contains(self.peek()) {
            value.push(self.advance());
        }
        self.add_token(Kind::Operator, value);
    }

    fn scan_token(&mut self) {
        let c = self.peek();
        match c {
            '(' | ')' | ';' | ',' => {
                self.advance();
                self.add_token(Kind::Punctuation, c.to_string());
            }

            ' ' | '\r' | '\t' => {
                self.advance();
            }

            '\n' => {
                self.advance();
                self.line += 1;
                self.column_offset = self.current;
            }

            '/' if self.peek_next() == '/' => {
                while self.peek() != '\n' && !self.is_at_end() {
                    self.advance();
                }
            }

            c if Self::is_quote(c) => self.string(c),

            c if c.is_ascii_digit() => self.integer(),

            c if c.is_alphabetic() => self.identifier(),

            c if OPERATOR_CHARS.contains(c) => self.operator(),

            _ => {
                self.advance();
                LexError {
                    line: self.line,
                    column: self.start - self.column_offset,
                    message: format!("unexpected character '{c}'"),
                }
                .throw();
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(src: &str) -> Vec<Kind> {
        Scanner::new(src).scan_tokens().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_integers_and_identifiers() {
        let tokens = Scanner::new("let x = 42").scan_tokens();
        assert_eq!(tokens[0].kind, Kind::Keyword);
        assert_eq!(tokens[1].kind, Kind::Identifier);
        assert_eq!(tokens[2].kind, Kind::Operator);
        assert_eq!(tokens[3].kind, Kind::Integer);
        assert_eq!(tokens[3].lexeme, "42");
    }

    #[test]
    fn scans_string_with_escapes() {
        let tokens = Scanner::new("\"a\\tb\"").scan_tokens();
        assert_eq!(tokens[0].kind, Kind::Str);
        assert_eq!(tokens[0].lexeme, "a\tb");
    }

    #[test]
    fn scans_single_quoted_strings() {
        let tokens = Scanner::new("'abc'").scan_tokens();
        assert_eq!(tokens[0].kind, Kind::Str);
        assert_eq!(tokens[0].lexeme, "abc");
    }

    #[test]
    fn unterminated_string_is_lex_error() {
        crate::error::reset_error();
        let _ = Scanner::new("\"abc").scan_tokens();
        assert!(crate::error::did_error());
        crate::error::reset_error();
    }

    #[test]
    fn maximal_munch_on_operators() {
        let tokens = Scanner::new("1**2").scan_tokens();
        assert_eq!(kinds("1**2"), vec![Kind::Integer, Kind::Operator, Kind::Integer, Kind::EndOfFile]);
        assert_eq!(tokens[1].lexeme, "**");
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(kinds("1 // comment\n2"), vec![Kind::Integer, Kind::Integer, Kind::EndOfFile]);
    }
}
