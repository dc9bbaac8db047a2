use crate::ast::{Keyword, Token, TokenKind};

pub use crate::ast::Position;

/// Single-pass SQL tokenizer.
///
/// The lexer never fails: anything it cannot make sense of becomes a
/// [`TokenKind::Error`] token at the offending position and lexing carries
/// on after it. Comments are returned as [`TokenKind::Comment`] trivia.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    offset: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Collect every token up to and including the final `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tracing::trace!(count = tokens.len(), "tokenized input");
        tokens
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += 1;
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn mark(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn text_from(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn read_word(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Read a delimited run where a doubled closing delimiter stands for
    /// itself (`'it''s'`, `[a]]b]`, `"say ""hi"""`). Returns `None` when the
    /// input ends before the closing delimiter.
    fn read_delimited(&mut self, close: char) -> Option<String> {
        let mut result = String::new();
        self.advance(); // opening delimiter

        while let Some(ch) = self.current_char() {
            if ch == close {
                if self.peek_char(1) == Some(close) {
                    result.push(close);
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    return Some(result);
                }
            } else {
                result.push(ch);
                self.advance();
            }
        }
        None
    }

    fn read_line_comment(&mut self) -> String {
        self.advance();
        self.advance(); // --
        let mut body = String::new();
        while let Some(ch) = self.current_char() {
            if ch == '\n' {
                break;
            }
            body.push(ch);
            self.advance();
        }
        body.trim().to_string()
    }

    fn read_block_comment(&mut self) -> Option<String> {
        self.advance();
        self.advance(); // /*
        let mut body = String::new();
        while let Some(ch) = self.current_char() {
            if ch == '*' && self.peek_char(1) == Some('/') {
                self.advance();
                self.advance();
                return Some(body.trim().to_string());
            }
            body.push(ch);
            self.advance();
        }
        None
    }

    fn read_number(&mut self) -> TokenKind {
        let mut number = String::new();
        let mut seen_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !seen_dot
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                seen_dot = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // `10abc` is neither a number nor an identifier
        if self
            .current_char()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
        {
            let rest = self.read_word();
            return TokenKind::Error(format!("Invalid numeric literal '{}{}'", number, rest));
        }

        TokenKind::Number(number)
    }

    /// Produce the next token; returns `Eof` forever once input is exhausted.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start_index = self.position;
        let start = self.mark();

        let kind = match self.current_char() {
            None => TokenKind::Eof,
            Some('-') if self.peek_char(1) == Some('-') => {
                TokenKind::Comment(self.read_line_comment())
            }
            Some('/') if self.peek_char(1) == Some('*') => match self.read_block_comment() {
                Some(body) => TokenKind::Comment(body),
                None => TokenKind::Error("Unterminated block comment".to_string()),
            },
            Some('\'') => match self.read_delimited('\'') {
                Some(s) => TokenKind::String(s),
                None => TokenKind::Error("Unterminated string literal".to_string()),
            },
            Some('[') => match self.read_delimited(']') {
                Some(name) if name.is_empty() => TokenKind::Error("Empty identifier '[]'".to_string()),
                Some(name) => TokenKind::Identifier(name),
                None => TokenKind::Error("Unterminated bracketed identifier".to_string()),
            },
            Some('"') => match self.read_delimited('"') {
                Some(name) if name.is_empty() => TokenKind::Error("Empty identifier '\"\"'".to_string()),
                Some(name) => TokenKind::Identifier(name),
                None => TokenKind::Error("Unterminated quoted identifier".to_string()),
            },
            Some('=') => {
                self.advance();
                TokenKind::Eq
            }
            Some('<') => {
                self.advance();
                match self.current_char() {
                    Some('=') => {
                        self.advance();
                        TokenKind::LtEq
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::NotEq
                    }
                    _ => TokenKind::Lt,
                }
            }
            Some('>') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            Some('!') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    TokenKind::Error("Unexpected character '!' (did you mean '!=' or '<>'?)".to_string())
                }
            }
            Some('*') => {
                self.advance();
                TokenKind::Star
            }
            Some('-') => {
                self.advance();
                TokenKind::Minus
            }
            Some(',') => {
                self.advance();
                TokenKind::Comma
            }
            Some('.') => {
                self.advance();
                TokenKind::Dot
            }
            Some('(') => {
                self.advance();
                TokenKind::LParen
            }
            Some(')') => {
                self.advance();
                TokenKind::RParen
            }
            Some(';') => {
                self.advance();
                TokenKind::Semicolon
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let word = self.read_word();
                match Keyword::from_word(&word) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Identifier(word),
                }
            }
            Some(ch) => {
                self.advance();
                TokenKind::Error(format!("Unexpected character '{}'", ch))
            }
        };

        Token::new(kind, self.text_from(start_index), start)
    }
}

#[test]
fn test_keywords_are_case_insensitive() {
    let mut lexer = Lexer::new("select From wHeRe");
    assert_eq!(lexer.next_token().kind, TokenKind::Keyword(Keyword::Select));
    assert_eq!(lexer.next_token().kind, TokenKind::Keyword(Keyword::From));
    assert_eq!(lexer.next_token().kind, TokenKind::Keyword(Keyword::Where));
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
}

#[test]
fn test_select_star() {
    let mut lexer = Lexer::new("SELECT * FROM account;");
    assert_eq!(lexer.next_token().kind, TokenKind::Keyword(Keyword::Select));
    assert_eq!(lexer.next_token().kind, TokenKind::Star);
    assert_eq!(lexer.next_token().kind, TokenKind::Keyword(Keyword::From));
    assert_eq!(
        lexer.next_token().kind,
        TokenKind::Identifier("account".to_string())
    );
    assert_eq!(lexer.next_token().kind, TokenKind::Semicolon);
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
}
