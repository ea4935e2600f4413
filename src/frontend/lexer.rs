//! Lexer for the C++ front end
//!
//! Converts source text into a stream of tokens. Directive lines are
//! routed to the lexer's own [`Preprocessor`]; identifiers naming a macro
//! are substituted once, and regions disabled by conditional compilation
//! are skipped line by line without being tokenized.

use log::trace;

use crate::frontend::preprocessor::{Diagnostic, Preprocessor};
use crate::frontend::token::{NumericValue, Token, TokenKind};
use crate::utils::Span;

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    line: u32,
    column: u32,
    start_line: u32,
    start_column: u32,
    /// Only whitespace seen since the last newline
    at_line_start: bool,
    /// End of input already reported to the preprocessor
    finished: bool,
    preprocessor: Preprocessor,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            at_line_start: true,
            finished: false,
            preprocessor: Preprocessor::new(),
        }
    }

    /// Create a lexer with object-like macros predefined, as if by
    /// `#define NAME VALUE` lines ahead of the source
    pub fn with_defines<I, K, V>(source: &str, defines: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut lexer = Self::new(source);
        for (name, value) in defines {
            lexer.preprocessor.macros_mut().define(name, value);
        }
        lexer
    }

    /// Preprocessor warnings collected so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.preprocessor.diagnostics()
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    // ==================== Character access ====================

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume the current character if it matches
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn mark_start(&mut self) {
        self.start = self.pos;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.start_line, self.start_column)
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.pos].iter().collect()
    }

    /// Create a token whose text is the consumed lexeme
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), self.make_span())
    }

    fn error_token(&self, message: impl Into<String>) -> Token {
        Token::new(TokenKind::Error, message, self.make_span())
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c' => {
                    self.advance();
                }
                // Line comment
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment
                '/' if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Discard the rest of the current line (inactive region)
    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    // ==================== Directives ====================

    /// Read a directive line starting at `#` and hand it to the
    /// preprocessor
    fn read_directive(&mut self) -> Option<Token> {
        self.mark_start();
        self.advance(); // #
        self.at_line_start = false;

        while matches!(self.peek(), Some(' ' | '\t')) {
            self.advance();
        }
        let mut keyword = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                keyword.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let rest = self.read_directive_text();

        let span = self.make_span();
        let (kind, text) = self.preprocessor.handle_directive(&keyword, &rest, span)?;
        trace!("directive {:?} `{}` at {}", kind, text, span);
        Some(Token::new(kind, text, span))
    }

    /// Rest of a directive line with continuations joined and comments
    /// removed. Stops before the terminating newline.
    fn read_directive_text(&mut self) -> String {
        let mut text = String::new();
        let mut quote: Option<char> = None;

        while let Some(c) = self.peek() {
            match c {
                '\n' => break,
                '\\' if self.peek_next() == Some('\n') => {
                    self.advance();
                    self.advance();
                    self.at_line_start = false;
                    text.push(' ');
                }
                '\\' if self.peek_next() == Some('\r')
                    && self.source.get(self.pos + 2) == Some(&'\n') =>
                {
                    self.advance();
                    self.advance();
                    self.advance();
                    self.at_line_start = false;
                    text.push(' ');
                }
                '\\' if quote.is_some() => {
                    text.push(c);
                    self.advance();
                    if let Some(escaped) = self.peek().filter(|&e| e != '\n') {
                        text.push(escaped);
                        self.advance();
                    }
                }
                '"' | '\'' if quote.is_none() => {
                    quote = Some(c);
                    text.push(c);
                    self.advance();
                }
                _ if quote == Some(c) => {
                    quote = None;
                    text.push(c);
                    self.advance();
                }
                '/' if quote.is_none() && self.peek_next() == Some('/') => {
                    self.skip_line();
                    break;
                }
                '/' if quote.is_none() && self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                    self.at_line_start = false;
                    text.push(' ');
                }
                _ => {
                    text.push(c);
                    self.advance();
                }
            }
        }

        text.trim().to_string()
    }

    // ==================== Tokens ====================

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.lexeme();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident);
        Token::new(kind, text, self.make_span())
    }

    /// Read a number literal (integer or float)
    fn read_number(&mut self) -> Token {
        // Hex literal
        if self.peek() == Some('0') && matches!(self.peek_next(), Some('x' | 'X')) {
            self.advance();
            self.advance();
            while self.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let text = self.lexeme();
            if text.len() == 2 {
                return self.error_token(format!("invalid integer literal `{}`", text));
            }
            return self.int_token(i64::from_str_radix(&text[2..], 16).ok());
        }

        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // A single `.` followed by digits makes it a float
        if self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
            let text = self.lexeme();
            return match text.parse::<f64>() {
                Ok(value) => self.make_token(TokenKind::FloatLit).with_value(NumericValue::Float(value)),
                Err(_) => self.error_token(format!("invalid float literal `{}`", text)),
            };
        }

        let value = self.lexeme().parse::<i64>().ok();
        self.int_token(value)
    }

    /// Integer literal; a value outside `i64` leaves the payload empty
    fn int_token(&self, value: Option<i64>) -> Token {
        let token = self.make_token(TokenKind::IntLit);
        match value {
            Some(value) => token.with_value(NumericValue::Int(value)),
            None => {
                trace!("integer literal `{}` exceeds i64", token.text);
                token
            }
        }
    }

    /// Read a string or character literal. Escapes are kept verbatim; the
    /// token text excludes the delimiters.
    fn read_quoted(&mut self, delimiter: char) -> Token {
        self.advance(); // opening delimiter
        let (kind, what) = if delimiter == '"' {
            (TokenKind::StringLit, "string")
        } else {
            (TokenKind::CharLit, "character")
        };

        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return self.error_token(format!("unterminated {} literal", what));
                }
                Some(c) if c == delimiter => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    text.push('\\');
                    self.advance();
                    match self.peek() {
                        Some(escaped) if escaped != '\n' => {
                            text.push(escaped);
                            self.advance();
                        }
                        _ => {}
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }

        if kind == TokenKind::CharLit {
            if text.is_empty() {
                return self.error_token("empty character literal");
            }
            if !text.starts_with('\\') && text.chars().count() != 1 {
                return self.error_token(format!("multi-character literal '{}'", text));
            }
        }

        Token::new(kind, text, self.make_span())
    }

    /// Scan one token from the current position. Operators take the
    /// longest matching spelling.
    fn lex_token(&mut self) -> Token {
        self.mark_start();
        self.at_line_start = false;

        let Some(c) = self.peek() else {
            return Token::eof(self.make_span());
        };

        if c.is_ascii_alphabetic() || c == '_' {
            return self.read_identifier();
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == '"' || c == '\'' {
            return self.read_quoted(c);
        }

        self.advance();
        let kind = match c {
            '+' => {
                if self.match_char('+') {
                    TokenKind::PlusPlus
                } else if self.match_char('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.match_char('-') {
                    TokenKind::MinusMinus
                } else if self.match_char('=') {
                    TokenKind::MinusEq
                } else if self.match_char('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.match_char('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.match_char('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.match_char('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.match_char('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.match_char('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.match_char('=') {
                    TokenKind::LtEq
                } else if self.match_char('<') {
                    if self.match_char('=') {
                        TokenKind::ShlEq
                    } else {
                        TokenKind::Shl
                    }
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenKind::GtEq
                } else if self.match_char('>') {
                    if self.match_char('=') {
                        TokenKind::ShrEq
                    } else {
                        TokenKind::Shr
                    }
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.match_char('&') {
                    TokenKind::AndAnd
                } else if self.match_char('=') {
                    TokenKind::AmpEq
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.match_char('|') {
                    TokenKind::OrOr
                } else if self.match_char('=') {
                    TokenKind::PipeEq
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => {
                if self.match_char('=') {
                    TokenKind::CaretEq
                } else {
                    TokenKind::Caret
                }
            }
            ':' => {
                if self.match_char(':') {
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                }
            }
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '#' => TokenKind::Hash,
            _ => return self.error_token(format!("unexpected character `{}`", c)),
        };

        self.make_token(kind)
    }

    /// Get the next token of the filtered, macro-substituted stream
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                self.mark_start();
                if !self.finished {
                    self.finished = true;
                    self.preprocessor.finish(self.make_span());
                }
                return Token::eof(self.make_span());
            }

            if self.at_line_start && self.peek() == Some('#') {
                if let Some(token) = self.read_directive() {
                    return token;
                }
                continue;
            }

            if !self.preprocessor.is_active() {
                self.skip_line();
                continue;
            }

            let mut token = self.lex_token();
            if token.kind == TokenKind::Ident {
                if let Some(replacement) = self.preprocessor.expand(&token.text) {
                    token.text = replacement.to_string();
                }
            }
            trace!("token {:?} `{}` at {}", token.kind, token.text, token.span);
            return token;
        }
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
