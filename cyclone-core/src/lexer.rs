//! Lexer for the Cyclone machine language.

use crate::diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::span::Span;

/// Kind of a token produced by the lexer.
///
/// The lexer only recognizes keywords and literals; the parser gives
/// them structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    IntLiteral,
    RealLiteral,
    StringLiteral,
    CharLiteral,
    BoolLiteral, // true / false

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    Comma,     // ,
    Semi,      // ;
    Colon,     // :
    Assign,    // =
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Percent,   // %
    Bang,      // !
    Less,      // <
    Greater,   // >

    // Compound operators
    Arrow,     // ->
    EqEq,      // ==
    NotEq,     // !=
    LessEq,    // <=
    GreaterEq, // >=
    AndAnd,    // &&
    OrOr,      // ||

    // Keywords
    Machine,
    State,
    Start,
    Final,
    Trans,
    Where,
    Do,
    Var,
    Enum,
}

impl TokenKind {
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Ident => "identifier",
            TokenKind::IntLiteral => "integer literal",
            TokenKind::RealLiteral => "real literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::CharLiteral => "character literal",
            TokenKind::BoolLiteral => "boolean literal",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semi => "';'",
            TokenKind::Colon => "':'",
            TokenKind::Assign => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Bang => "'!'",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::Arrow => "'->'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::LessEq => "'<='",
            TokenKind::GreaterEq => "'>='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Machine => "'machine'",
            TokenKind::State => "'state'",
            TokenKind::Start => "'start'",
            TokenKind::Final => "'final'",
            TokenKind::Trans => "'trans'",
            TokenKind::Where => "'where'",
            TokenKind::Do => "'do'",
            TokenKind::Var => "'var'",
            TokenKind::Enum => "'enum'",
        }
    }
}

/// A single token with its kind and span.
///
/// `text_start` / `text_end` are byte offsets of the token text; for
/// string and char literals they exclude the quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text_start: u32,
    pub text_end: u32,
}

impl Token {
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.text_start as usize..self.text_end as usize]
    }
}

/// Result of lexing a source file.
///
/// Lexical errors are recovered by skipping the offending text; they are
/// reported as syntax diagnostics rather than aborting.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Diagnostics,
}

/// Lex a source string into tokens. The last token is always `Eof`.
pub fn lex(source: &str) -> LexResult {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        len: source.len(),
        index: 0,
        diagnostics: Diagnostics::new(),
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    len: usize,
    index: usize,
    diagnostics: Diagnostics,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> LexResult {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }
            if ch == b'/' && self.peek_next() == Some(b'/') {
                self.skip_line_comment();
                continue;
            }

            let start = self.index as u32;
            let token = match ch {
                b'(' => self.single(TokenKind::LParen, start),
                b')' => self.single(TokenKind::RParen, start),
                b'{' => self.single(TokenKind::LBrace, start),
                b'}' => self.single(TokenKind::RBrace, start),
                b',' => self.single(TokenKind::Comma, start),
                b';' => self.single(TokenKind::Semi, start),
                b':' => self.single(TokenKind::Colon, start),
                b'+' => self.single(TokenKind::Plus, start),
                b'*' => self.single(TokenKind::Star, start),
                b'/' => self.single(TokenKind::Slash, start),
                b'%' => self.single(TokenKind::Percent, start),
                b'-' => self.one_or_two(b'>', TokenKind::Arrow, TokenKind::Minus, start),
                b'=' => self.one_or_two(b'=', TokenKind::EqEq, TokenKind::Assign, start),
                b'!' => self.one_or_two(b'=', TokenKind::NotEq, TokenKind::Bang, start),
                b'<' => self.one_or_two(b'=', TokenKind::LessEq, TokenKind::Less, start),
                b'>' => self.one_or_two(b'=', TokenKind::GreaterEq, TokenKind::Greater, start),
                b'&' | b'|' => {
                    // Only the doubled forms exist.
                    if self.peek_next() == Some(ch) {
                        self.consume_char();
                        self.consume_char();
                        let kind = if ch == b'&' {
                            TokenKind::AndAnd
                        } else {
                            TokenKind::OrOr
                        };
                        self.simple_token(kind, start)
                    } else {
                        self.consume_char();
                        self.unexpected_char(start)
                    }
                }
                b'"' => self.lex_quoted(start, b'"', TokenKind::StringLiteral),
                b'\'' => self.lex_quoted(start, b'\'', TokenKind::CharLiteral),
                b'0'..=b'9' => self.lex_number(start),
                _ => {
                    if is_ident_start(ch) {
                        self.lex_ident_or_keyword(start)
                    } else {
                        self.consume_utf8_char();
                        self.unexpected_char(start)
                    }
                }
            };

            if let Some(tok) = token {
                tokens.push(tok);
            }
        }

        let eof = self.len as u32;
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::point(eof),
            text_start: eof,
            text_end: eof,
        });

        LexResult {
            tokens,
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }

    fn single(&mut self, kind: TokenKind, start: u32) -> Option<Token> {
        self.consume_char();
        self.simple_token(kind, start)
    }

    fn one_or_two(
        &mut self,
        second: u8,
        double: TokenKind,
        single: TokenKind,
        start: u32,
    ) -> Option<Token> {
        self.consume_char();
        if self.peek_char() == Some(second) {
            self.consume_char();
            self.simple_token(double, start)
        } else {
            self.simple_token(single, start)
        }
    }

    fn simple_token(&self, kind: TokenKind, start: u32) -> Option<Token> {
        let end = self.index as u32;
        Some(Token {
            kind,
            span: Span::new(start, end),
            text_start: start,
            text_end: end,
        })
    }

    fn unexpected_char(&mut self, start: u32) -> Option<Token> {
        let end = self.index as u32;
        let text = &self.source[start as usize..end as usize];
        self.diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnexpectedCharacter,
            format!("unexpected character `{text}`"),
            Span::new(start, end),
        ));
        None
    }

    fn lex_quoted(&mut self, start: u32, quote: u8, kind: TokenKind) -> Option<Token> {
        // Consume the opening quote
        self.consume_char();

        let content_start = self.index;
        while let Some(ch) = self.peek_char() {
            match ch {
                b'\n' => break,
                b'\\' => {
                    // Skip over escape sequence: backslash + next char (if any)
                    self.consume_char();
                    if self.peek_char().is_some() {
                        self.consume_utf8_char();
                    }
                }
                _ if ch == quote => {
                    let content_end = self.index;
                    self.consume_char();
                    return Some(Token {
                        kind,
                        span: Span::new(start, self.index as u32),
                        text_start: content_start as u32,
                        text_end: content_end as u32,
                    });
                }
                _ => self.consume_utf8_char(),
            }
        }

        self.diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnterminatedLiteral,
            format!("unterminated {}", kind.describe()),
            Span::new(start, self.index as u32),
        ));
        None
    }

    fn lex_number(&mut self, start: u32) -> Option<Token> {
        // integer or real: digits [ '.' digits ]?
        self.consume_digits();

        let mut is_real = false;
        if self.peek_char() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_real = true;
            self.consume_char(); // '.'
            self.consume_digits();
        }

        let kind = if is_real {
            TokenKind::RealLiteral
        } else {
            TokenKind::IntLiteral
        };
        self.simple_token(kind, start)
    }

    fn consume_digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if matches!(ch, b'0'..=b'9' | b'_') {
                self.consume_char();
            } else {
                break;
            }
        }
    }

    fn lex_ident_or_keyword(&mut self, start: u32) -> Option<Token> {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let end = self.index as u32;
        let text = &self.source[start as usize..end as usize];

        let kind = match text {
            "machine" => TokenKind::Machine,
            "state" => TokenKind::State,
            "start" => TokenKind::Start,
            "final" => TokenKind::Final,
            "trans" => TokenKind::Trans,
            "where" => TokenKind::Where,
            "do" => TokenKind::Do,
            "var" => TokenKind::Var,
            "enum" => TokenKind::Enum,
            "true" | "false" => TokenKind::BoolLiteral,
            _ => TokenKind::Ident,
        };

        self.simple_token(kind, start)
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.len {
            self.index += 1;
        }
    }

    /// Consume a whole UTF-8 scalar so spans stay on char boundaries.
    fn consume_utf8_char(&mut self) {
        let width = self.source[self.index..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        self.index = (self.index + width).min(self.len);
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}
