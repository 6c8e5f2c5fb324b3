//! Recursive-descent parser for the Cyclone machine language.
//!
//! Grammar errors are not recovered: the first one becomes a
//! [`RecognitionFailure`] carrying its position. Lexical errors were
//! already recovered by the lexer and travel alongside the tree.

use crate::ast::{
    Action, BinaryOp, EnumDecl, Expr, ExprKind, Ident, Item, Literal, Machine, StateDecl,
    TransitionDecl, UnaryOp, VarDecl,
};
use crate::diagnostic::Diagnostics;
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind, lex};
use crate::span::{LineIndex, Span};

/// Deepest expression nesting accepted, counting unary operators,
/// parentheses and binary operands.
pub const MAX_NESTING: usize = 256;

/// Front-end failure: no syntax tree could be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionFailure {
    pub source_name: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// Rendered lexical errors recovered before the grammar gave up.
    pub lexical: Vec<String>,
}

impl From<RecognitionFailure> for CoreError {
    fn from(failure: RecognitionFailure) -> Self {
        CoreError::Recognition {
            source_name: failure.source_name,
            line: failure.line,
            column: failure.column,
            message: failure.message,
            lexical: failure.lexical,
        }
    }
}

/// Successful front-end output: the tree plus recovered syntax errors.
#[derive(Debug)]
pub struct ParseOutput {
    pub machine: Machine,
    pub diagnostics: Diagnostics,
}

/// Parse a whole compilation unit rooted at `machine`.
pub fn parse(source: &str, source_name: &str) -> Result<ParseOutput, RecognitionFailure> {
    let lexed = lex(source);
    let mut parser = Parser {
        source,
        tokens: &lexed.tokens,
        position: 0,
        nesting: 0,
    };
    match parser.parse_machine() {
        Ok(machine) => Ok(ParseOutput {
            machine,
            diagnostics: lexed.diagnostics,
        }),
        Err(error) => {
            let lines = LineIndex::new(source);
            let position = lines.position(error.offset);
            Err(RecognitionFailure {
                source_name: source_name.to_string(),
                line: position.line,
                column: position.column,
                message: error.message,
                lexical: lexed
                    .diagnostics
                    .iter()
                    .map(|diag| diag.render(source_name, &lines))
                    .collect(),
            })
        }
    }
}

struct ParseError {
    offset: u32,
    message: String,
}

type PResult<T> = Result<T, ParseError>;

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    position: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn parse_machine(&mut self) -> PResult<Machine> {
        let start = self.expect(TokenKind::Machine)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) {
            items.push(self.parse_item()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        self.expect(TokenKind::Eof)?;
        Ok(Machine {
            name,
            items,
            span: start.to(end),
        })
    }

    fn parse_item(&mut self) -> PResult<Item> {
        match self.peek().kind {
            TokenKind::Enum => self.parse_enum().map(Item::Enum),
            TokenKind::Var => self.parse_var().map(Item::Var),
            TokenKind::Start | TokenKind::Final | TokenKind::State => {
                self.parse_state().map(Item::State)
            }
            TokenKind::Trans => self.parse_transition().map(Item::Transition),
            _ => Err(self.unexpected("a declaration, state or transition")),
        }
    }

    fn parse_enum(&mut self) -> PResult<EnumDecl> {
        let start = self.expect(TokenKind::Enum)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;
        let mut variants = vec![self.expect_ident()?];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::RBrace) {
                break;
            }
            variants.push(self.expect_ident()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(EnumDecl {
            name,
            variants,
            span: start.to(end),
        })
    }

    fn parse_var(&mut self) -> PResult<VarDecl> {
        let start = self.expect(TokenKind::Var)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.expect_ident()?;
        let init = if self.eat(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.expect(TokenKind::Semi)?.span;
        Ok(VarDecl {
            name,
            ty,
            init,
            span: start.to(end),
        })
    }

    fn parse_state(&mut self) -> PResult<StateDecl> {
        let start = self.peek().span;
        let mut is_start = false;
        let mut is_final = false;
        loop {
            if self.eat(TokenKind::Start) {
                is_start = true;
            } else if self.eat(TokenKind::Final) {
                is_final = true;
            } else {
                break;
            }
        }
        self.expect(TokenKind::State)?;
        let name = self.expect_ident()?;
        let mut body = Vec::new();
        let end = if self.eat(TokenKind::LBrace) {
            while !self.at(TokenKind::RBrace) {
                body.push(self.parse_var()?);
            }
            self.expect(TokenKind::RBrace)?.span
        } else {
            self.expect(TokenKind::Semi)?.span
        };
        Ok(StateDecl {
            name,
            is_start,
            is_final,
            body,
            span: start.to(end),
        })
    }

    fn parse_transition(&mut self) -> PResult<TransitionDecl> {
        let start = self.expect(TokenKind::Trans)?.span;
        let source = self.expect_ident()?;
        self.expect(TokenKind::Arrow)?;
        let target = self.expect_ident()?;
        let guard = if self.eat(TokenKind::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let mut actions = Vec::new();
        if self.eat(TokenKind::Do) {
            actions.push(self.parse_action()?);
            while self.eat(TokenKind::Comma) {
                actions.push(self.parse_action()?);
            }
        }
        let end = self.expect(TokenKind::Semi)?.span;
        Ok(TransitionDecl {
            source,
            target,
            guard,
            actions,
            span: start.to(end),
        })
    }

    fn parse_action(&mut self) -> PResult<Action> {
        let target = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        let span = target.span.to(value.span);
        Ok(Action {
            target,
            value,
            span,
        })
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binary(0).map(|(expr, _)| expr)
    }

    /// Precedence climbing over the binary operator table. Returns the
    /// expression with the height of its tree.
    fn parse_binary(&mut self, min_level: u8) -> PResult<(Expr, usize)> {
        let (mut lhs, mut height) = self.parse_unary()?;
        while let Some((op, level)) = binary_op(self.peek().kind) {
            if level < min_level {
                break;
            }
            let op_span = self.bump().span;
            let (rhs, rhs_height) = self.parse_binary(level + 1)?;
            height = 1 + height.max(rhs_height);
            check_nesting(height, op_span)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
        Ok((lhs, height))
    }

    fn parse_unary(&mut self) -> PResult<(Expr, usize)> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        let start = self.bump().span;
        let (operand, height) = self.nested(start, Self::parse_unary)?;
        check_nesting(height + 1, start)?;
        let span = start.to(operand.span);
        Ok((
            Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            },
            height + 1,
        ))
    }

    fn parse_primary(&mut self) -> PResult<(Expr, usize)> {
        let token = self.peek().clone();
        let text = token.text(self.source);
        let literal = match token.kind {
            TokenKind::IntLiteral => {
                let digits: String = text.chars().filter(|c| *c != '_').collect();
                let value = digits.parse::<i64>().map_err(|_| ParseError {
                    offset: token.span.start,
                    message: format!("integer literal `{text}` is out of range"),
                })?;
                Literal::Int(value)
            }
            TokenKind::RealLiteral => {
                let digits: String = text.chars().filter(|c| *c != '_').collect();
                let value = digits.parse::<f64>().map_err(|_| ParseError {
                    offset: token.span.start,
                    message: format!("malformed real literal `{text}`"),
                })?;
                Literal::Real(value)
            }
            TokenKind::StringLiteral => Literal::Str(unescape(text)),
            TokenKind::CharLiteral => {
                let unescaped = unescape(text);
                let mut chars = unescaped.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Literal::Char(ch),
                    _ => {
                        return Err(ParseError {
                            offset: token.span.start,
                            message: "character literal must hold exactly one character"
                                .to_string(),
                        });
                    }
                }
            }
            TokenKind::BoolLiteral => Literal::Bool(text == "true"),
            TokenKind::Ident => {
                self.bump();
                let expr = Expr {
                    kind: ExprKind::Ident(Ident::new(text, token.span)),
                    span: token.span,
                };
                return Ok((expr, 1));
            }
            TokenKind::LParen => {
                let start = self.bump().span;
                let (mut inner, height, end) = self.nested(start, |parser| {
                    let (inner, height) = parser.parse_binary(0)?;
                    let end = parser.expect(TokenKind::RParen)?.span;
                    Ok((inner, height, end))
                })?;
                inner.span = start.to(end);
                return Ok((inner, height));
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.bump();
        let expr = Expr {
            kind: ExprKind::Literal(literal),
            span: token.span,
        };
        Ok((expr, 1))
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(&mut self, at: Span, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.nesting += 1;
        check_nesting(self.nesting, at)?;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn peek(&self) -> &'a Token {
        // The lexer always terminates the stream with Eof.
        let tokens = self.tokens;
        &tokens[self.position.min(tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn bump(&mut self) -> &'a Token {
        let tokens = self.tokens;
        let index = self.position.min(tokens.len() - 1);
        if self.position < tokens.len() {
            self.position += 1;
        }
        &tokens[index]
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<&'a Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        if self.at(TokenKind::Ident) {
            let token = self.bump();
            Ok(Ident::new(token.text(self.source), token.span))
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        let found = match token.kind {
            TokenKind::Eof => token.kind.describe().to_string(),
            _ => format!("`{}`", &self.source[token.span.start as usize..token.span.end as usize]),
        };
        ParseError {
            offset: token.span.start,
            message: format!("expected {expected}, found {found}"),
        }
    }
}

fn check_nesting(depth: usize, at: Span) -> PResult<()> {
    if depth > MAX_NESTING {
        return Err(ParseError {
            offset: at.start,
            message: format!("expression nested too deeply (limit {MAX_NESTING})"),
        });
    }
    Ok(())
}

/// Operator and precedence level; higher binds tighter.
fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::EqEq => (BinaryOp::Eq, 3),
        TokenKind::NotEq => (BinaryOp::Ne, 3),
        TokenKind::Less => (BinaryOp::Lt, 4),
        TokenKind::LessEq => (BinaryOp::Le, 4),
        TokenKind::Greater => (BinaryOp::Gt, 4),
        TokenKind::GreaterEq => (BinaryOp::Ge, 4),
        TokenKind::Plus => (BinaryOp::Add, 5),
        TokenKind::Minus => (BinaryOp::Sub, 5),
        TokenKind::Star => (BinaryOp::Mul, 6),
        TokenKind::Slash => (BinaryOp::Div, 6),
        TokenKind::Percent => (BinaryOp::Rem, 6),
        _ => return None,
    };
    Some(entry)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
