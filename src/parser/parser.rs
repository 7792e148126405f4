//! Recursive-descent parser for the zig language subset.
//!
//! Grammar:
//! ```text
//! root         = (extern_block | fn_def)* EOF
//! extern_block = "extern" "{" (fn_proto ";")* "}"
//! fn_def       = fn_proto block
//! fn_proto     = "fn" IDENT "(" (param ("," param)*)? ")" "->" type
//! param        = IDENT ":" type
//! type         = IDENT | "unreachable" | "*" ("const" | "mut") type
//! block        = "{" statement* "}"
//! statement    = "return" expr ";" | expr ";"
//! expr         = NUMBER | STRING | IDENT "(" args ")" | "unreachable"
//! args         = (expr ("," expr)*)?
//! ```
//!
//! Every node records the 1-based line and column of its first token.

use crate::ast::{
    Block, Expr, ExprKind, ExternBlock, FnDecl, FnDef, FnProto, ParamDecl, Root, Span, Statement,
    TopLevelDecl, TypeRef, TypeRefKind,
};
use crate::errors::{self, Phase};
use crate::lexer::lexer::Token;
use logos::Logos;

/// A single token together with the source text it matched and its position.
#[derive(Debug, Clone)]
struct SpannedToken {
    token: Token,
    lexeme: String,
    span: Span,
}

/// Recursive-descent parser.
///
/// Tokens are pre-lexed into a flat vector so we have random access to
/// the token kind, the original source text, and the source position.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    /// Create a new parser by lexing the full source up-front.
    pub fn new(source: &str) -> Self {
        let line_starts = line_starts(source);
        let mut lexer = Token::lexer(source);
        let mut tokens = Vec::new();

        while let Some(result) = lexer.next() {
            let span = position_at(&line_starts, lexer.span().start);
            match result {
                Ok(token) => tokens.push(SpannedToken {
                    token,
                    lexeme: lexer.slice().to_string(),
                    span,
                }),
                Err(()) => errors::fatal(
                    Phase::Lexer,
                    format!(
                        "unexpected character {:?} at {}:{}",
                        lexer.slice(),
                        span.line,
                        span.column
                    ),
                ),
            }
        }

        Self { tokens, pos: 0 }
    }

    // ── helpers ──────────────────────────────────────────────────────

    /// Look at the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    /// Consume and return the current token + lexeme + span.
    fn advance(&mut self) -> SpannedToken {
        match self.tokens.get(self.pos) {
            Some(st) => {
                self.pos += 1;
                st.clone()
            }
            None => errors::fatal(Phase::Parser, "unexpected end of input"),
        }
    }

    /// Consume the next token and assert it matches `expected`.
    fn expect(&mut self, expected: Token, msg: &str) -> SpannedToken {
        let st = self.advance();
        if st.token != expected {
            errors::fatal(
                Phase::Parser,
                format!(
                    "{}:{}: {msg} (expected {expected:?}, got {:?})",
                    st.span.line, st.span.column, st.token
                ),
            );
        }
        st
    }

    /// Return `true` if there are more tokens to consume.
    fn has_more(&self) -> bool {
        self.pos < self.tokens.len()
    }

    // ── grammar rules ───────────────────────────────────────────────

    /// Entry point. Parse the entire source into a [`Root`].
    pub fn parse_root(mut self) -> Root {
        let mut decls = Vec::new();

        while self.has_more() {
            match self.peek() {
                Some(Token::Extern) => decls.push(TopLevelDecl::Extern(self.parse_extern_block())),
                Some(Token::Fn) => decls.push(TopLevelDecl::FnDef(self.parse_fn_def())),
                _ => {
                    let st = self.advance();
                    errors::fatal(
                        Phase::Parser,
                        format!(
                            "{}:{}: expected 'extern' or 'fn' at top level, got {:?}",
                            st.span.line, st.span.column, st.token
                        ),
                    );
                }
            }
        }

        Root { decls }
    }

    /// Parse `extern { fn_proto ";" ... }`.
    fn parse_extern_block(&mut self) -> ExternBlock {
        let span = self.expect(Token::Extern, "expected 'extern'").span;
        self.expect(Token::LBrace, "expected '{' after 'extern'");

        let mut fn_decls = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            let proto = self.parse_fn_proto();
            let decl_span = proto.span;
            self.expect(Token::Semi, "expected ';' after extern declaration");
            fn_decls.push(FnDecl { span: decl_span, proto });
        }
        self.expect(Token::RBrace, "expected '}' to close extern block");

        ExternBlock { span, fn_decls }
    }

    /// Parse a function definition: prototype followed by a block body.
    fn parse_fn_def(&mut self) -> FnDef {
        let proto = self.parse_fn_proto();
        let span = proto.span;
        let body = self.parse_block();
        FnDef { span, proto, body }
    }

    /// Parse `fn name(params) -> type`.
    fn parse_fn_proto(&mut self) -> FnProto {
        let span = self.expect(Token::Fn, "expected 'fn'").span;
        let name = self.parse_ident();

        self.expect(Token::LParen, "expected '(' after function name");
        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            params.push(self.parse_param_decl());
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                params.push(self.parse_param_decl());
            }
        }
        self.expect(Token::RParen, "expected ')' after parameter list");

        self.expect(Token::Arrow, "expected '->' before return type");
        let return_type = self.parse_type();

        FnProto { span, name, params, return_type }
    }

    /// Parse `name: type`.
    fn parse_param_decl(&mut self) -> ParamDecl {
        let st = self.advance();
        let name = match st.token {
            Token::Ident => st.lexeme,
            other => errors::fatal(
                Phase::Parser,
                format!(
                    "{}:{}: expected parameter name, got {other:?}",
                    st.span.line, st.span.column
                ),
            ),
        };
        self.expect(Token::Colon, "expected ':' after parameter name");
        let ty = self.parse_type();
        ParamDecl { span: st.span, name, ty }
    }

    /// Parse a type reference: a primitive name or `*const T` / `*mut T`.
    fn parse_type(&mut self) -> TypeRef {
        let st = self.advance();
        match st.token {
            Token::Star => {
                let qualifier = self.advance();
                let is_const = match qualifier.token {
                    Token::Const => true,
                    Token::Mut => false,
                    other => errors::fatal(
                        Phase::Parser,
                        format!(
                            "{}:{}: expected 'const' or 'mut' after '*', got {other:?}",
                            qualifier.span.line, qualifier.span.column
                        ),
                    ),
                };
                let child = self.parse_type();
                TypeRef::new(
                    st.span,
                    TypeRefKind::Pointer { is_const, child: Box::new(child) },
                )
            }
            Token::Ident => TypeRef::new(st.span, TypeRefKind::Primitive(st.lexeme)),
            // `unreachable` lexes as a keyword but also names a type.
            Token::Unreachable => {
                TypeRef::new(st.span, TypeRefKind::Primitive("unreachable".to_string()))
            }
            other => errors::fatal(
                Phase::Parser,
                format!(
                    "{}:{}: expected type, got {other:?}",
                    st.span.line, st.span.column
                ),
            ),
        }
    }

    /// Parse `{ statement* }`.
    fn parse_block(&mut self) -> Block {
        let span = self.expect(Token::LBrace, "expected '{' to open function body").span;

        let mut statements = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    break;
                }
                Some(Token::Return) => {
                    self.advance();
                    let expr = self.parse_expr();
                    self.expect(Token::Semi, "expected ';' after return expression");
                    statements.push(Statement::Return(expr));
                }
                Some(_) => {
                    let expr = self.parse_expr();
                    self.expect(Token::Semi, "expected ';' after expression");
                    statements.push(Statement::Expr(expr));
                }
                None => errors::fatal(Phase::Parser, "unexpected end of input inside function body"),
            }
        }

        Block { span, statements }
    }

    /// Parse a single expression.
    fn parse_expr(&mut self) -> Expr {
        let st = self.advance();
        match st.token {
            Token::Number => Expr { span: st.span, kind: ExprKind::Number(st.lexeme) },
            Token::Str => Expr { span: st.span, kind: ExprKind::Str(unescape_string(&st.lexeme)) },
            Token::Unreachable => Expr { span: st.span, kind: ExprKind::Unreachable },
            Token::Ident => {
                self.expect(Token::LParen, "expected '(' after callee name");
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    args.push(self.parse_expr());
                    while self.peek() == Some(&Token::Comma) {
                        self.advance();
                        args.push(self.parse_expr());
                    }
                }
                self.expect(Token::RParen, "expected ')' after arguments");
                Expr { span: st.span, kind: ExprKind::FnCall { name: st.lexeme, args } }
            }
            other => errors::fatal(
                Phase::Parser,
                format!(
                    "{}:{}: unexpected token in expression: {other:?}",
                    st.span.line, st.span.column
                ),
            ),
        }
    }

    /// Consume the next token and interpret it as an identifier string.
    fn parse_ident(&mut self) -> String {
        let st = self.advance();
        match st.token {
            Token::Ident => st.lexeme,
            other => errors::fatal(
                Phase::Parser,
                format!(
                    "{}:{}: expected identifier, got {other:?}",
                    st.span.line, st.span.column
                ),
            ),
        }
    }
}

// ── source positions ────────────────────────────────────────────────

/// Byte offsets at which each line begins.
fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// Map a byte offset to 1-based line and column.
fn position_at(line_starts: &[usize], offset: usize) -> Span {
    let line_idx = line_starts.partition_point(|&start| start <= offset) - 1;
    Span {
        line: (line_idx + 1) as u32,
        column: (offset - line_starts[line_idx] + 1) as u32,
    }
}

/// Strip the surrounding quotes and process backslash escapes.
fn unescape_string(lexeme: &str) -> Vec<u8> {
    let inner = &lexeme[1..lexeme.len() - 1];
    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes();

    while let Some(byte) = chars.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b'r') => bytes.push(b'\r'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'0') => bytes.push(0),
            Some(b'\\') => bytes.push(b'\\'),
            Some(b'"') => bytes.push(b'"'),
            Some(other) => bytes.push(other),
            None => {}
        }
    }

    bytes
}
