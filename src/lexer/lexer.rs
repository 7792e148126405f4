use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // ── keywords ────────────────────────────────────────────────
    #[token("fn")]
    Fn,

    #[token("extern")]
    Extern,

    #[token("return")]
    Return,

    #[token("unreachable")]
    Unreachable,

    #[token("const")]
    Const,

    #[token("mut")]
    Mut,

    // ── punctuation ─────────────────────────────────────────────
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semi,

    #[token(":")]
    Colon,

    #[token("->")]
    Arrow,

    #[token("*")]
    Star,

    // ── literals ────────────────────────────────────────────────

    /// Decimal integer literal: 42, 0, 100
    #[regex(r"[0-9]+")]
    Number,

    /// String literal: "hello world"
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    /// Identifier: puts, main, u8, my_fn
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}
