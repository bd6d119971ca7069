//! Tokens and a tokenizer for the source language.

use logos::{Lexer, Logos};

use std::fmt;

/// Enumeration of all tokens of the source language.
///
/// Whitespace and both comment forms are consumed by the lexer, which covers
/// the preprocessing stage: by the time the parser sees a token stream there
/// is nothing left to strip.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Erroneous token that could not be interpreted as any of the other
    /// variants.
    #[error]
    #[regex(r"[ \n\t\r\f]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/", logos::skip)]
    Error,

    /// The `static` keyword of the entry block header.
    #[token("static")]
    Static,

    /// The `void` keyword of the entry block header.
    #[token("void")]
    Void,

    /// The `byte` keyword starting a variable declaration.
    #[token("byte")]
    Byte,

    #[token("if")]
    If,

    #[token("while")]
    While,

    /// An identifier: a variable, the entry point name or a call target.
    #[regex("[A-Za-z_][A-Za-z0-9_]*", Lexer::slice)]
    Ident(&'a str),

    /// An unsigned decimal literal that fits a byte.
    #[regex("[0-9]+", literal_callback)]
    Literal(u8),

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("==")]
    Equal,

    #[token("!=")]
    NotEqual,

    #[token(">=")]
    GreaterEqual,

    #[token("<=")]
    LessEqual,

    #[token(">")]
    Greater,

    #[token("<")]
    Less,

    #[token("=")]
    Assign,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,
}

fn literal_callback<'a>(
    lex: &mut Lexer<'a, Token<'a>>,
) -> std::result::Result<u8, std::num::ParseIntError> {
    lex.slice().parse()
}

impl<'t> fmt::Display for Token<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "<error>"),
            Token::Static => write!(f, "static"),
            Token::Void => write!(f, "void"),
            Token::Byte => write!(f, "byte"),
            Token::If => write!(f, "if"),
            Token::While => write!(f, "while"),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Literal(value) => write!(f, "{}", value),
            Token::BraceOpen => write!(f, "{{"),
            Token::BraceClose => write!(f, "}}"),
            Token::ParenOpen => write!(f, "("),
            Token::ParenClose => write!(f, ")"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::GreaterEqual => write!(f, ">="),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::Less => write!(f, "<"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Token::lexer(source).collect()
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        let tokens = lex("byte x = 1; // trailing\n/* block\ncomment */ x = 2;");

        assert_eq!(tokens, vec![
            Token::Byte,
            Token::Ident("x"),
            Token::Assign,
            Token::Literal(1),
            Token::Semicolon,
            Token::Ident("x"),
            Token::Assign,
            Token::Literal(2),
            Token::Semicolon,
        ]);
    }

    #[test]
    fn keywords_beat_identifiers() {
        assert_eq!(lex("if iffy while"), vec![
            Token::If,
            Token::Ident("iffy"),
            Token::While,
        ]);
    }

    #[test]
    fn comparison_operators_lex_greedily() {
        assert_eq!(lex("a >= 1"), vec![
            Token::Ident("a"),
            Token::GreaterEqual,
            Token::Literal(1),
        ]);

        assert_eq!(lex("a = b == c"), vec![
            Token::Ident("a"),
            Token::Assign,
            Token::Ident("b"),
            Token::Equal,
            Token::Ident("c"),
        ]);
    }

    #[test]
    fn oversized_literals_are_errors() {
        assert_eq!(lex("256"), vec![Token::Error]);
    }
}
