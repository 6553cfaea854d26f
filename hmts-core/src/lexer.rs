//! Lexer for hmts source text.
//!
//! Rules are tried in a fixed order at every position and the first rule
//! that matches wins. Keyword rules only match when followed by a word
//! boundary, so `constant` is an identifier while `const` is a keyword.
//! Comments consume input but never produce a token.

use std::fmt;

use log::trace;

use crate::error::LexError;
use crate::span::Span;

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Const,
    Return,

    // Type keywords
    TypeNumber,  // number
    TypeString,  // string
    TypeBoolean, // boolean
    TypeArray,   // Array
    TypeVoid,    // void
    TypeInt,     // Void
    TypeFloat,   // Float
    TypeBool,    // Bool
    TypeUnit,    // Unit

    // Punctuation
    Arrow,        // =>
    Ternary,      // ?
    Colon,        // :
    Equal,        // =
    Pipe,         // |
    LessThan,     // <
    GreaterThan,  // >
    Plus,         // +
    Star,         // *
    LeftParen,    // (
    RightParen,   // )
    LeftCurly,    // {
    RightCurly,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Semicolon,    // ;

    // Literals and names
    Boolean,
    Identifier,
    Number,
    String,

    Eof,
}

impl TokenKind {
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::TypeNumber
                | TokenKind::TypeString
                | TokenKind::TypeBoolean
                | TokenKind::TypeArray
                | TokenKind::TypeVoid
                | TokenKind::TypeInt
                | TokenKind::TypeFloat
                | TokenKind::TypeBool
                | TokenKind::TypeUnit
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Const => "CONST",
            TokenKind::Return => "RETURN",
            TokenKind::TypeNumber => "TYPE_NUMBER",
            TokenKind::TypeString => "TYPE_STRING",
            TokenKind::TypeBoolean => "TYPE_BOOLEAN",
            TokenKind::TypeArray => "TYPE_ARRAY",
            TokenKind::TypeVoid => "TYPE_VOID",
            TokenKind::TypeInt => "TYPE_INT",
            TokenKind::TypeFloat => "TYPE_FLOAT",
            TokenKind::TypeBool => "TYPE_BOOL",
            TokenKind::TypeUnit => "TYPE_UNIT",
            TokenKind::Arrow => "ARROW",
            TokenKind::Ternary => "TERNARY",
            TokenKind::Colon => "COLON",
            TokenKind::Equal => "EQUAL",
            TokenKind::Pipe => "PIPE",
            TokenKind::LessThan => "LESS_THAN",
            TokenKind::GreaterThan => "GREATER_THAN",
            TokenKind::Plus => "PLUS",
            TokenKind::Star => "STAR",
            TokenKind::LeftParen => "LEFT_PAREN",
            TokenKind::RightParen => "RIGHT_PAREN",
            TokenKind::LeftCurly => "LEFT_CURLY",
            TokenKind::RightCurly => "RIGHT_CURLY",
            TokenKind::LeftBracket => "LEFT_BRACKET",
            TokenKind::RightBracket => "RIGHT_BRACKET",
            TokenKind::Comma => "COMMA",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Boolean => "BOOLEAN",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single token.
///
/// `lexeme` is the exact matched text; only the synthetic `EOF` token
/// has none. String lexemes keep their quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Option<String>,
    pub span: Span,
}

impl Token {
    pub fn position(&self) -> usize {
        self.span.start as usize
    }

    pub fn text(&self) -> &str {
        self.lexeme.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    LineComment,
    BlockComment,
    Keyword(&'static str, TokenKind),
    Punct(&'static str, TokenKind),
    Boolean,
    Identifier,
    Number,
    QuotedString(u8),
}

const RULES: &[Rule] = &[
    Rule::LineComment,
    Rule::BlockComment,
    Rule::Keyword("const", TokenKind::Const),
    Rule::Keyword("return", TokenKind::Return),
    Rule::Keyword("number", TokenKind::TypeNumber),
    Rule::Keyword("string", TokenKind::TypeString),
    Rule::Keyword("boolean", TokenKind::TypeBoolean),
    Rule::Keyword("Array", TokenKind::TypeArray),
    Rule::Keyword("void", TokenKind::TypeVoid),
    Rule::Keyword("Void", TokenKind::TypeInt),
    Rule::Keyword("Float", TokenKind::TypeFloat),
    Rule::Keyword("Bool", TokenKind::TypeBool),
    Rule::Keyword("Unit", TokenKind::TypeUnit),
    Rule::Punct("=>", TokenKind::Arrow),
    Rule::Punct("?", TokenKind::Ternary),
    Rule::Punct(":", TokenKind::Colon),
    Rule::Punct("=", TokenKind::Equal),
    Rule::Punct("|", TokenKind::Pipe),
    Rule::Punct("<", TokenKind::LessThan),
    Rule::Punct(">", TokenKind::GreaterThan),
    Rule::Punct("+", TokenKind::Plus),
    Rule::Punct("*", TokenKind::Star),
    Rule::Punct("(", TokenKind::LeftParen),
    Rule::Punct(")", TokenKind::RightParen),
    Rule::Punct("{", TokenKind::LeftCurly),
    Rule::Punct("}", TokenKind::RightCurly),
    Rule::Punct("[", TokenKind::LeftBracket),
    Rule::Punct("]", TokenKind::RightBracket),
    Rule::Punct(",", TokenKind::Comma),
    Rule::Punct(";", TokenKind::Semicolon),
    Rule::Boolean,
    Rule::Identifier,
    Rule::Number,
    Rule::QuotedString(b'"'),
    Rule::QuotedString(b'\''),
];

/// Lex a source string into tokens terminated by `EOF`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let end = source_end(source.len())?;
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        index: 0,
        end,
    };
    let tokens = lexer.run()?;
    trace!("lexed {} token(s) from {} byte(s)", tokens.len(), source.len());
    Ok(tokens)
}

/// Offset of the end of a source of `len` bytes, if spans can address it.
fn source_end(len: usize) -> Result<u32, LexError> {
    u32::try_from(len).map_err(|_| LexError::SourceTooLarge { len })
}

struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    index: usize,
    end: u32,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            while self.peek().is_some_and(is_whitespace) {
                self.index += 1;
            }

            let start = self.index;
            if start >= self.bytes.len() {
                break;
            }

            let rest = &self.bytes[start..];
            let matched = RULES
                .iter()
                .find_map(|rule| match_rule(*rule, rest).map(|len| (*rule, len)));

            let Some((rule, len)) = matched else {
                let ch = self.source[start..].chars().next().unwrap_or('\0');
                return Err(LexError::UnexpectedCharacter {
                    position: start,
                    ch,
                });
            };
            self.index += len;

            let kind = match rule {
                Rule::LineComment | Rule::BlockComment => continue,
                Rule::Keyword(_, kind) | Rule::Punct(_, kind) => kind,
                Rule::Boolean => TokenKind::Boolean,
                Rule::Identifier => TokenKind::Identifier,
                Rule::Number => TokenKind::Number,
                Rule::QuotedString(_) => TokenKind::String,
            };
            tokens.push(Token {
                kind,
                lexeme: Some(self.source[start..self.index].to_string()),
                span: Span::new(self.offset(start), self.offset(self.index)),
            });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: None,
            span: Span::point(self.end),
        });
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    /// Every index is at most the source length, which `source_end` bounded.
    fn offset(&self, index: usize) -> u32 {
        u32::try_from(index).unwrap_or(self.end)
    }
}

/// Length of the prefix of `rest` accepted by `rule`, if any.
fn match_rule(rule: Rule, rest: &[u8]) -> Option<usize> {
    match rule {
        Rule::LineComment => {
            if !rest.starts_with(b"//") {
                return None;
            }
            Some(rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len()))
        }
        Rule::BlockComment => {
            if !rest.starts_with(b"/*") {
                return None;
            }
            rest[2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map(|idx| idx + 4)
        }
        Rule::Keyword(word, _) => match_word(rest, word.as_bytes()),
        Rule::Punct(text, _) => rest.starts_with(text.as_bytes()).then_some(text.len()),
        Rule::Boolean => match_word(rest, b"true").or_else(|| match_word(rest, b"false")),
        Rule::Identifier => {
            let first = *rest.first()?;
            if !is_ident_start(first) {
                return None;
            }
            Some(
                rest.iter()
                    .position(|&b| !is_ident_continue(b))
                    .unwrap_or(rest.len()),
            )
        }
        Rule::Number => {
            let digits = count_digits(rest);
            if digits == 0 {
                return None;
            }
            if rest.get(digits) == Some(&b'.') {
                let fraction = count_digits(&rest[digits + 1..]);
                if fraction > 0 {
                    return Some(digits + 1 + fraction);
                }
            }
            Some(digits)
        }
        Rule::QuotedString(quote) => {
            if rest.first() != Some(&quote) {
                return None;
            }
            let mut idx = 1;
            while let Some(&b) = rest.get(idx) {
                if b == quote {
                    return Some(idx + 1);
                }
                idx += if b == b'\\' { 2 } else { 1 };
            }
            None
        }
    }
}

fn match_word(rest: &[u8], word: &[u8]) -> Option<usize> {
    if !rest.starts_with(word) {
        return None;
    }
    match rest.get(word.len()) {
        Some(&next) if is_ident_continue(next) => None,
        _ => Some(word.len()),
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
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
