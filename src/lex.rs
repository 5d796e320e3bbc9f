// SPDX-License-Identifier: GPL-2.0-only

//
// Lexical analyzer
//

use crate::error::Diagnostic;
use std::collections::HashMap;
use std::fmt::{Display,Formatter};
use tracing::trace;

/// Location of a token in the source (line and column are 1-based)
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq,Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Display for Position {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub enum TokenKind {
    // Typenames
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,

    // Aggregates and access modes
    Struct,
    Class,
    Public,
    Protected,
    Private,

    // Statements
    Return,
    If,
    Else,
    While,

    // Literals (text carries the value)
    IntLiteral,
    FloatLiteral,
    DoubleLiteral,
    BoolLiteral,
    CharLiteral,
    StringLiteral,

    Ident,

    // Symbols
    Assign,     // =
    Add,        // +
    Sub,        // -
    Mul,        // *
    Div,        // /
    Lt,         // <
    Gt,         // >
    Le,         // <=
    Ge,         // >=
    Eq,         // ==
    Ne,         // !=
    Excl,       // !
    AddAssign,  // +=
    SubAssign,  // -=
    MulAssign,  // *=
    DivAssign,  // /=
    Incr,       // ++
    Decr,       // --
    Arrow,      // ->
    Scope,      // ::
    Dot,        // .
    Comma,      // ,
    Semicolon,  // ;
    Colon,      // :
    LParen,     // (
    RParen,     // )
    LCurly,     // {
    RCurly,     // }
    LSq,        // [
    RSq,        // ]
}

impl TokenKind {
    /// Is this token a primitive type keyword?
    pub fn is_type(self) -> bool {
        matches!(self,
            TokenKind::Void | TokenKind::Bool | TokenKind::Char |
            TokenKind::Short | TokenKind::Int | TokenKind::Long |
            TokenKind::Float | TokenKind::Double | TokenKind::String)
    }

    pub fn is_literal(self) -> bool {
        matches!(self,
            TokenKind::IntLiteral | TokenKind::FloatLiteral |
            TokenKind::DoubleLiteral | TokenKind::BoolLiteral |
            TokenKind::CharLiteral | TokenKind::StringLiteral)
    }
}

impl Display for TokenKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenKind::Void          => "'void'",
            TokenKind::Bool          => "'bool'",
            TokenKind::Char          => "'char'",
            TokenKind::Short         => "'short'",
            TokenKind::Int           => "'int'",
            TokenKind::Long          => "'long'",
            TokenKind::Float         => "'float'",
            TokenKind::Double        => "'double'",
            TokenKind::String        => "'string'",
            TokenKind::Struct        => "'struct'",
            TokenKind::Class         => "'class'",
            TokenKind::Public        => "'public'",
            TokenKind::Protected     => "'protected'",
            TokenKind::Private       => "'private'",
            TokenKind::Return        => "'return'",
            TokenKind::If            => "'if'",
            TokenKind::Else          => "'else'",
            TokenKind::While         => "'while'",
            TokenKind::IntLiteral    => "integer literal",
            TokenKind::FloatLiteral  => "float literal",
            TokenKind::DoubleLiteral => "double literal",
            TokenKind::BoolLiteral   => "boolean literal",
            TokenKind::CharLiteral   => "character literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Ident         => "identifier",
            TokenKind::Assign        => "'='",
            TokenKind::Add           => "'+'",
            TokenKind::Sub           => "'-'",
            TokenKind::Mul           => "'*'",
            TokenKind::Div           => "'/'",
            TokenKind::Lt            => "'<'",
            TokenKind::Gt            => "'>'",
            TokenKind::Le            => "'<='",
            TokenKind::Ge            => "'>='",
            TokenKind::Eq            => "'=='",
            TokenKind::Ne            => "'!='",
            TokenKind::Excl          => "'!'",
            TokenKind::AddAssign     => "'+='",
            TokenKind::SubAssign     => "'-='",
            TokenKind::MulAssign     => "'*='",
            TokenKind::DivAssign     => "'/='",
            TokenKind::Incr          => "'++'",
            TokenKind::Decr          => "'--'",
            TokenKind::Arrow         => "'->'",
            TokenKind::Scope         => "'::'",
            TokenKind::Dot           => "'.'",
            TokenKind::Comma         => "','",
            TokenKind::Semicolon     => "';'",
            TokenKind::Colon         => "':'",
            TokenKind::LParen        => "'('",
            TokenKind::RParen        => "')'",
            TokenKind::LCurly        => "'{'",
            TokenKind::RCurly        => "'}'",
            TokenKind::LSq           => "'['",
            TokenKind::RSq           => "']'",
        };
        write!(fmt, "{}", s)
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Option<String>,
    pub pos: Position,
}

impl Token {
    fn new(kind: TokenKind, pos: Position) -> Token {
        Token { kind: kind, text: None, pos: pos }
    }

    fn with_text(kind: TokenKind, text: String, pos: Position) -> Token {
        Token { kind: kind, text: Some(text), pos: pos }
    }

    /// Literal or identifier text, empty for punctuation
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.text) {
            (TokenKind::Ident, Some(text)) => write!(fmt, "identifier '{}'", text),
            (kind, Some(text)) if kind.is_literal() => write!(fmt, "{} '{}'", kind, text),
            (kind, _) => write!(fmt, "{}", kind),
        }
    }
}

pub struct Lexer<'a> {
    kws: HashMap<&'static str, TokenKind>,
    data: &'a [u8],
    pos: Position,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a str) -> Lexer<'a> {
        let mut kws = HashMap::new();
        kws.insert("void",      TokenKind::Void);
        kws.insert("bool",      TokenKind::Bool);
        kws.insert("char",      TokenKind::Char);
        kws.insert("short",     TokenKind::Short);
        kws.insert("int",       TokenKind::Int);
        kws.insert("long",      TokenKind::Long);
        kws.insert("float",     TokenKind::Float);
        kws.insert("double",    TokenKind::Double);
        kws.insert("string",    TokenKind::String);
        kws.insert("struct",    TokenKind::Struct);
        kws.insert("class",     TokenKind::Class);
        kws.insert("public",    TokenKind::Public);
        kws.insert("protected", TokenKind::Protected);
        kws.insert("private",   TokenKind::Private);
        kws.insert("return",    TokenKind::Return);
        kws.insert("if",        TokenKind::If);
        kws.insert("else",      TokenKind::Else);
        kws.insert("while",     TokenKind::While);
        Lexer {
            kws: kws,
            data: data.as_bytes(),
            pos: Position { line: 1, column: 1, offset: 0 },
            diagnostics: Vec::new(),
        }
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn look(&self, i: usize) -> Option<u8> {
        self.data.get(i).cloned()
    }

    fn eat(&mut self, n: usize) {
        for &byte in &self.data[..n] {
            if byte == b'\n' {
                self.pos.line += 1;
                self.pos.column = 1;
            } else {
                self.pos.column += 1;
            }
            self.pos.offset += 1;
        }
        self.data = &self.data[n..]
    }

    fn report(&mut self, pos: Position, message: String) {
        trace!(%pos, %message, "lexical error");
        self.diagnostics.push(Diagnostic::error(pos, message));
    }

    fn unescape(&mut self) -> Option<u8> {
        let byte = match self.look(0)? {
            b'n'  => b'\n',
            b't'  => b'\t',
            b'r'  => b'\r',
            b'0'  => b'\0',
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'"'  => b'"',
            other => {
                let pos = self.pos;
                self.report(pos, format!("unknown escape sequence '\\{}'", other as char));
                other
            },
        };
        self.eat(1);
        Some(byte)
    }

    // Read bytes up to the closing quote, None if the literal is unterminated
    fn quoted(&mut self, quote: u8) -> Option<Vec<u8>> {
        let mut v = Vec::new();
        self.eat(1);
        loop {
            match self.look(0) {
                Some(b'\\') => {
                    self.eat(1);
                    v.push(self.unescape()?);
                },
                Some(b'\n') | None => return None,
                Some(byte) if byte == quote => {
                    self.eat(1);
                    return Some(v);
                },
                Some(byte) => {
                    self.eat(1);
                    v.push(byte);
                },
            }
        }
    }

    fn number(&mut self, start: Position) -> Token {
        let mut text = String::new();
        let mut seen_dot = false;
        loop {
            match self.look(0) {
                Some(byte @ b'0'..=b'9') => {
                    text.push(byte as char);
                    self.eat(1);
                },
                Some(b'.') if !seen_dot => {
                    seen_dot = true;
                    text.push('.');
                    self.eat(1);
                },
                // Grouping separator, only inside a digit run
                Some(b',') if matches!(self.look(1), Some(b'0'..=b'9')) && !seen_dot => {
                    self.eat(1);
                },
                _ => break,
            }
        }
        if let Some(b'f') = self.look(0) {
            self.eat(1);
            return Token::with_text(TokenKind::FloatLiteral, text, start);
        }
        if seen_dot {
            Token::with_text(TokenKind::DoubleLiteral, text, start)
        } else {
            Token::with_text(TokenKind::IntLiteral, text, start)
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        Some(loop {
            let start = self.pos;
            break match self.look(0)? {
                // Whitespace
                b' ' | b'\n' | b'\r' | b'\t' => { self.eat(1); continue },
                // Identifier
                b'_' | b'a'..=b'z' | b'A'..=b'Z' => {
                    let begin = self.data;

                    // First character already matched
                    self.eat(1);

                    // Consume characters until a non-matching one is hit
                    while let Some(b'_' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9') = self.look(0) {
                        self.eat(1);
                    }

                    let slice = String::from_utf8_lossy(&begin[.. begin.len() - self.data.len()]);
                    match &*slice {
                        "true"  => Token::with_text(TokenKind::BoolLiteral, "1".into(), start),
                        "false" => Token::with_text(TokenKind::BoolLiteral, "0".into(), start),
                        word => match self.kws.get(word) {
                            Some(kind) => Token::new(*kind, start),
                            None => Token::with_text(TokenKind::Ident, word.into(), start),
                        },
                    }
                },
                // Numbers
                b'0'..=b'9' => self.number(start),
                b'.' => match self.look(1) {
                    Some(b'0'..=b'9') => self.number(start),
                    _ => { self.eat(1); Token::new(TokenKind::Dot, start) },
                },
                // Character constant
                b'\'' => match self.quoted(b'\'') {
                    Some(v) if v.len() == 1 => {
                        Token::with_text(TokenKind::CharLiteral, v[0].to_string(), start)
                    },
                    Some(_) => {
                        self.report(start, "character literal must contain exactly one character".into());
                        continue;
                    },
                    None => {
                        self.report(start, "unterminated character literal".into());
                        continue;
                    },
                },
                // String literal
                b'"' => match self.quoted(b'"') {
                    Some(v) => {
                        let s = String::from_utf8_lossy(&v).into_owned();
                        Token::with_text(TokenKind::StringLiteral, s, start)
                    },
                    None => {
                        self.report(start, "unterminated string literal".into());
                        continue;
                    },
                },
                // Symbols
                b'=' => match self.look(1) {
                    Some(b'=') => { self.eat(2); Token::new(TokenKind::Eq, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Assign, start) },
                },
                b'!' => match self.look(1) {
                    Some(b'=') => { self.eat(2); Token::new(TokenKind::Ne, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Excl, start) },
                },
                b'<' => match self.look(1) {
                    Some(b'=') => { self.eat(2); Token::new(TokenKind::Le, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Lt, start) },
                },
                b'>' => match self.look(1) {
                    Some(b'=') => { self.eat(2); Token::new(TokenKind::Ge, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Gt, start) },
                },
                b'+' => match self.look(1) {
                    Some(b'=') => { self.eat(2); Token::new(TokenKind::AddAssign, start) },
                    Some(b'+') => { self.eat(2); Token::new(TokenKind::Incr, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Add, start) },
                },
                b'-' => match self.look(1) {
                    Some(b'=') => { self.eat(2); Token::new(TokenKind::SubAssign, start) },
                    Some(b'-') => { self.eat(2); Token::new(TokenKind::Decr, start) },
                    Some(b'>') => { self.eat(2); Token::new(TokenKind::Arrow, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Sub, start) },
                },
                b'*' => match self.look(1) {
                    Some(b'=') => { self.eat(2); Token::new(TokenKind::MulAssign, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Mul, start) },
                },
                b'/' => match self.look(1) {
                    Some(b'/') => {
                        let mut n = 2;
                        while let Some(byte) = self.look(n) {
                            if byte == b'\n' {
                                break;
                            }
                            n += 1;
                        }
                        self.eat(n);
                        continue;
                    },
                    Some(b'=') => { self.eat(2); Token::new(TokenKind::DivAssign, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Div, start) },
                },
                b':' => match self.look(1) {
                    Some(b':') => { self.eat(2); Token::new(TokenKind::Scope, start) },
                    _          => { self.eat(1); Token::new(TokenKind::Colon, start) },
                },
                b'(' => { self.eat(1); Token::new(TokenKind::LParen, start) },
                b')' => { self.eat(1); Token::new(TokenKind::RParen, start) },
                b'[' => { self.eat(1); Token::new(TokenKind::LSq, start) },
                b']' => { self.eat(1); Token::new(TokenKind::RSq, start) },
                b'{' => { self.eat(1); Token::new(TokenKind::LCurly, start) },
                b'}' => { self.eat(1); Token::new(TokenKind::RCurly, start) },
                b';' => { self.eat(1); Token::new(TokenKind::Semicolon, start) },
                b',' => { self.eat(1); Token::new(TokenKind::Comma, start) },
                _ => {
                    // Skip a whole UTF-8 sequence so the report names the character
                    let len = std::str::from_utf8(&self.data[..self.data.len().min(4)])
                        .or_else(|e| std::str::from_utf8(&self.data[..e.valid_up_to()]))
                        .ok()
                        .and_then(|s| s.chars().next())
                        .map(|c| c.len_utf8())
                        .unwrap_or(1);
                    let shown = String::from_utf8_lossy(&self.data[..len]).into_owned();
                    self.eat(len);
                    self.report(start, format!("unexpected character '{}'", shown));
                    continue;
                },
            };
        })
    }
}

/// Convert a whole source text into tokens, never stopping early
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    trace!(count = tokens.len(), "tokenized");
    (tokens, lexer.into_diagnostics())
}
