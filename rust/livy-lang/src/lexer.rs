//! Hand-written lexer for the array language.
//!
//! Longest-match ordering matters: keywords are tried before identifiers,
//! complex literals before plain numbers, and the adorned operator forms
//! (`op/`, `op\`, `op~`, `op1.op2`, `..op`) before plain operators, so that
//! `+/` lexes as a reduce token rather than `+` followed by `/`.
//!
//! Numbers are signed: a `+`/`-` immediately followed by a digit starts a
//! literal, so `1-2` lexes as the two numbers `1` and `-2` (a vector), not
//! as a subtraction.

use std::str::FromStr;

use thiserror::Error;

use crate::tokens::{Keyword, Token, TokenKind};
use livy_core::Error as CoreError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character {ch:?} at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unterminated string starting at byte {pos}")]
    UnterminatedString { pos: usize },
    #[error("unsupported escape '\\{ch}' at byte {pos}")]
    BadEscape { ch: char, pos: usize },
}

impl LexError {
    pub fn pos(&self) -> usize {
        match self {
            LexError::UnexpectedChar { pos, .. }
            | LexError::UnterminatedString { pos }
            | LexError::BadEscape { pos, .. } => *pos,
        }
    }
}

impl From<LexError> for CoreError {
    fn from(e: LexError) -> CoreError {
        CoreError::Syntax {
            message: e.to_string(),
            pos: e.pos(),
        }
    }
}

/// Symbolic operator characters. A maximal run of these forms one operator
/// name (`**`, `==`, `<=`, ...).
fn is_op_char(c: char) -> bool {
    matches!(
        c,
        '-' | '+' | '*' | '/' | '\\' | ',' | '&' | '|' | '!' | '=' | '<' | '>'
    )
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Lexer {
    src: Vec<char>,
    /// Byte offset of each character, plus a sentinel for end-of-input.
    offsets: Vec<usize>,
    pos: usize,
    tokens: Vec<Token>,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut offsets: Vec<usize> = source.char_indices().map(|(i, _)| i).collect();
    offsets.push(source.len());
    let mut lexer = Lexer {
        src: source.chars().collect(),
        offsets,
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl Lexer {
    fn run(&mut self) -> Result<(), LexError> {
        loop {
            self.skip_space();
            let start = self.byte_pos(self.pos);
            let Some(c) = self.current() else {
                self.tokens.push(Token::new(TokenKind::End, start));
                return Ok(());
            };
            let kind = self.next_kind(c)?;
            self.tokens.push(Token::new(kind, start));
        }
    }

    fn next_kind(&mut self, c: char) -> Result<TokenKind, LexError> {
        if is_word_start(c) {
            return Ok(self.lex_word());
        }
        if c.is_ascii_digit() || c == '+' || c == '-' {
            if let Some(kind) = self.lex_number()? {
                return Ok(kind);
            }
        }
        if is_op_char(c) {
            return Ok(self.lex_symbolic());
        }
        match c {
            '.' => self.lex_outer(),
            '(' => Ok(self.one(TokenKind::Open)),
            ')' => Ok(self.one(TokenKind::Close)),
            '[' => Ok(self.one(TokenKind::OpenBracket)),
            ']' => Ok(self.one(TokenKind::CloseBracket)),
            '{' => Ok(self.one(TokenKind::OpenBrace)),
            '}' => Ok(self.one(TokenKind::CloseBrace)),
            ';' | '\n' => Ok(self.one(TokenKind::Semi)),
            '"' => self.lex_string(),
            _ => Err(LexError::UnexpectedChar {
                ch: c,
                pos: self.byte_pos(self.pos),
            }),
        }
    }

    // ── Cursor helpers ──────────────────────────────────────────────────

    fn current(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn at(&self, i: usize) -> Option<char> {
        self.src.get(i).copied()
    }

    fn byte_pos(&self, i: usize) -> usize {
        self.offsets[i.min(self.offsets.len() - 1)]
    }

    fn one(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn skip_space(&mut self) {
        while matches!(self.current(), Some(' ' | '\t' | '\r')) {
            self.pos += 1;
        }
    }

    // ── Words: keywords, variables, identifier operators ────────────────

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while self.current().map(is_word_char).unwrap_or(false) {
            self.pos += 1;
        }
        let word: String = self.src[start..self.pos].iter().collect();
        if let Ok(kw) = Keyword::from_str(&word) {
            return TokenKind::Keyword(kw);
        }
        let first = self.src[start];
        if first.is_ascii_uppercase() || first == '_' {
            return TokenKind::Variable(word);
        }
        self.adorned(word)
    }

    /// Attach a reduce/scan/each/inner adornment to an operator name, if one
    /// follows directly.
    fn adorned(&mut self, op: String) -> TokenKind {
        match self.current() {
            Some('/') => {
                self.pos += 1;
                TokenKind::Reduce(op)
            }
            Some('\\') => {
                self.pos += 1;
                TokenKind::Scan(op)
            }
            Some('~') => {
                self.pos += 1;
                TokenKind::Each(op)
            }
            Some('.') => {
                if let Some((op2, end)) = self.scan_operator_name(self.pos + 1) {
                    self.pos = end;
                    TokenKind::Inner(op, op2)
                } else {
                    TokenKind::Operator(op)
                }
            }
            _ => TokenKind::Operator(op),
        }
    }

    // ── Symbolic operators and their adornments ─────────────────────────

    fn lex_symbolic(&mut self) -> TokenKind {
        let start = self.pos;
        while self.current().map(is_op_char).unwrap_or(false) {
            self.pos += 1;
        }
        let run: String = self.src[start..self.pos].iter().collect();
        match self.current() {
            Some('~') => {
                self.pos += 1;
                return TokenKind::Each(run);
            }
            Some('.') => {
                if let Some((op2, end)) = self.scan_operator_name(self.pos + 1) {
                    self.pos = end;
                    return TokenKind::Inner(run, op2);
                }
            }
            _ => {}
        }
        // A run ending in `/` or `\` is an adorned shorter operator, so `+/`
        // is reduce-plus and `//` is reduce-compress; a lone `/` or `\` is
        // the plain operator.
        if run.len() >= 2 && run.ends_with('/') {
            TokenKind::Reduce(run[..run.len() - 1].to_string())
        } else if run.len() >= 2 && run.ends_with('\\') {
            TokenKind::Scan(run[..run.len() - 1].to_string())
        } else {
            TokenKind::Operator(run)
        }
    }

    /// An operator name for the second half of an inner product or the body
    /// of an outer product: a symbolic run or a lowercase identifier.
    fn scan_operator_name(&self, i: usize) -> Option<(String, usize)> {
        let c = self.at(i)?;
        if c.is_ascii_lowercase() {
            let mut j = i;
            while self.at(j).map(is_word_char).unwrap_or(false) {
                j += 1;
            }
            Some((self.src[i..j].iter().collect(), j))
        } else if is_op_char(c) {
            let mut j = i;
            while self.at(j).map(is_op_char).unwrap_or(false) {
                j += 1;
            }
            Some((self.src[i..j].iter().collect(), j))
        } else {
            None
        }
    }

    fn lex_outer(&mut self) -> Result<TokenKind, LexError> {
        if self.at(self.pos + 1) == Some('.') {
            if let Some((op, end)) = self.scan_operator_name(self.pos + 2) {
                self.pos = end;
                return Ok(TokenKind::Outer(op));
            }
        }
        Err(LexError::UnexpectedChar {
            ch: '.',
            pos: self.byte_pos(self.pos),
        })
    }

    // ── Numbers ─────────────────────────────────────────────────────────

    /// Try a complex literal first (`3+j4`, `-j2`), then a plain real.
    /// Returns `None` when a leading sign is not followed by a literal, so
    /// the caller can fall back to operator lexing.
    fn lex_number(&mut self) -> Result<Option<TokenKind>, LexError> {
        let (re, after_re) = match self.scan_real(self.pos) {
            Some((re, end)) => (re, end),
            None => (0.0, self.pos),
        };
        // `±j` after the (possibly absent) real part makes it complex.
        if let (Some(sign @ ('+' | '-')), Some('j' | 'J')) =
            (self.at(after_re), self.at(after_re + 1))
        {
            if let Some((im, end)) = self.scan_real(after_re + 2) {
                self.pos = end;
                let im = if sign == '-' { -im } else { im };
                return Ok(Some(TokenKind::Complex(re, im)));
            }
        }
        if after_re > self.pos {
            self.pos = after_re;
            return Ok(Some(TokenKind::Number(re)));
        }
        Ok(None)
    }

    /// A real literal: `[-+]?digits(.digits)?([eE][-+]?digits)?`.
    fn scan_real(&self, start: usize) -> Option<(f64, usize)> {
        let mut i = start;
        if matches!(self.at(i), Some('+' | '-')) {
            i += 1;
        }
        let digits = i;
        while self.at(i).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            i += 1;
        }
        if i == digits {
            return None;
        }
        if self.at(i) == Some('.') && self.at(i + 1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            i += 1;
            while self.at(i).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                i += 1;
            }
        }
        if matches!(self.at(i), Some('e' | 'E')) {
            let mut j = i + 1;
            if matches!(self.at(j), Some('+' | '-')) {
                j += 1;
            }
            if self.at(j).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                while self.at(j).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    j += 1;
                }
                i = j;
            }
        }
        let text: String = self.src[start..i].iter().collect();
        text.parse::<f64>().ok().map(|x| (x, i))
    }

    // ── Strings ─────────────────────────────────────────────────────────

    /// Double-quoted, with `\"` and `\\` as the only escapes.
    fn lex_string(&mut self) -> Result<TokenKind, LexError> {
        let open = self.byte_pos(self.pos);
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString { pos: open });
                }
                Some('"') => {
                    self.pos += 1;
                    return Ok(TokenKind::Str(out));
                }
                Some('\\') => match self.at(self.pos + 1) {
                    Some(c @ ('"' | '\\')) => {
                        out.push(c);
                        self.pos += 2;
                    }
                    Some(c) => {
                        return Err(LexError::BadEscape {
                            ch: c,
                            pos: self.byte_pos(self.pos),
                        });
                    }
                    None => {
                        return Err(LexError::UnterminatedString { pos: open });
                    }
                },
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}
