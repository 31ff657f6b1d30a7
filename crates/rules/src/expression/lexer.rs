//! Tokenizer for condition strings.

use std::fmt;

use super::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    And,
    Or,
    Star,
    Cmp(CmpOp),
    /// Field name fragment or literal text, e.g. `wind_speed`, `80F`, `m/s`.
    Word(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::And => f.write_str("'&&'"),
            TokenKind::Or => f.write_str("'||'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Cmp(op) => write!(f, "'{}'", op.as_str()),
            TokenKind::Word(w) => write!(f, "'{w}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset in the source.
    pub pos: usize,
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '&' | '|' | '<' | '>' | '=' | '!' | '*')
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let (kind, width) = match (c, next) {
            (c, _) if c.is_whitespace() => {
                i += 1;
                continue;
            }
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('&', Some('&')) => (TokenKind::And, 2),
            ('|', Some('|')) => (TokenKind::Or, 2),
            ('>', Some('=')) => (TokenKind::Cmp(CmpOp::Ge), 2),
            ('<', Some('=')) => (TokenKind::Cmp(CmpOp::Le), 2),
            ('=', Some('=')) => (TokenKind::Cmp(CmpOp::Eq), 2),
            ('!', Some('=')) => (TokenKind::Cmp(CmpOp::Ne), 2),
            ('>', _) => (TokenKind::Cmp(CmpOp::Gt), 1),
            ('<', _) => (TokenKind::Cmp(CmpOp::Lt), 1),
            (c, _) if is_word_char(c) => {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Word(chars[start..i].iter().collect()),
                    pos: start,
                });
                continue;
            }
            (ch, _) => return Err(ParseError::UnexpectedChar { ch, pos: i }),
        };
        tokens.push(Token { kind, pos: i });
        i += width;
    }

    Ok(tokens)
}
