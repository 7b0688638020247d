// SPDX-License-Identifier: MIT

//! Formula tokenizer

use crate::error::FormulaError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Token {
    /// Source-like text of the token, for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Ident(name) => name.clone(),
            other => other.symbol().to_string(),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Eq => "=",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Lte => "<=",
            Token::Gt => ">",
            Token::Gte => ">=",
            Token::Number(_) | Token::Ident(_) => "",
        }
    }
}

/// A token with its character offset
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Tokenize formula text
///
/// `known_id` decides whether a dashed run such as `formula-3` is one
/// identifier (an element id) or a subtraction.
pub fn tokenize<F>(input: &str, known_id: F) -> Result<Vec<Spanned>, FormulaError>
where
    F: Fn(&str) -> bool,
{
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let pos = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| FormulaError::InvalidNumber(text.clone()))?;
            tokens.push(Spanned {
                token: Token::Number(n),
                pos,
            });
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            i = extend_dashed_id(&chars, start, i, &known_id);
            let text: String = chars[start..i].iter().collect();
            let token = match text.to_ascii_uppercase().as_str() {
                "AND" => Token::And,
                "OR" => Token::Or,
                "NOT" => Token::Not,
                _ => Token::Ident(text),
            };
            tokens.push(Spanned { token, pos });
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('<', Some('=')) => (Token::Lte, 2),
            ('<', Some('>')) => (Token::NotEq, 2),
            ('>', Some('=')) => (Token::Gte, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('=', Some('=')) => (Token::Eq, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('=', _) => (Token::Eq, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            _ => return Err(FormulaError::UnexpectedChar { ch: c, pos }),
        };
        tokens.push(Spanned { token, pos });
        i += width;
    }

    Ok(tokens)
}

/// Longest `ident(-segment)*` run starting at `start` that names a known id
///
/// Returns the end of the identifier: `end` itself when no dashed extension
/// is a known id.
fn extend_dashed_id<F>(chars: &[char], start: usize, end: usize, known_id: &F) -> usize
where
    F: Fn(&str) -> bool,
{
    let mut best = end;
    let mut j = end;
    while j + 1 < chars.len() && chars[j] == '-' && is_ident_char(chars[j + 1]) {
        j += 1;
        while j < chars.len() && is_ident_char(chars[j]) {
            j += 1;
        }
        let candidate: String = chars[start..j].iter().collect();
        if known_id(&candidate) {
            best = j;
        }
    }
    best
}
