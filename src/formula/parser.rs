// SPDX-License-Identifier: MIT

//! Formula parser
//!
//! Grammar, lowest precedence first:
//! ```text
//! or      := and (OR and)*
//! and     := not (AND not)*
//! not     := NOT not | compare
//! compare := sum (cmp_op sum)*
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/' | '%') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER | IDENT | IDENT '(' args ')' | '(' or ')'
//! ```

use super::ast::{BinaryOp, FormulaExpr, UnaryOp};
use super::lexer::{tokenize, Spanned, Token};
use crate::error::FormulaError;

/// Parse formula text; `known_id` is consulted for dashed element ids
pub fn parse<F>(input: &str, known_id: F) -> Result<FormulaExpr, FormulaError>
where
    F: Fn(&str) -> bool,
{
    let tokens = tokenize(input, known_id)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(spanned) => Err(FormulaError::UnexpectedToken {
            found: spanned.token.describe(),
            expected: "end of formula".to_string(),
            pos: spanned.pos,
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_token() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), FormulaError> {
        match self.advance() {
            Some(s) if s.token == token => Ok(()),
            Some(s) => Err(FormulaError::UnexpectedToken {
                found: s.token.describe(),
                expected: expected.to_string(),
                pos: s.pos,
            }),
            None => Err(FormulaError::UnexpectedEnd(expected.to_string())),
        }
    }

    fn parse_or(&mut self) -> Result<FormulaExpr, FormulaError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = FormulaExpr::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FormulaExpr, FormulaError> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = FormulaExpr::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<FormulaExpr, FormulaError> {
        if self.eat(&Token::Not) {
            let operand = self.parse_not()?;
            return Ok(FormulaExpr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<FormulaExpr, FormulaError> {
        let mut left = self.parse_sum()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Lte) => BinaryOp::Lte,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Gte) => BinaryOp::Gte,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_sum()?;
            left = FormulaExpr::binary(op, left, right);
        }
    }

    fn parse_sum(&mut self) -> Result<FormulaExpr, FormulaError> {
        let mut left = self.parse_product()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_product()?;
            left = FormulaExpr::binary(op, left, right);
        }
    }

    fn parse_product(&mut self) -> Result<FormulaExpr, FormulaError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = FormulaExpr::binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<FormulaExpr, FormulaError> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(match operand {
                FormulaExpr::Number(n) => FormulaExpr::Number(-n),
                other => FormulaExpr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(other),
                },
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FormulaExpr, FormulaError> {
        let Some(spanned) = self.advance() else {
            return Err(FormulaError::UnexpectedEnd("expression".to_string()));
        };
        match spanned.token {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.parse_args()?;
                    Ok(FormulaExpr::Call { name, args })
                } else {
                    Ok(FormulaExpr::Ident(name))
                }
            }
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            other => Err(FormulaError::UnexpectedToken {
                found: other.describe(),
                expected: "expression".to_string(),
                pos: spanned.pos,
            }),
        }
    }

    /// Arguments after the opening `(`, through the closing `)`
    fn parse_args(&mut self) -> Result<Vec<FormulaExpr>, FormulaError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }
}
