// SPDX-License-Identifier: MIT

//! Formula AST and its text form

use std::fmt;

use crate::codegen::printer::format_number;

/// A parsed formula
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    Number(f64),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<FormulaExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    Call {
        name: String,
        args: Vec<FormulaExpr>,
    },
    /// Text that could not be parsed, carried through verbatim
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::Lte
            | BinaryOp::Gt
            | BinaryOp::Gte => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::And)
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 4
    }

    fn is_associative(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or
        )
    }
}

const NOT_PRECEDENCE: u8 = 3;
const NEG_PRECEDENCE: u8 = 7;
const ATOM_PRECEDENCE: u8 = 8;

impl FormulaExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        FormulaExpr::Ident(name.into())
    }

    pub fn binary(op: BinaryOp, left: FormulaExpr, right: FormulaExpr) -> Self {
        FormulaExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<FormulaExpr>) -> Self {
        FormulaExpr::Call {
            name: name.into(),
            args,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            FormulaExpr::Number(n) if *n < 0.0 => NEG_PRECEDENCE,
            FormulaExpr::Number(_) | FormulaExpr::Ident(_) | FormulaExpr::Call { .. } => {
                ATOM_PRECEDENCE
            }
            FormulaExpr::Unary {
                op: UnaryOp::Neg, ..
            } => NEG_PRECEDENCE,
            FormulaExpr::Unary {
                op: UnaryOp::Not, ..
            } => NOT_PRECEDENCE,
            FormulaExpr::Binary { op, .. } => op.precedence(),
            FormulaExpr::Raw(_) => 0,
        }
    }

    fn is_negative(&self) -> bool {
        self.precedence() == NEG_PRECEDENCE
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            FormulaExpr::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Apply `f` bottom-up to every node
    pub fn map_bottom_up<F, E>(self, f: &mut F) -> Result<FormulaExpr, E>
    where
        F: FnMut(FormulaExpr) -> Result<FormulaExpr, E>,
    {
        let rebuilt = match self {
            FormulaExpr::Unary { op, operand } => FormulaExpr::Unary {
                op,
                operand: Box::new(operand.map_bottom_up(f)?),
            },
            FormulaExpr::Binary { op, left, right } => FormulaExpr::Binary {
                op,
                left: Box::new(left.map_bottom_up(f)?),
                right: Box::new(right.map_bottom_up(f)?),
            },
            FormulaExpr::Call { name, args } => FormulaExpr::Call {
                name,
                args: args
                    .into_iter()
                    .map(|a| a.map_bottom_up(f))
                    .collect::<Result<_, _>>()?,
            },
            leaf => leaf,
        };
        f(rebuilt)
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    operand: &FormulaExpr,
    parens: bool,
) -> fmt::Result {
    if parens {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}

impl fmt::Display for FormulaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaExpr::Number(n) => write!(f, "{}", format_number(*n)),
            FormulaExpr::Ident(name) => write!(f, "{}", name),
            FormulaExpr::Raw(text) => write!(f, "{}", text),
            FormulaExpr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                write!(f, "-")?;
                write_operand(f, operand, operand.precedence() < ATOM_PRECEDENCE)
            }
            FormulaExpr::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "NOT({})", operand),
            FormulaExpr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            FormulaExpr::Binary { op, left, right } => {
                let prec = op.precedence();
                if op.is_logical() {
                    // Comparisons and mixed AND/OR operands are always grouped
                    let group = |e: &FormulaExpr| match e.binary_op() {
                        Some(inner) => inner.is_comparison() || inner != *op,
                        None => e.precedence() < prec,
                    };
                    write_operand(f, left, group(left))?;
                    write!(f, " {} ", op.symbol())?;
                    return write_operand(f, right, group(right));
                }

                write_operand(f, left, left.precedence() < prec)?;
                let right_parens = right.precedence() < prec
                    || (right.precedence() == prec
                        && !(op.is_associative() && right.binary_op() == Some(*op)))
                    || (!op.is_comparison() && right.is_negative());
                if op.is_comparison() {
                    write!(f, " {} ", op.symbol())?;
                } else {
                    write!(f, "{}", op.symbol())?;
                }
                write_operand(f, right, right_parens)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> FormulaExpr {
        FormulaExpr::Number(n)
    }

    #[test]
    fn test_arithmetic_printing() {
        let e = FormulaExpr::binary(
            BinaryOp::Mul,
            FormulaExpr::binary(BinaryOp::Add, FormulaExpr::ident("a"), num(1.0)),
            num(2.0),
        );
        assert_eq!(e.to_string(), "(a+1)*2");

        let e = FormulaExpr::binary(
            BinaryOp::Sub,
            FormulaExpr::ident("a"),
            FormulaExpr::binary(BinaryOp::Sub, FormulaExpr::ident("b"), num(1.0)),
        );
        assert_eq!(e.to_string(), "a-(b-1)");

        let e = FormulaExpr::binary(
            BinaryOp::Add,
            FormulaExpr::ident("a"),
            FormulaExpr::binary(BinaryOp::Add, FormulaExpr::ident("b"), num(1.0)),
        );
        assert_eq!(e.to_string(), "a+b+1");
    }

    #[test]
    fn test_negative_operands() {
        let e = FormulaExpr::binary(BinaryOp::Sub, FormulaExpr::ident("a"), num(-1.0));
        assert_eq!(e.to_string(), "a-(-1)");
        let e = FormulaExpr::binary(BinaryOp::Gte, FormulaExpr::ident("a"), num(-1.0));
        assert_eq!(e.to_string(), "a >= -1");
    }

    #[test]
    fn test_logic_groups_comparisons() {
        let e = FormulaExpr::binary(
            BinaryOp::And,
            FormulaExpr::binary(BinaryOp::Gte, num(10.0), num(0.0)),
            FormulaExpr::binary(BinaryOp::Lte, num(10.0), num(20.0)),
        );
        assert_eq!(e.to_string(), "(10 >= 0) AND (10 <= 20)");
    }

    #[test]
    fn test_call_printing() {
        let e = FormulaExpr::call(
            "WHEN",
            vec![
                FormulaExpr::binary(BinaryOp::Gt, FormulaExpr::ident("x"), num(0.0)),
                FormulaExpr::ident("x"),
                num(0.0),
            ],
        );
        assert_eq!(e.to_string(), "WHEN(x > 0, x, 0)");
    }
}
