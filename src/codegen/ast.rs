// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for compiled conditions and expressions

use std::fmt;

/// A boolean guard
#[derive(Debug, Clone)]
pub enum Condition {
    /// Literal true
    True,
    /// Literal false
    False,
    /// `v = 0`
    Eq0(String),
    /// `v != 0`
    Ne0(String),
    /// Comparison: left op right
    Cmp {
        left: String,
        op: CmpOp,
        right: String,
    },
    /// Logical AND
    And(Box<Condition>, Box<Condition>),
    /// Logical OR
    Or(Box<Condition>, Box<Condition>),
    /// Logical NOT
    Not(Box<Condition>),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// =
    Eq,
    /// !=
    NotEq,
    /// >
    Gt,
    /// >=
    Gte,
    /// <
    Lt,
    /// <=
    Lte,
}

impl CmpOp {
    /// Parse the editor operator symbol
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s.trim() {
            "=" | "==" => Some(CmpOp::Eq),
            "!=" | "<>" => Some(CmpOp::NotEq),
            ">" => Some(CmpOp::Gt),
            ">=" => Some(CmpOp::Gte),
            "<" => Some(CmpOp::Lt),
            "<=" => Some(CmpOp::Lte),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "!=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
        }
    }

    /// Operator of the complementary comparison: `a op b` is false exactly when `a negate(op) b`
    pub fn negate(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::NotEq,
            CmpOp::NotEq => CmpOp::Eq,
            CmpOp::Gt => CmpOp::Lte,
            CmpOp::Lte => CmpOp::Gt,
            CmpOp::Lt => CmpOp::Gte,
            CmpOp::Gte => CmpOp::Lt,
        }
    }

    /// Operator after swapping operands: `a op b` ≡ `b reverse(op) a`
    pub fn reverse(self) -> Self {
        match self {
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Gte => CmpOp::Lte,
            CmpOp::Lte => CmpOp::Gte,
            other => other,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Arithmetic operators of [`Expr::BinOp`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A value expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    /// A signal name or an already-expanded formula text
    Var(String),
    BinOp {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `WHEN(cond, then, otherwise)`
    When {
        cond: Condition,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Condition {
    pub fn eq0(v: impl Into<String>) -> Self {
        Condition::Eq0(v.into())
    }

    pub fn ne0(v: impl Into<String>) -> Self {
        Condition::Ne0(v.into())
    }

    pub fn cmp(left: impl Into<String>, op: CmpOp, right: impl Into<String>) -> Self {
        Condition::Cmp {
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    pub fn and(a: Condition, b: Condition) -> Self {
        Condition::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: Condition, b: Condition) -> Self {
        Condition::Or(Box::new(a), Box::new(b))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(x: Condition) -> Self {
        Condition::Not(Box::new(x))
    }

    /// Conjoin two optional guards; `None` means "no constraint"
    pub fn and_opt(a: Option<Condition>, b: Option<Condition>) -> Option<Condition> {
        match (a, b) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(Condition::and(a, b)),
        }
    }

    /// Like [`Condition::and_opt`] but keeps one copy of structurally equal guards
    pub fn merge(a: Option<Condition>, b: Option<Condition>) -> Option<Condition> {
        match (a, b) {
            (Some(a), Some(b)) if a == b => Some(a),
            (a, b) => Condition::and_opt(a, b),
        }
    }

    /// Left-fold a list of conjuncts; empty is `True`
    pub fn all(terms: impl IntoIterator<Item = Condition>) -> Self {
        terms
            .into_iter()
            .reduce(Condition::and)
            .unwrap_or(Condition::True)
    }

    /// Left-fold a list of disjuncts; empty is `False`
    pub fn any(terms: impl IntoIterator<Item = Condition>) -> Self {
        terms
            .into_iter()
            .reduce(Condition::or)
            .unwrap_or(Condition::False)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Condition::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Condition::False)
    }

    /// Canonical identity of an atom (`eq0:v`, `ne0:v`, `cmp:l:op:r`)
    pub fn atom_key(&self) -> Option<AtomKey> {
        match self {
            Condition::Eq0(v) => Some(AtomKey::Eq0(v.clone())),
            Condition::Ne0(v) => Some(AtomKey::Ne0(v.clone())),
            Condition::Cmp { left, op, right } => {
                Some(AtomKey::Cmp(left.clone(), *op, right.clone()))
            }
            _ => None,
        }
    }

    /// Direct complement of an atom, without simplification
    pub fn negated_atom(&self) -> Option<Condition> {
        match self {
            Condition::Eq0(v) => Some(Condition::Ne0(v.clone())),
            Condition::Ne0(v) => Some(Condition::Eq0(v.clone())),
            Condition::Cmp { left, op, right } => {
                Some(Condition::cmp(left.clone(), op.negate(), right.clone()))
            }
            _ => None,
        }
    }

    /// True when `self` and `other` are each other's complement
    pub fn is_negation_of(&self, other: &Condition) -> bool {
        match (self, other) {
            (Condition::Not(x), y) | (y, Condition::Not(x)) if **x == *y => true,
            _ => match (self.atom_key(), other.atom_key()) {
                (Some(a), Some(b)) => a.negate() == b,
                _ => false,
            },
        }
    }
}

/// Structural equality, commutative for `And` / `Or`
impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Condition::True, Condition::True) | (Condition::False, Condition::False) => true,
            (Condition::Eq0(a), Condition::Eq0(b)) | (Condition::Ne0(a), Condition::Ne0(b)) => {
                a == b
            }
            (
                Condition::Cmp { left, op, right },
                Condition::Cmp {
                    left: l2,
                    op: op2,
                    right: r2,
                },
            ) => left == l2 && op == op2 && right == r2,
            (Condition::Not(a), Condition::Not(b)) => a == b,
            (Condition::And(a1, b1), Condition::And(a2, b2))
            | (Condition::Or(a1, b1), Condition::Or(a2, b2)) => {
                (a1 == a2 && b1 == b2) || (a1 == b2 && b1 == a2)
            }
            _ => false,
        }
    }
}

/// Hashable atom identity used for deduplication and contradiction checks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtomKey {
    Eq0(String),
    Ne0(String),
    Cmp(String, CmpOp, String),
}

impl AtomKey {
    pub fn negate(&self) -> AtomKey {
        match self {
            AtomKey::Eq0(v) => AtomKey::Ne0(v.clone()),
            AtomKey::Ne0(v) => AtomKey::Eq0(v.clone()),
            AtomKey::Cmp(l, op, r) => AtomKey::Cmp(l.clone(), op.negate(), r.clone()),
        }
    }
}

impl fmt::Display for AtomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomKey::Eq0(v) => write!(f, "eq0:{}", v),
            AtomKey::Ne0(v) => write!(f, "ne0:{}", v),
            AtomKey::Cmp(l, op, r) => write!(f, "cmp:{}:{}:{}", l, op, r),
        }
    }
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn binop(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn when(cond: Condition, then: Expr, otherwise: Expr) -> Self {
        Expr::When {
            cond,
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Literal `0`
    pub fn zero() -> Self {
        Expr::Const(0.0)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(n) if *n == 0.0)
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(n) => Some(*n),
            _ => None,
        }
    }

    /// Name used when this value is an operand of a comparison
    pub fn operand_name(&self) -> String {
        match self {
            Expr::Var(name) => name.clone(),
            Expr::Const(n) => super::printer::format_number(*n),
            other => other.to_string(),
        }
    }
}
