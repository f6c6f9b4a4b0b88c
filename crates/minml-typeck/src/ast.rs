//! The untyped input tree.
//!
//! This is the shape handed over by the parser: expressions with optional
//! type annotations on binders. Constructor helpers keep hand-built trees
//! (tests, embedders without a parser) readable.

use crate::ty::Ty;

/// Unary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Boolean negation: `not e`.
    Not,
    /// Integer negation: `-e`.
    Neg,
    /// Float negation: `-.e`.
    FNeg,
}

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    FAdd,
    FSub,
    FMul,
    FDiv,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl BinOp {
    /// Whether the operator compares its operands and yields `Bool`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Le | BinOp::Ge | BinOp::Lt | BinOp::Gt
        )
    }
}

/// A bound name with an optional type annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct Binder {
    pub name: String,
    pub ty: Option<Ty>,
}

impl Binder {
    pub fn new(name: impl Into<String>) -> Self {
        Binder {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: Ty) -> Self {
        Binder {
            name: name.into(),
            ty: Some(ty),
        }
    }
}

/// A (possibly recursive) function definition: `let rec f x y = body`.
#[derive(Clone, Debug, PartialEq)]
pub struct FunDef {
    pub name: Binder,
    pub args: Vec<Binder>,
    pub body: Box<Expr>,
}

/// An expression of the source language.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `let x = e1 in e2`
    Let(Binder, Box<Expr>, Box<Expr>),
    Var(String),
    /// `let rec f args = body in e`
    LetRec(FunDef, Box<Expr>),
    App(Box<Expr>, Vec<Expr>),
    Tuple(Vec<Expr>),
    /// `let (x, y) = e1 in e2`
    LetTuple(Vec<Binder>, Box<Expr>, Box<Expr>),
    /// `Array.make len init`
    Array(Box<Expr>, Box<Expr>),
    /// `a.(i)`
    Get(Box<Expr>, Box<Expr>),
    /// `a.(i) <- v`
    Put(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `e1; e2`
    Seq(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(name.into())
    }

    pub fn unary(op: UnaryOp, e: Expr) -> Expr {
        Expr::Unary(op, Box::new(e))
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn if_(cond: Expr, then: Expr, else_: Expr) -> Expr {
        Expr::If(Box::new(cond), Box::new(then), Box::new(else_))
    }

    pub fn let_(name: impl Into<String>, bound: Expr, body: Expr) -> Expr {
        Expr::Let(Binder::new(name), Box::new(bound), Box::new(body))
    }

    /// `let rec name args = body in cont`
    pub fn let_rec(name: impl Into<String>, args: &[&str], body: Expr, cont: Expr) -> Expr {
        Expr::LetRec(
            FunDef {
                name: Binder::new(name),
                args: args.iter().map(|a| Binder::new(*a)).collect(),
                body: Box::new(body),
            },
            Box::new(cont),
        )
    }

    pub fn app(fun: Expr, args: Vec<Expr>) -> Expr {
        Expr::App(Box::new(fun), args)
    }

    /// Apply a named function.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::app(Expr::var(name), args)
    }

    pub fn let_tuple(names: &[&str], bound: Expr, body: Expr) -> Expr {
        Expr::LetTuple(
            names.iter().map(|n| Binder::new(*n)).collect(),
            Box::new(bound),
            Box::new(body),
        )
    }

    pub fn array(len: Expr, init: Expr) -> Expr {
        Expr::Array(Box::new(len), Box::new(init))
    }

    pub fn get(array: Expr, index: Expr) -> Expr {
        Expr::Get(Box::new(array), Box::new(index))
    }

    pub fn put(array: Expr, index: Expr, value: Expr) -> Expr {
        Expr::Put(Box::new(array), Box::new(index), Box::new(value))
    }

    pub fn seq(first: Expr, second: Expr) -> Expr {
        Expr::Seq(Box::new(first), Box::new(second))
    }
}
