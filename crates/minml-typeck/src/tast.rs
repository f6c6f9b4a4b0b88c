//! The typed tree produced by inference.
//!
//! Same shape as [`ast`](crate::ast), except that every node and every
//! binder carries its inferred type. After [`check`](crate::check) returns,
//! no type in the tree contains a type variable.

use crate::ast::{BinOp, UnaryOp};
use crate::ty::Ty;

/// A bound name together with its type.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub name: String,
    pub ty: Ty,
}

impl Binding {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        Binding {
            name: name.into(),
            ty,
        }
    }
}

/// A typed function definition. `name.ty` is the function's full type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedFunDef {
    pub name: Binding,
    pub args: Vec<Binding>,
    pub body: Box<TypedExpr>,
}

/// A typed expression node.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedExpr {
    pub kind: ExprKind,
    pub ty: Ty,
}

impl TypedExpr {
    pub fn new(kind: ExprKind, ty: Ty) -> Self {
        TypedExpr { kind, ty }
    }

    /// Apply `f` to every type in the tree, children first.
    pub fn map_types(self, f: &mut impl FnMut(Ty) -> Ty) -> TypedExpr {
        let TypedExpr { kind, ty } = self;
        let kind = match kind {
            ExprKind::Unit => ExprKind::Unit,
            ExprKind::Bool(b) => ExprKind::Bool(b),
            ExprKind::Int(n) => ExprKind::Int(n),
            ExprKind::Float(d) => ExprKind::Float(d),
            ExprKind::Var(x) => ExprKind::Var(x),
            ExprKind::Unary(op, e) => ExprKind::Unary(op, map_box(e, f)),
            ExprKind::Binary(op, l, r) => ExprKind::Binary(op, map_box(l, f), map_box(r, f)),
            ExprKind::If(c, t, e) => ExprKind::If(map_box(c, f), map_box(t, f), map_box(e, f)),
            ExprKind::Let(b, e1, e2) => {
                ExprKind::Let(map_binding(b, f), map_box(e1, f), map_box(e2, f))
            }
            ExprKind::LetRec(fundef, e) => {
                let fundef = TypedFunDef {
                    name: map_binding(fundef.name, f),
                    args: fundef.args.into_iter().map(|a| map_binding(a, f)).collect(),
                    body: map_box(fundef.body, f),
                };
                ExprKind::LetRec(fundef, map_box(e, f))
            }
            ExprKind::App(fun, args) => ExprKind::App(
                map_box(fun, f),
                args.into_iter().map(|a| a.map_types(f)).collect(),
            ),
            ExprKind::Tuple(elems) => {
                ExprKind::Tuple(elems.into_iter().map(|e| e.map_types(f)).collect())
            }
            ExprKind::LetTuple(pat, e1, e2) => ExprKind::LetTuple(
                pat.into_iter().map(|b| map_binding(b, f)).collect(),
                map_box(e1, f),
                map_box(e2, f),
            ),
            ExprKind::Array(len, init) => ExprKind::Array(map_box(len, f), map_box(init, f)),
            ExprKind::Get(a, i) => ExprKind::Get(map_box(a, f), map_box(i, f)),
            ExprKind::Put(a, i, v) => ExprKind::Put(map_box(a, f), map_box(i, f), map_box(v, f)),
            ExprKind::Seq(e1, e2) => ExprKind::Seq(map_box(e1, f), map_box(e2, f)),
        };
        TypedExpr { kind, ty: f(ty) }
    }
}

fn map_box(e: Box<TypedExpr>, f: &mut impl FnMut(Ty) -> Ty) -> Box<TypedExpr> {
    Box::new(e.map_types(f))
}

fn map_binding(b: Binding, f: &mut impl FnMut(Ty) -> Ty) -> Binding {
    Binding {
        name: b.name,
        ty: f(b.ty),
    }
}

/// The kind of a typed expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Unary(UnaryOp, Box<TypedExpr>),
    Binary(BinOp, Box<TypedExpr>, Box<TypedExpr>),
    If(Box<TypedExpr>, Box<TypedExpr>, Box<TypedExpr>),
    Let(Binding, Box<TypedExpr>, Box<TypedExpr>),
    Var(String),
    LetRec(TypedFunDef, Box<TypedExpr>),
    App(Box<TypedExpr>, Vec<TypedExpr>),
    Tuple(Vec<TypedExpr>),
    LetTuple(Vec<Binding>, Box<TypedExpr>, Box<TypedExpr>),
    Array(Box<TypedExpr>, Box<TypedExpr>),
    Get(Box<TypedExpr>, Box<TypedExpr>),
    Put(Box<TypedExpr>, Box<TypedExpr>, Box<TypedExpr>),
    Seq(Box<TypedExpr>, Box<TypedExpr>),
}
