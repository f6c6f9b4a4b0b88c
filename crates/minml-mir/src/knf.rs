//! K-normal form.
//!
//! The administrative IR between typing and closure conversion. Every
//! operand of a primitive operation, branch condition, call target and call
//! argument is a bare name; compound sub-computations are bound by an
//! enclosing `Let`. All rewrite passes map this IR to itself.

use std::fmt;

use minml_common::Env;
use rustc_hash::FxHashSet;

use crate::types::MirType;

/// A variable or function name.
pub type Name = String;

/// A function definition owned by its `LetRec` node.
#[derive(Clone, Debug, PartialEq)]
pub struct FunDef {
    pub name: Name,
    /// The full function type.
    pub ty: MirType,
    pub args: Vec<(Name, MirType)>,
    pub body: Box<Expr>,
}

/// A K-normal form expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Unit,
    Int(i64),
    Float(f64),
    Neg(Name),
    Add(Name, Name),
    Sub(Name, Name),
    FNeg(Name),
    FAdd(Name, Name),
    FSub(Name, Name),
    FMul(Name, Name),
    FDiv(Name, Name),
    /// `if x = y then e1 else e2`
    IfEq(Name, Name, Box<Expr>, Box<Expr>),
    /// `if x <= y then e1 else e2`
    IfLE(Name, Name, Box<Expr>, Box<Expr>),
    Let((Name, MirType), Box<Expr>, Box<Expr>),
    Var(Name),
    LetRec(FunDef, Box<Expr>),
    App(Name, Vec<Name>),
    Tuple(Vec<Name>),
    LetTuple(Vec<(Name, MirType)>, Name, Box<Expr>),
    Get(Name, Name),
    Put(Name, Name, Name),
    ExtArray(Name),
    ExtFunApp(Name, Vec<Name>),
}

impl Expr {
    /// `let name: ty = bound in body`
    pub fn let_(name: impl Into<Name>, ty: MirType, bound: Expr, body: Expr) -> Expr {
        Expr::Let((name.into(), ty), Box::new(bound), Box::new(body))
    }

    /// Free variables of the expression.
    pub fn free_vars(&self) -> FxHashSet<Name> {
        let mut out = FxHashSet::default();
        collect_free_vars(self, &mut out);
        out
    }

    /// Number of nodes, counting only the nodes that carry sub-expressions
    /// as more than one.
    pub fn size(&self) -> usize {
        match self {
            Expr::IfEq(_, _, e1, e2) | Expr::IfLE(_, _, e1, e2) | Expr::Let(_, e1, e2) => {
                1 + e1.size() + e2.size()
            }
            Expr::LetRec(fundef, e) => 1 + fundef.body.size() + e.size(),
            Expr::LetTuple(_, _, e) => 1 + e.size(),
            Expr::Unit
            | Expr::Int(_)
            | Expr::Float(_)
            | Expr::Neg(_)
            | Expr::Add(..)
            | Expr::Sub(..)
            | Expr::FNeg(_)
            | Expr::FAdd(..)
            | Expr::FSub(..)
            | Expr::FMul(..)
            | Expr::FDiv(..)
            | Expr::Var(_)
            | Expr::App(..)
            | Expr::Tuple(_)
            | Expr::Get(..)
            | Expr::Put(..)
            | Expr::ExtArray(_)
            | Expr::ExtFunApp(..) => 1,
        }
    }
}

fn collect_free_vars(e: &Expr, out: &mut FxHashSet<Name>) {
    match e {
        Expr::Unit | Expr::Int(_) | Expr::Float(_) | Expr::ExtArray(_) => {}
        Expr::Neg(x) | Expr::FNeg(x) | Expr::Var(x) => {
            out.insert(x.clone());
        }
        Expr::Add(x, y)
        | Expr::Sub(x, y)
        | Expr::FAdd(x, y)
        | Expr::FSub(x, y)
        | Expr::FMul(x, y)
        | Expr::FDiv(x, y)
        | Expr::Get(x, y) => {
            out.insert(x.clone());
            out.insert(y.clone());
        }
        Expr::IfEq(x, y, e1, e2) | Expr::IfLE(x, y, e1, e2) => {
            out.insert(x.clone());
            out.insert(y.clone());
            collect_free_vars(e1, out);
            collect_free_vars(e2, out);
        }
        Expr::Let((x, _), e1, e2) => {
            collect_free_vars(e1, out);
            let mut body = e2.free_vars();
            body.remove(x);
            out.extend(body);
        }
        Expr::LetRec(fundef, e) => {
            let mut inner = fundef.body.free_vars();
            for (arg, _) in &fundef.args {
                inner.remove(arg);
            }
            collect_free_vars(e, &mut inner);
            inner.remove(&fundef.name);
            out.extend(inner);
        }
        Expr::App(f, args) => {
            out.insert(f.clone());
            out.extend(args.iter().cloned());
        }
        Expr::Tuple(xs) | Expr::ExtFunApp(_, xs) => {
            out.extend(xs.iter().cloned());
        }
        Expr::LetTuple(pat, y, e) => {
            let mut body = e.free_vars();
            for (x, _) in pat {
                body.remove(x);
            }
            out.insert(y.clone());
            out.extend(body);
        }
        Expr::Put(x, y, z) => {
            out.insert(x.clone());
            out.insert(y.clone());
            out.insert(z.clone());
        }
    }
}

// ── Alpha-equivalence ────────────────────────────────────────────────

/// A pair of bound-name maps, one per side, used to compare two trees
/// modulo a consistent renaming of their bound names.
#[derive(Clone, Default)]
struct Renaming {
    left: Env<Name>,
    right: Env<Name>,
}

impl Renaming {
    fn bind(&self, x: &str, y: &str) -> Renaming {
        Renaming {
            left: self.left.insert(x, y.to_string()),
            right: self.right.insert(y, x.to_string()),
        }
    }

    fn bind_all<'a>(&self, pairs: impl Iterator<Item = (&'a Name, &'a Name)>) -> Renaming {
        let pairs: Vec<_> = pairs.collect();
        Renaming {
            left: self.left.extend(pairs.iter().map(|(x, y)| ((*x).clone(), (*y).clone()))),
            right: self.right.extend(pairs.iter().map(|(x, y)| ((*y).clone(), (*x).clone()))),
        }
    }

    fn same(&self, x: &str, y: &str) -> bool {
        match (self.left.get(x), self.right.get(y)) {
            (Some(mx), Some(my)) => mx == y && my == x,
            (None, None) => x == y,
            _ => false,
        }
    }

    fn same_all(&self, xs: &[Name], ys: &[Name]) -> bool {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.same(x, y))
    }
}

/// Whether two expressions are equal up to a consistent renaming of bound
/// names. Free names must match exactly.
pub fn alpha_eq(a: &Expr, b: &Expr) -> bool {
    alpha_eq_in(&Renaming::default(), a, b)
}

fn alpha_eq_in(rn: &Renaming, a: &Expr, b: &Expr) -> bool {
    match (a, b) {
        (Expr::Unit, Expr::Unit) => true,
        (Expr::Int(m), Expr::Int(n)) => m == n,
        (Expr::Float(c), Expr::Float(d)) => c.to_bits() == d.to_bits(),
        (Expr::Neg(x), Expr::Neg(y))
        | (Expr::FNeg(x), Expr::FNeg(y))
        | (Expr::Var(x), Expr::Var(y)) => rn.same(x, y),
        (Expr::Add(x1, x2), Expr::Add(y1, y2))
        | (Expr::Sub(x1, x2), Expr::Sub(y1, y2))
        | (Expr::FAdd(x1, x2), Expr::FAdd(y1, y2))
        | (Expr::FSub(x1, x2), Expr::FSub(y1, y2))
        | (Expr::FMul(x1, x2), Expr::FMul(y1, y2))
        | (Expr::FDiv(x1, x2), Expr::FDiv(y1, y2))
        | (Expr::Get(x1, x2), Expr::Get(y1, y2)) => rn.same(x1, y1) && rn.same(x2, y2),
        (Expr::IfEq(x1, x2, a1, a2), Expr::IfEq(y1, y2, b1, b2))
        | (Expr::IfLE(x1, x2, a1, a2), Expr::IfLE(y1, y2, b1, b2)) => {
            rn.same(x1, y1) && rn.same(x2, y2) && alpha_eq_in(rn, a1, b1) && alpha_eq_in(rn, a2, b2)
        }
        (Expr::Let((x, tx), a1, a2), Expr::Let((y, ty), b1, b2)) => {
            tx == ty && alpha_eq_in(rn, a1, b1) && alpha_eq_in(&rn.bind(x, y), a2, b2)
        }
        (Expr::LetRec(f, a), Expr::LetRec(g, b)) => {
            if f.ty != g.ty || f.args.len() != g.args.len() {
                return false;
            }
            if f.args.iter().zip(&g.args).any(|((_, t1), (_, t2))| t1 != t2) {
                return false;
            }
            let fun_rn = rn.bind(&f.name, &g.name);
            let formals = f.args.iter().map(|(x, _)| x);
            let body_rn = fun_rn.bind_all(formals.zip(g.args.iter().map(|(y, _)| y)));
            alpha_eq_in(&body_rn, &f.body, &g.body) && alpha_eq_in(&fun_rn, a, b)
        }
        (Expr::App(f, xs), Expr::App(g, ys)) => rn.same(f, g) && rn.same_all(xs, ys),
        (Expr::Tuple(xs), Expr::Tuple(ys)) => rn.same_all(xs, ys),
        (Expr::LetTuple(xs, x, a), Expr::LetTuple(ys, y, b)) => {
            xs.len() == ys.len()
                && xs.iter().zip(ys).all(|((_, t1), (_, t2))| t1 == t2)
                && rn.same(x, y)
                && alpha_eq_in(
                    &rn.bind_all(xs.iter().map(|(x, _)| x).zip(ys.iter().map(|(y, _)| y))),
                    a,
                    b,
                )
        }
        (Expr::Put(x1, x2, x3), Expr::Put(y1, y2, y3)) => {
            rn.same(x1, y1) && rn.same(x2, y2) && rn.same(x3, y3)
        }
        (Expr::ExtArray(x), Expr::ExtArray(y)) => x == y,
        (Expr::ExtFunApp(f, xs), Expr::ExtFunApp(g, ys)) => f == g && rn.same_all(xs, ys),
        _ => false,
    }
}

// ── Pretty printing ──────────────────────────────────────────────────

fn is_compound(e: &Expr) -> bool {
    matches!(
        e,
        Expr::IfEq(..) | Expr::IfLE(..) | Expr::Let(..) | Expr::LetRec(..) | Expr::LetTuple(..)
    )
}

pub(crate) fn write_args(f: &mut fmt::Formatter<'_>, xs: &[Name]) -> fmt::Result {
    write!(f, "(")?;
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", x)?;
    }
    write!(f, ")")
}

pub(crate) fn write_binders(f: &mut fmt::Formatter<'_>, xts: &[(Name, MirType)]) -> fmt::Result {
    for (i, (x, t)) in xts.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}: {}", x, t)?;
    }
    Ok(())
}

fn write_expr(f: &mut fmt::Formatter<'_>, e: &Expr, indent: usize) -> fmt::Result {
    let pad = " ".repeat(indent);
    match e {
        Expr::Unit => write!(f, "()"),
        Expr::Int(n) => write!(f, "{}", n),
        Expr::Float(d) => write!(f, "{:?}", d),
        Expr::Neg(x) => write!(f, "-{}", x),
        Expr::Add(x, y) => write!(f, "{} + {}", x, y),
        Expr::Sub(x, y) => write!(f, "{} - {}", x, y),
        Expr::FNeg(x) => write!(f, "-.{}", x),
        Expr::FAdd(x, y) => write!(f, "{} +. {}", x, y),
        Expr::FSub(x, y) => write!(f, "{} -. {}", x, y),
        Expr::FMul(x, y) => write!(f, "{} *. {}", x, y),
        Expr::FDiv(x, y) => write!(f, "{} /. {}", x, y),
        Expr::IfEq(x, y, e1, e2) | Expr::IfLE(x, y, e1, e2) => {
            let op = if matches!(e, Expr::IfEq(..)) { "=" } else { "<=" };
            writeln!(f, "if {} {} {} then", x, op, y)?;
            write!(f, "{}  ", pad)?;
            write_expr(f, e1, indent + 2)?;
            writeln!(f)?;
            writeln!(f, "{}else", pad)?;
            write!(f, "{}  ", pad)?;
            write_expr(f, e2, indent + 2)
        }
        Expr::Let((x, t), e1, e2) => {
            if is_compound(e1) {
                writeln!(f, "let {}: {} =", x, t)?;
                write!(f, "{}  ", pad)?;
                write_expr(f, e1, indent + 2)?;
                writeln!(f)?;
                writeln!(f, "{}in", pad)?;
            } else {
                write!(f, "let {}: {} = ", x, t)?;
                write_expr(f, e1, indent)?;
                writeln!(f, " in")?;
            }
            write!(f, "{}", pad)?;
            write_expr(f, e2, indent)
        }
        Expr::Var(x) => write!(f, "{}", x),
        Expr::LetRec(fundef, e) => {
            write!(f, "let rec {}", fundef.name)?;
            for (x, t) in &fundef.args {
                write!(f, " ({}: {})", x, t)?;
            }
            match fundef.ty.ret() {
                Some(ret) => writeln!(f, ": {} =", ret)?,
                None => writeln!(f, " =")?,
            }
            write!(f, "{}  ", pad)?;
            write_expr(f, &fundef.body, indent + 2)?;
            writeln!(f)?;
            writeln!(f, "{}in", pad)?;
            write!(f, "{}", pad)?;
            write_expr(f, e, indent)
        }
        Expr::App(g, xs) => {
            write!(f, "{}", g)?;
            write_args(f, xs)
        }
        Expr::Tuple(xs) => write_args(f, xs),
        Expr::LetTuple(xts, y, e) => {
            write!(f, "let (")?;
            write_binders(f, xts)?;
            writeln!(f, ") = {} in", y)?;
            write!(f, "{}", pad)?;
            write_expr(f, e, indent)
        }
        Expr::Get(x, y) => write!(f, "{}.({})", x, y),
        Expr::Put(x, y, z) => write!(f, "{}.({}) <- {}", x, y, z),
        Expr::ExtArray(x) => write!(f, "extern {}", x),
        Expr::ExtFunApp(g, xs) => {
            write!(f, "extern {}", g)?;
            write_args(f, xs)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}
