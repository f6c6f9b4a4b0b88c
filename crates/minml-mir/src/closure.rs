//! Closure conversion.
//!
//! Flattens every `let rec` into a [`TopLevelFundef`]. A function that
//! turns out to need no captured variables is "known": calls to it become
//! direct calls ([`Expr::AppDir`]) and no closure is allocated for it unless
//! the function escapes as a value. Everything else is called through a
//! closure ([`Expr::AppCls`]) built by [`Expr::MakeCls`].
//!
//! Whether a function is known is decided optimistically: its body is
//! converted assuming it is, then the assumption is checked against the
//! body's free variables. On failure the functions emitted during the
//! attempt are dropped and the body is converted again.

use std::fmt;

use log::debug;
use minml_common::Env;
use rustc_hash::FxHashSet;

use crate::knf::{self, write_args, write_binders, Name};
use crate::types::MirType;

/// A closure value: the code label and the captured variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Closure {
    pub entry: Name,
    pub captured: Vec<Name>,
}

/// An expression after closure conversion.
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
    IfEq(Name, Name, Box<Expr>, Box<Expr>),
    IfLE(Name, Name, Box<Expr>, Box<Expr>),
    Let((Name, MirType), Box<Expr>, Box<Expr>),
    Var(Name),
    /// Allocate a closure and bind it.
    MakeCls((Name, MirType), Closure, Box<Expr>),
    /// Call through a closure value.
    AppCls(Name, Vec<Name>),
    /// Call a code label directly.
    AppDir(Name, Vec<Name>),
    Tuple(Vec<Name>),
    LetTuple(Vec<(Name, MirType)>, Name, Box<Expr>),
    Get(Name, Name),
    Put(Name, Name, Name),
    ExtArray(Name),
}

/// A function lifted to the top level.
#[derive(Clone, Debug, PartialEq)]
pub struct TopLevelFundef {
    pub name: Name,
    pub ty: MirType,
    pub args: Vec<(Name, MirType)>,
    /// Variables read from the closure record, in sorted order.
    pub captured: Vec<(Name, MirType)>,
    pub body: Expr,
}

/// A closure-converted program: the lifted functions, innermost first, and
/// the residual main expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub fundefs: Vec<TopLevelFundef>,
    pub main: Expr,
}

impl Expr {
    /// Free variables of the expression.
    pub fn free_vars(&self) -> FxHashSet<Name> {
        let mut out = FxHashSet::default();
        collect_free_vars(self, &mut out);
        out
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
        Expr::MakeCls((x, _), closure, e) => {
            let mut body = e.free_vars();
            body.remove(x);
            out.extend(body);
            out.extend(closure.captured.iter().cloned());
        }
        Expr::AppCls(x, ys) => {
            out.insert(x.clone());
            out.extend(ys.iter().cloned());
        }
        Expr::AppDir(_, ys) | Expr::Tuple(ys) => {
            out.extend(ys.iter().cloned());
        }
        Expr::LetTuple(xts, y, e) => {
            let mut body = e.free_vars();
            for (x, _) in xts {
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

// ── Converter ────────────────────────────────────────────────────────

/// Prefix of the code labels of external functions.
pub const EXTERNAL_PREFIX: &str = "min_caml_";

struct Converter {
    /// Lifted functions emitted so far. Only ever appended to, except when
    /// a speculative conversion is rolled back by truncation.
    toplevel: Vec<TopLevelFundef>,
}

/// Closure-convert a K-normal form program.
pub fn convert(e: &knf::Expr) -> Program {
    let mut converter = Converter {
        toplevel: Vec::new(),
    };
    let main = converter.expr(&Env::new(), &FxHashSet::default(), e);
    Program {
        fundefs: converter.toplevel,
        main,
    }
}

fn sorted(names: FxHashSet<Name>) -> Vec<Name> {
    let mut names: Vec<Name> = names.into_iter().collect();
    names.sort();
    names
}

impl Converter {
    fn expr(&mut self, env: &Env<MirType>, known: &FxHashSet<Name>, e: &knf::Expr) -> Expr {
        match e {
            knf::Expr::Unit => Expr::Unit,
            knf::Expr::Int(n) => Expr::Int(*n),
            knf::Expr::Float(d) => Expr::Float(*d),
            knf::Expr::Neg(x) => Expr::Neg(x.clone()),
            knf::Expr::Add(x, y) => Expr::Add(x.clone(), y.clone()),
            knf::Expr::Sub(x, y) => Expr::Sub(x.clone(), y.clone()),
            knf::Expr::FNeg(x) => Expr::FNeg(x.clone()),
            knf::Expr::FAdd(x, y) => Expr::FAdd(x.clone(), y.clone()),
            knf::Expr::FSub(x, y) => Expr::FSub(x.clone(), y.clone()),
            knf::Expr::FMul(x, y) => Expr::FMul(x.clone(), y.clone()),
            knf::Expr::FDiv(x, y) => Expr::FDiv(x.clone(), y.clone()),
            knf::Expr::IfEq(x, y, e1, e2) => Expr::IfEq(
                x.clone(),
                y.clone(),
                Box::new(self.expr(env, known, e1)),
                Box::new(self.expr(env, known, e2)),
            ),
            knf::Expr::IfLE(x, y, e1, e2) => Expr::IfLE(
                x.clone(),
                y.clone(),
                Box::new(self.expr(env, known, e1)),
                Box::new(self.expr(env, known, e2)),
            ),
            knf::Expr::Let((x, t), e1, e2) => {
                let e1 = self.expr(env, known, e1);
                let e2 = self.expr(&env.insert(x.clone(), t.clone()), known, e2);
                Expr::Let((x.clone(), t.clone()), Box::new(e1), Box::new(e2))
            }
            knf::Expr::Var(x) => Expr::Var(x.clone()),
            knf::Expr::LetRec(fundef, e) => self.let_rec(env, known, fundef, e),
            knf::Expr::App(f, ys) if known.contains(f) => {
                debug!("directly applying {}", f);
                Expr::AppDir(f.clone(), ys.clone())
            }
            knf::Expr::App(f, ys) => Expr::AppCls(f.clone(), ys.clone()),
            knf::Expr::Tuple(xs) => Expr::Tuple(xs.clone()),
            knf::Expr::LetTuple(xts, y, e) => {
                let body_env = env.extend(xts.iter().cloned());
                Expr::LetTuple(xts.clone(), y.clone(), Box::new(self.expr(&body_env, known, e)))
            }
            knf::Expr::Get(x, y) => Expr::Get(x.clone(), y.clone()),
            knf::Expr::Put(x, y, z) => Expr::Put(x.clone(), y.clone(), z.clone()),
            knf::Expr::ExtArray(x) => Expr::ExtArray(x.clone()),
            knf::Expr::ExtFunApp(f, ys) => {
                Expr::AppDir(format!("{}{}", EXTERNAL_PREFIX, f), ys.clone())
            }
        }
    }

    fn let_rec(
        &mut self,
        env: &Env<MirType>,
        known: &FxHashSet<Name>,
        fundef: &knf::FunDef,
        cont: &knf::Expr,
    ) -> Expr {
        let x = &fundef.name;
        let fun_env = env.insert(x.clone(), fundef.ty.clone());
        let body_env = fun_env.extend(fundef.args.iter().cloned());
        let formals: FxHashSet<&Name> = fundef.args.iter().map(|(y, _)| y).collect();

        // Assume the function needs no closure and check afterwards.
        let snapshot = self.toplevel.len();
        let mut optimistic = known.clone();
        optimistic.insert(x.clone());
        let body = self.expr(&body_env, &optimistic, &fundef.body);
        let mut free: Vec<Name> = sorted(body.free_vars())
            .into_iter()
            .filter(|z| !formals.contains(z))
            .collect();

        let (known, body) = if free.is_empty() {
            (optimistic, body)
        } else {
            debug!("free variable(s) {} found in function {}", free.join(", "), x);
            debug!("function {} cannot be directly applied", x);
            self.toplevel.truncate(snapshot);
            let body = self.expr(&body_env, known, &fundef.body);
            free = sorted(body.free_vars())
                .into_iter()
                .filter(|z| z != x && !formals.contains(z))
                .collect();
            (known.clone(), body)
        };

        // Names free in the whole program have no local type; they are
        // treated as int, like unconstrained type variables.
        let captured: Vec<(Name, MirType)> = free
            .iter()
            .map(|z| (z.clone(), fun_env.get(z).cloned().unwrap_or(MirType::Int)))
            .collect();
        self.toplevel.push(TopLevelFundef {
            name: x.clone(),
            ty: fundef.ty.clone(),
            args: fundef.args.clone(),
            captured,
            body,
        });

        let cont = self.expr(&fun_env, &known, cont);
        if cont.free_vars().contains(x) {
            Expr::MakeCls(
                (x.clone(), fundef.ty.clone()),
                Closure {
                    entry: x.clone(),
                    captured: free,
                },
                Box::new(cont),
            )
        } else {
            debug!("eliminating closure {}", x);
            cont
        }
    }
}

// ── Pretty printing ──────────────────────────────────────────────────

fn is_compound(e: &Expr) -> bool {
    matches!(
        e,
        Expr::IfEq(..) | Expr::IfLE(..) | Expr::Let(..) | Expr::MakeCls(..) | Expr::LetTuple(..)
    )
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
        Expr::MakeCls((x, t), closure, e) => {
            write!(f, "let {}: {} = closure {} [", x, t, closure.entry)?;
            write!(f, "{}", closure.captured.join(", "))?;
            writeln!(f, "] in")?;
            write!(f, "{}", pad)?;
            write_expr(f, e, indent)
        }
        Expr::AppCls(x, ys) => {
            write!(f, "call_closure {}", x)?;
            write_args(f, ys)
        }
        Expr::AppDir(label, ys) => {
            write!(f, "call {}", label)?;
            write_args(f, ys)
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
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}

impl fmt::Display for TopLevelFundef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        write_binders(f, &self.args)?;
        write!(f, ")")?;
        if !self.captured.is_empty() {
            write!(f, " [")?;
            write_binders(f, &self.captured)?;
            write!(f, "]")?;
        }
        if let Some(ret) = self.ty.ret() {
            write!(f, " -> {}", ret)?;
        }
        writeln!(f, " =")?;
        write!(f, "  ")?;
        write_expr(f, &self.body, 2)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fundef in &self.fundefs {
            writeln!(f, "{}", fundef)?;
            writeln!(f)?;
        }
        writeln!(f, "main =")?;
        write!(f, "  ")?;
        write_expr(f, &self.main, 2)
    }
}
