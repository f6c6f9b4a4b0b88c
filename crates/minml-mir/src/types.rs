//! Type resolution: Ty -> MirType conversion.
//!
//! Converts the type checker's `Ty` to the `MirType` carried by the middle
//! IR. After type checking every type is fully resolved, so `MirType` has no
//! variable case.

use std::fmt;

use minml_typeck::ty::Ty;

/// A concrete type in the middle IR.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MirType {
    Unit,
    Bool,
    Int,
    Float,
    Fun(Vec<MirType>, Box<MirType>),
    Tuple(Vec<MirType>),
    Array(Box<MirType>),
}

impl MirType {
    /// One-letter tag used in the names of compiler temporaries.
    pub fn tag(&self) -> char {
        match self {
            MirType::Unit => 'u',
            MirType::Bool => 'b',
            MirType::Int => 'i',
            MirType::Float => 'd',
            MirType::Fun(..) => 'f',
            MirType::Tuple(_) => 't',
            MirType::Array(_) => 'a',
        }
    }

    /// Return type of a function type, `None` for any other type.
    pub fn ret(&self) -> Option<&MirType> {
        match self {
            MirType::Fun(_, ret) => Some(ret),
            _ => None,
        }
    }
}

/// Convert a type checker `Ty` to a `MirType`.
///
/// Unresolved type variables cannot survive type checking (they are
/// defaulted to `Int`); should one appear anyway it is lowered as `Int` too.
pub fn resolve_type(ty: &Ty) -> MirType {
    match ty {
        Ty::Unit => MirType::Unit,
        Ty::Bool => MirType::Bool,
        Ty::Int | Ty::Var(_) => MirType::Int,
        Ty::Float => MirType::Float,
        Ty::Fun(params, ret) => MirType::Fun(
            params.iter().map(resolve_type).collect(),
            Box::new(resolve_type(ret)),
        ),
        Ty::Tuple(elems) => MirType::Tuple(elems.iter().map(resolve_type).collect()),
        Ty::Array(elem) => MirType::Array(Box::new(resolve_type(elem))),
    }
}

impl fmt::Display for MirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirType::Unit => write!(f, "unit"),
            MirType::Bool => write!(f, "bool"),
            MirType::Int => write!(f, "int"),
            MirType::Float => write!(f, "float"),
            MirType::Fun(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            MirType::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            MirType::Array(elem) => write!(f, "{} array", elem),
        }
    }
}
