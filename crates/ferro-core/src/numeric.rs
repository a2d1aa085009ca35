//! Numeric coercion rules shared by the arithmetic built-ins.
//!
//! The joint type of two operands is the smallest common supertype under
//! `Int ⊂ BigInt` and `Int ⊂ Double`; `Double` and `BigInt` do not unify.

use crate::object::ObjType;
use crate::value::{Value, ValueKind};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// A numeric operand, reduced to one of the three joint classes.
#[derive(Clone)]
pub enum Num {
    Int(i32),
    Double(f64),
    Big(BigInt),
}

impl Num {
    pub fn from_value(v: Value) -> Option<Num> {
        match v.kind() {
            ValueKind::Int => Some(Num::Int(v.as_int())),
            ValueKind::Double => Some(Num::Double(v.as_double())),
            ValueKind::Obj(ObjType::BigInt) => Some(Num::Big(v.obj().as_bigint().value.clone())),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Num::Int(i) => *i as f64,
            Num::Double(d) => *d,
            Num::Big(b) => b.to_f64().unwrap_or(f64::NAN),
        }
    }

    pub fn to_bigint(&self) -> BigInt {
        match self {
            Num::Int(i) => BigInt::from(*i),
            Num::Double(d) => BigInt::from(*d as i64),
            Num::Big(b) => b.clone(),
        }
    }
}

/// The joint class two operands unify to, or `None` if the pairing has no
/// defined coercion (callers report `NonNumericArguments` in that case).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointClass {
    Int,
    Double,
    Big,
}

pub fn joint_class(a: &Num, b: &Num) -> Option<JointClass> {
    use Num::*;
    match (a, b) {
        (Int(_), Int(_)) => Some(JointClass::Int),
        (Double(_), Double(_)) => Some(JointClass::Double),
        (Big(_), Big(_)) => Some(JointClass::Big),
        (Int(_), Double(_)) | (Double(_), Int(_)) => Some(JointClass::Double),
        (Int(_), Big(_)) | (Big(_), Int(_)) => Some(JointClass::Big),
        (Double(_), Big(_)) | (Big(_), Double(_)) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_double_join_as_double() {
        let a = Num::Int(1);
        let b = Num::Double(2.0);
        assert_eq!(joint_class(&a, &b), Some(JointClass::Double));
    }

    #[test]
    fn double_and_bigint_do_not_unify() {
        let a = Num::Double(1.0);
        let b = Num::Big(BigInt::from(2));
        assert_eq!(joint_class(&a, &b), None);
    }

    #[test]
    fn int_and_bigint_join_as_bigint() {
        let a = Num::Int(1);
        let b = Num::Big(BigInt::from(2));
        assert_eq!(joint_class(&a, &b), Some(JointClass::Big));
    }
}
