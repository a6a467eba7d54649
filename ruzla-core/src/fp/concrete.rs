//! Concrete Instantiation of the FP Templates.
//!
//! Evaluates the shared circuit templates directly over [`BitVector`]
//! values. Used for constant folding in the rewriter and for model values.

use super::template::BvFactory;
use crate::bv::BitVector;

/// A factory computing over concrete bit-vector values.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConcreteFactory;

impl ConcreteFactory {
    fn bit(value: bool) -> BitVector {
        BitVector::from_u64(1, u64::from(value))
    }
}

impl BvFactory for ConcreteFactory {
    type Bv = BitVector;

    fn constant(&mut self, value: BitVector) -> BitVector {
        value
    }

    fn width(&self, a: &BitVector) -> u64 {
        a.width()
    }

    fn not(&mut self, a: &BitVector) -> BitVector {
        a.not()
    }

    fn and(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        a.and(b)
    }

    fn or(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        a.or(b)
    }

    fn xor(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        a.xor(b)
    }

    fn add(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        a.add(b)
    }

    fn sub(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        a.sub(b)
    }

    fn mul(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        a.mul(b)
    }

    fn udiv(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        a.udiv(b)
    }

    fn urem(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        a.urem(b)
    }

    fn neg(&mut self, a: &BitVector) -> BitVector {
        a.neg()
    }

    fn shl(&mut self, a: &BitVector, amount: &BitVector) -> BitVector {
        a.shl(amount)
    }

    fn lshr(&mut self, a: &BitVector, amount: &BitVector) -> BitVector {
        a.shr(amount)
    }

    fn ashr(&mut self, a: &BitVector, amount: &BitVector) -> BitVector {
        a.ashr(amount)
    }

    fn concat(&mut self, hi: &BitVector, lo: &BitVector) -> BitVector {
        hi.concat(lo)
    }

    fn extract(&mut self, a: &BitVector, upper: u64, lower: u64) -> BitVector {
        a.extract(upper, lower).expect("template extract in range")
    }

    fn zero_extend(&mut self, a: &BitVector, n: u64) -> BitVector {
        a.zero_extend(n)
    }

    fn sign_extend(&mut self, a: &BitVector, n: u64) -> BitVector {
        a.sign_extend(n)
    }

    fn eq(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        Self::bit(a == b)
    }

    fn ult(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        Self::bit(a.ult(b))
    }

    fn ule(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        Self::bit(a.ule(b))
    }

    fn slt(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        Self::bit(a.slt(b))
    }

    fn sle(&mut self, a: &BitVector, b: &BitVector) -> BitVector {
        Self::bit(a.sle(b))
    }

    fn ite(&mut self, cond: &BitVector, then: &BitVector, els: &BitVector) -> BitVector {
        if cond.is_one() {
            then.clone()
        } else {
            els.clone()
        }
    }
}
