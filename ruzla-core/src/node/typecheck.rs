//! Kind Signature Checking and Sort Inference.
//!
//! A single total function assigns every well-formed term its sort; any
//! arity, sort or index violation is a `Type` error and constructs nothing.

use super::{Kind, TermId, TermManager};
use crate::error::{type_error, Result};
use crate::sort::{SortId, SortKind};

impl TermManager {
    /// Infer the sort of `mk_term(kind, children, indices)`, validating the
    /// kind's signature.
    pub(super) fn infer_sort(
        &mut self,
        kind: Kind,
        children: &[TermId],
        indices: &[u64],
    ) -> Result<SortId> {
        use Kind::*;

        let arity = |n: usize| -> Result<()> {
            if children.len() != n {
                return Err(type_error(format!(
                    "{kind:?} expects {n} children, got {}",
                    children.len()
                )));
            }
            Ok(())
        };
        let min_arity = |n: usize| -> Result<()> {
            if children.len() < n {
                return Err(type_error(format!(
                    "{kind:?} expects at least {n} children, got {}",
                    children.len()
                )));
            }
            Ok(())
        };
        let num_indices = |n: usize| -> Result<()> {
            if indices.len() != n {
                return Err(type_error(format!(
                    "{kind:?} expects {n} indices, got {}",
                    indices.len()
                )));
            }
            Ok(())
        };

        if !matches!(
            kind,
            BvExtract
                | BvRepeat
                | BvRoli
                | BvRori
                | BvSignExtend
                | BvZeroExtend
                | FpToFpFromBv
                | FpToFpFromFp
                | FpToFpFromSbv
                | FpToFpFromUbv
                | FpToSbv
                | FpToUbv
        ) {
            num_indices(0)?;
        }

        match kind {
            Value | Constant | Variable | ConstArray => {
                Err(type_error(format!("{kind:?} has no operator signature")))
            }

            /* boolean */
            And | Or => {
                min_arity(2)?;
                self.all_bool(kind, children)
            }
            Implies | Iff | Xor => {
                arity(2)?;
                self.all_bool(kind, children)
            }
            Not => {
                arity(1)?;
                self.all_bool(kind, children)
            }

            /* polymorphic */
            Ite => {
                arity(3)?;
                self.expect_bool(kind, children[0])?;
                self.expect_same_sort(kind, children[1], children[2])?;
                Ok(self.sort(children[1]))
            }
            Equal => {
                arity(2)?;
                self.expect_same_sort(kind, children[0], children[1])?;
                Ok(self.mk_bool_sort())
            }
            Distinct => {
                min_arity(2)?;
                for pair in children.windows(2) {
                    self.expect_same_sort(kind, pair[0], pair[1])?;
                }
                Ok(self.mk_bool_sort())
            }

            /* binders and application */
            Forall | Exists => {
                arity(2)?;
                if self.kind(children[0]) != Variable {
                    return Err(type_error(format!(
                        "{kind:?} binds a variable, got {:?}",
                        self.kind(children[0])
                    )));
                }
                self.expect_bool(kind, children[1])?;
                Ok(self.mk_bool_sort())
            }
            Lambda => {
                arity(2)?;
                if self.kind(children[0]) != Variable {
                    return Err(type_error("lambda binds a variable"));
                }
                let var_sort = self.sort(children[0]);
                let body_sort = self.sort(children[1]);
                if let SortKind::Fun(inner) = self.sort_kind(body_sort) {
                    let mut all = vec![var_sort];
                    all.extend(inner.iter().copied());
                    let (cod, dom) = all.split_last().expect("nonempty");
                    let (cod, dom) = (*cod, dom.to_vec());
                    self.mk_fun_sort(&dom, cod)
                } else {
                    self.mk_fun_sort(&[var_sort], body_sort)
                }
            }
            Apply => {
                min_arity(2)?;
                let fun_sort = self.sort(children[0]);
                let Some(sig) = self.fun_sorts(fun_sort) else {
                    return Err(type_error("apply expects a function as first child"));
                };
                let sig: Vec<SortId> = sig.to_vec();
                let (codomain, domain) = sig.split_last().expect("nonempty");
                if children.len() - 1 != domain.len() {
                    return Err(type_error(format!(
                        "apply expects {} arguments, got {}",
                        domain.len(),
                        children.len() - 1
                    )));
                }
                for (arg, &want) in children[1..].iter().zip(domain) {
                    if self.sort(*arg) != want {
                        return Err(type_error("apply argument sort mismatch"));
                    }
                }
                Ok(*codomain)
            }

            /* arrays */
            Select => {
                arity(2)?;
                let Some((idx, elem)) = self.array_sorts(self.sort(children[0])) else {
                    return Err(type_error("select expects an array as first child"));
                };
                if self.sort(children[1]) != idx {
                    return Err(type_error("select index sort mismatch"));
                }
                Ok(elem)
            }
            Store => {
                arity(3)?;
                let arr_sort = self.sort(children[0]);
                let Some((idx, elem)) = self.array_sorts(arr_sort) else {
                    return Err(type_error("store expects an array as first child"));
                };
                if self.sort(children[1]) != idx {
                    return Err(type_error("store index sort mismatch"));
                }
                if self.sort(children[2]) != elem {
                    return Err(type_error("store value sort mismatch"));
                }
                Ok(arr_sort)
            }

            /* bit-vector, unary same-width */
            BvNot | BvNeg | BvInc | BvDec => {
                arity(1)?;
                self.expect_bv(kind, children[0]).map(|_| self.sort(children[0]))
            }
            /* bit-vector, unary reductions */
            BvRedand | BvRedor | BvRedxor => {
                arity(1)?;
                self.expect_bv(kind, children[0])?;
                self.mk_bv_sort(1)
            }
            /* bit-vector, binary same-width */
            BvAdd | BvAnd | BvAshr | BvMul | BvNand | BvNor | BvOr | BvRol | BvRor | BvSdiv
            | BvShl | BvShr | BvSmod | BvSrem | BvSub | BvUdiv | BvUrem | BvXnor | BvXor => {
                arity(2)?;
                self.expect_bv(kind, children[0])?;
                self.expect_same_sort(kind, children[0], children[1])?;
                Ok(self.sort(children[0]))
            }
            BvComp => {
                arity(2)?;
                self.expect_bv(kind, children[0])?;
                self.expect_same_sort(kind, children[0], children[1])?;
                self.mk_bv_sort(1)
            }
            BvConcat => {
                arity(2)?;
                let w0 = self.expect_bv(kind, children[0])?;
                let w1 = self.expect_bv(kind, children[1])?;
                self.mk_bv_sort(w0 + w1)
            }
            /* bit-vector predicates */
            BvSaddo | BvSdivo | BvSge | BvSgt | BvSle | BvSlt | BvSmulo | BvSsubo | BvUaddo
            | BvUge | BvUgt | BvUle | BvUlt | BvUmulo | BvUsubo => {
                arity(2)?;
                self.expect_bv(kind, children[0])?;
                self.expect_same_sort(kind, children[0], children[1])?;
                Ok(self.mk_bool_sort())
            }
            /* indexed bit-vector operations */
            BvExtract => {
                arity(1)?;
                num_indices(2)?;
                let w = self.expect_bv(kind, children[0])?;
                let (upper, lower) = (indices[0], indices[1]);
                if upper < lower || upper >= w {
                    return Err(type_error(format!(
                        "invalid extract indices [{upper}:{lower}] on width {w}"
                    )));
                }
                self.mk_bv_sort(upper - lower + 1)
            }
            BvRepeat => {
                arity(1)?;
                num_indices(1)?;
                let w = self.expect_bv(kind, children[0])?;
                if indices[0] < 1 {
                    return Err(type_error("repeat count must be >= 1"));
                }
                self.mk_bv_sort(w * indices[0])
            }
            BvRoli | BvRori => {
                arity(1)?;
                num_indices(1)?;
                self.expect_bv(kind, children[0])?;
                Ok(self.sort(children[0]))
            }
            BvSignExtend | BvZeroExtend => {
                arity(1)?;
                num_indices(1)?;
                let w = self.expect_bv(kind, children[0])?;
                self.mk_bv_sort(w + indices[0])
            }

            /* floating-point */
            FpAbs | FpNeg => {
                arity(1)?;
                self.expect_fp(kind, children[0]).map(|_| self.sort(children[0]))
            }
            FpIsInf | FpIsNan | FpIsNeg | FpIsNormal | FpIsPos | FpIsSubnormal | FpIsZero => {
                arity(1)?;
                self.expect_fp(kind, children[0])?;
                Ok(self.mk_bool_sort())
            }
            FpEqual | FpGe | FpGt | FpLe | FpLt => {
                arity(2)?;
                self.expect_fp(kind, children[0])?;
                self.expect_same_sort(kind, children[0], children[1])?;
                Ok(self.mk_bool_sort())
            }
            FpMax | FpMin | FpRem => {
                arity(2)?;
                self.expect_fp(kind, children[0])?;
                self.expect_same_sort(kind, children[0], children[1])?;
                Ok(self.sort(children[0]))
            }
            FpAdd | FpSub | FpMul | FpDiv => {
                arity(3)?;
                self.expect_rm(kind, children[0])?;
                self.expect_fp(kind, children[1])?;
                self.expect_same_sort(kind, children[1], children[2])?;
                Ok(self.sort(children[1]))
            }
            FpFma => {
                arity(4)?;
                self.expect_rm(kind, children[0])?;
                self.expect_fp(kind, children[1])?;
                self.expect_same_sort(kind, children[1], children[2])?;
                self.expect_same_sort(kind, children[1], children[3])?;
                Ok(self.sort(children[1]))
            }
            FpSqrt | FpRti => {
                arity(2)?;
                self.expect_rm(kind, children[0])?;
                self.expect_fp(kind, children[1])?;
                Ok(self.sort(children[1]))
            }
            FpFp => {
                arity(3)?;
                let ws = self.expect_bv(kind, children[0])?;
                let we = self.expect_bv(kind, children[1])?;
                let wm = self.expect_bv(kind, children[2])?;
                if ws != 1 {
                    return Err(type_error("fp sign field must have width 1"));
                }
                if we < 2 || wm < 1 {
                    return Err(type_error("invalid fp field widths"));
                }
                self.mk_fp_sort(we, wm + 1)
            }
            FpToFpFromBv => {
                arity(1)?;
                num_indices(2)?;
                let w = self.expect_bv(kind, children[0])?;
                let (e, s) = (indices[0], indices[1]);
                if e < 2 || s < 2 {
                    return Err(type_error("floating-point widths must be >= 2"));
                }
                if w != e + s {
                    return Err(type_error(format!(
                        "to_fp expects a bit-vector of width {}, got {w}",
                        e + s
                    )));
                }
                self.mk_fp_sort(e, s)
            }
            FpToFpFromFp | FpToFpFromSbv | FpToFpFromUbv => {
                arity(2)?;
                num_indices(2)?;
                self.expect_rm(kind, children[0])?;
                let (e, s) = (indices[0], indices[1]);
                if e < 2 || s < 2 {
                    return Err(type_error("floating-point widths must be >= 2"));
                }
                if kind == FpToFpFromFp {
                    self.expect_fp(kind, children[1])?;
                } else {
                    self.expect_bv(kind, children[1])?;
                }
                self.mk_fp_sort(e, s)
            }
            FpToSbv | FpToUbv => {
                arity(2)?;
                num_indices(1)?;
                self.expect_rm(kind, children[0])?;
                self.expect_fp(kind, children[1])?;
                if indices[0] < 1 {
                    return Err(type_error("conversion width must be >= 1"));
                }
                self.mk_bv_sort(indices[0])
            }
        }
    }

    fn all_bool(&mut self, kind: Kind, children: &[TermId]) -> Result<SortId> {
        for &c in children {
            self.expect_bool(kind, c)?;
        }
        Ok(self.mk_bool_sort())
    }

    fn expect_bool(&self, kind: Kind, t: TermId) -> Result<()> {
        if self.is_bool_sort(self.sort(t)) {
            Ok(())
        } else {
            Err(type_error(format!("{kind:?} expects Boolean children")))
        }
    }

    fn expect_bv(&self, kind: Kind, t: TermId) -> Result<u64> {
        self.bv_width(self.sort(t))
            .ok_or_else(|| type_error(format!("{kind:?} expects bit-vector children")))
    }

    fn expect_fp(&self, kind: Kind, t: TermId) -> Result<()> {
        if self.fp_format(self.sort(t)).is_some() {
            Ok(())
        } else {
            Err(type_error(format!(
                "{kind:?} expects floating-point children"
            )))
        }
    }

    fn expect_rm(&self, kind: Kind, t: TermId) -> Result<()> {
        if self.is_rm_sort(self.sort(t)) {
            Ok(())
        } else {
            Err(type_error(format!(
                "{kind:?} expects a rounding mode as first child"
            )))
        }
    }

    fn expect_same_sort(&self, kind: Kind, a: TermId, b: TermId) -> Result<()> {
        if self.sort(a) == self.sort(b) {
            Ok(())
        } else {
            Err(type_error(format!("{kind:?} children must share a sort")))
        }
    }
}
