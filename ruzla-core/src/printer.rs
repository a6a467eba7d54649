//! SMT-LIB v2 Printing.
//!
//! Terms print in SMT-LIB syntax with a `let` factorization of sub-DAGs
//! that occur more than once. Anonymous constants print as
//! `@bzla.const_<id>` and variables as `@bzla.var_<id>`.
//! [`Printer::write_formula`] emits a complete script (declarations,
//! assertions, `check-sat`).

use crate::node::{Kind, TermId, TermManager, Value};
use crate::sort::{SortId, SortKind};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write;

/// SMT-LIB printer over a term manager.
pub struct Printer<'a> {
    tm: &'a TermManager,
}

impl<'a> Printer<'a> {
    /// Create a printer.
    #[must_use]
    pub fn new(tm: &'a TermManager) -> Self {
        Self { tm }
    }

    /* ---- sorts ------------------------------------------------------------- */

    /// Render a sort in SMT-LIB syntax.
    #[must_use]
    pub fn sort_to_string(&self, sort: SortId) -> String {
        match self.tm.sort_kind(sort) {
            SortKind::Bool => "Bool".into(),
            SortKind::Bv(w) => format!("(_ BitVec {w})"),
            SortKind::Fp(e, s) => format!("(_ FloatingPoint {e} {s})"),
            SortKind::Rm => "RoundingMode".into(),
            SortKind::Array(i, e) => format!(
                "(Array {} {})",
                self.sort_to_string(*i),
                self.sort_to_string(*e)
            ),
            SortKind::Fun(all) => {
                let (cod, dom) = all.split_last().expect("nonempty");
                let dom: Vec<String> = dom.iter().map(|s| self.sort_to_string(*s)).collect();
                format!("({}) {}", dom.join(" "), self.sort_to_string(*cod))
            }
            SortKind::Uninterpreted(name) => name.to_string(),
        }
    }

    /* ---- terms ------------------------------------------------------------- */

    /// Render a term in SMT-LIB syntax with let factorization.
    #[must_use]
    pub fn term_to_string(&self, term: TermId) -> String {
        let mut out = String::new();
        self.write_term(&mut out, term).expect("string write");
        out
    }

    /// Write a term in SMT-LIB syntax.
    pub fn write_term(&self, out: &mut impl Write, term: TermId) -> std::fmt::Result {
        // Count child occurrences and find subterms containing bound
        // variables (those are never letified).
        let mut counts: FxHashMap<TermId, usize> = FxHashMap::default();
        let mut has_var: FxHashSet<TermId> = FxHashSet::default();
        let mut order: Vec<TermId> = Vec::new();
        let mut stack = vec![(term, false)];
        let mut seen: FxHashSet<TermId> = FxHashSet::default();
        *counts.entry(term).or_default() += 1;
        while let Some((cur, expanded)) = stack.pop() {
            if expanded {
                order.push(cur);
                if self.tm.kind(cur) == Kind::Variable
                    || self
                        .tm
                        .children(cur)
                        .iter()
                        .any(|c| has_var.contains(c))
                {
                    has_var.insert(cur);
                }
                continue;
            }
            if !seen.insert(cur) {
                continue;
            }
            stack.push((cur, true));
            for &child in self.tm.children(cur) {
                *counts.entry(child).or_default() += 1;
                stack.push((child, false));
            }
        }

        // Letify shared interior nodes in post order.
        let mut names: FxHashMap<TermId, String> = FxHashMap::default();
        let mut bindings: Vec<TermId> = Vec::new();
        for &t in &order {
            if t == term {
                continue;
            }
            let kind = self.tm.kind(t);
            if counts[&t] >= 2 && !kind.is_leaf() && !has_var.contains(&t) {
                names.insert(t, format!("_let{}", bindings.len()));
                bindings.push(t);
            }
        }

        for &b in &bindings {
            let name = names[&b].clone();
            write!(out, "(let (({name} ")?;
            let suppressed = names.remove(&b);
            self.write_node(out, b, &names)?;
            if let Some(n) = suppressed {
                names.insert(b, n);
            }
            write!(out, ")) ")?;
        }
        self.write_node(out, term, &names)?;
        for _ in &bindings {
            write!(out, ")")?;
        }
        Ok(())
    }

    fn symbol_of(&self, t: TermId) -> String {
        match self.tm.symbol(t) {
            Some(sym) if sym.chars().all(|c| !c.is_whitespace() && c != '|') => sym.to_string(),
            Some(sym) => format!("|{sym}|"),
            None => match self.tm.kind(t) {
                Kind::Variable => format!("@bzla.var_{}", t.raw()),
                _ => format!("@bzla.const_{}", t.raw()),
            },
        }
    }

    fn write_value(&self, out: &mut impl Write, value: &Value) -> std::fmt::Result {
        match value {
            Value::Bool(b) => write!(out, "{b}"),
            Value::BitVector(bv) => write!(out, "#b{}", bv.to_string_base(2)),
            Value::FloatingPoint(fp) => write!(out, "{fp}"),
            Value::RoundingMode(rm) => write!(out, "{rm}"),
        }
    }

    fn write_node(
        &self,
        out: &mut impl Write,
        term: TermId,
        names: &FxHashMap<TermId, String>,
    ) -> std::fmt::Result {
        if let Some(name) = names.get(&term) {
            return write!(out, "{name}");
        }
        let kind = self.tm.kind(term);
        match kind {
            Kind::Value => self.write_value(out, self.tm.value(term).expect("value payload")),
            Kind::Constant | Kind::Variable => write!(out, "{}", self.symbol_of(term)),
            Kind::ConstArray => {
                let sort = self.sort_to_string(self.tm.sort(term));
                write!(out, "((as const {sort}) ")?;
                self.write_node(out, self.tm.child(term, 0), names)?;
                write!(out, ")")
            }
            Kind::Forall | Kind::Exists | Kind::Lambda => {
                let var = self.tm.child(term, 0);
                let body = self.tm.child(term, 1);
                let sort = self.sort_to_string(self.tm.sort(var));
                write!(out, "({} (({} {sort})) ", kind.smt_name(), self.symbol_of(var))?;
                self.write_node(out, body, names)?;
                write!(out, ")")
            }
            Kind::Apply => {
                write!(out, "(")?;
                self.write_node(out, self.tm.child(term, 0), names)?;
                for &arg in &self.tm.children(term)[1..] {
                    write!(out, " ")?;
                    self.write_node(out, arg, names)?;
                }
                write!(out, ")")
            }
            _ => {
                let indices = self.tm.indices(term);
                if indices.is_empty() {
                    write!(out, "({}", kind.smt_name())?;
                } else {
                    let idx: Vec<String> = indices.iter().map(u64::to_string).collect();
                    write!(out, "((_ {} {})", kind.smt_name(), idx.join(" "))?;
                }
                for &child in self.tm.children(term) {
                    write!(out, " ")?;
                    self.write_node(out, child, names)?;
                }
                write!(out, ")")
            }
        }
    }

    /* ---- formulas ----------------------------------------------------------- */

    /// Write a complete SMT-LIB script for the given assertions.
    pub fn write_formula(
        &self,
        out: &mut impl Write,
        assertions: &[TermId],
    ) -> std::fmt::Result {
        // Collect declarations and theory usage.
        let mut consts: Vec<TermId> = Vec::new();
        let mut usorts: Vec<String> = Vec::new();
        let mut usort_seen: FxHashSet<String> = FxHashSet::default();
        let mut seen: FxHashSet<TermId> = FxHashSet::default();
        let (mut has_bv, mut has_fp, mut has_array, mut has_fun, mut has_quant) =
            (false, false, false, false, false);
        let mut stack: Vec<TermId> = assertions.to_vec();
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            match self.tm.kind(cur) {
                Kind::Constant => consts.push(cur),
                Kind::Forall | Kind::Exists => has_quant = true,
                _ => {}
            }
            let mut record_sort = |sort: SortId| match self.tm.sort_kind(sort) {
                SortKind::Bv(_) => has_bv = true,
                SortKind::Fp(..) | SortKind::Rm => has_fp = true,
                SortKind::Array(..) => has_array = true,
                SortKind::Fun(_) => has_fun = true,
                SortKind::Uninterpreted(name) => {
                    if usort_seen.insert(name.to_string()) {
                        usorts.push(name.to_string());
                    }
                }
                SortKind::Bool => {}
            };
            record_sort(self.tm.sort(cur));
            stack.extend(self.tm.children(cur).iter().copied());
        }
        consts.sort_unstable();

        let mut logic = String::new();
        if !has_quant {
            logic.push_str("QF_");
        }
        if has_array {
            logic.push('A');
        }
        if has_fun || !usorts.is_empty() {
            logic.push_str("UF");
        }
        if has_bv {
            logic.push_str("BV");
        }
        if has_fp {
            logic.push_str("FP");
        }
        if logic == "QF_" || logic.is_empty() {
            logic = "ALL".into();
        }
        writeln!(out, "(set-logic {logic})")?;

        for name in &usorts {
            writeln!(out, "(declare-sort {name} 0)")?;
        }
        for &c in &consts {
            let name = self.symbol_of(c);
            let sort = self.tm.sort(c);
            if matches!(self.tm.sort_kind(sort), SortKind::Fun(_)) {
                writeln!(out, "(declare-fun {name} {})", self.sort_to_string(sort))?;
            } else {
                writeln!(out, "(declare-const {name} {})", self.sort_to_string(sort))?;
            }
        }
        for &a in assertions {
            write!(out, "(assert ")?;
            self.write_term(out, a)?;
            writeln!(out, ")")?;
        }
        writeln!(out, "(check-sat)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Kind;

    #[test]
    fn test_print_values() {
        let mut tm = TermManager::new();
        let bv4 = tm.mk_bv_sort(4).unwrap();
        let v = tm.mk_bv_value_u64(bv4, 10).unwrap();
        let p = Printer::new(&tm);
        assert_eq!(p.term_to_string(v), "#b1010");
        let t = tm.mk_true();
        let p = Printer::new(&tm);
        assert_eq!(p.term_to_string(t), "true");
    }

    #[test]
    fn test_print_operation() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let y = tm.mk_const(bv8, Some("y"));
        let sum = tm.mk_term(Kind::BvAdd, &[x, y], &[]).unwrap();
        let p = Printer::new(&tm);
        assert_eq!(p.term_to_string(sum), "(bvadd x y)");
    }

    #[test]
    fn test_print_indexed() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let ext = tm.mk_term(Kind::BvExtract, &[x], &[3, 0]).unwrap();
        let p = Printer::new(&tm);
        assert_eq!(p.term_to_string(ext), "((_ extract 3 0) x)");
    }

    #[test]
    fn test_anonymous_symbols() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, None);
        let p = Printer::new(&tm);
        assert_eq!(p.term_to_string(x), format!("@bzla.const_{}", x.raw()));
    }

    #[test]
    fn test_let_factorization() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let y = tm.mk_const(bv8, Some("y"));
        let sum = tm.mk_term(Kind::BvAdd, &[x, y], &[]).unwrap();
        let prod = tm.mk_term(Kind::BvMul, &[sum, sum], &[]).unwrap();
        let p = Printer::new(&tm);
        assert_eq!(
            p.term_to_string(prod),
            "(let ((_let0 (bvadd x y))) (bvmul _let0 _let0))"
        );
    }

    #[test]
    fn test_quantifier_printing() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let v = tm.mk_var(bv8, Some("v"));
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let eq = tm.mk_term(Kind::Equal, &[v, zero], &[]).unwrap();
        let ex = tm.mk_term(Kind::Exists, &[v, eq], &[]).unwrap();
        let p = Printer::new(&tm);
        assert_eq!(
            p.term_to_string(ex),
            "(exists ((v (_ BitVec 8))) (= v #b00000000))"
        );
    }

    #[test]
    fn test_write_formula() {
        let mut tm = TermManager::new();
        let bv8 = tm.mk_bv_sort(8).unwrap();
        let x = tm.mk_const(bv8, Some("x"));
        let zero = tm.mk_bv_zero(bv8).unwrap();
        let ult = tm.mk_term(Kind::BvUlt, &[zero, x], &[]).unwrap();
        let p = Printer::new(&tm);
        let mut out = String::new();
        p.write_formula(&mut out, &[ult]).unwrap();
        assert!(out.contains("(set-logic QF_BV)"));
        assert!(out.contains("(declare-const x (_ BitVec 8))"));
        assert!(out.contains("(assert (bvult #b00000000 x))"));
        assert!(out.ends_with("(check-sat)\n"));
    }
}
