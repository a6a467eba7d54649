//! The Term Kind Catalogue.

/// The kind of a term node.
///
/// Indexed kinds (`BvExtract`, `BvRepeat`, `BvRoli`, `BvRori`,
/// `BvSignExtend`, `BvZeroExtend`, `FpToFp*`, `FpToSbv`, `FpToUbv`) carry
/// their integer indices on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Kind {
    /* leaves */
    /// A value literal (Bool, BV, FP or RM payload).
    Value,
    /// An uninterpreted free symbol of a given sort.
    Constant,
    /// A bound symbol introduced by a binder.
    Variable,

    /* boolean */
    And,
    Or,
    Not,
    Implies,
    Iff,
    Xor,

    /* polymorphic */
    Ite,
    Equal,
    Distinct,

    /* quantifiers and functions */
    Forall,
    Exists,
    Lambda,
    Apply,

    /* arrays */
    Select,
    Store,
    ConstArray,

    /* bit-vectors */
    BvAdd,
    BvAnd,
    BvAshr,
    BvComp,
    BvConcat,
    BvDec,
    BvInc,
    BvMul,
    BvNand,
    BvNeg,
    BvNor,
    BvNot,
    BvOr,
    BvRedand,
    BvRedor,
    BvRedxor,
    BvRol,
    BvRor,
    BvSaddo,
    BvSdiv,
    BvSdivo,
    BvSge,
    BvSgt,
    BvShl,
    BvShr,
    BvSle,
    BvSlt,
    BvSmod,
    BvSmulo,
    BvSrem,
    BvSsubo,
    BvSub,
    BvUaddo,
    BvUdiv,
    BvUge,
    BvUgt,
    BvUle,
    BvUlt,
    BvUmulo,
    BvUrem,
    BvUsubo,
    BvXnor,
    BvXor,
    /* indexed bit-vector operations */
    BvExtract,
    BvRepeat,
    BvRoli,
    BvRori,
    BvSignExtend,
    BvZeroExtend,

    /* floating-point */
    FpAbs,
    FpAdd,
    FpDiv,
    FpEqual,
    FpFma,
    FpFp,
    FpGe,
    FpGt,
    FpIsInf,
    FpIsNan,
    FpIsNeg,
    FpIsNormal,
    FpIsPos,
    FpIsSubnormal,
    FpIsZero,
    FpLe,
    FpLt,
    FpMax,
    FpMin,
    FpMul,
    FpNeg,
    FpRem,
    FpRti,
    FpSqrt,
    FpSub,
    /* indexed floating-point conversions */
    FpToFpFromBv,
    FpToFpFromFp,
    FpToFpFromSbv,
    FpToFpFromUbv,
    FpToSbv,
    FpToUbv,
}

impl Kind {
    /// True for leaf kinds that never have children.
    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(self, Kind::Value | Kind::Constant | Kind::Variable)
    }

    /// True for kinds whose operands can be reordered without changing the
    /// meaning (used for operand normalization).
    #[must_use]
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Kind::And
                | Kind::Or
                | Kind::Iff
                | Kind::Xor
                | Kind::Equal
                | Kind::Distinct
                | Kind::BvAdd
                | Kind::BvAnd
                | Kind::BvComp
                | Kind::BvMul
                | Kind::BvNand
                | Kind::BvNor
                | Kind::BvOr
                | Kind::BvXnor
                | Kind::BvXor
        )
    }

    /// True for the binder kinds.
    #[must_use]
    pub fn is_binder(self) -> bool {
        matches!(self, Kind::Forall | Kind::Exists | Kind::Lambda)
    }

    /// True for Boolean-valued bit-vector predicates.
    #[must_use]
    pub fn is_bv_predicate(self) -> bool {
        matches!(
            self,
            Kind::BvSaddo
                | Kind::BvSdivo
                | Kind::BvSge
                | Kind::BvSgt
                | Kind::BvSle
                | Kind::BvSlt
                | Kind::BvSmulo
                | Kind::BvSsubo
                | Kind::BvUaddo
                | Kind::BvUge
                | Kind::BvUgt
                | Kind::BvUle
                | Kind::BvUlt
                | Kind::BvUmulo
                | Kind::BvUsubo
        )
    }

    /// The SMT-LIB operator name, where one exists.
    #[must_use]
    pub fn smt_name(self) -> &'static str {
        match self {
            Kind::Value => "value",
            Kind::Constant => "const",
            Kind::Variable => "var",
            Kind::And => "and",
            Kind::Or => "or",
            Kind::Not => "not",
            Kind::Implies => "=>",
            Kind::Iff => "=",
            Kind::Xor => "xor",
            Kind::Ite => "ite",
            Kind::Equal => "=",
            Kind::Distinct => "distinct",
            Kind::Forall => "forall",
            Kind::Exists => "exists",
            Kind::Lambda => "lambda",
            Kind::Apply => "apply",
            Kind::Select => "select",
            Kind::Store => "store",
            Kind::ConstArray => "const-array",
            Kind::BvAdd => "bvadd",
            Kind::BvAnd => "bvand",
            Kind::BvAshr => "bvashr",
            Kind::BvComp => "bvcomp",
            Kind::BvConcat => "concat",
            Kind::BvDec => "bvdec",
            Kind::BvInc => "bvinc",
            Kind::BvMul => "bvmul",
            Kind::BvNand => "bvnand",
            Kind::BvNeg => "bvneg",
            Kind::BvNor => "bvnor",
            Kind::BvNot => "bvnot",
            Kind::BvOr => "bvor",
            Kind::BvRedand => "bvredand",
            Kind::BvRedor => "bvredor",
            Kind::BvRedxor => "bvredxor",
            Kind::BvRol => "bvrol",
            Kind::BvRor => "bvror",
            Kind::BvSaddo => "bvsaddo",
            Kind::BvSdiv => "bvsdiv",
            Kind::BvSdivo => "bvsdivo",
            Kind::BvSge => "bvsge",
            Kind::BvSgt => "bvsgt",
            Kind::BvShl => "bvshl",
            Kind::BvShr => "bvlshr",
            Kind::BvSle => "bvsle",
            Kind::BvSlt => "bvslt",
            Kind::BvSmod => "bvsmod",
            Kind::BvSmulo => "bvsmulo",
            Kind::BvSrem => "bvsrem",
            Kind::BvSsubo => "bvssubo",
            Kind::BvSub => "bvsub",
            Kind::BvUaddo => "bvuaddo",
            Kind::BvUdiv => "bvudiv",
            Kind::BvUge => "bvuge",
            Kind::BvUgt => "bvugt",
            Kind::BvUle => "bvule",
            Kind::BvUlt => "bvult",
            Kind::BvUmulo => "bvumulo",
            Kind::BvUrem => "bvurem",
            Kind::BvUsubo => "bvusubo",
            Kind::BvXnor => "bvxnor",
            Kind::BvXor => "bvxor",
            Kind::BvExtract => "extract",
            Kind::BvRepeat => "repeat",
            Kind::BvRoli => "rotate_left",
            Kind::BvRori => "rotate_right",
            Kind::BvSignExtend => "sign_extend",
            Kind::BvZeroExtend => "zero_extend",
            Kind::FpAbs => "fp.abs",
            Kind::FpAdd => "fp.add",
            Kind::FpDiv => "fp.div",
            Kind::FpEqual => "fp.eq",
            Kind::FpFma => "fp.fma",
            Kind::FpFp => "fp",
            Kind::FpGe => "fp.geq",
            Kind::FpGt => "fp.gt",
            Kind::FpIsInf => "fp.isInfinite",
            Kind::FpIsNan => "fp.isNaN",
            Kind::FpIsNeg => "fp.isNegative",
            Kind::FpIsNormal => "fp.isNormal",
            Kind::FpIsPos => "fp.isPositive",
            Kind::FpIsSubnormal => "fp.isSubnormal",
            Kind::FpIsZero => "fp.isZero",
            Kind::FpLe => "fp.leq",
            Kind::FpLt => "fp.lt",
            Kind::FpMax => "fp.max",
            Kind::FpMin => "fp.min",
            Kind::FpMul => "fp.mul",
            Kind::FpNeg => "fp.neg",
            Kind::FpRem => "fp.rem",
            Kind::FpRti => "fp.roundToIntegral",
            Kind::FpSqrt => "fp.sqrt",
            Kind::FpSub => "fp.sub",
            Kind::FpToFpFromBv => "to_fp",
            Kind::FpToFpFromFp => "to_fp",
            Kind::FpToFpFromSbv => "to_fp",
            Kind::FpToFpFromUbv => "to_fp_unsigned",
            Kind::FpToSbv => "fp.to_sbv",
            Kind::FpToUbv => "fp.to_ubv",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.smt_name())
    }
}
