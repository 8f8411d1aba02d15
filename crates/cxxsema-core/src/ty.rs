//! Static types of C++ expressions.
//!
//! Types are immutable values shared through [`TyRef`]. Every layer a C++
//! type can carry (typedef, reference, cv-qualification) is a separate
//! variant, so the normalizer can peel exactly the layers a rule asks for.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::expr::ExprId;
use crate::interner::InternedStr;
use crate::symbol::ClassId;

pub type TyRef = Arc<Type>;

bitflags::bitflags! {
    /// `const` / `volatile` qualifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CvQualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

impl CvQualifiers {
    /// Spelling used by the type printer, e.g. `const volatile`.
    pub fn spelling(&self) -> &'static str {
        match (self.contains(Self::CONST), self.contains(Self::VOLATILE)) {
            (true, true) => "const volatile",
            (true, false) => "const",
            (false, true) => "volatile",
            (false, false) => "",
        }
    }

    /// Parse a single `type_qualifier` keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "const" => Some(Self::CONST),
            "volatile" => Some(Self::VOLATILE),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// Size and sign modifiers of a basic type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BasicModifiers: u8 {
        const SIGNED = 1 << 0;
        const UNSIGNED = 1 << 1;
        const SHORT = 1 << 2;
        const LONG = 1 << 3;
        const LONG_LONG = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
pub enum BasicKind {
    #[strum(serialize = "void")]
    Void,
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "char")]
    Char,
    #[strum(serialize = "wchar_t")]
    WChar,
    #[strum(serialize = "char8_t")]
    Char8,
    #[strum(serialize = "char16_t")]
    Char16,
    #[strum(serialize = "char32_t")]
    Char32,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "double")]
    Double,
    #[strum(serialize = "std::nullptr_t")]
    NullPtr,
}

impl BasicKind {
    fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "void" => BasicKind::Void,
            "bool" | "_Bool" => BasicKind::Bool,
            "char" => BasicKind::Char,
            "wchar_t" => BasicKind::WChar,
            "char8_t" => BasicKind::Char8,
            "char16_t" => BasicKind::Char16,
            "char32_t" => BasicKind::Char32,
            "int" => BasicKind::Int,
            "float" => BasicKind::Float,
            "double" => BasicKind::Double,
            "nullptr_t" | "std::nullptr_t" => BasicKind::NullPtr,
            _ => return None,
        };
        Some(kind)
    }
}

/// A builtin arithmetic (or `void`/`nullptr_t`) type.
///
/// `origin` records the expression whose type this value was computed for.
/// It is provenance only and takes no part in equality or hashing.
#[derive(Debug, Clone, Copy)]
pub struct BasicType {
    kind: BasicKind,
    modifiers: BasicModifiers,
    origin: Option<ExprId>,
}

impl BasicType {
    pub fn new(kind: BasicKind) -> Self {
        Self {
            kind,
            modifiers: BasicModifiers::empty(),
            origin: None,
        }
    }

    pub fn with_modifiers(mut self, modifiers: BasicModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// A copy of this type stamped with the expression it was computed for.
    pub fn with_origin(mut self, origin: ExprId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn kind(&self) -> BasicKind {
        self.kind
    }

    pub fn modifiers(&self) -> BasicModifiers {
        self.modifiers
    }

    pub fn origin(&self) -> Option<ExprId> {
        self.origin
    }

    /// Parse a specifier sequence such as `unsigned long` or `long double`.
    pub fn from_spelling(spelling: &str) -> Option<Self> {
        let mut kind = None;
        let mut modifiers = BasicModifiers::empty();

        for word in spelling.split_whitespace() {
            match word {
                "signed" => modifiers |= BasicModifiers::SIGNED,
                "unsigned" => modifiers |= BasicModifiers::UNSIGNED,
                "short" => modifiers |= BasicModifiers::SHORT,
                "long" if modifiers.contains(BasicModifiers::LONG) => {
                    modifiers.remove(BasicModifiers::LONG);
                    modifiers |= BasicModifiers::LONG_LONG;
                }
                "long" => modifiers |= BasicModifiers::LONG,
                other => {
                    let parsed = BasicKind::from_keyword(other)?;
                    if kind.replace(parsed).is_some() {
                        return None;
                    }
                }
            }
        }

        if kind.is_none() && modifiers.is_empty() {
            return None;
        }
        Some(Self::new(kind.unwrap_or(BasicKind::Int)).with_modifiers(modifiers))
    }

    /// C++ spelling; `int` is omitted when a size or sign modifier is present.
    pub fn spelling(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if self.modifiers.contains(BasicModifiers::SIGNED) {
            parts.push("signed");
        }
        if self.modifiers.contains(BasicModifiers::UNSIGNED) {
            parts.push("unsigned");
        }
        if self.modifiers.contains(BasicModifiers::SHORT) {
            parts.push("short");
        }
        if self.modifiers.contains(BasicModifiers::LONG) {
            parts.push("long");
        }
        if self.modifiers.contains(BasicModifiers::LONG_LONG) {
            parts.push("long long");
        }
        if self.kind != BasicKind::Int || parts.is_empty() {
            parts.push(self.kind.into());
        }
        parts.join(" ")
    }
}

impl PartialEq for BasicType {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.modifiers == other.modifiers
    }
}

impl Eq for BasicType {}

impl Hash for BasicType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.modifiers.hash(state);
    }
}

/// Diagnostic carried by a problem type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
pub enum ProblemCode {
    /// An operator applied to an operand the language forbids.
    #[strum(serialize = "invalid semantic type")]
    InvalidType,
    /// An identifier that could not be bound to a declaration.
    #[strum(serialize = "name not found")]
    NameNotFound,
    /// The operand chain is nested deeper than the configured limit.
    #[strum(serialize = "expression nested too deeply")]
    RecursionLimit,
}

impl ProblemCode {
    /// Short kebab-case identifier used in CLI diagnostics.
    pub fn id(&self) -> &'static str {
        match self {
            ProblemCode::InvalidType => "invalid-type",
            ProblemCode::NameNotFound => "name-not-found",
            ProblemCode::RecursionLimit => "recursion-limit",
        }
    }
}

/// An error marker that stands in for a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProblemType {
    pub code: ProblemCode,
    /// Source text of the offending expression.
    pub text: String,
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.code, self.text)
    }
}

/// A type that cannot be known before template instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnknownType {
    /// A template parameter or a name qualified by one.
    Dependent(InternedStr),
    /// Placeholder class produced when dereferencing a dependent operand.
    UnnamedClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(BasicType),
    Pointer(TyRef),
    Array {
        element: TyRef,
        size: Option<u64>,
    },
    PointerToMember {
        member: TyRef,
        owner: ClassId,
        is_const: bool,
        is_volatile: bool,
    },
    Class(ClassId),
    Reference {
        referred: TyRef,
        rvalue: bool,
    },
    Qualified {
        inner: TyRef,
        cv: CvQualifiers,
    },
    Typedef {
        name: InternedStr,
        aliased: TyRef,
    },
    Function {
        ret: TyRef,
        params: Vec<TyRef>,
    },
    Unknown(UnknownType),
    Problem(ProblemType),
}

impl Type {
    pub fn basic(kind: BasicKind) -> TyRef {
        Arc::new(Type::Basic(BasicType::new(kind)))
    }

    pub fn from_basic(basic: BasicType) -> TyRef {
        Arc::new(Type::Basic(basic))
    }

    pub fn pointer(pointee: TyRef) -> TyRef {
        Arc::new(Type::Pointer(pointee))
    }

    pub fn array(element: TyRef, size: Option<u64>) -> TyRef {
        Arc::new(Type::Array { element, size })
    }

    /// Lvalue reference, collapsing a reference to a reference into `&`.
    pub fn reference(referred: TyRef) -> TyRef {
        if let Type::Reference { referred: inner, .. } = strip_typedefs(&referred).as_ref() {
            return Arc::new(Type::Reference {
                referred: inner.clone(),
                rvalue: false,
            });
        }
        Arc::new(Type::Reference {
            referred,
            rvalue: false,
        })
    }

    /// Rvalue reference; `T& &&` collapses to `T&`, `T&& &&` to `T&&`.
    pub fn rvalue_reference(referred: TyRef) -> TyRef {
        let stripped = strip_typedefs(&referred);
        if let Type::Reference { .. } = stripped.as_ref() {
            return stripped;
        }
        Arc::new(Type::Reference {
            referred,
            rvalue: true,
        })
    }

    /// Add cv-qualifiers, merging with an existing qualified layer.
    ///
    /// References and problem types cannot be qualified and come back unchanged.
    pub fn qualified(inner: TyRef, cv: CvQualifiers) -> TyRef {
        if cv.is_empty() {
            return inner;
        }
        match inner.as_ref() {
            Type::Reference { .. } | Type::Problem(_) => inner,
            Type::Qualified {
                inner: nested,
                cv: existing,
            } => Arc::new(Type::Qualified {
                inner: nested.clone(),
                cv: *existing | cv,
            }),
            _ => Arc::new(Type::Qualified { inner, cv }),
        }
    }

    pub fn typedef(name: InternedStr, aliased: TyRef) -> TyRef {
        Arc::new(Type::Typedef { name, aliased })
    }

    pub fn function(ret: TyRef, params: Vec<TyRef>) -> TyRef {
        Arc::new(Type::Function { ret, params })
    }

    pub fn class(id: ClassId) -> TyRef {
        Arc::new(Type::Class(id))
    }

    /// Pointer to a member of `owner` with type `member`, without cv-qualifiers.
    pub fn pointer_to_member(member: TyRef, owner: ClassId) -> TyRef {
        Arc::new(Type::PointerToMember {
            member,
            owner,
            is_const: false,
            is_volatile: false,
        })
    }

    pub fn dependent(name: InternedStr) -> TyRef {
        Arc::new(Type::Unknown(UnknownType::Dependent(name)))
    }

    pub fn unnamed_class() -> TyRef {
        Arc::new(Type::Unknown(UnknownType::UnnamedClass))
    }

    pub fn problem(code: ProblemCode, text: impl Into<String>) -> TyRef {
        Arc::new(Type::Problem(ProblemType {
            code,
            text: text.into(),
        }))
    }

    pub fn pointee(&self) -> Option<&TyRef> {
        match self {
            Type::Pointer(pointee) => Some(pointee),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&TyRef> {
        match self {
            Type::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn referred(&self) -> Option<&TyRef> {
        match self {
            Type::Reference { referred, .. } => Some(referred),
            _ => None,
        }
    }

    /// Owning class and member type of a pointer-to-member.
    pub fn member_of(&self) -> Option<(ClassId, &TyRef)> {
        match self {
            Type::PointerToMember { member, owner, .. } => Some((*owner, member)),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            Type::Class(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_basic(&self) -> Option<&BasicType> {
        match self {
            Type::Basic(basic) => Some(basic),
            _ => None,
        }
    }

    pub fn problem_info(&self) -> Option<&ProblemType> {
        match self {
            Type::Problem(problem) => Some(problem),
            _ => None,
        }
    }

    pub fn is_problem(&self) -> bool {
        matches!(self, Type::Problem(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown(_))
    }

    /// Qualifiers on the outermost layer.
    pub fn cv(&self) -> CvQualifiers {
        match self {
            Type::Qualified { cv, .. } => *cv,
            _ => CvQualifiers::empty(),
        }
    }
}

fn strip_typedefs(ty: &TyRef) -> TyRef {
    let mut current = ty.clone();
    while let Type::Typedef { aliased, .. } = current.as_ref() {
        current = aliased.clone();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::InternPool;

    #[test]
    fn basic_spelling_round_trips_common_types() {
        for spelling in ["int", "unsigned long", "long long", "long double", "signed char", "bool"] {
            let basic = BasicType::from_spelling(spelling).unwrap();
            assert_eq!(basic.spelling(), spelling);
        }
        assert_eq!(
            BasicType::from_spelling("unsigned int").unwrap().spelling(),
            "unsigned"
        );
    }

    #[test]
    fn basic_spelling_rejects_non_builtin() {
        assert!(BasicType::from_spelling("size_t").is_none());
        assert!(BasicType::from_spelling("int double").is_none());
        assert!(BasicType::from_spelling("").is_none());
    }

    #[test]
    fn origin_does_not_affect_equality() {
        let plain = BasicType::new(BasicKind::Int);
        let stamped = plain.with_origin(ExprId(7));
        assert_eq!(plain, stamped);
        assert_eq!(stamped.origin(), Some(ExprId(7)));
        assert_eq!(Type::from_basic(plain), Type::from_basic(stamped));
    }

    #[test]
    fn qualified_merges_and_skips_references() {
        let int = Type::basic(BasicKind::Int);
        let c = Type::qualified(int.clone(), CvQualifiers::CONST);
        let cv = Type::qualified(c.clone(), CvQualifiers::VOLATILE);
        assert_eq!(cv.cv(), CvQualifiers::CONST | CvQualifiers::VOLATILE);

        let r = Type::reference(int.clone());
        assert_eq!(Type::qualified(r.clone(), CvQualifiers::CONST), r);
        assert_eq!(Type::qualified(int.clone(), CvQualifiers::empty()), int);
    }

    #[test]
    fn references_collapse() {
        let pool = InternPool::new();
        let int = Type::basic(BasicKind::Int);
        let lref = Type::reference(int.clone());
        let rref = Type::rvalue_reference(int.clone());

        assert_eq!(Type::reference(rref.clone()), lref);
        assert_eq!(Type::rvalue_reference(lref.clone()), lref);
        assert_eq!(Type::rvalue_reference(rref.clone()), rref);

        let alias = Type::typedef(pool.intern("R"), lref.clone());
        assert_eq!(Type::reference(alias), lref);
    }

    #[test]
    fn accessors_match_variants() {
        let int = Type::basic(BasicKind::Int);
        assert_eq!(Type::pointer(int.clone()).pointee(), Some(&int));
        assert_eq!(Type::array(int.clone(), Some(4)).element(), Some(&int));
        let ptm = Type::pointer_to_member(int.clone(), ClassId(3));
        assert_eq!(ptm.member_of(), Some((ClassId(3), &int)));
        let problem = Type::problem(ProblemCode::InvalidType, "*x");
        assert_eq!(problem.problem_info().unwrap().text, "*x");
        assert_eq!(
            problem.problem_info().unwrap().to_string(),
            "invalid semantic type '*x'"
        );
    }
}
