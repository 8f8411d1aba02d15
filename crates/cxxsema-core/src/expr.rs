//! Index-based expression trees.
//!
//! Nodes live in a flat arena and refer to their operands by [`ExprId`].
//! Trees are assembled with an [`ExprBuilder`], which is the only place an
//! operand can be attached or replaced, and then frozen into an immutable
//! [`ExprTree`] for resolution.

use std::fmt;
use std::ops::Index;

use cxxsema_error::{Error, ErrorKind, Result};
use smallvec::SmallVec;
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::interner::{InternPool, InternedStr};
use crate::ty::{BasicKind, BasicModifiers, BasicType, CvQualifiers, TyRef, Type};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct ExprId(pub u32);

impl ExprId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unary operator kinds.
///
/// `Bracketed` is the syntactic `( expr )` wrapper, not a semantic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum UnaryOp {
    Deref,
    AddressOf,
    Sizeof,
    Typeid,
    Bracketed,
    Plus,
    Minus,
    Not,
    Complement,
    PrefixIncr,
    PrefixDecr,
    PostfixIncr,
    PostfixDecr,
}

impl UnaryOp {
    /// Operator token as it appears in source and in `operator@` names.
    pub fn token(&self) -> &'static str {
        match self {
            UnaryOp::Deref => "*",
            UnaryOp::AddressOf => "&",
            UnaryOp::Sizeof => "sizeof",
            UnaryOp::Typeid => "typeid",
            UnaryOp::Bracketed => "()",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::Complement => "~",
            UnaryOp::PrefixIncr | UnaryOp::PostfixIncr => "++",
            UnaryOp::PrefixDecr | UnaryOp::PostfixDecr => "--",
        }
    }

    /// Map a prefix operator token (including the alternative spellings).
    pub fn from_prefix_token(token: &str) -> Option<Self> {
        let op = match token {
            "*" => UnaryOp::Deref,
            "&" => UnaryOp::AddressOf,
            "+" => UnaryOp::Plus,
            "-" => UnaryOp::Minus,
            "!" | "not" => UnaryOp::Not,
            "~" | "compl" => UnaryOp::Complement,
            "++" => UnaryOp::PrefixIncr,
            "--" => UnaryOp::PrefixDecr,
            _ => return None,
        };
        Some(op)
    }

    /// Whether a class may declare an `operator` overload for this kind.
    pub fn is_overloadable(&self) -> bool {
        !matches!(self, UnaryOp::Sizeof | UnaryOp::Typeid | UnaryOp::Bracketed)
    }

    /// Render the source text of `op operand`.
    pub fn spell(&self, operand: &str) -> String {
        let bracketed = operand.starts_with('(') && operand.ends_with(')');
        match self {
            UnaryOp::Sizeof | UnaryOp::Typeid if bracketed => format!("{}{operand}", self.token()),
            UnaryOp::Sizeof => format!("sizeof({operand})"),
            UnaryOp::Typeid => format!("typeid({operand})"),
            UnaryOp::Bracketed => format!("({operand})"),
            UnaryOp::PostfixIncr | UnaryOp::PostfixDecr => format!("{operand}{}", self.token()),
            _ => format!("{}{operand}", self.token()),
        }
    }
}

/// An identifier as written: one or more `::`-separated segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    segments: SmallVec<[InternedStr; 2]>,
    global: bool,
}

impl Name {
    pub fn simple(name: InternedStr) -> Self {
        Self {
            segments: SmallVec::from_slice(&[name]),
            global: false,
        }
    }

    /// Build a name from its segments. `None` when there are no segments.
    pub fn new(segments: impl IntoIterator<Item = InternedStr>, global: bool) -> Option<Self> {
        let segments: SmallVec<[InternedStr; 2]> = segments.into_iter().collect();
        if segments.is_empty() {
            return None;
        }
        Some(Self { segments, global })
    }

    /// Split a path such as `ns::Obj::field` or `::x`.
    pub fn parse(interner: &InternPool, path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let (global, rest) = match trimmed.strip_prefix("::") {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let mut segments = SmallVec::new();
        for segment in rest.split("::") {
            let segment = segment.trim();
            if segment.is_empty() {
                return None;
            }
            segments.push(interner.intern(segment));
        }
        Some(Self { segments, global })
    }

    pub fn segments(&self) -> &[InternedStr] {
        &self.segments
    }

    /// The segments before the last one.
    pub fn qualifier(&self) -> &[InternedStr] {
        &self.segments[..self.segments.len() - 1]
    }

    pub fn last(&self) -> InternedStr {
        self.segments[self.segments.len() - 1]
    }

    /// Starts with `::`.
    pub fn is_global(&self) -> bool {
        self.global
    }

    /// Written with explicit scope qualification (`A::b` or `::b`).
    pub fn is_qualified(&self) -> bool {
        self.global || self.segments.len() > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    Char,
    WChar,
    Char8,
    Char16,
    Char32,
    Bool,
    /// Narrow string literal with `len` characters, excluding the terminator.
    String { len: u64 },
    Nullptr,
}

impl LiteralKind {
    /// Static type of the literal.
    pub fn ty(&self) -> TyRef {
        let basic = |kind| BasicType::new(kind);
        let int = |modifiers| BasicType::new(BasicKind::Int).with_modifiers(modifiers);
        let basic = match self {
            LiteralKind::Int => basic(BasicKind::Int),
            LiteralKind::UnsignedInt => int(BasicModifiers::UNSIGNED),
            LiteralKind::Long => int(BasicModifiers::LONG),
            LiteralKind::UnsignedLong => int(BasicModifiers::UNSIGNED | BasicModifiers::LONG),
            LiteralKind::LongLong => int(BasicModifiers::LONG_LONG),
            LiteralKind::UnsignedLongLong => {
                int(BasicModifiers::UNSIGNED | BasicModifiers::LONG_LONG)
            }
            LiteralKind::Float => basic(BasicKind::Float),
            LiteralKind::Double => basic(BasicKind::Double),
            LiteralKind::LongDouble => {
                BasicType::new(BasicKind::Double).with_modifiers(BasicModifiers::LONG)
            }
            LiteralKind::Char => basic(BasicKind::Char),
            LiteralKind::WChar => basic(BasicKind::WChar),
            LiteralKind::Char8 => basic(BasicKind::Char8),
            LiteralKind::Char16 => basic(BasicKind::Char16),
            LiteralKind::Char32 => basic(BasicKind::Char32),
            LiteralKind::Bool => basic(BasicKind::Bool),
            LiteralKind::Nullptr => basic(BasicKind::NullPtr),
            LiteralKind::String { len } => {
                let element = Type::qualified(Type::basic(BasicKind::Char), CvQualifiers::CONST);
                return Type::array(element, Some(len + 1));
            }
        };
        Type::from_basic(basic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Unary { op: UnaryOp, operand: ExprId },
    Id(Name),
    Literal(LiteralKind),
    /// An operand whose type the caller already knows.
    Typed(TyRef),
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    kind: ExprKind,
    text: String,
}

impl ExprNode {
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Source text of the whole expression.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Mutable construction phase of an expression tree.
#[derive(Debug)]
pub struct ExprBuilder {
    interner: InternPool,
    nodes: Vec<ExprNode>,
    parents: Vec<Option<ExprId>>,
}

impl ExprBuilder {
    pub fn new(interner: InternPool) -> Self {
        Self {
            interner,
            nodes: Vec::new(),
            parents: Vec::new(),
        }
    }

    pub fn interner(&self) -> &InternPool {
        &self.interner
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, kind: ExprKind, text: String) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(ExprNode { kind, text });
        self.parents.push(None);
        id
    }

    fn check(&self, id: ExprId) -> Result<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::expr_not_found(id.0).with_operation("expr::build"))
        }
    }

    fn attach(&mut self, parent: ExprId, operand: ExprId) -> Result<()> {
        self.check(operand)?;
        if operand == parent {
            return Err(Error::invalid_argument("an expression cannot be its own operand")
                .with_operation("expr::attach"));
        }
        if let Some(existing) = self.parents[operand.index()] {
            return Err(Error::new(
                ErrorKind::OperandShared,
                format!("{} is already the operand of {}", operand, existing),
            )
            .with_operation("expr::attach"));
        }
        let mut ancestor = self.parents[parent.index()];
        while let Some(id) = ancestor {
            if id == operand {
                return Err(Error::invalid_argument(format!(
                    "{} encloses {}; attaching it would create a cycle",
                    operand, parent
                ))
                .with_operation("expr::attach"));
            }
            ancestor = self.parents[id.index()];
        }
        self.parents[operand.index()] = Some(parent);
        Ok(())
    }

    /// Identifier from a path such as `Obj::field`; the path is its source text.
    pub fn ident(&mut self, path: &str) -> Result<ExprId> {
        let name = Name::parse(&self.interner, path).ok_or_else(|| {
            Error::invalid_argument(format!("'{}' is not an identifier path", path))
                .with_operation("expr::ident")
        })?;
        Ok(self.push(ExprKind::Id(name), path.trim().to_string()))
    }

    pub fn name(&mut self, name: Name, text: impl Into<String>) -> ExprId {
        self.push(ExprKind::Id(name), text.into())
    }

    pub fn literal(&mut self, kind: LiteralKind, text: impl Into<String>) -> ExprId {
        self.push(ExprKind::Literal(kind), text.into())
    }

    pub fn typed(&mut self, ty: TyRef, text: impl Into<String>) -> ExprId {
        self.push(ExprKind::Typed(ty), text.into())
    }

    /// `op operand`, with source text spelled from the operand's text.
    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> Result<ExprId> {
        self.check(operand)?;
        let text = op.spell(&self.nodes[operand.index()].text);
        self.unary_with_text(op, operand, text)
    }

    /// `op operand` with the source text as it appeared in the file.
    pub fn unary_with_text(
        &mut self,
        op: UnaryOp,
        operand: ExprId,
        text: impl Into<String>,
    ) -> Result<ExprId> {
        self.check(operand)?;
        let id = self.push(ExprKind::Unary { op, operand }, text.into());
        if let Err(err) = self.attach(id, operand) {
            self.nodes.pop();
            self.parents.pop();
            return Err(err);
        }
        Ok(id)
    }

    /// Replace the operand of a unary node; the previous operand is released.
    pub fn set_operand(&mut self, expr: ExprId, operand: ExprId) -> Result<()> {
        self.check(expr)?;
        let old = match &self.nodes[expr.index()].kind {
            ExprKind::Unary { operand, .. } => *operand,
            _ => {
                return Err(Error::invalid_argument(format!("{} has no operand", expr))
                    .with_operation("expr::set_operand"));
            }
        };
        if old == operand {
            return Ok(());
        }
        self.attach(expr, operand)?;
        self.parents[old.index()] = None;
        if let ExprKind::Unary { operand: slot, .. } = &mut self.nodes[expr.index()].kind {
            *slot = operand;
        }
        Ok(())
    }

    /// The current operand of a unary node.
    pub fn operand(&self, expr: ExprId) -> Option<ExprId> {
        match &self.nodes.get(expr.index())?.kind {
            ExprKind::Unary { operand, .. } => Some(*operand),
            _ => None,
        }
    }

    pub fn freeze(self) -> ExprTree {
        ExprTree { nodes: self.nodes }
    }
}

/// Immutable view of an expression arena.
#[derive(Debug, Clone)]
pub struct ExprTree {
    nodes: Vec<ExprNode>,
}

impl ExprTree {
    pub fn contains(&self, id: ExprId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn get(&self, id: ExprId) -> Option<&ExprNode> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: ExprId) -> Result<&ExprNode> {
        self.get(id).ok_or_else(|| Error::expr_not_found(id.0))
    }

    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self[id].kind
    }

    pub fn text(&self, id: ExprId) -> &str {
        &self[id].text
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look through any number of `( ... )` wrappers.
    ///
    /// Returns the innermost expression and whether a wrapper was present.
    pub fn unwrap_brackets(&self, mut id: ExprId) -> (ExprId, bool) {
        let mut in_parenthesis = false;
        while let ExprKind::Unary {
            op: UnaryOp::Bracketed,
            operand,
        } = self[id].kind
        {
            id = operand;
            in_parenthesis = true;
        }
        (id, in_parenthesis)
    }
}

impl Index<ExprId> for ExprTree {
    type Output = ExprNode;

    fn index(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn builder() -> ExprBuilder {
        ExprBuilder::new(InternPool::new())
    }

    #[test]
    fn unary_text_is_spelled_from_operand() {
        let mut b = builder();
        let method = b.ident("Obj::method").unwrap();
        let paren = b.unary(UnaryOp::Bracketed, method).unwrap();
        let addr = b.unary(UnaryOp::AddressOf, paren).unwrap();
        let x = b.ident("x").unwrap();
        let size = b.unary(UnaryOp::Sizeof, x).unwrap();
        let post = b.ident("i").unwrap();
        let post = b.unary(UnaryOp::PostfixIncr, post).unwrap();
        let tree = b.freeze();

        assert_eq!(tree.text(addr), "&(Obj::method)");
        assert_eq!(tree.text(size), "sizeof(x)");
        assert_eq!(tree.text(post), "i++");
    }

    #[test]
    fn sizeof_of_bracketed_does_not_double_parenthesize() {
        let mut b = builder();
        let x = b.ident("x").unwrap();
        let paren = b.unary(UnaryOp::Bracketed, x).unwrap();
        let size = b.unary(UnaryOp::Sizeof, paren).unwrap();
        assert_eq!(b.freeze().text(size), "sizeof(x)");
    }

    #[test]
    fn names_track_qualification() {
        let pool = InternPool::new();
        let plain = Name::parse(&pool, "x").unwrap();
        let scoped = Name::parse(&pool, "ns :: Obj::field").unwrap();
        let global = Name::parse(&pool, "::x").unwrap();

        assert!(!plain.is_qualified());
        assert!(scoped.is_qualified());
        assert_eq!(scoped.segments().len(), 3);
        assert_eq!(scoped.qualifier().len(), 2);
        assert_eq!(pool.resolve_owned(scoped.last()).as_deref(), Some("field"));
        assert!(global.is_global() && global.is_qualified());
        assert!(Name::parse(&pool, "a::").is_none());
    }

    #[test]
    fn names_need_a_segment() {
        let pool = InternPool::new();
        assert!(Name::new(std::iter::empty(), true).is_none());

        let name = Name::new([pool.intern("Obj"), pool.intern("field")], false).unwrap();
        assert_eq!(name, Name::parse(&pool, "Obj::field").unwrap());
        assert_eq!(name.qualifier(), &[pool.intern("Obj")]);
    }

    #[test]
    fn operands_are_not_shared() {
        let mut b = builder();
        let x = b.ident("x").unwrap();
        b.unary(UnaryOp::Deref, x).unwrap();
        let err = b.unary(UnaryOp::Minus, x).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperandShared);
        // The failed node is not left behind.
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn set_operand_releases_previous_operand() {
        let mut b = builder();
        let x = b.ident("x").unwrap();
        let y = b.ident("y").unwrap();
        let deref = b.unary(UnaryOp::Deref, x).unwrap();

        b.set_operand(deref, y).unwrap();
        assert_eq!(b.operand(deref), Some(y));

        // `x` is free again and can be attached elsewhere.
        let neg = b.unary(UnaryOp::Minus, x).unwrap();
        assert_eq!(b.operand(neg), Some(x));

        let err = b.set_operand(x, y).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn ancestors_cannot_become_operands() {
        let mut b = builder();
        let x = b.ident("x").unwrap();
        let p1 = b.unary(UnaryOp::Bracketed, x).unwrap();
        let p2 = b.unary(UnaryOp::Bracketed, p1).unwrap();
        let p3 = b.unary(UnaryOp::Bracketed, p2).unwrap();

        let err = b.set_operand(p1, p3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(b.operand(p1), Some(x));

        // A free node is still accepted.
        let y = b.ident("y").unwrap();
        b.set_operand(p1, y).unwrap();
        let tree = b.freeze();
        assert_eq!(tree.unwrap_brackets(p3), (y, true));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut b = builder();
        let err = b.unary(UnaryOp::Deref, ExprId(9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExprNotFound);
        assert!(b.freeze().node(ExprId(0)).is_err());
    }

    #[test]
    fn unwrap_brackets_reports_parenthesis() {
        let mut b = builder();
        let x = b.ident("x").unwrap();
        let p1 = b.unary(UnaryOp::Bracketed, x).unwrap();
        let p2 = b.unary(UnaryOp::Bracketed, p1).unwrap();
        let tree = b.freeze();

        assert_eq!(tree.unwrap_brackets(p2), (x, true));
        assert_eq!(tree.unwrap_brackets(x), (x, false));
    }

    #[test]
    fn string_literal_is_const_char_array() {
        let ty = LiteralKind::String { len: 3 }.ty();
        let element = ty.element().unwrap();
        assert_eq!(element.cv(), CvQualifiers::CONST);
        assert_eq!(
            ty.as_ref(),
            &Type::Array {
                element: element.clone(),
                size: Some(4)
            }
        );
    }
}
