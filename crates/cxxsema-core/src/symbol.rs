use std::fmt;

use smallvec::SmallVec;
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::expr::UnaryOp;
use crate::interner::InternedStr;
use crate::scope::ScopeId;
use crate::ty::{TyRef, Type};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum BindingKind {
    DataMember,
    MemberFunction,
    Variable,
    Function,
}

/// The declaration an identifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: InternedStr,
    pub kind: BindingKind,
    /// Declared type of the entity.
    pub ty: TyRef,
    /// Class that declares the entity, for members.
    pub owner: Option<ClassId>,
    pub is_static: bool,
}

impl Binding {
    pub fn variable(name: InternedStr, ty: TyRef) -> Self {
        Self {
            name,
            kind: BindingKind::Variable,
            ty,
            owner: None,
            is_static: false,
        }
    }

    pub fn function(name: InternedStr, ty: TyRef) -> Self {
        Self {
            name,
            kind: BindingKind::Function,
            ty,
            owner: None,
            is_static: false,
        }
    }

    pub fn data_member(name: InternedStr, ty: TyRef, owner: ClassId) -> Self {
        Self {
            name,
            kind: BindingKind::DataMember,
            ty,
            owner: Some(owner),
            is_static: false,
        }
    }

    pub fn member_function(name: InternedStr, ty: TyRef, owner: ClassId) -> Self {
        Self {
            name,
            kind: BindingKind::MemberFunction,
            ty,
            owner: Some(owner),
            is_static: false,
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn is_member(&self) -> bool {
        matches!(self.kind, BindingKind::DataMember | BindingKind::MemberFunction)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, BindingKind::MemberFunction | BindingKind::Function)
    }
}

/// A declared `operator@` usable for a unary operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadBinding {
    pub op: UnaryOp,
    /// Declared return type of the overload.
    pub ret: TyRef,
    /// Declaring class for member operators, `None` for free functions.
    pub owner: Option<ClassId>,
    /// Parameter type of a free operator.
    pub param: Option<TyRef>,
}

impl OverloadBinding {
    pub fn member(op: UnaryOp, ret: TyRef, owner: ClassId) -> Self {
        Self {
            op,
            ret,
            owner: Some(owner),
            param: None,
        }
    }

    pub fn free(op: UnaryOp, ret: TyRef, param: TyRef) -> Self {
        Self {
            op,
            ret,
            owner: None,
            param: Some(param),
        }
    }

    pub fn is_member(&self) -> bool {
        self.owner.is_some()
    }
}

/// A class, struct or union declaration.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub id: ClassId,
    pub name: InternedStr,
    /// `ns::Outer::Name` as written from the global scope.
    pub qualified_name: String,
    /// Scope holding the class members.
    pub scope: ScopeId,
    pub bases: SmallVec<[ClassId; 2]>,
    pub operators: Vec<OverloadBinding>,
}

impl ClassDecl {
    pub fn ty(&self) -> TyRef {
        Type::class(self.id)
    }

    /// Member operators declared for `op` in this class only.
    pub fn operators_for(&self, op: UnaryOp) -> impl Iterator<Item = &OverloadBinding> {
        self.operators.iter().filter(move |o| o.op == op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::InternPool;
    use crate::ty::BasicKind;

    #[test]
    fn binding_constructors_set_kind_and_owner() {
        let pool = InternPool::new();
        let int = Type::basic(BasicKind::Int);

        let v = Binding::variable(pool.intern("v"), int.clone());
        assert!(!v.is_member());
        assert!(v.owner.is_none());

        let f = Binding::member_function(pool.intern("f"), int.clone(), ClassId(1));
        assert!(f.is_member() && f.is_function());
        assert_eq!(f.owner, Some(ClassId(1)));

        let s = Binding::data_member(pool.intern("s"), int, ClassId(1)).with_static(true);
        assert!(s.is_static);
        assert_eq!(s.kind.to_string(), "data_member");
    }

    #[test]
    fn operators_for_filters_by_kind() {
        let pool = InternPool::new();
        let int = Type::basic(BasicKind::Int);
        let decl = ClassDecl {
            id: ClassId(0),
            name: pool.intern("It"),
            qualified_name: "It".to_string(),
            scope: ScopeId(1),
            bases: SmallVec::new(),
            operators: vec![
                OverloadBinding::member(UnaryOp::Deref, int.clone(), ClassId(0)),
                OverloadBinding::member(UnaryOp::Minus, int, ClassId(0)),
            ],
        };
        assert_eq!(decl.operators_for(UnaryOp::Deref).count(), 1);
        assert_eq!(decl.operators_for(UnaryOp::Not).count(), 0);
        assert_eq!(decl.ty().as_class(), Some(ClassId(0)));
    }
}
