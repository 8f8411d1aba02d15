pub mod expr;
pub mod interner;
pub mod printer;
pub mod scope;
pub mod symbol;
pub mod ty;

pub use expr::{ExprBuilder, ExprId, ExprKind, ExprNode, ExprTree, LiteralKind, Name, UnaryOp};
pub use interner::{InternPool, InternedStr};
pub use printer::TypePrinter;
pub use scope::{Scope, ScopeId, ScopeKind, SymbolTable};
pub use symbol::{Binding, BindingKind, ClassDecl, ClassId, OverloadBinding};
pub use ty::{
    BasicKind, BasicModifiers, BasicType, CvQualifiers, ProblemCode, ProblemType, TyRef, Type,
    UnknownType,
};
