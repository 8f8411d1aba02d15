use cxxsema_core::{
    ExprId, ExprKind, ExprTree, Name, ProblemCode, ScopeId, SymbolTable, TyRef, Type, UnaryOp,
};
use cxxsema_error::{Error, Result};

use crate::ResolverOption;
use crate::binding::{BindingResolver, Resolution};
use crate::normalize::{StripMask, normalize};
use crate::overload::OperatorLookup;
use crate::target::TargetModel;

const RED_ZONE: usize = 64 * 1024;
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Static type rules for unary expressions.
///
/// resolve_* - computes the type of an expression node
/// *_type    - computes the type an operand contributes to a rule
///
/// The context keeps no state between calls: the result depends only on the
/// tree, the scope and the injected collaborators.
pub struct TyCtxt<'a> {
    bindings: &'a dyn BindingResolver,
    operators: &'a dyn OperatorLookup,
    target: &'a TargetModel,
    option: ResolverOption,
}

impl<'a> TyCtxt<'a> {
    pub fn new(
        bindings: &'a dyn BindingResolver,
        operators: &'a dyn OperatorLookup,
        target: &'a TargetModel,
    ) -> Self {
        Self {
            bindings,
            operators,
            target,
            option: ResolverOption::default(),
        }
    }

    /// Use one symbol table for both name binding and operator lookup.
    pub fn with_table(table: &'a SymbolTable, target: &'a TargetModel) -> Self {
        Self::new(table, table, target)
    }

    pub fn with_option(mut self, option: ResolverOption) -> Self {
        self.option = option;
        self
    }

    pub fn option(&self) -> &ResolverOption {
        &self.option
    }

    /// Computes the static type of `expr`, looking names up from `scope`.
    ///
    /// Semantic failures come back as problem types.
    ///
    /// # Panics
    /// Panics if `expr` does not belong to `tree`.
    pub fn resolve_type(&self, tree: &ExprTree, scope: ScopeId, expr: ExprId) -> TyRef {
        TyImpl::new(self, tree, scope).expr_type(expr)
    }

    /// Like [`TyCtxt::resolve_type`], reporting a foreign id as an error.
    pub fn try_resolve_type(&self, tree: &ExprTree, scope: ScopeId, expr: ExprId) -> Result<TyRef> {
        if !tree.contains(expr) {
            return Err(Error::expr_not_found(expr.0).with_operation("resolver::resolve_type"));
        }
        Ok(self.resolve_type(tree, scope, expr))
    }
}

// ============================================================================
// Internal Implementation
// ============================================================================

struct TyImpl<'c, 'a, 't> {
    cx: &'c TyCtxt<'a>,
    tree: &'t ExprTree,
    scope: ScopeId,
    depth: usize,
}

impl<'c, 'a, 't> TyImpl<'c, 'a, 't> {
    fn new(cx: &'c TyCtxt<'a>, tree: &'t ExprTree, scope: ScopeId) -> Self {
        Self {
            cx,
            tree,
            scope,
            depth: 0,
        }
    }

    fn expr_type(&mut self, expr: ExprId) -> TyRef {
        if self.depth >= self.cx.option.max_depth {
            tracing::debug!(depth = self.depth, "operand chain too deep at {}", expr);
            return Type::problem(ProblemCode::RecursionLimit, self.tree.text(expr));
        }
        self.depth += 1;
        let ty = stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.dispatch(expr));
        self.depth -= 1;
        ty
    }

    fn dispatch(&mut self, expr: ExprId) -> TyRef {
        let tree = self.tree;
        match tree.kind(expr) {
            ExprKind::Unary { op, operand } => self.resolve_unary(expr, *op, *operand),
            ExprKind::Id(name) => self.id_type(expr, name),
            ExprKind::Literal(literal) => literal.ty(),
            ExprKind::Typed(ty) => ty.clone(),
        }
    }

    fn resolve_unary(&mut self, expr: ExprId, op: UnaryOp, operand: ExprId) -> TyRef {
        match op {
            UnaryOp::Sizeof => self.cx.target.size_type(),
            UnaryOp::Typeid => self.cx.target.type_info(),
            UnaryOp::Deref => self.resolve_deref(expr, operand),
            UnaryOp::AddressOf => self.resolve_address_of(operand),
            _ => self.resolve_passthrough(expr, operand),
        }
    }

    fn resolve_deref(&mut self, expr: ExprId, operand: ExprId) -> TyRef {
        let operand_ty = self.expr_type(operand);
        let ty = normalize(&operand_ty, StripMask::all());
        match ty.as_ref() {
            Type::Problem(_) => ty,
            Type::Class(class) => match self.cx.operators.find_operator(UnaryOp::Deref, *class) {
                Some(overload) => overload.ret,
                None => self.invalid(expr),
            },
            Type::Pointer(pointee) => pointee.clone(),
            Type::Array { element, .. } => element.clone(),
            Type::Unknown(_) => Type::unnamed_class(),
            _ => self.invalid(expr),
        }
    }

    fn resolve_address_of(&mut self, operand: ExprId) -> TyRef {
        let tree = self.tree;
        let (inner, in_parenthesis) = tree.unwrap_brackets(operand);
        if let ExprKind::Id(name) = tree.kind(inner) {
            if let Some(ty) = self.member_address(inner, name, in_parenthesis) {
                return ty;
            }
        }

        let operand_ty = self.expr_type(operand);
        let ty = normalize(&operand_ty, StripMask::TYPEDEF | StripMask::REFERENCE);
        if ty.is_problem() {
            return ty;
        }
        Type::pointer(ty)
    }

    /// `&Class::member` forms a pointer-to-member; `&(Class::method)` is ill-formed.
    fn member_address(&self, id: ExprId, name: &Name, in_parenthesis: bool) -> Option<TyRef> {
        if !name.is_qualified() {
            return None;
        }
        let Resolution::Bound(binding) = self.cx.bindings.resolve(name, self.scope) else {
            return None;
        };
        let owner = binding.owner.filter(|_| binding.is_member() && !binding.is_static)?;
        if !in_parenthesis {
            return Some(Type::pointer_to_member(binding.ty, owner));
        }
        if binding.is_function() {
            return Some(Type::problem(ProblemCode::InvalidType, self.tree.text(id)));
        }
        None
    }

    fn resolve_passthrough(&mut self, expr: ExprId, operand: ExprId) -> TyRef {
        let operand_ty = self.expr_type(operand);
        let ty = normalize(&operand_ty, StripMask::TYPEDEF | StripMask::REFERENCE);
        match ty.as_basic() {
            Some(basic) => Type::from_basic(basic.with_origin(expr)),
            None => ty,
        }
    }

    fn id_type(&self, expr: ExprId, name: &Name) -> TyRef {
        match self.cx.bindings.resolve(name, self.scope) {
            Resolution::Bound(binding) => binding.ty,
            Resolution::Dependent => Type::dependent(name.segments()[0]),
            Resolution::Unresolved => {
                tracing::trace!("unresolved name '{}'", self.tree.text(expr));
                Type::problem(ProblemCode::NameNotFound, self.tree.text(expr))
            }
        }
    }

    fn invalid(&self, expr: ExprId) -> TyRef {
        Type::problem(ProblemCode::InvalidType, self.tree.text(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxxsema_core::{BasicKind, Binding, ExprBuilder, InternPool, LiteralKind};
    use pretty_assertions::assert_eq;

    fn setup() -> (SymbolTable, TargetModel) {
        let mut table = SymbolTable::new(InternPool::new());
        let target = TargetModel::standard(&mut table);
        let g = table.global();
        let x = table.interner().intern("x");
        table.declare_value(g, Binding::variable(x, Type::basic(BasicKind::Int)));
        (table, target)
    }

    #[test]
    fn literals_and_typed_operands_pass_through() {
        let (table, target) = setup();
        let cx = TyCtxt::with_table(&table, &target);
        let mut b = ExprBuilder::new(table.interner().clone());
        let lit = b.literal(LiteralKind::Double, "1.0");
        let typed = b.typed(Type::basic(BasicKind::Char), "c");
        let tree = b.freeze();

        assert_eq!(cx.resolve_type(&tree, table.global(), lit), Type::basic(BasicKind::Double));
        assert_eq!(cx.resolve_type(&tree, table.global(), typed), Type::basic(BasicKind::Char));
    }

    #[test]
    fn passthrough_stamps_basic_types_with_origin() {
        let (table, target) = setup();
        let cx = TyCtxt::with_table(&table, &target);
        let mut b = ExprBuilder::new(table.interner().clone());
        let x = b.ident("x").unwrap();
        let neg = b.unary(UnaryOp::Minus, x).unwrap();
        let tree = b.freeze();

        let ty = cx.resolve_type(&tree, table.global(), neg);
        assert_eq!(ty.as_basic().and_then(|basic| basic.origin()), Some(neg));
        assert_eq!(ty, Type::basic(BasicKind::Int));
    }

    #[test]
    fn depth_limit_produces_problem() {
        let (table, target) = setup();
        let cx = TyCtxt::with_table(&table, &target)
            .with_option(ResolverOption::default().with_max_depth(4));
        let mut b = ExprBuilder::new(table.interner().clone());
        let mut expr = b.ident("x").unwrap();
        for _ in 0..8 {
            expr = b.unary(UnaryOp::Not, expr).unwrap();
        }
        let tree = b.freeze();

        let ty = cx.resolve_type(&tree, table.global(), expr);
        assert_eq!(ty.problem_info().unwrap().code, ProblemCode::RecursionLimit);
    }

    #[test]
    fn deep_chains_resolve_within_default_limit() {
        let (table, target) = setup();
        let cx = TyCtxt::with_table(&table, &target);
        let mut b = ExprBuilder::new(table.interner().clone());
        let mut expr = b.ident("x").unwrap();
        for _ in 0..200 {
            expr = b.unary_with_text(UnaryOp::Minus, expr, "-x").unwrap();
        }
        let tree = b.freeze();
        assert_eq!(cx.resolve_type(&tree, table.global(), expr), Type::basic(BasicKind::Int));
    }

    #[test]
    fn foreign_ids_are_reported() {
        let (table, target) = setup();
        let cx = TyCtxt::with_table(&table, &target);
        let tree = ExprBuilder::new(table.interner().clone()).freeze();
        assert!(cx.try_resolve_type(&tree, table.global(), ExprId(3)).is_err());
    }
}
