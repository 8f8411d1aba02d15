use cxxsema_core::{
    BasicKind, Binding, ClassId, CvQualifiers, ExprBuilder, ExprId, ExprTree, OverloadBinding,
    ScopeId, ScopeKind, SymbolTable, TyRef, Type, TypePrinter, UnaryOp,
};
use cxxsema_resolver::{TargetModel, TyCtxt};
use tracing_subscriber::EnvFilter;

/// A translation unit equivalent to:
///
/// ```cpp
/// struct Obj { double field; int method(); static int count; };
/// struct SomeStruct {};
/// struct Iter { int& operator*(); };
/// typedef int& IntRef;
/// template <typename T> void f(T t) {
///     int v; int* p; int arr[4]; const int cv; IntRef r;
///     SomeStruct x; Iter it;
/// }
/// ```
#[allow(dead_code)]
pub struct Fixture {
    pub table: SymbolTable,
    pub target: TargetModel,
    pub body: ScopeId,
    pub obj: ClassId,
    pub iter: ClassId,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        init_tracing();

        let mut table = SymbolTable::new(Default::default());
        let target = TargetModel::standard(&mut table);
        let pool = table.interner().clone();
        let g = table.global();
        let int = Type::basic(BasicKind::Int);

        let obj = table.declare_class(g, "Obj");
        let obj_scope = table.class(obj).scope;
        table.declare_value(
            obj_scope,
            Binding::data_member(pool.intern("field"), Type::basic(BasicKind::Double), obj),
        );
        table.declare_value(
            obj_scope,
            Binding::member_function(pool.intern("method"), Type::function(int.clone(), vec![]), obj),
        );
        table.declare_value(
            obj_scope,
            Binding::data_member(pool.intern("count"), int.clone(), obj).with_static(true),
        );

        let some = table.declare_class(g, "SomeStruct");

        let iter = table.declare_class(g, "Iter");
        table.add_operator(
            iter,
            OverloadBinding::member(UnaryOp::Deref, Type::reference(int.clone()), iter),
        );

        let int_ref = Type::typedef(pool.intern("IntRef"), Type::reference(int.clone()));
        table.declare_type(g, pool.intern("IntRef"), int_ref.clone());

        let tmpl = table.add_scope(ScopeKind::Template, g);
        let t = pool.intern("T");
        table.declare_type(tmpl, t, Type::dependent(t));
        let body = table.add_scope(ScopeKind::Block, tmpl);

        let locals = [
            ("t", Type::dependent(t)),
            ("v", int.clone()),
            ("p", Type::pointer(int.clone())),
            ("arr", Type::array(int.clone(), Some(4))),
            ("cv", Type::qualified(int.clone(), CvQualifiers::CONST)),
            ("r", int_ref),
            ("x", Type::class(some)),
            ("it", Type::class(iter)),
        ];
        for (name, ty) in locals {
            table.declare_value(body, Binding::variable(pool.intern(name), ty));
        }

        Self {
            table,
            target,
            body,
            obj,
            iter,
        }
    }

    pub fn builder(&self) -> ExprBuilder {
        ExprBuilder::new(self.table.interner().clone())
    }

    pub fn resolve(&self, tree: &ExprTree, expr: ExprId) -> TyRef {
        TyCtxt::with_table(&self.table, &self.target).resolve_type(tree, self.body, expr)
    }

    pub fn render(&self, ty: &TyRef) -> String {
        TypePrinter::new(&self.table).render(ty)
    }

    /// Build `op` applied to the identifier `path` and resolve it.
    pub fn unary_on(&self, op: UnaryOp, path: &str) -> (ExprTree, ExprId, TyRef) {
        let mut b = self.builder();
        let operand = b.ident(path).unwrap();
        let expr = b.unary(op, operand).unwrap();
        let tree = b.freeze();
        let ty = self.resolve(&tree, expr);
        (tree, expr, ty)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
