//! Scoped symbol table for a translation unit.
//!
//! Scopes form a tree rooted at the global scope. Each scope maps names to
//! value bindings (variables, functions, members) and to type names (classes,
//! typedefs, template parameters). Namespaces are reopened rather than
//! duplicated. The table is built once by a collector and then only read.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use smallvec::SmallVec;
use strum_macros::{Display, IntoStaticStr};

use crate::interner::{InternPool, InternedStr};
use crate::symbol::{Binding, ClassDecl, ClassId, OverloadBinding};
use crate::ty::{TyRef, Type};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ScopeKind {
    Global,
    Namespace,
    Class(ClassId),
    /// Holds the type parameters of a template declaration.
    Template,
    Block,
}

#[derive(Debug)]
pub struct Scope {
    id: ScopeId,
    kind: ScopeKind,
    name: Option<InternedStr>,
    parent: Option<ScopeId>,
    values: HashMap<InternedStr, Binding>,
    types: HashMap<InternedStr, TyRef>,
    namespaces: HashMap<InternedStr, ScopeId>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, name: Option<InternedStr>, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            kind,
            name,
            parent,
            values: HashMap::new(),
            types: HashMap::new(),
            namespaces: HashMap::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn name(&self) -> Option<InternedStr> {
        self.name
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn value(&self, name: InternedStr) -> Option<&Binding> {
        self.values.get(&name)
    }

    pub fn type_name(&self, name: InternedStr) -> Option<&TyRef> {
        self.types.get(&name)
    }

    pub fn namespace(&self, name: InternedStr) -> Option<ScopeId> {
        self.namespaces.get(&name).copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &Binding> {
        self.values.values()
    }
}

pub struct SymbolTable {
    interner: InternPool,
    scopes: Vec<Scope>,
    classes: Vec<ClassDecl>,
    free_operators: Vec<OverloadBinding>,
}

impl SymbolTable {
    pub fn new(interner: InternPool) -> Self {
        Self {
            interner,
            scopes: vec![Scope::new(ScopeId(0), ScopeKind::Global, None, None)],
            classes: Vec::new(),
            free_operators: Vec::new(),
        }
    }

    pub fn interner(&self) -> &InternPool {
        &self.interner
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn get_scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.index())
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get_scope(id).and_then(|s| s.parent)
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn add_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        self.push_scope(kind, None, parent)
    }

    fn push_scope(&mut self, kind: ScopeKind, name: Option<InternedStr>, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, kind, name, Some(parent)));
        id
    }

    /// Open namespace `name` inside `parent`, reusing an earlier opening.
    pub fn namespace(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        let name = self.interner.intern(name);
        if let Some(existing) = self.scope(parent).namespace(name) {
            return existing;
        }
        let id = self.push_scope(ScopeKind::Namespace, Some(name), parent);
        self.scopes[parent.index()].namespaces.insert(name, id);
        id
    }

    /// The scope a declaration made in `scope` becomes visible in.
    ///
    /// Template parameter scopes are transparent for the declared name.
    pub fn declaring_scope(&self, mut scope: ScopeId) -> ScopeId {
        while self.scope(scope).kind == ScopeKind::Template {
            match self.scope(scope).parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }

    /// Declare class `name` in `scope`; a redeclaration returns the existing class.
    pub fn declare_class(&mut self, scope: ScopeId, name: &str) -> ClassId {
        let target = self.declaring_scope(scope);
        let symbol = self.interner.intern(name);
        if let Some(Type::Class(existing)) = self.scope(target).type_name(symbol).map(|t| t.as_ref()) {
            return *existing;
        }

        let id = ClassId(self.classes.len() as u32);
        let class_scope = self.push_scope(ScopeKind::Class(id), Some(symbol), scope);
        let qualified_name = self.qualified_name(class_scope);
        self.classes.push(ClassDecl {
            id,
            name: symbol,
            qualified_name,
            scope: class_scope,
            bases: SmallVec::new(),
            operators: Vec::new(),
        });
        self.scopes[target.index()].types.insert(symbol, Type::class(id));
        tracing::trace!("declared class {} in {}", name, target);
        id
    }

    /// Declare a value binding; the first declaration of a name wins.
    pub fn declare_value(&mut self, scope: ScopeId, binding: Binding) -> bool {
        match self.scopes[scope.index()].values.entry(binding.name) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(binding);
                true
            }
        }
    }

    /// Declare a type name (typedef, alias, template parameter, enum).
    pub fn declare_type(&mut self, scope: ScopeId, name: InternedStr, ty: TyRef) {
        self.scopes[scope.index()].types.insert(name, ty);
    }

    pub fn add_operator(&mut self, class: ClassId, overload: OverloadBinding) {
        self.classes[class.index()].operators.push(overload);
    }

    pub fn add_free_operator(&mut self, overload: OverloadBinding) {
        self.free_operators.push(overload);
    }

    pub fn add_base(&mut self, class: ClassId, base: ClassId) {
        if class == base {
            return;
        }
        let bases = &mut self.classes[class.index()].bases;
        if !bases.contains(&base) {
            bases.push(base);
        }
    }

    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id.index()]
    }

    pub fn get_class(&self, id: ClassId) -> Option<&ClassDecl> {
        self.classes.get(id.index())
    }

    pub fn classes(&self) -> &[ClassDecl] {
        &self.classes
    }

    pub fn free_operators(&self) -> &[OverloadBinding] {
        &self.free_operators
    }

    pub fn local_value(&self, scope: ScopeId, name: InternedStr) -> Option<&Binding> {
        self.get_scope(scope)?.value(name)
    }

    pub fn local_type(&self, scope: ScopeId, name: InternedStr) -> Option<&TyRef> {
        self.get_scope(scope)?.type_name(name)
    }

    pub fn child_namespace(&self, scope: ScopeId, name: InternedStr) -> Option<ScopeId> {
        self.get_scope(scope)?.namespace(name)
    }

    /// The class whose member scope `scope` is, if any.
    pub fn class_of_scope(&self, scope: ScopeId) -> Option<ClassId> {
        match self.get_scope(scope)?.kind {
            ScopeKind::Class(id) => Some(id),
            _ => None,
        }
    }

    /// Innermost enclosing class of `scope`, including `scope` itself.
    pub fn enclosing_class(&self, mut scope: ScopeId) -> Option<ClassId> {
        loop {
            if let Some(class) = self.class_of_scope(scope) {
                return Some(class);
            }
            scope = self.parent(scope)?;
        }
    }

    /// Declare (or find) a class by a path such as `std::type_info`.
    ///
    /// Every qualifier segment is opened as a namespace of the global scope.
    pub fn ensure_class_path(&mut self, path: &str) -> ClassId {
        let mut segments: Vec<&str> = path
            .trim_start_matches("::")
            .split("::")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let name = segments.pop().unwrap_or(path);
        let mut scope = self.global();
        for segment in segments {
            scope = self.namespace(scope, segment);
        }
        self.declare_class(scope, name)
    }

    /// `ns::Outer` path of a named scope, empty for the global scope.
    pub fn qualified_name(&self, scope: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(name) = s.name {
                parts.push(self.interner.display(name));
            }
            current = s.parent;
        }
        parts.reverse();
        parts.join("::")
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("scopes", &self.scopes.len())
            .field("classes", &self.classes.len())
            .field("free_operators", &self.free_operators.len())
            .finish()
    }
}
