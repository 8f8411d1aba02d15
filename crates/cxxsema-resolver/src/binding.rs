//! Name binding over a [`SymbolTable`].
//!
//! Unqualified names walk the scope chain outward; inside a class scope the
//! base classes are searched before moving on to the enclosing scope.
//! Qualified names first resolve their qualifier to a namespace, a class or a
//! template parameter, then look the last segment up inside it.

use std::collections::HashSet;

use cxxsema_core::{Binding, ClassId, InternedStr, Name, ScopeId, SymbolTable, TyRef, Type};

use crate::normalize::{StripMask, normalize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Bound(Binding),
    /// The name is qualified by a template parameter.
    Dependent,
    Unresolved,
}

impl Resolution {
    pub fn binding(&self) -> Option<&Binding> {
        match self {
            Resolution::Bound(binding) => Some(binding),
            _ => None,
        }
    }
}

/// Maps identifiers to the declarations they denote.
pub trait BindingResolver: Send + Sync {
    fn resolve(&self, name: &Name, scope: ScopeId) -> Resolution;
}

impl BindingResolver for SymbolTable {
    fn resolve(&self, name: &Name, scope: ScopeId) -> Resolution {
        let last = name.last();
        if !name.is_qualified() {
            return match lookup_value(self, scope, last) {
                Some(binding) => Resolution::Bound(binding.clone()),
                None => Resolution::Unresolved,
            };
        }

        let found = match resolve_qualifier(self, name, scope) {
            Some(Qualifier::Namespace(ns)) => self.local_value(ns, last),
            Some(Qualifier::Class(class)) => member_value(self, class, last, &mut HashSet::new()),
            Some(Qualifier::Dependent(_)) => return Resolution::Dependent,
            None => None,
        };
        match found {
            Some(binding) => Resolution::Bound(binding.clone()),
            None => Resolution::Unresolved,
        }
    }
}

/// What the qualifier of a qualified name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    Namespace(ScopeId),
    Class(ClassId),
    /// A template parameter, which cannot be looked into before instantiation.
    Dependent(InternedStr),
}

/// Resolve everything before the last segment of `name`.
///
/// Names without a qualifier segment (`::x`) resolve to the global namespace.
pub fn resolve_qualifier(table: &SymbolTable, name: &Name, scope: ScopeId) -> Option<Qualifier> {
    let qualifier = name.qualifier();
    let Some((first, rest)) = qualifier.split_first() else {
        return name.is_global().then(|| Qualifier::Namespace(table.global()));
    };

    let mut current = if name.is_global() {
        scope_entry(table, table.global(), *first)?
    } else {
        let mut found = None;
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if let Some(entry) = scope_entry(table, id, *first) {
                found = Some(entry);
                break;
            }
            if let Some(class) = table.class_of_scope(id) {
                if let Some(ty) = member_type(table, class, *first, &mut HashSet::new()) {
                    found = qualifier_of_type(&ty);
                    if found.is_some() {
                        break;
                    }
                }
            }
            cursor = table.parent(id);
        }
        found?
    };

    for segment in rest {
        current = match current {
            Qualifier::Namespace(ns) => scope_entry(table, ns, *segment)?,
            Qualifier::Class(class) => {
                let ty = member_type(table, class, *segment, &mut HashSet::new())?;
                qualifier_of_type(&ty)?
            }
            Qualifier::Dependent(_) => return Some(current),
        };
    }
    Some(current)
}

/// Resolve a type name such as `Obj`, `ns::Alias` or `T`.
pub fn resolve_type_name(table: &SymbolTable, name: &Name, scope: ScopeId) -> Option<TyRef> {
    let last = name.last();
    if !name.is_qualified() {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if let Some(ty) = table.local_type(id, last) {
                return Some(ty.clone());
            }
            if let Some(class) = table.class_of_scope(id) {
                if let Some(ty) = member_type(table, class, last, &mut HashSet::new()) {
                    return Some(ty);
                }
            }
            cursor = table.parent(id);
        }
        return None;
    }

    match resolve_qualifier(table, name, scope)? {
        Qualifier::Namespace(ns) => table.local_type(ns, last).cloned(),
        Qualifier::Class(class) => member_type(table, class, last, &mut HashSet::new()),
        Qualifier::Dependent(param) => Some(Type::dependent(param)),
    }
}

fn scope_entry(table: &SymbolTable, scope: ScopeId, name: InternedStr) -> Option<Qualifier> {
    if let Some(ns) = table.child_namespace(scope, name) {
        return Some(Qualifier::Namespace(ns));
    }
    qualifier_of_type(table.local_type(scope, name)?)
}

fn qualifier_of_type(ty: &TyRef) -> Option<Qualifier> {
    match normalize(ty, StripMask::all()).as_ref() {
        Type::Class(class) => Some(Qualifier::Class(*class)),
        Type::Unknown(cxxsema_core::UnknownType::Dependent(param)) => {
            Some(Qualifier::Dependent(*param))
        }
        _ => None,
    }
}

fn lookup_value(table: &SymbolTable, scope: ScopeId, name: InternedStr) -> Option<&Binding> {
    let mut cursor = Some(scope);
    while let Some(id) = cursor {
        if let Some(binding) = table.local_value(id, name) {
            return Some(binding);
        }
        if let Some(class) = table.class_of_scope(id) {
            if let Some(binding) = member_value(table, class, name, &mut HashSet::new()) {
                return Some(binding);
            }
        }
        cursor = table.parent(id);
    }
    None
}

/// Member `name` of `class` or, depth first, of its bases.
fn member_value<'t>(
    table: &'t SymbolTable,
    class: ClassId,
    name: InternedStr,
    visited: &mut HashSet<ClassId>,
) -> Option<&'t Binding> {
    if !visited.insert(class) {
        return None;
    }
    let decl = table.get_class(class)?;
    if let Some(binding) = table.local_value(decl.scope, name) {
        return Some(binding);
    }
    decl.bases
        .iter()
        .find_map(|base| member_value(table, *base, name, visited))
}

fn member_type(
    table: &SymbolTable,
    class: ClassId,
    name: InternedStr,
    visited: &mut HashSet<ClassId>,
) -> Option<TyRef> {
    if !visited.insert(class) {
        return None;
    }
    let decl = table.get_class(class)?;
    if let Some(ty) = table.local_type(decl.scope, name) {
        return Some(ty.clone());
    }
    decl.bases
        .iter()
        .find_map(|base| member_type(table, *base, name, visited))
}
