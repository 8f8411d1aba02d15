use std::collections::HashSet;

use cxxsema_core::{ClassId, OverloadBinding, SymbolTable, UnaryOp};

use crate::normalize::{StripMask, normalize};

/// Finds user-declared `operator@` overloads for a class operand.
pub trait OperatorLookup: Send + Sync {
    /// `None` means the class declares no usable overload.
    fn find_operator(&self, op: UnaryOp, class: ClassId) -> Option<OverloadBinding>;
}

impl OperatorLookup for SymbolTable {
    fn find_operator(&self, op: UnaryOp, class: ClassId) -> Option<OverloadBinding> {
        if !op.is_overloadable() {
            return None;
        }
        if let Some(member) = find_member(self, op, class, &mut HashSet::new()) {
            tracing::trace!("member operator{} found for {}", op.token(), class);
            return Some(member.clone());
        }
        self.free_operators()
            .iter()
            .filter(|candidate| candidate.op == op)
            .find(|candidate| {
                candidate
                    .param
                    .as_ref()
                    .and_then(|param| normalize(param, StripMask::all()).as_class())
                    .is_some_and(|target| derives_from(self, class, target, &mut HashSet::new()))
            })
            .cloned()
    }
}

/// Member operators of `class`, then of its bases depth first.
fn find_member<'t>(
    table: &'t SymbolTable,
    op: UnaryOp,
    class: ClassId,
    visited: &mut HashSet<ClassId>,
) -> Option<&'t OverloadBinding> {
    if !visited.insert(class) {
        return None;
    }
    let decl = table.get_class(class)?;
    if let Some(found) = decl.operators_for(op).next() {
        return Some(found);
    }
    decl.bases
        .iter()
        .find_map(|base| find_member(table, op, *base, visited))
}

fn derives_from(
    table: &SymbolTable,
    class: ClassId,
    target: ClassId,
    visited: &mut HashSet<ClassId>,
) -> bool {
    if class == target {
        return true;
    }
    if !visited.insert(class) {
        return false;
    }
    table.get_class(class).is_some_and(|decl| {
        decl.bases
            .iter()
            .any(|base| derives_from(table, *base, target, visited))
    })
}
