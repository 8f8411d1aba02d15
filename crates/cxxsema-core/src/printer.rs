//! Render types with C++ declarator spelling.
//!
//! The printer works inside out: every pointer, reference, array or
//! function layer wraps the declarator text built so far, and the leaf type
//! is finally placed in front of it. `int (*)[4]`, `double Obj::*` and
//! `int * const` all fall out of the same recursion.

use crate::scope::SymbolTable;
use crate::ty::{TyRef, Type, UnknownType};

pub struct TypePrinter<'a> {
    table: &'a SymbolTable,
}

impl<'a> TypePrinter<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }

    pub fn render(&self, ty: &TyRef) -> String {
        self.declare(ty, String::new())
    }

    fn declare(&self, ty: &TyRef, declarator: String) -> String {
        match ty.as_ref() {
            Type::Pointer(pointee) => self.declare(pointee, prefix("*", &declarator)),
            Type::Reference { referred, rvalue } => {
                let token = if *rvalue { "&&" } else { "&" };
                self.declare(referred, prefix(token, &declarator))
            }
            Type::PointerToMember { member, owner, .. } => {
                let owner = self
                    .table
                    .get_class(*owner)
                    .map(|c| c.qualified_name.clone())
                    .unwrap_or_else(|| "?".to_string());
                self.declare(member, prefix(&format!("{owner}::*"), &declarator))
            }
            Type::Array { element, size } => {
                let extent = match size {
                    Some(n) => format!("[{n}]"),
                    None => "[]".to_string(),
                };
                self.declare(element, format!("{}{extent}", group(declarator)))
            }
            Type::Function { ret, params } => {
                let params: Vec<String> = params.iter().map(|p| self.render(p)).collect();
                self.declare(ret, format!("{}({})", group(declarator), params.join(", ")))
            }
            Type::Qualified { inner, cv } => match inner.as_ref() {
                Type::Pointer(_) | Type::PointerToMember { .. } => {
                    let qualified = if declarator.is_empty() {
                        cv.spelling().to_string()
                    } else {
                        format!("{} {declarator}", cv.spelling())
                    };
                    match inner.as_ref() {
                        Type::Pointer(pointee) => self.declare(pointee, prefix("*", &qualified)),
                        _ => format!("{} {}", self.render(inner), qualified),
                    }
                }
                _ if self.is_leaf(inner) => {
                    attach(format!("{} {}", cv.spelling(), self.leaf(inner)), declarator)
                }
                _ => format!("{} {}", cv.spelling(), self.declare(inner, declarator)),
            },
            _ => attach(self.leaf(ty), declarator),
        }
    }

    fn is_leaf(&self, ty: &TyRef) -> bool {
        matches!(
            ty.as_ref(),
            Type::Basic(_) | Type::Class(_) | Type::Typedef { .. } | Type::Unknown(_) | Type::Problem(_)
        )
    }

    fn leaf(&self, ty: &TyRef) -> String {
        let interner = self.table.interner();
        match ty.as_ref() {
            Type::Basic(basic) => basic.spelling(),
            Type::Class(id) => self
                .table
                .get_class(*id)
                .map(|c| c.qualified_name.clone())
                .unwrap_or_else(|| "?".to_string()),
            Type::Typedef { name, .. } => interner.display(*name),
            Type::Unknown(UnknownType::Dependent(name)) => interner.display(*name),
            Type::Unknown(UnknownType::UnnamedClass) => "<unknown>".to_string(),
            Type::Problem(_) => "?".to_string(),
            _ => self.render(ty),
        }
    }
}

/// Put a pointer-like token in front of the declarator.
fn prefix(token: &str, declarator: &str) -> String {
    if declarator.is_empty() {
        token.to_string()
    } else if declarator.starts_with('*') || declarator.starts_with('&') {
        format!("{token}{declarator}")
    } else {
        format!("{token} {declarator}")
    }
}

/// Array and function suffixes bind tighter than pointer prefixes.
fn group(declarator: String) -> String {
    if declarator.is_empty() || declarator.starts_with('(') || declarator.starts_with('[') {
        declarator
    } else {
        format!("({declarator})")
    }
}

fn attach(base: String, declarator: String) -> String {
    if declarator.is_empty() {
        base
    } else {
        format!("{base} {declarator}")
    }
}
