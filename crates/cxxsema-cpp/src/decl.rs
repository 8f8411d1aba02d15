//! Types of declarations: specifiers, cv-qualifiers and declarators.
//!
//! A C declarator reads inside out. The outermost declarator node is applied
//! to the specifier type first, so `int *arr[4]` (a pointer declarator around
//! an array declarator) becomes "array of 4 pointers to int" and
//! `int (*fp)(int)` becomes "pointer to function".

use cxxsema_core::{
    BasicKind, BasicModifiers, BasicType, CvQualifiers, Name, ProblemCode, ScopeId, TyRef, Type,
};
use cxxsema_resolver::resolve_type_name;
use tree_sitter::Node;

use crate::collect::Collector;
use crate::parse::{named_children, node_text};

/// `<cstddef>`/`<cstdint>` names the grammar reports as primitive types.
const SIZED_TYPEDEFS: &[(&str, &str)] = &[
    ("size_t", "unsigned long"),
    ("ssize_t", "long"),
    ("ptrdiff_t", "long"),
    ("intptr_t", "long"),
    ("uintptr_t", "unsigned long"),
    ("int8_t", "signed char"),
    ("uint8_t", "unsigned char"),
    ("int16_t", "short"),
    ("uint16_t", "unsigned short"),
    ("int32_t", "int"),
    ("uint32_t", "unsigned int"),
    ("int64_t", "long"),
    ("uint64_t", "unsigned long"),
];

impl<'s> Collector<'s> {
    /// Type of the `type` field of a declaration, with its cv-qualifiers.
    ///
    /// Constructors and destructors have no type field and get `void`.
    pub(crate) fn declared_base(&mut self, decl: Node<'_>, scope: ScopeId) -> TyRef {
        let base = match decl.child_by_field_name("type") {
            Some(spec) => self.specifier_type(spec, scope),
            None => Type::basic(BasicKind::Void),
        };
        Type::qualified(base, cv_of(decl, self.source))
    }

    pub(crate) fn specifier_type(&mut self, spec: Node<'_>, scope: ScopeId) -> TyRef {
        let text = node_text(spec, self.source);
        match spec.kind() {
            "primitive_type" => primitive_type(self, text),
            "sized_type_specifier" => match BasicType::from_spelling(text) {
                Some(basic) => Type::from_basic(basic),
                None => Type::problem(ProblemCode::NameNotFound, text),
            },
            "type_identifier" | "qualified_identifier" | "template_type" | "identifier" => {
                self.named_type(spec, scope)
            }
            "dependent_type" => match named_children(spec).first() {
                Some(inner) => self.specifier_type(*inner, scope),
                None => Type::problem(ProblemCode::NameNotFound, text),
            },
            "struct_specifier" | "class_specifier" | "union_specifier" => {
                Type::class(self.class_specifier(spec, scope))
            }
            "enum_specifier" => self.enum_specifier(spec, scope),
            _ => {
                tracing::trace!("unsupported type specifier '{}'", spec.kind());
                Type::problem(ProblemCode::InvalidType, text)
            }
        }
    }

    /// Look a type name up from `scope`; unknown names become problem types.
    pub(crate) fn named_type(&self, node: Node<'_>, scope: ScopeId) -> TyRef {
        let path = path_text(node, self.source);
        Name::parse(self.table.interner(), &path)
            .and_then(|name| resolve_type_name(&self.table, &name, scope))
            .unwrap_or_else(|| Type::problem(ProblemCode::NameNotFound, node_text(node, self.source)))
    }

    /// Apply a declarator chain to `base`.
    ///
    /// Returns the declared name node (if the declarator is not abstract) and
    /// the resulting type.
    pub(crate) fn apply_declarator<'t>(
        &mut self,
        base: TyRef,
        declarator: Option<Node<'t>>,
        scope: ScopeId,
    ) -> (Option<Node<'t>>, TyRef) {
        let mut ty = base;
        let mut current = declarator;
        while let Some(node) = current {
            match node.kind() {
                "pointer_declarator" | "abstract_pointer_declarator" => {
                    ty = Type::qualified(Type::pointer(ty), cv_of(node, self.source));
                    current = node.child_by_field_name("declarator");
                }
                "reference_declarator" | "abstract_reference_declarator" => {
                    ty = if has_token(node, "&&") {
                        Type::rvalue_reference(ty)
                    } else {
                        Type::reference(ty)
                    };
                    current = named_children(node).into_iter().last();
                }
                "array_declarator" | "abstract_array_declarator" => {
                    let size = node
                        .child_by_field_name("size")
                        .and_then(|size| parse_integer(node_text(size, self.source)));
                    ty = Type::array(ty, size);
                    current = node.child_by_field_name("declarator");
                }
                "function_declarator" | "abstract_function_declarator" => {
                    let ret = match trailing_return(node) {
                        Some(desc) => self.type_descriptor(desc, scope),
                        None => ty,
                    };
                    let params = node
                        .child_by_field_name("parameters")
                        .map(|params| self.parameter_types(params, scope))
                        .unwrap_or_default();
                    ty = Type::function(ret, params);
                    current = node.child_by_field_name("declarator");
                }
                "init_declarator" => current = node.child_by_field_name("declarator"),
                "parenthesized_declarator"
                | "abstract_parenthesized_declarator"
                | "attributed_declarator" => {
                    current = named_children(node)
                        .into_iter()
                        .find(|child| !matches!(child.kind(), "type_qualifier" | "attribute_declaration"));
                }
                _ => return (Some(node), ty),
            }
        }
        (None, ty)
    }

    /// Type named by a `type_descriptor` such as `const char *`.
    pub(crate) fn type_descriptor(&mut self, desc: Node<'_>, scope: ScopeId) -> TyRef {
        let base = self.declared_base(desc, scope);
        self.apply_declarator(base, desc.child_by_field_name("declarator"), scope)
            .1
    }

    /// Adjusted parameter types of a `parameter_list`.
    pub(crate) fn parameter_types(&mut self, params: Node<'_>, scope: ScopeId) -> Vec<TyRef> {
        let mut types = Vec::new();
        for param in named_children(params) {
            if !matches!(
                param.kind(),
                "parameter_declaration" | "optional_parameter_declaration"
            ) {
                continue;
            }
            let declarator = param.child_by_field_name("declarator");
            let base = self.declared_base(param, scope);
            let (_, ty) = self.apply_declarator(base, declarator, scope);
            let is_void = declarator.is_none()
                && ty.as_basic().is_some_and(|basic| basic.kind() == BasicKind::Void);
            if !is_void {
                types.push(adjust_parameter(ty));
            }
        }
        types
    }
}

fn primitive_type(collector: &Collector<'_>, text: &str) -> TyRef {
    if let Some(basic) = BasicType::from_spelling(text) {
        return Type::from_basic(basic);
    }
    match SIZED_TYPEDEFS.iter().find(|(name, _)| *name == text) {
        Some((name, spelling)) => {
            let aliased = BasicType::from_spelling(spelling)
                .unwrap_or_else(|| BasicType::new(BasicKind::Int).with_modifiers(BasicModifiers::LONG));
            Type::typedef(collector.table.interner().intern(name), Type::from_basic(aliased))
        }
        None => Type::problem(ProblemCode::NameNotFound, text),
    }
}

/// Arrays and functions decay to pointers in parameter position.
pub(crate) fn adjust_parameter(ty: TyRef) -> TyRef {
    match ty.as_ref() {
        Type::Array { element, .. } => Type::pointer(element.clone()),
        Type::Function { .. } => Type::pointer(ty),
        _ => ty,
    }
}

/// Union of the `type_qualifier` children of `node`.
pub(crate) fn cv_of(node: Node<'_>, source: &str) -> CvQualifiers {
    named_children(node)
        .into_iter()
        .filter(|child| child.kind() == "type_qualifier")
        .filter_map(|child| CvQualifiers::from_keyword(node_text(child, source).trim()))
        .fold(CvQualifiers::empty(), |acc, cv| acc | cv)
}

/// Whether `node` has a storage class specifier spelled `keyword`.
pub(crate) fn has_storage(node: Node<'_>, source: &str, keyword: &str) -> bool {
    named_children(node)
        .into_iter()
        .any(|child| child.kind() == "storage_class_specifier" && node_text(child, source) == keyword)
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| !child.is_named() && child.kind() == token);
    found
}

fn trailing_return(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node)
        .into_iter()
        .find(|child| child.kind() == "trailing_return_type")
        .and_then(|ret| {
            named_children(ret)
                .into_iter()
                .find(|child| child.kind() == "type_descriptor")
        })
}

/// `ns::Outer::Name` path of an identifier-like node, without template arguments.
pub(crate) fn path_text(node: Node<'_>, source: &str) -> String {
    match node.kind() {
        "qualified_identifier" | "nested_namespace_specifier" if node.child_by_field_name("name").is_some() => {
            let scope = node
                .child_by_field_name("scope")
                .map(|scope| path_text(scope, source))
                .unwrap_or_default();
            let name = node
                .child_by_field_name("name")
                .map(|name| path_text(name, source))
                .unwrap_or_default();
            format!("{scope}::{name}")
        }
        "template_type" | "template_function" => node
            .child_by_field_name("name")
            .map(|name| path_text(name, source))
            .unwrap_or_default(),
        _ => node_text(node, source).split_whitespace().collect(),
    }
}

/// Integer value of a literal such as `16`, `0x10u` or `1'000`.
pub(crate) fn parse_integer(text: &str) -> Option<u64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '\'')
        .collect::<String>()
        .to_ascii_lowercase();
    let digits = cleaned.trim_end_matches(['u', 'l', 'z']);
    if let Some(hex) = digits.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = digits.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}
