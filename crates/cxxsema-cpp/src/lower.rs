//! Lowering of tree-sitter expressions into [`ExprTree`]s.
//!
//! Only the forms the resolver has rules for are lowered: unary operators,
//! parentheses, names and literals. Casts and `this` carry their type
//! directly. Anything else fails with an `Unsupported` error and the caller
//! skips the whole expression.

use cxxsema_core::{
    BasicKind, CvQualifiers, ExprBuilder, ExprId, ExprTree, LiteralKind, Name, ScopeId, Type,
    UnaryOp,
};
use cxxsema_error::{Error, ErrorKind, Result};
use tree_sitter::Node;

use crate::collect::{Collector, line_of};
use crate::decl::{parse_integer, path_text};
use crate::parse::{named_children, node_text};

const CASTS: &[&str] = &["static_cast", "const_cast", "reinterpret_cast", "dynamic_cast"];

pub(crate) const RED_ZONE: usize = 64 * 1024;
pub(crate) const STACK_PER_RECURSION: usize = 1024 * 1024;

impl<'s> Collector<'s> {
    pub(crate) fn lower_root(&mut self, node: Node<'_>, scope: ScopeId) -> Result<(ExprTree, ExprId)> {
        let mut builder = ExprBuilder::new(self.table.interner().clone());
        let root = self.lower_expr(&mut builder, node, scope)?;
        Ok((builder.freeze(), root))
    }

    fn lower_expr(&mut self, b: &mut ExprBuilder, node: Node<'_>, scope: ScopeId) -> Result<ExprId> {
        if self.depth >= self.option.max_depth {
            return Err(Error::new(
                ErrorKind::Unsupported,
                format!("operands nested deeper than {} levels", self.option.max_depth),
            )
            .with_operation("cpp::lower_expr")
            .with_context("line", line_of(node).to_string()));
        }
        self.depth += 1;
        let id = stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || {
            self.lower_node(b, node, scope)
        });
        self.depth -= 1;
        id
    }

    fn lower_node(&mut self, b: &mut ExprBuilder, node: Node<'_>, scope: ScopeId) -> Result<ExprId> {
        let text = self.text(node);
        match node.kind() {
            "parenthesized_expression" => {
                let inner = self.first_named(node)?;
                let operand = self.lower_expr(b, inner, scope)?;
                b.unary_with_text(UnaryOp::Bracketed, operand, text)
            }
            "pointer_expression" => {
                let op = match self.operator_token(node) {
                    Some("*") => UnaryOp::Deref,
                    Some("&") => UnaryOp::AddressOf,
                    _ => return Err(self.unsupported(node)),
                };
                self.lower_unary(b, node, op, scope)
            }
            "unary_expression" => {
                let op = self
                    .operator_token(node)
                    .and_then(UnaryOp::from_prefix_token)
                    .ok_or_else(|| self.unsupported(node))?;
                self.lower_unary(b, node, op, scope)
            }
            "update_expression" => {
                let (Some(operator), Some(argument)) = (
                    node.child_by_field_name("operator"),
                    node.child_by_field_name("argument"),
                ) else {
                    return Err(self.unsupported(node));
                };
                let prefix = operator.start_byte() < argument.start_byte();
                let op = match (self.text(operator), prefix) {
                    ("++", true) => UnaryOp::PrefixIncr,
                    ("--", true) => UnaryOp::PrefixDecr,
                    ("++", false) => UnaryOp::PostfixIncr,
                    ("--", false) => UnaryOp::PostfixDecr,
                    _ => return Err(self.unsupported(node)),
                };
                self.lower_unary(b, node, op, scope)
            }
            "sizeof_expression" => {
                let operand = match (
                    node.child_by_field_name("value"),
                    node.child_by_field_name("type"),
                ) {
                    (Some(value), _) => self.lower_expr(b, value, scope)?,
                    (None, Some(desc)) => {
                        let ty = self.type_descriptor(desc, scope);
                        b.typed(ty, self.text(desc))
                    }
                    (None, None) => return Err(self.unsupported(node)),
                };
                b.unary_with_text(UnaryOp::Sizeof, operand, text)
            }
            "call_expression" => self.lower_call(b, node, scope),
            "cast_expression" => {
                let desc = node
                    .child_by_field_name("type")
                    .ok_or_else(|| self.unsupported(node))?;
                let ty = self.type_descriptor(desc, scope);
                Ok(b.typed(ty, text))
            }
            "identifier" | "qualified_identifier" => {
                let name = Name::parse(self.table.interner(), &path_text(node, self.source))
                    .ok_or_else(|| self.unsupported(node))?;
                Ok(b.name(name, text))
            }
            "this" => {
                let class = self
                    .table
                    .enclosing_class(scope)
                    .ok_or_else(|| self.unsupported(node))?;
                Ok(b.typed(Type::pointer(Type::class(class)), text))
            }
            "number_literal" => {
                let kind = number_kind(text).ok_or_else(|| self.unsupported(node))?;
                Ok(b.literal(kind, text))
            }
            "char_literal" => Ok(b.literal(char_kind(text), text)),
            "string_literal" | "raw_string_literal" | "concatenated_string" => {
                let len = string_length(node, self.source);
                match string_element(text) {
                    None => Ok(b.literal(LiteralKind::String { len }, text)),
                    Some(element) => {
                        let element = Type::qualified(Type::basic(element), CvQualifiers::CONST);
                        Ok(b.typed(Type::array(element, Some(len + 1)), text))
                    }
                }
            }
            "true" | "false" => Ok(b.literal(LiteralKind::Bool, text)),
            "nullptr" => Ok(b.literal(LiteralKind::Nullptr, text)),
            "null" if text == "nullptr" => Ok(b.literal(LiteralKind::Nullptr, text)),
            "null" => Ok(b.literal(LiteralKind::Int, text)),
            _ => Err(self.unsupported(node)),
        }
    }

    fn lower_unary(
        &mut self,
        b: &mut ExprBuilder,
        node: Node<'_>,
        op: UnaryOp,
        scope: ScopeId,
    ) -> Result<ExprId> {
        let argument = node
            .child_by_field_name("argument")
            .ok_or_else(|| self.unsupported(node))?;
        let operand = self.lower_expr(b, argument, scope)?;
        b.unary_with_text(op, operand, self.text(node))
    }

    /// `typeid(...)` and the named casts; other calls are unsupported.
    fn lower_call(&mut self, b: &mut ExprBuilder, node: Node<'_>, scope: ScopeId) -> Result<ExprId> {
        let function = node
            .child_by_field_name("function")
            .ok_or_else(|| self.unsupported(node))?;
        let arguments = node.child_by_field_name("arguments");

        if self.text(function) == "typeid" {
            let argument = arguments
                .and_then(|args| named_children(args).into_iter().next())
                .ok_or_else(|| self.unsupported(node))?;
            let operand = match argument.kind() {
                "type_descriptor" => {
                    let ty = self.type_descriptor(argument, scope);
                    b.typed(ty, self.text(argument))
                }
                "primitive_type" | "sized_type_specifier" => {
                    let ty = self.specifier_type(argument, scope);
                    b.typed(ty, self.text(argument))
                }
                _ => self.lower_expr(b, argument, scope)?,
            };
            return b.unary_with_text(UnaryOp::Typeid, operand, self.text(node));
        }

        if function.kind() == "template_function" {
            let name = function
                .child_by_field_name("name")
                .map(|name| self.text(name))
                .unwrap_or_default();
            if CASTS.contains(&name) {
                let desc = function
                    .child_by_field_name("arguments")
                    .and_then(|args| {
                        named_children(args)
                            .into_iter()
                            .find(|arg| arg.kind() == "type_descriptor")
                    })
                    .ok_or_else(|| self.unsupported(node))?;
                let ty = self.type_descriptor(desc, scope);
                return Ok(b.typed(ty, self.text(node)));
            }
        }
        Err(self.unsupported(node))
    }

    fn first_named<'t>(&self, node: Node<'t>) -> Result<Node<'t>> {
        named_children(node)
            .into_iter()
            .next()
            .ok_or_else(|| self.unsupported(node))
    }

    fn operator_token(&self, node: Node<'_>) -> Option<&'s str> {
        node.child_by_field_name("operator")
            .map(|op| node_text(op, self.source))
    }

    fn unsupported(&self, node: Node<'_>) -> Error {
        Error::unsupported(node.kind())
            .with_operation("cpp::lower_expr")
            .with_context("line", line_of(node).to_string())
            .with_context("text", self.text(node))
    }
}

/// Literal kind of a numeric literal on an LP64 target.
///
/// Unsuffixed decimal integers take the first of `int`, `long` that fits;
/// hexadecimal and octal ones may also become unsigned.
pub(crate) fn number_kind(text: &str) -> Option<LiteralKind> {
    let lower: String = text
        .trim()
        .trim_start_matches(['-', '+'])
        .chars()
        .filter(|c| *c != '\'')
        .collect::<String>()
        .to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let is_float = if is_hex {
        lower.contains('p')
    } else {
        lower.contains('.') || lower.contains('e')
    };

    if is_float {
        let kind = if lower.ends_with('f') {
            LiteralKind::Float
        } else if lower.ends_with('l') {
            LiteralKind::LongDouble
        } else {
            LiteralKind::Double
        };
        return Some(kind);
    }

    let suffix_start = if is_hex {
        lower[2..]
            .find(|c: char| !c.is_ascii_hexdigit())
            .map_or(lower.len(), |at| at + 2)
    } else {
        lower
            .find(|c: char| !c.is_ascii_alphanumeric() || matches!(c, 'u' | 'l' | 'z'))
            .unwrap_or(lower.len())
    };
    let suffix = &lower[suffix_start..];
    let unsigned = suffix.contains('u');
    let longs = suffix.matches('l').count();
    let value = parse_integer(&lower)?;

    let kind = match (longs, unsigned) {
        (2, false) => LiteralKind::LongLong,
        (2, true) => LiteralKind::UnsignedLongLong,
        (1, false) if value <= i64::MAX as u64 => LiteralKind::Long,
        (1, _) => LiteralKind::UnsignedLong,
        (_, true) if value <= u32::MAX as u64 => LiteralKind::UnsignedInt,
        (_, true) => LiteralKind::UnsignedLong,
        _ => {
            let decimal = (!is_hex && !lower.starts_with('0')) || lower == "0";
            if value <= i32::MAX as u64 {
                LiteralKind::Int
            } else if !decimal && value <= u32::MAX as u64 {
                LiteralKind::UnsignedInt
            } else if value <= i64::MAX as u64 {
                LiteralKind::Long
            } else if decimal {
                return None;
            } else {
                LiteralKind::UnsignedLong
            }
        }
    };
    Some(kind)
}

fn char_kind(text: &str) -> LiteralKind {
    match text.split('\'').next().unwrap_or_default() {
        "L" => LiteralKind::WChar,
        "u8" => LiteralKind::Char8,
        "u" => LiteralKind::Char16,
        "U" => LiteralKind::Char32,
        _ => LiteralKind::Char,
    }
}

/// Element type of a prefixed string literal; `None` for narrow strings.
fn string_element(text: &str) -> Option<BasicKind> {
    let prefix = text
        .split(['"', 'R'])
        .next()
        .unwrap_or_default();
    match prefix {
        "L" => Some(BasicKind::WChar),
        "u8" => Some(BasicKind::Char8),
        "u" => Some(BasicKind::Char16),
        "U" => Some(BasicKind::Char32),
        _ => None,
    }
}

/// Number of code units in a string literal, excluding the terminator.
fn string_length(node: Node<'_>, source: &str) -> u64 {
    let mut len = 0;
    for child in named_children(node) {
        len += match child.kind() {
            "string_content" | "raw_string_content" => node_text(child, source).len() as u64,
            "escape_sequence" => 1,
            "string_literal" | "raw_string_literal" => string_length(child, source),
            _ => 0,
        };
    }
    len
}
