use cxxsema_core::{
    BasicKind, Binding, ClassId, Name, OverloadBinding, ProblemCode, ScopeId, ScopeKind,
    SymbolTable, TyRef, Type, UnaryOp,
};
use cxxsema_resolver::{
    Qualifier, ResolverOption, StripMask, TargetModel, TyCtxt, normalize, resolve_qualifier,
};
use tree_sitter::Node;

use crate::Probe;
use crate::decl::{adjust_parameter, cv_of, has_storage, path_text};
use crate::lower::{RED_ZONE, STACK_PER_RECURSION};
use crate::parse::{field_children, named_children, node_text};

/// A function body whose walk waits until the enclosing class is complete.
type PendingBody<'t> = (Node<'t>, Node<'t>, ScopeId);

/// Walks a translation unit once, declaring names in source order and
/// lowering the expressions of function bodies as they are reached.
///
/// Inline member function bodies are walked after the whole class body has
/// been declared, so members declared later in the class are visible.
pub(crate) struct Collector<'s> {
    pub(crate) source: &'s str,
    pub(crate) table: SymbolTable,
    pub(crate) target: TargetModel,
    pub(crate) option: ResolverOption,
    pub(crate) probes: Vec<Probe>,
    pub(crate) skipped: usize,
    /// Operand levels entered by the expression being lowered.
    pub(crate) depth: usize,
    anonymous: usize,
}

impl<'s> Collector<'s> {
    pub(crate) fn new(
        source: &'s str,
        table: SymbolTable,
        target: TargetModel,
        option: ResolverOption,
    ) -> Self {
        Self {
            source,
            table,
            target,
            option,
            probes: Vec::new(),
            skipped: 0,
            depth: 0,
            anonymous: 0,
        }
    }

    pub(crate) fn finish(self) -> (SymbolTable, TargetModel, Vec<Probe>, usize) {
        (self.table, self.target, self.probes, self.skipped)
    }

    pub(crate) fn text(&self, node: Node<'_>) -> &'s str {
        node_text(node, self.source)
    }

    #[tracing::instrument(skip_all)]
    pub(crate) fn collect_unit(&mut self, root: Node<'_>) {
        let global = self.table.global();
        self.collect_items(root, global);
    }

    fn collect_items(&mut self, node: Node<'_>, scope: ScopeId) {
        for child in named_children(node) {
            self.collect_item(child, scope);
        }
    }

    fn collect_item(&mut self, node: Node<'_>, scope: ScopeId) {
        match node.kind() {
            "namespace_definition" => self.namespace_definition(node, scope),
            "declaration" => self.declaration(node, scope, None),
            "function_definition" => {
                if let Some((def, body, parent)) = self.function_definition(node, scope, None) {
                    self.function_body(def, body, parent);
                }
            }
            "template_declaration" => {
                let tmpl = self.template_scope(node, scope);
                for child in named_children(node) {
                    if child.kind() != "template_parameter_list" {
                        self.collect_item(child, tmpl);
                    }
                }
            }
            "type_definition" => self.type_definition(node, scope),
            "alias_declaration" => self.alias_declaration(node, scope),
            "struct_specifier" | "class_specifier" | "union_specifier" => {
                self.class_specifier(node, scope);
            }
            "enum_specifier" => {
                self.enum_specifier(node, scope);
            }
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.collect_items(body, scope);
                    } else {
                        self.collect_item(body, scope);
                    }
                }
            }
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif" | "preproc_elifdef" => {
                self.collect_items(node, scope)
            }
            "ERROR" => {
                tracing::debug!(line = line_of(node), "skipping unparsable declaration");
            }
            other => tracing::trace!("ignoring top-level '{}'", other),
        }
    }

    fn namespace_definition(&mut self, node: Node<'_>, scope: ScopeId) {
        // An unnamed namespace makes its members visible in the enclosing scope.
        let mut ns = scope;
        if let Some(name) = node.child_by_field_name("name") {
            for segment in self.text(name).split("::") {
                let segment = segment.trim();
                let segment = segment.strip_prefix("inline ").unwrap_or(segment).trim();
                if !segment.is_empty() {
                    ns = self.table.namespace(ns, segment);
                }
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.collect_items(body, ns);
        }
    }

    fn template_scope(&mut self, node: Node<'_>, scope: ScopeId) -> ScopeId {
        let tmpl = self.table.add_scope(ScopeKind::Template, scope);
        let Some(params) = node.child_by_field_name("parameters") else {
            return tmpl;
        };
        for param in named_children(params) {
            match param.kind() {
                "type_parameter_declaration" | "variadic_type_parameter_declaration" => {
                    let name = named_children(param)
                        .into_iter()
                        .find(|child| child.kind() == "type_identifier");
                    if let Some(name) = name {
                        self.declare_template_type(tmpl, name);
                    }
                }
                "optional_type_parameter_declaration" => {
                    if let Some(name) = param.child_by_field_name("name") {
                        self.declare_template_type(tmpl, name);
                    }
                }
                "parameter_declaration" | "optional_parameter_declaration" => {
                    let base = self.declared_base(param, tmpl);
                    let (name, ty) =
                        self.apply_declarator(base, param.child_by_field_name("declarator"), tmpl);
                    if let Some(name) = name {
                        let symbol = self.table.interner().intern(self.text(name));
                        self.table.declare_value(tmpl, Binding::variable(symbol, ty));
                    }
                }
                other => tracing::trace!("ignoring template parameter '{}'", other),
            }
        }
        tmpl
    }

    fn declare_template_type(&mut self, tmpl: ScopeId, name: Node<'_>) {
        let symbol = self.table.interner().intern(self.text(name));
        self.table.declare_type(tmpl, symbol, Type::dependent(symbol));
    }

    /// `declaration` and `field_declaration`: variables, members and function prototypes.
    fn declaration(&mut self, node: Node<'_>, scope: ScopeId, owner: Option<ClassId>) {
        let is_static = has_storage(node, self.source, "static");
        let deduced = node
            .child_by_field_name("type")
            .is_some_and(|spec| matches!(spec.kind(), "placeholder_type_specifier" | "auto"));
        let base = if deduced {
            None
        } else {
            Some(self.declared_base(node, scope))
        };
        let in_body = self.table.scope(scope).kind() == ScopeKind::Block;

        for declarator in field_children(node, "declarator") {
            let value = match declarator.kind() {
                "init_declarator" => declarator.child_by_field_name("value"),
                _ => None,
            };
            let base = match &base {
                Some(base) => base.clone(),
                None => Type::qualified(
                    self.deduce(node, declarator, value, scope),
                    cv_of(node, self.source),
                ),
            };
            let (name, ty) = self.apply_declarator(base, Some(declarator), scope);
            if let Some(name) = name {
                self.declare_entity(name, ty, scope, owner, is_static);
            }
            if let Some(value) = value.filter(|_| in_body) {
                self.probe_expr(value, scope);
            }
        }
    }

    /// Placeholder type of an `auto` declaration, deduced from its initializer.
    ///
    /// Top-level references and cv-qualifiers are dropped and arrays decay,
    /// except under a reference declarator (`auto&`) where cv is kept.
    /// `auto*` strips the pointer the declarator adds back.
    fn deduce(
        &mut self,
        decl: Node<'_>,
        declarator: Node<'_>,
        value: Option<Node<'_>>,
        scope: ScopeId,
    ) -> TyRef {
        let decl_text = node_text(decl, self.source);
        let cannot_deduce = || Type::problem(ProblemCode::InvalidType, decl_text);
        let Some(value) = value else {
            return cannot_deduce();
        };
        let lowered = match self.lower_root(value, scope) {
            Ok(lowered) => lowered,
            Err(err) => {
                tracing::debug!("cannot deduce placeholder type: {}", err);
                return cannot_deduce();
            }
        };
        let ty = TyCtxt::with_table(&self.table, &self.target)
            .with_option(self.option)
            .resolve_type(&lowered.0, scope, lowered.1);

        let inner = declarator.child_by_field_name("declarator");
        match inner.map(|node| node.kind()) {
            Some("reference_declarator") => normalize(&ty, StripMask::TYPEDEF | StripMask::REFERENCE),
            Some("pointer_declarator") => {
                match adjust_parameter(normalize(&ty, StripMask::all())).as_ref() {
                    Type::Pointer(pointee) => pointee.clone(),
                    _ => cannot_deduce(),
                }
            }
            _ => adjust_parameter(normalize(&ty, StripMask::all())),
        }
    }

    fn declare_entity(
        &mut self,
        name: Node<'_>,
        ty: TyRef,
        scope: ScopeId,
        owner: Option<ClassId>,
        is_static: bool,
    ) {
        if name.kind() == "operator_name" {
            self.declare_operator(name, &ty, owner);
            return;
        }
        // Out-of-class definitions (`int Obj::count = 0;`) were declared in the class.
        if name.kind() == "qualified_identifier" {
            return;
        }

        let symbol = self.table.interner().intern(self.text(name));
        let is_function = matches!(ty.as_ref(), Type::Function { .. });
        let binding = match (owner, is_function) {
            (Some(class), true) => Binding::member_function(symbol, ty, class),
            (Some(class), false) => Binding::data_member(symbol, ty, class),
            (None, true) => Binding::function(symbol, ty),
            (None, false) => Binding::variable(symbol, ty),
        }
        .with_static(is_static && owner.is_some());

        let target = self.table.declaring_scope(scope);
        if !self.table.declare_value(target, binding) {
            tracing::trace!("'{}' redeclared in {}", self.text(name), target);
        }
    }

    /// Record `operator@` declarations usable as unary operators.
    ///
    /// Postfix `++`/`--` take an extra `int` parameter; binary forms are ignored.
    fn declare_operator(&mut self, name: Node<'_>, ty: &TyRef, owner: Option<ClassId>) {
        let Type::Function { ret, params } = ty.as_ref() else {
            return;
        };
        let token = self.text(name).trim_start_matches("operator").trim();
        let postfix = || match token {
            "++" => Some(UnaryOp::PostfixIncr),
            "--" => Some(UnaryOp::PostfixDecr),
            _ => None,
        };
        let is_int = |ty: &TyRef| {
            normalize(ty, StripMask::all())
                .as_basic()
                .is_some_and(|basic| basic.kind() == BasicKind::Int && basic.modifiers().is_empty())
        };

        let op = match (owner, params.as_slice()) {
            (Some(_), []) | (None, [_]) => UnaryOp::from_prefix_token(token),
            (Some(_), [extra]) | (None, [_, extra]) if is_int(extra) => postfix(),
            _ => None,
        };
        let Some(op) = op.filter(UnaryOp::is_overloadable) else {
            return;
        };

        match (owner, params.first()) {
            (Some(class), _) => self
                .table
                .add_operator(class, OverloadBinding::member(op, ret.clone(), class)),
            (None, Some(param)) => self
                .table
                .add_free_operator(OverloadBinding::free(op, ret.clone(), param.clone())),
            (None, None) => {}
        }
    }

    /// Declare a function definition and return its body for walking.
    fn function_definition<'t>(
        &mut self,
        node: Node<'t>,
        scope: ScopeId,
        owner: Option<ClassId>,
    ) -> Option<PendingBody<'t>> {
        let is_static = has_storage(node, self.source, "static");
        let base = self.declared_base(node, scope);
        let (name, ty) = self.apply_declarator(base, node.child_by_field_name("declarator"), scope);

        let mut parent = scope;
        if let Some(name) = name {
            if name.kind() == "qualified_identifier" {
                parent = self.definition_scope(name, scope);
            }
            self.declare_entity(name, ty, scope, owner, is_static);
        }
        let body = node.child_by_field_name("body")?;
        Some((node, body, parent))
    }

    /// Scope an out-of-class definition such as `int Obj::get()` belongs to.
    fn definition_scope(&self, name: Node<'_>, scope: ScopeId) -> ScopeId {
        let path = path_text(name, self.source);
        let qualifier = Name::parse(self.table.interner(), &path)
            .and_then(|name| resolve_qualifier(&self.table, &name, scope));
        match qualifier {
            Some(Qualifier::Class(class)) => self.table.class(class).scope,
            Some(Qualifier::Namespace(ns)) => ns,
            _ => scope,
        }
    }

    pub(crate) fn function_body(&mut self, def: Node<'_>, body: Node<'_>, parent: ScopeId) {
        let block = self.table.add_scope(ScopeKind::Block, parent);
        if let Some(params) = innermost_parameters(def.child_by_field_name("declarator")) {
            self.declare_parameters(params, block);
        }
        if body.kind() == "compound_statement" {
            self.walk_block(body, block);
        }
    }

    fn declare_parameters(&mut self, params: Node<'_>, block: ScopeId) {
        for param in named_children(params) {
            if !matches!(
                param.kind(),
                "parameter_declaration" | "optional_parameter_declaration"
            ) {
                continue;
            }
            let base = self.declared_base(param, block);
            let (name, ty) = self.apply_declarator(base, param.child_by_field_name("declarator"), block);
            if let Some(name) = name {
                let symbol = self.table.interner().intern(self.text(name));
                self.table
                    .declare_value(block, Binding::variable(symbol, adjust_parameter(ty)));
            }
        }
    }

    fn type_definition(&mut self, node: Node<'_>, scope: ScopeId) {
        let base = self.declared_base(node, scope);
        for declarator in field_children(node, "declarator") {
            let (name, ty) = self.apply_declarator(base.clone(), Some(declarator), scope);
            if let Some(name) = name {
                self.declare_alias(name, ty, scope);
            }
        }
    }

    fn alias_declaration(&mut self, node: Node<'_>, scope: ScopeId) {
        let (Some(name), Some(desc)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("type"),
        ) else {
            return;
        };
        let ty = self.type_descriptor(desc, scope);
        self.declare_alias(name, ty, scope);
    }

    fn declare_alias(&mut self, name: Node<'_>, ty: TyRef, scope: ScopeId) {
        let symbol = self.table.interner().intern(self.text(name));
        let target = self.table.declaring_scope(scope);
        self.table.declare_type(target, symbol, Type::typedef(symbol, ty));
    }

    pub(crate) fn class_specifier(&mut self, spec: Node<'_>, scope: ScopeId) -> ClassId {
        let id = match spec.child_by_field_name("name") {
            Some(name) if name.kind() == "qualified_identifier" => {
                match self.named_type(name, scope).as_class() {
                    Some(existing) => existing,
                    None => {
                        let path = path_text(name, self.source);
                        let last = path.rsplit("::").next().unwrap_or(&path).to_string();
                        self.table.declare_class(scope, &last)
                    }
                }
            }
            Some(name) => {
                let path = path_text(name, self.source);
                self.table.declare_class(scope, &path)
            }
            None => {
                self.anonymous += 1;
                let name = format!("(anonymous {})", self.anonymous);
                self.table.declare_class(scope, &name)
            }
        };

        let Some(body) = spec.child_by_field_name("body") else {
            return id;
        };
        let class_scope = self.table.class(id).scope;
        for clause in named_children(spec) {
            if clause.kind() != "base_class_clause" {
                continue;
            }
            for base in named_children(clause) {
                if matches!(
                    base.kind(),
                    "type_identifier" | "qualified_identifier" | "template_type"
                ) {
                    match self.named_type(base, class_scope).as_class() {
                        Some(base) => self.table.add_base(id, base),
                        None => tracing::debug!("unknown base class '{}'", self.text(base)),
                    }
                }
            }
        }
        self.class_body(id, body);
        id
    }

    fn class_body(&mut self, class: ClassId, body: Node<'_>) {
        let scope = self.table.class(class).scope;
        let mut pending = Vec::new();
        for child in named_children(body) {
            self.member_item(child, scope, class, &mut pending);
        }
        for (def, body, parent) in pending {
            self.function_body(def, body, parent);
        }
    }

    fn member_item<'t>(
        &mut self,
        node: Node<'t>,
        scope: ScopeId,
        class: ClassId,
        pending: &mut Vec<PendingBody<'t>>,
    ) {
        match node.kind() {
            "field_declaration" | "declaration" => self.declaration(node, scope, Some(class)),
            "function_definition" => {
                pending.extend(self.function_definition(node, scope, Some(class)));
            }
            "template_declaration" => {
                let tmpl = self.template_scope(node, scope);
                for child in named_children(node) {
                    if child.kind() != "template_parameter_list" {
                        self.member_item(child, tmpl, class, pending);
                    }
                }
            }
            "friend_declaration" => {
                // Friends are members of the enclosing namespace.
                let outer = self
                    .table
                    .parent(self.table.class(class).scope)
                    .unwrap_or_else(|| self.table.global());
                for child in named_children(node) {
                    match child.kind() {
                        "declaration" => self.declaration(child, outer, None),
                        "function_definition" => {
                            pending.extend(self.function_definition(child, outer, None));
                        }
                        _ => {}
                    }
                }
            }
            "type_definition" => self.type_definition(node, scope),
            "alias_declaration" => self.alias_declaration(node, scope),
            "struct_specifier" | "class_specifier" | "union_specifier" => {
                self.class_specifier(node, scope);
            }
            "enum_specifier" => {
                self.enum_specifier(node, scope);
            }
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif" => {
                for child in named_children(node) {
                    self.member_item(child, scope, class, pending);
                }
            }
            _ => {}
        }
    }

    /// Enumerations are typedefs of `int`; enumerators become values of that type.
    pub(crate) fn enum_specifier(&mut self, spec: Node<'_>, scope: ScopeId) -> TyRef {
        let target = self.table.declaring_scope(scope);
        let ty = match spec.child_by_field_name("name") {
            Some(name) => {
                let symbol = self.table.interner().intern(path_text(name, self.source));
                match self.table.local_type(target, symbol) {
                    Some(existing) => existing.clone(),
                    None => {
                        let ty = Type::typedef(symbol, Type::basic(BasicKind::Int));
                        self.table.declare_type(target, symbol, ty.clone());
                        ty
                    }
                }
            }
            None => Type::basic(BasicKind::Int),
        };

        if let Some(body) = spec.child_by_field_name("body") {
            for enumerator in named_children(body) {
                if enumerator.kind() != "enumerator" {
                    continue;
                }
                if let Some(name) = enumerator.child_by_field_name("name") {
                    let symbol = self.table.interner().intern(self.text(name));
                    self.table
                        .declare_value(target, Binding::variable(symbol, ty.clone()));
                }
            }
        }
        ty
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn walk_block(&mut self, block: Node<'_>, scope: ScopeId) {
        for child in named_children(block) {
            self.statement(child, scope);
        }
    }

    fn statement(&mut self, node: Node<'_>, scope: ScopeId) {
        match node.kind() {
            "compound_statement" => {
                let inner = self.table.add_scope(ScopeKind::Block, scope);
                self.walk_block(node, inner);
            }
            "declaration" => self.declaration(node, scope, None),
            "type_definition" => self.type_definition(node, scope),
            "alias_declaration" => self.alias_declaration(node, scope),
            "struct_specifier" | "class_specifier" | "union_specifier" => {
                self.class_specifier(node, scope);
            }
            "enum_specifier" => {
                self.enum_specifier(node, scope);
            }
            "expression_statement" | "return_statement" | "throw_statement" => {
                for child in named_children(node) {
                    self.probe_expr(child, scope);
                }
            }
            "for_range_loop" => self.for_range_loop(node, scope),
            "catch_clause" => {
                let inner = self.table.add_scope(ScopeKind::Block, scope);
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.declare_parameters(params, inner);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk_block(body, inner);
                }
            }
            "if_statement" | "while_statement" | "for_statement" | "do_statement"
            | "switch_statement" | "case_statement" | "labeled_statement" | "else_clause"
            | "condition_clause" | "try_statement" => {
                let inner = self.table.add_scope(ScopeKind::Block, scope);
                for child in named_children(node) {
                    self.statement(child, inner);
                }
            }
            "break_statement" | "continue_statement" | "goto_statement" | "statement_identifier"
            | "comment" => {}
            _ => self.probe_expr(node, scope),
        }
    }

    fn for_range_loop(&mut self, node: Node<'_>, scope: ScopeId) {
        let inner = self.table.add_scope(ScopeKind::Block, scope);
        if let Some(range) = node.child_by_field_name("right") {
            self.probe_expr(range, scope);
        }
        let deduced = node
            .child_by_field_name("type")
            .is_some_and(|spec| matches!(spec.kind(), "placeholder_type_specifier" | "auto"));
        let base = if deduced {
            Type::problem(ProblemCode::InvalidType, self.text(node).lines().next().unwrap_or_default())
        } else {
            self.declared_base(node, scope)
        };
        let (name, ty) = self.apply_declarator(base, node.child_by_field_name("declarator"), inner);
        if let Some(name) = name {
            let symbol = self.table.interner().intern(self.text(name));
            self.table.declare_value(inner, Binding::variable(symbol, ty));
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.statement(body, inner);
        }
    }

    /// Lower the outermost unary forms inside an expression.
    pub(crate) fn probe_expr(&mut self, node: Node<'_>, scope: ScopeId) {
        if is_unary_form(node, self.source) {
            self.add_probe(node, scope);
            return;
        }
        if node.kind() == "lambda_expression" {
            return;
        }
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || {
            for child in named_children(node) {
                self.probe_expr(child, scope);
            }
        });
    }

    fn add_probe(&mut self, node: Node<'_>, scope: ScopeId) {
        let line = line_of(node);
        match self.lower_root(node, scope) {
            Ok((tree, root)) => {
                tracing::trace!(line, "probe '{}'", self.text(node));
                self.probes.push(Probe {
                    tree,
                    root,
                    scope,
                    line,
                    text: self.text(node).to_string(),
                });
            }
            Err(err) => {
                tracing::warn!(line, "skipping expression: {}", err);
                self.skipped += 1;
            }
        }
    }
}

/// Whether `node` is an expression whose outermost operator is unary.
pub(crate) fn is_unary_form(node: Node<'_>, source: &str) -> bool {
    let mut node = node;
    while node.kind() == "parenthesized_expression" {
        match named_children(node).first() {
            Some(inner) => node = *inner,
            None => return false,
        }
    }
    match node.kind() {
        "pointer_expression" | "unary_expression" | "update_expression" | "sizeof_expression" => true,
        "call_expression" => node
            .child_by_field_name("function")
            .is_some_and(|function| node_text(function, source) == "typeid"),
        _ => false,
    }
}

/// The parameter list nearest the declared name.
fn innermost_parameters(declarator: Option<Node<'_>>) -> Option<Node<'_>> {
    let mut found = None;
    let mut current = declarator;
    while let Some(node) = current {
        if node.kind() == "function_declarator" {
            found = node.child_by_field_name("parameters").or(found);
        }
        current = match node.kind() {
            "reference_declarator" | "parenthesized_declarator" | "attributed_declarator" => {
                named_children(node).into_iter().last()
            }
            _ => node.child_by_field_name("declarator"),
        };
    }
    found
}

pub(crate) fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}
