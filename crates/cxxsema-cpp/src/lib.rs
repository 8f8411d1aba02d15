//! tree-sitter C++ frontend.
//!
//! [`analyze`] parses a translation unit, collects its declarations into a
//! [`SymbolTable`] and lowers the unary expressions found in function bodies
//! into frozen expression trees ("probes") ready for type resolution.
//!
//! ```ignore
//! let unit = cxxsema_cpp::analyze("int *p; void f() { *p; }")?;
//! for probe in &unit.probes {
//!     println!("{} : {}", probe.text, unit.render(&unit.resolve(probe)));
//! }
//! ```

mod collect;
mod decl;
mod lower;
mod parse;

use cxxsema_core::{ExprId, ExprTree, ScopeId, SymbolTable, TyRef, TypePrinter};
use cxxsema_error::Result;
use cxxsema_resolver::{Config, ResolverOption, TargetModel, TyCtxt};

pub use parse::parse;

use crate::collect::Collector;

/// One lowered expression, resolvable on its own.
#[derive(Debug, Clone)]
pub struct Probe {
    pub tree: ExprTree,
    pub root: ExprId,
    /// Scope the expression appeared in.
    pub scope: ScopeId,
    /// 1-based source line.
    pub line: usize,
    pub text: String,
}

/// Declarations and probes of one source file.
#[derive(Debug)]
pub struct TranslationUnit {
    pub table: SymbolTable,
    pub target: TargetModel,
    pub option: ResolverOption,
    pub probes: Vec<Probe>,
    /// Expressions that used syntax the lowering does not support.
    pub skipped: usize,
}

impl TranslationUnit {
    pub fn resolver(&self) -> TyCtxt<'_> {
        TyCtxt::with_table(&self.table, &self.target).with_option(self.option)
    }

    pub fn resolve(&self, probe: &Probe) -> TyRef {
        self.resolver().resolve_type(&probe.tree, probe.scope, probe.root)
    }

    pub fn render(&self, ty: &TyRef) -> String {
        TypePrinter::new(&self.table).render(ty)
    }
}

/// Analyze `source` with the default target model.
pub fn analyze(source: &str) -> Result<TranslationUnit> {
    analyze_with(source, &Config::default())
}

#[tracing::instrument(skip_all)]
pub fn analyze_with(source: &str, config: &Config) -> Result<TranslationUnit> {
    let tree = parse(source)?;
    let mut table = SymbolTable::new(Default::default());
    let target = TargetModel::from_config(&config.target, &mut table)?;
    let option = config.option();

    let mut collector = Collector::new(source, table, target, option);
    collector.collect_unit(tree.root_node());
    let (table, target, probes, skipped) = collector.finish();
    tracing::debug!(probes = probes.len(), skipped, "collected translation unit");

    Ok(TranslationUnit {
        table,
        target,
        option,
        probes,
        skipped,
    })
}
