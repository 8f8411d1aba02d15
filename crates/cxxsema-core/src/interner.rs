use parking_lot::RwLock;
use std::sync::Arc;

use string_interner::StringInterner;
use string_interner::backend::DefaultBackend;
use string_interner::symbol::DefaultSymbol;

/// Interned string symbol backed by a `StringInterner`.
pub type InternedStr = DefaultSymbol;

/// Shared string interner for identifiers, class names and typedef names.
///
/// Clones share one underlying pool, so every `ExprBuilder` and the
/// `SymbolTable` of a translation unit agree on symbols.
#[derive(Clone, Debug, Default)]
pub struct InternPool {
    inner: Arc<RwLock<StringInterner<DefaultBackend>>>,
}

impl InternPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern the provided string slice and return its symbol.
    #[inline]
    pub fn intern<S>(&self, value: S) -> InternedStr
    where
        S: AsRef<str>,
    {
        let value = value.as_ref();
        if let Some(sym) = self.inner.read().get(value) {
            return sym;
        }
        self.inner.write().get_or_intern(value)
    }

    /// Resolve an interned symbol back into an owned string.
    pub fn resolve_owned(&self, symbol: InternedStr) -> Option<String> {
        self.inner.read().resolve(symbol).map(|s| s.to_owned())
    }

    /// Resolve a symbol, falling back to `"?"` for symbols from another pool.
    pub fn display(&self, symbol: InternedStr) -> String {
        self.resolve_owned(symbol).unwrap_or_else(|| "?".to_string())
    }
}
