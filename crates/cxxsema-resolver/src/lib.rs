pub mod binding;
pub mod normalize;
pub mod overload;
pub mod target;
pub mod unary;

pub use binding::{BindingResolver, Qualifier, Resolution, resolve_qualifier, resolve_type_name};
pub use normalize::{StripMask, normalize};
pub use overload::OperatorLookup;
pub use target::{Config, TargetConfig, TargetModel};
pub use unary::TyCtxt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOption {
    pub max_depth: usize,
}

impl ResolverOption {
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }
}

impl Default for ResolverOption {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
