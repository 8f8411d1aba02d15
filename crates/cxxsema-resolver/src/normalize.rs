use std::sync::Arc;

use cxxsema_core::{TyRef, Type};

bitflags::bitflags! {
    /// Layers [`normalize`] removes from the top of a type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StripMask: u8 {
        const TYPEDEF = 1 << 0;
        const REFERENCE = 1 << 1;
        const CV = 1 << 2;
    }
}

/// Peel the requested layers until none remains at the top level.
///
/// A cv-qualified layer that is kept is looked through: its inner type is
/// normalized with the same mask and qualified again, so `const T` with
/// `T = int&` becomes `const int` under `TYPEDEF | REFERENCE`.
pub fn normalize(ty: &TyRef, mask: StripMask) -> TyRef {
    let mut current = ty.clone();
    loop {
        let next = match current.as_ref() {
            Type::Typedef { aliased, .. } if mask.contains(StripMask::TYPEDEF) => aliased.clone(),
            Type::Reference { referred, .. } if mask.contains(StripMask::REFERENCE) => {
                referred.clone()
            }
            Type::Qualified { inner, .. } if mask.contains(StripMask::CV) => inner.clone(),
            Type::Qualified { inner, cv } => {
                let stripped = normalize(inner, mask);
                if Arc::ptr_eq(&stripped, inner) {
                    return current;
                }
                return Type::qualified(stripped, *cv);
            }
            _ => return current,
        };
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxxsema_core::{BasicKind, CvQualifiers, InternPool};
    use pretty_assertions::assert_eq;

    fn masks() -> impl Iterator<Item = StripMask> {
        (0..=StripMask::all().bits()).filter_map(StripMask::from_bits)
    }

    fn samples(pool: &InternPool) -> Vec<TyRef> {
        let int = Type::basic(BasicKind::Int);
        let cint = Type::qualified(int.clone(), CvQualifiers::CONST);
        let tref = Type::typedef(pool.intern("R"), Type::reference(int.clone()));
        let ctref = Type::qualified(tref.clone(), CvQualifiers::CONST);
        let nested = Type::typedef(pool.intern("N"), Type::reference(ctref.clone()));
        vec![
            int.clone(),
            cint.clone(),
            Type::reference(cint),
            tref,
            ctref,
            nested,
            Type::pointer(Type::typedef(pool.intern("P"), int)),
        ]
    }

    #[test]
    fn strips_stacked_layers() {
        let pool = InternPool::new();
        let int = Type::basic(BasicKind::Int);
        let t = Type::typedef(pool.intern("T"), Type::reference(int.clone()));
        assert_eq!(normalize(&t, StripMask::all()), int);
        assert_eq!(
            normalize(&t, StripMask::TYPEDEF),
            Type::reference(int.clone())
        );
        assert_eq!(normalize(&t, StripMask::REFERENCE), t);
    }

    #[test]
    fn looks_through_kept_qualifiers() {
        let pool = InternPool::new();
        let int = Type::basic(BasicKind::Int);
        let t = Type::typedef(pool.intern("T"), Type::reference(int.clone()));
        let const_t = Type::qualified(t, CvQualifiers::CONST);

        // The qualifier on a reference has no effect once the reference is gone.
        assert_eq!(
            normalize(&const_t, StripMask::TYPEDEF | StripMask::REFERENCE),
            Type::qualified(int.clone(), CvQualifiers::CONST)
        );
        assert_eq!(normalize(&const_t, StripMask::all()), int);
    }

    #[test]
    fn does_not_look_inside_pointers() {
        let pool = InternPool::new();
        let alias = Type::typedef(pool.intern("I"), Type::basic(BasicKind::Int));
        let ptr = Type::pointer(alias);
        assert!(Arc::ptr_eq(&normalize(&ptr, StripMask::all()), &ptr));
    }

    #[test]
    fn normalization_is_idempotent_for_every_mask() {
        let pool = InternPool::new();
        for ty in samples(&pool) {
            for mask in masks() {
                let once = normalize(&ty, mask);
                let twice = normalize(&once, mask);
                assert_eq!(once, twice, "mask {:?} on {:?}", mask, ty);
            }
        }
    }

    #[test]
    fn problem_passes_through_unchanged() {
        let problem = Type::problem(cxxsema_core::ProblemCode::InvalidType, "*x");
        assert!(Arc::ptr_eq(&normalize(&problem, StripMask::all()), &problem));
    }
}
