/*!

A `PrimSig` ("primitive signature") is a named type: primitive sigs form a tree rooted at `UNIV`,
related to each other via the `extends` relation, which in the absence of cycles is a tree edge set.

## Lifecycle and Ownership

`PrimSig`s are owned by the `SigGraph` in which they are declared, never by their parent or
children. Once `SigGraph::resolve_hierarchy` completes, the tree (and the `ancestors` bitset on
every sig) is immutable for the remaining lifetime of the module (§5).

*/

use std::fmt::Write;

use alloy_abs::{IString, NatSet, UnsafePtr};

use crate::field::FieldPtr;
use crate::format::{FormatStyle, Formattable};
use crate::impl_display_debug_for_formattable;

/// A non-owning pointer to a `PrimSig`, valid for the lifetime of the owning `SigGraph`.
pub type PrimSigPtr = UnsafePtr<PrimSig>;

/// The index a `PrimSig` occupies within its `SigGraph`'s `prim_sigs` vector; used as the bit
/// position in `ancestors`/`descendants` `NatSet`s so subtype queries are O(1) set membership
/// tests instead of O(depth) pointer-chasing.
pub type SigIndex = u32;

#[derive(Eq, PartialEq, Clone)]
pub struct PrimSig {
  pub name: IString,
  pub index: SigIndex,
  pub is_abstract: bool,

  /// `None` only for `UNIV`. Parsed as a name at parse time and linked to a real pointer by
  /// `SigGraph::resolve_hierarchy`.
  pub parent: Option<PrimSigPtr>,
  /// Declaration order, not insertion order into any hash structure — iteration over children
  /// must be deterministic (§5).
  pub children: Vec<PrimSigPtr>,

  /// Bit `i` set iff the sig at index `i` is this sig or an ancestor of this sig (i.e. this sig
  /// `isSubtypeOf` the sig at index `i`). Populated by `SigGraph::resolve_hierarchy`; empty
  /// (meaningless) before that call completes.
  pub ancestors: NatSet,

  /// Field declarations belonging to this sig, in declaration order. Populated by the Resolver
  /// (§4.F step 3); a field's own `Field::ty` already carries the domain restriction to `self`.
  pub fields: Vec<FieldPtr>,
}

impl PrimSig {
  pub(crate) fn new(name: IString, index: SigIndex, is_abstract: bool) -> Self {
    PrimSig {
      name,
      index,
      is_abstract,
      parent: None,
      children: Vec::new(),
      ancestors: NatSet::new(),
      fields: Vec::new(),
    }
  }

  /// A ⊑ B iff B lies on A's chain to UNIV, or A = NONE, or B = UNIV. NONE and UNIV are handled by
  /// `SigGraph` (NONE's `ancestors` set is defined to contain every sig index; UNIV is every
  /// other sig's ancestor by construction), so after `resolve_hierarchy` this reduces to a single
  /// bitset membership test.
  #[inline]
  pub fn is_subtype_of(&self, other: PrimSigPtr) -> bool {
    self.ancestors.contains(other.index as usize)
  }

  /// Returns the more specific of `self`/`other` when one is a subtype of the other (i.e. their
  /// intersection is non-empty and tree-structured), else `None` to mean NONE. Callers that need
  /// an actual `PrimSigPtr` for NONE should consult `Builtins::none`.
  pub fn intersect(self_ptr: PrimSigPtr, other: PrimSigPtr) -> Option<PrimSigPtr> {
    if self_ptr.is_subtype_of(other) {
      Some(self_ptr)
    } else if other.is_subtype_of(self_ptr) {
      Some(other)
    } else {
      None
    }
  }
}

impl Formattable for PrimSig {
  fn repr(&self, out: &mut dyn Write, _style: FormatStyle) -> std::fmt::Result {
    write!(out, "{}", self.name)
  }
}

impl_display_debug_for_formattable!(PrimSig);

#[cfg(test)]
mod tests {
  use super::*;
  use alloy_abs::heap_construct;

  fn leaf(name: &str, index: u32) -> PrimSigPtr {
    PrimSigPtr::new(heap_construct!(PrimSig::new(IString::from(name), index, false)))
  }

  #[test]
  fn subtype_via_ancestors_bitset() {
    let mut univ = leaf("univ", 0);
    let mut a = leaf("A", 1);
    let b = leaf("B", 2);

    univ.ancestors.insert(0);
    a.ancestors.insert(0);
    a.ancestors.insert(1);

    assert!(a.is_subtype_of(univ));
    assert!(a.is_subtype_of(a));
    assert!(!univ.is_subtype_of(b));
  }

  #[test]
  fn intersect_picks_more_specific() {
    let mut univ = leaf("univ", 0);
    let mut a = leaf("A", 1);
    univ.ancestors.insert(0);
    a.ancestors.insert(0);
    a.ancestors.insert(1);

    assert_eq!(PrimSig::intersect(a, univ), Some(a));
    assert_eq!(PrimSig::intersect(univ, a), Some(a));
  }
}
