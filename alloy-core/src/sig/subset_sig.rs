/*!

A `SubsetSig` is a non-primitive sig whose extent is a subset of the union of a non-empty list of
parent sigs (primitive or subset). Unlike `PrimSig`, subset sigs are not tree-structured among
themselves; the type algebra only ever needs their union-of-primitive upper bound, computed once
and cached as `upper_bound`.

*/

use std::fmt::Write;

use alloy_abs::{IString, UnsafePtr};

use crate::format::{FormatStyle, Formattable};
use crate::impl_display_debug_for_formattable;
use crate::sig::prim_sig::PrimSigPtr;

pub type SubsetSigPtr = UnsafePtr<SubsetSig>;

#[derive(Eq, PartialEq, Clone)]
pub struct SubsetSig {
  pub name: IString,
  /// Declared parents, in declaration order. Populated at parse time as names, linked to real
  /// pointers by `SigGraph::resolve_hierarchy`.
  pub parents: Vec<SubsetParent>,
  /// The union of every parent's set of primitive sigs, flattening nested subset parents. Used
  /// by the type algebra in place of a tree walk, since subset sigs have no tree position of
  /// their own.
  pub upper_bound: Vec<PrimSigPtr>,
}

/// A subset sig's parent is either a primitive sig or another subset sig; resolved from a name at
/// parse time the same way a `PrimSig`'s `extends` target is.
#[derive(Eq, PartialEq, Clone, Copy)]
pub enum SubsetParent {
  Prim(PrimSigPtr),
  Subset(SubsetSigPtr),
}

impl SubsetSig {
  pub(crate) fn new(name: IString, parents: Vec<SubsetParent>) -> Self {
    SubsetSig { name, parents, upper_bound: Vec::new() }
  }
}

impl Formattable for SubsetSig {
  fn repr(&self, out: &mut dyn Write, _style: FormatStyle) -> std::fmt::Result {
    write!(out, "{}", self.name)
  }
}

impl_display_debug_for_formattable!(SubsetSig);
