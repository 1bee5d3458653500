/*!

`SigGraph` owns every `PrimSig` and `SubsetSig` declared in a module and resolves the textual
`extends`/`in` parent references captured at parse time into real pointers. Mutated only during
Pass 1 (Resolver); after `resolve_hierarchy` succeeds the graph is frozen (§5) and every
`PrimSig::ancestors` bitset answers `isSubtypeOf`/`intersect` in O(1).

`UNIV`, `NONE`, and `SIGINT` are threaded through construction as a `Builtins` value rather than
held in a process-wide global: callers that run multiple analyses concurrently must never mix
`PrimSig`s from different modules (§5), which a `once_cell`-style global would silently violate.

*/

use alloy_abs::{heap_construct, HashMap, IString, NatSet};

use crate::error::ErrorKind;
use crate::sig::prim_sig::{PrimSig, PrimSigPtr, SigIndex};
use crate::sig::subset_sig::{SubsetParent, SubsetSig, SubsetSigPtr};

/// The three primitive sigs that always exist in a module: the root of the primitive tree, the
/// empty-set bottom, and the built-in integer sig.
#[derive(Copy, Clone)]
pub struct Builtins {
  pub univ: PrimSigPtr,
  pub none: PrimSigPtr,
  pub sigint: PrimSigPtr,
}

/// Either kind of sig, as returned by name lookup (a name may legally refer to either).
#[derive(Copy, Clone)]
pub enum SigRef {
  Prim(PrimSigPtr),
  Subset(SubsetSigPtr),
}

struct PendingPrim {
  parent_name: Option<IString>,
}

struct PendingSubset {
  parent_names: Vec<IString>,
}

pub struct SigGraph {
  pub builtins: Builtins,
  /// Declaration order; iteration over this must stay deterministic (§5).
  prim_sigs: Vec<PrimSigPtr>,
  subset_sigs: Vec<SubsetSigPtr>,
  by_name: HashMap<IString, SigRef>,
  pending_prim: HashMap<SigIndex, PendingPrim>,
  pending_subset: HashMap<IString, PendingSubset>,
  resolved: bool,
}

impl SigGraph {
  pub fn new() -> Self {
    let mut by_name = HashMap::new();

    let univ = PrimSigPtr::new(heap_construct!(PrimSig::new(IString::from("univ"), 0, false)));
    let none = PrimSigPtr::new(heap_construct!(PrimSig::new(IString::from("none"), 1, false)));
    let sigint = PrimSigPtr::new(heap_construct!(PrimSig::new(IString::from("Int"), 2, false)));

    by_name.insert(univ.name.clone(), SigRef::Prim(univ));
    by_name.insert(none.name.clone(), SigRef::Prim(none));
    by_name.insert(sigint.name.clone(), SigRef::Prim(sigint));

    let mut graph = SigGraph {
      builtins: Builtins { univ, none, sigint },
      prim_sigs: vec![univ, none, sigint],
      subset_sigs: Vec::new(),
      by_name,
      pending_prim: HashMap::new(),
      pending_subset: HashMap::new(),
      resolved: false,
    };
    // SIGINT is a direct child of UNIV and has no pending parent to resolve.
    graph.pending_prim.insert(sigint.index, PendingPrim { parent_name: None });
    let mut sigint_mut = sigint;
    sigint_mut.parent = Some(univ);
    let mut univ_mut = univ;
    univ_mut.children.push(sigint);
    graph
  }

  pub fn is_resolved(&self) -> bool {
    self.resolved
  }

  pub fn prim_sigs(&self) -> &[PrimSigPtr] {
    &self.prim_sigs
  }

  pub fn subset_sigs(&self) -> &[SubsetSigPtr] {
    &self.subset_sigs
  }

  pub fn lookup(&self, name: &IString) -> Option<SigRef> {
    self.by_name.get(name).copied()
  }

  /// Creates a primitive sig with `parent_name` captured for later resolution. Fails with
  /// `DuplicateName` if `name` clashes with any sig already declared in this module.
  pub fn add_prim_sig(
    &mut self,
    name: IString,
    parent_name: Option<IString>,
    is_abstract: bool,
  ) -> Result<PrimSigPtr, ErrorKind> {
    if self.by_name.contains_key(&name) {
      return Err(ErrorKind::DuplicateName { name });
    }
    let index = self.prim_sigs.len() as SigIndex;
    let sig = PrimSigPtr::new(heap_construct!(PrimSig::new(name.clone(), index, is_abstract)));
    self.prim_sigs.push(sig);
    self.by_name.insert(name, SigRef::Prim(sig));
    self.pending_prim.insert(index, PendingPrim { parent_name });
    Ok(sig)
  }

  /// Creates a subset sig with `parent_names` (non-empty, checked by the caller via the untyped
  /// AST's own arity invariant) captured for later resolution.
  pub fn add_subset_sig(
    &mut self,
    name: IString,
    parent_names: Vec<IString>,
  ) -> Result<SubsetSigPtr, ErrorKind> {
    if self.by_name.contains_key(&name) {
      return Err(ErrorKind::DuplicateName { name });
    }
    let sig = SubsetSigPtr::new(heap_construct!(SubsetSig::new(name.clone(), Vec::new())));
    self.subset_sigs.push(sig);
    self.by_name.insert(name.clone(), SigRef::Subset(sig));
    self.pending_subset.insert(name, PendingSubset { parent_names });
    Ok(sig)
  }

  /// Links every pending textual parent reference into a real pointer, wires `children`, computes
  /// every `PrimSig::ancestors` bitset, and computes every `SubsetSig::upper_bound`. Must be
  /// called exactly once, before any `Type` operation touches this graph's sigs.
  pub fn resolve_hierarchy(&mut self) -> Result<(), Vec<ErrorKind>> {
    let mut errors = Vec::new();

    // 1. Link PrimSig parent/children from the captured textual names.
    let mut pending_prim: Vec<(SigIndex, Option<IString>)> = Vec::new();
    for sig in &self.prim_sigs {
      if let Some(p) = self.pending_prim.get(&sig.index) {
        pending_prim.push((sig.index, p.parent_name.clone()));
      }
    }

    for (index, parent_name) in pending_prim {
      let mut sig = self.prim_sigs[index as usize];
      if sig.index == self.builtins.univ.index || sig.index == self.builtins.sigint.index {
        // UNIV has no parent; SIGINT's parent (UNIV) was wired directly in `new`.
        continue;
      }
      let Some(parent_name) = parent_name else {
        // A user-declared prim sig with no `extends` clause implicitly extends UNIV.
        let mut univ = self.builtins.univ;
        sig.parent = Some(univ);
        univ.children.push(sig);
        continue;
      };
      match self.by_name.get(&parent_name) {
        None => errors.push(ErrorKind::UnknownName { name: parent_name }),
        Some(SigRef::Subset(_)) => errors.push(ErrorKind::IllegalExtension { parent: parent_name }),
        Some(SigRef::Prim(mut parent)) => {
          if parent.index == self.builtins.none.index || parent.index == self.builtins.sigint.index {
            errors.push(ErrorKind::IllegalExtension { parent: parent_name });
          } else {
            sig.parent = Some(parent);
            parent.children.push(sig);
          }
        }
      }
    }

    // 2. Compute ancestor bitsets by walking each sig's parent chain, detecting non-termination
    // (a cycle not containing UNIV) by the pigeonhole principle: a chain that visits more nodes
    // than exist in the whole graph must have revisited one.
    let total = self.prim_sigs.len();
    for &sig in &self.prim_sigs {
      let mut sig = sig;
      let mut ancestors = NatSet::new();
      let mut cursor = Some(sig);
      let mut steps = 0usize;
      while let Some(node) = cursor {
        if steps > total {
          errors.push(ErrorKind::Fatal {
            message: format!("cycle detected in extends chain of sig '{}'", sig.name),
          });
          break;
        }
        ancestors.insert(node.index as usize);
        cursor = node.parent;
        steps += 1;
      }
      sig.ancestors = ancestors;
    }

    // NONE is a distinguished bottom: subtype of everything, including sigs declared after it.
    let mut none = self.builtins.none;
    none.ancestors = (0..total).collect();

    // 3. Resolve SubsetSig parents and compute their upper bound (union of primitive ancestors).
    let mut pending_subset: Vec<(SubsetSigPtr, Vec<IString>)> = Vec::new();
    for sig in &self.subset_sigs {
      if let Some(p) = self.pending_subset.get(&sig.name) {
        pending_subset.push((*sig, p.parent_names.clone()));
      }
    }

    for (mut sig, parent_names) in pending_subset {
      let mut parents = Vec::with_capacity(parent_names.len());
      let mut upper_bound = Vec::new();
      for parent_name in parent_names {
        match self.by_name.get(&parent_name) {
          None => {
            errors.push(ErrorKind::UnknownName { name: parent_name });
            continue;
          }
          Some(SigRef::Prim(parent)) => {
            if parent.index == self.builtins.none.index || parent.index == self.builtins.univ.index {
              errors.push(ErrorKind::IllegalExtension { parent: parent_name });
              continue;
            }
            parents.push(SubsetParent::Prim(*parent));
            if !upper_bound.contains(parent) {
              upper_bound.push(*parent);
            }
          }
          Some(SigRef::Subset(parent)) => {
            parents.push(SubsetParent::Subset(*parent));
            for prim in &parent.upper_bound {
              if !upper_bound.contains(prim) {
                upper_bound.push(*prim);
              }
            }
          }
        }
      }
      sig.parents = parents;
      sig.upper_bound = upper_bound;
    }

    if errors.is_empty() {
      self.resolved = true;
      Ok(())
    } else {
      Err(errors)
    }
  }

  /// `intersect(A,B)`: the more specific of `A`/`B` when one is a subtype of the other, else
  /// `NONE` (the built-in, not `Option::None` — §4.B's pointwise-disjoint contract).
  pub fn intersect(&self, a: PrimSigPtr, b: PrimSigPtr) -> PrimSigPtr {
    PrimSig::intersect(a, b).unwrap_or(self.builtins.none)
  }
}

impl Default for SigGraph {
  fn default() -> Self {
    SigGraph::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn s1_extends_builds_tree() {
    let mut graph = SigGraph::new();
    let a = graph.add_prim_sig(IString::from("A"), None, false).unwrap();
    let b = graph.add_prim_sig(IString::from("B"), Some(IString::from("A")), false).unwrap();
    graph.resolve_hierarchy().unwrap();

    assert!(b.is_subtype_of(a));
    assert!(!a.is_subtype_of(b));
    assert!(a.is_subtype_of(graph.builtins.univ));
  }

  #[test]
  fn none_is_subtype_of_everything() {
    let mut graph = SigGraph::new();
    let a = graph.add_prim_sig(IString::from("A"), None, false).unwrap();
    graph.resolve_hierarchy().unwrap();
    assert!(graph.builtins.none.is_subtype_of(a));
    assert!(graph.builtins.none.is_subtype_of(graph.builtins.univ));
  }

  #[test]
  fn duplicate_name_rejected() {
    let mut graph = SigGraph::new();
    graph.add_prim_sig(IString::from("A"), None, false).unwrap();
    let err = graph.add_prim_sig(IString::from("A"), None, false).unwrap_err();
    assert!(matches!(err, ErrorKind::DuplicateName { .. }));
  }

  #[test]
  fn cannot_extend_sigint() {
    let mut graph = SigGraph::new();
    graph.add_prim_sig(IString::from("A"), Some(IString::from("Int")), false).unwrap();
    let errors = graph.resolve_hierarchy().unwrap_err();
    assert!(matches!(errors[0], ErrorKind::IllegalExtension { .. }));
  }

  #[test]
  fn subset_sig_upper_bound_unions_parents() {
    let mut graph = SigGraph::new();
    let a = graph.add_prim_sig(IString::from("A"), None, false).unwrap();
    let b = graph.add_prim_sig(IString::from("B"), None, false).unwrap();
    let sub = graph
      .add_subset_sig(IString::from("AB"), vec![IString::from("A"), IString::from("B")])
      .unwrap();
    graph.resolve_hierarchy().unwrap();
    assert_eq!(sub.upper_bound.len(), 2);
    assert!(sub.upper_bound.contains(&a));
    assert!(sub.upper_bound.contains(&b));
  }
}
