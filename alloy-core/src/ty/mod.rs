/*!

The relational type algebra (§4.C) — the heart of the analyzer. A `Type` is a canonical, minimal
set of `ProductType`s (deduplicated by subsumption) plus two scalar flags, and a cached bitmask of
the arities present. Every operator here is pure: it consumes `Type`/`ProductType` values by
reference and produces a fresh canonical value, never mutating its arguments.

*/

use std::fmt::Write;

use alloy_abs::{smallvec, SmallVec};
use enumflags2::{bitflags, BitFlags};

use crate::cancel::CancellationToken;
use crate::error::ErrorKind;
use crate::format::{FormatStyle, Formattable};
use crate::impl_display_debug_for_formattable;
use crate::sig::{PrimSig, PrimSigPtr};

/// The maximum arity a relation may have; also the width of the `arities` bitmask (bit `k-1`
/// corresponds to arity `k`, so it fits comfortably in a `u32`).
pub const MAXARITY: u32 = 30;

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeFlag {
  IsInt,
  IsBool,
}

/// An ordered tuple of `PrimSig` references, `1 ≤ len ≤ MAXARITY`. Equality and subsumption are
/// element-wise identity/subtype checks; sized inline up to 4 columns since most Alloy relations
/// declared in practice are unary or binary.
#[derive(Clone, Eq, PartialEq)]
pub struct ProductType {
  columns: SmallVec<[PrimSigPtr; 4]>,
}

impl ProductType {
  pub fn new(columns: SmallVec<[PrimSigPtr; 4]>) -> Self {
    debug_assert!(!columns.is_empty() && columns.len() as u32 <= MAXARITY);
    ProductType { columns }
  }

  pub fn unary(sig: PrimSigPtr) -> Self {
    ProductType { columns: smallvec![sig] }
  }

  pub fn binary(first: PrimSigPtr, second: PrimSigPtr) -> Self {
    ProductType { columns: smallvec![first, second] }
  }

  pub fn arity(&self) -> u32 {
    self.columns.len() as u32
  }

  pub fn columns(&self) -> &[PrimSigPtr] {
    &self.columns
  }

  pub fn is_none_canonical(&self, none: PrimSigPtr) -> bool {
    self.columns.first().map(|c| c.addr_eq(none)).unwrap_or(false)
  }

  /// A ⊑ B iff arity matches and A[i] ⊑ B[i] for every i.
  pub fn subsumes(&self, other: &ProductType) -> bool {
    self.columns.len() == other.columns.len()
      && self
        .columns
        .iter()
        .zip(other.columns.iter())
        .all(|(a, b)| b.is_subtype_of(*a))
  }

  fn concat(&self, other: &ProductType) -> ProductType {
    let mut columns = SmallVec::with_capacity(self.columns.len() + other.columns.len());
    columns.extend(self.columns.iter().copied());
    columns.extend(other.columns.iter().copied());
    ProductType { columns }
  }

  /// The join of two tuples: drop the last column of `self` and the first column of `other`,
  /// concatenating what remains. Caller has already checked `self`'s last and `other`'s first
  /// columns are type-compatible.
  fn joined(&self, other: &ProductType) -> ProductType {
    let mut columns = SmallVec::with_capacity(self.columns.len() + other.columns.len() - 2);
    columns.extend(self.columns[..self.columns.len() - 1].iter().copied());
    columns.extend(other.columns[1..].iter().copied());
    ProductType { columns }
  }

  fn transposed(&self) -> ProductType {
    debug_assert_eq!(self.columns.len(), 2);
    ProductType::binary(self.columns[1], self.columns[0])
  }
}

fn arity_bit(arity: u32) -> u32 {
  debug_assert!(arity >= 1 && arity <= MAXARITY);
  1 << (arity - 1)
}

/// The static type of an Alloy expression: a canonical set of `ProductType`s plus `isInt`/`isBool`
/// flags. Immutable; every operator below returns a fresh `Type`.
#[derive(Clone, Eq)]
pub struct Type {
  /// Insertion order, preserved for determinism (§5). Canonical: no entry subsumes another.
  entries: Vec<ProductType>,
  arities: u32,
  flags: BitFlags<TypeFlag>,
}

impl Type {
  pub fn empty() -> Self {
    Type { entries: Vec::new(), arities: 0, flags: BitFlags::EMPTY }
  }

  pub fn int() -> Self {
    Type { entries: Vec::new(), arities: 0, flags: TypeFlag::IsInt.into() }
  }

  pub fn formula() -> Self {
    Type { entries: Vec::new(), arities: 0, flags: TypeFlag::IsBool.into() }
  }

  pub fn int_and_formula() -> Self {
    Type { entries: Vec::new(), arities: 0, flags: TypeFlag::IsInt | TypeFlag::IsBool }
  }

  /// The singleton relational type of a single sig, i.e. `Type.make(primSig)`. `NONE` contributes
  /// no tuples, so `make_sig(none, none)` is `EMPTY`.
  pub fn make_sig(sig: PrimSigPtr, none: PrimSigPtr) -> Self {
    if sig.addr_eq(none) {
      return Type::empty();
    }
    let mut ty = Type::empty();
    ty.insert_canonical(ProductType::unary(sig));
    ty
  }

  pub fn from_entries(entries: Vec<ProductType>) -> Self {
    let mut ty = Type::empty();
    for entry in entries {
      ty.insert_canonical(entry);
    }
    ty
  }

  pub fn is_int(&self) -> bool {
    self.flags.contains(TypeFlag::IsInt)
  }

  pub fn is_bool(&self) -> bool {
    self.flags.contains(TypeFlag::IsBool)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty() && self.flags.is_empty()
  }

  pub fn entries(&self) -> &[ProductType] {
    &self.entries
  }

  pub fn arities(&self) -> u32 {
    self.arities
  }

  pub fn has_arity(&self, arity: u32) -> bool {
    self.arities & arity_bit(arity) != 0
  }

  pub fn has_common_arity(&self, other: &Type) -> bool {
    self.arities & other.arities != 0
  }

  /// Inserts `entry` applying the canonicalization rule: if an existing entry subsumes `entry`,
  /// it is dropped; if `entry` subsumes an existing entry, that entry is removed first.
  fn insert_canonical(&mut self, entry: ProductType) {
    if self.entries.iter().any(|existing| existing.subsumes(&entry)) {
      return;
    }
    self.entries.retain(|existing| !entry.subsumes(existing));
    self.arities |= arity_bit(entry.arity());
    self.entries.push(entry);
  }

  /// Element-wise subtype intersection of two entries of equal arity, dropping NONE-canonical
  /// results. `None` means the pair contributes nothing (disjoint in every column, or at least
  /// one).
  fn intersect_entries(a: &ProductType, b: &ProductType, none: PrimSigPtr) -> Option<ProductType> {
    if a.arity() != b.arity() {
      return None;
    }
    let mut columns = SmallVec::with_capacity(a.columns().len());
    for (&ca, &cb) in a.columns().iter().zip(b.columns().iter()) {
      let intersected = PrimSig::intersect(ca, cb)?;
      if intersected.addr_eq(none) {
        return None;
      }
      columns.push(intersected);
    }
    Some(ProductType::new(columns))
  }

  /// `{ a·b : a ∈ A, b ∈ B }`, arity `a.arity + b.arity`. Fails `TypeArity` if any pair would
  /// exceed `max_arity` (clamped to, never above, the hard `MAXARITY` ceiling — see
  /// `AnalysisOptions::max_arity`).
  pub fn product(&self, other: &Type, max_arity: u32) -> Result<Type, ErrorKind> {
    let max_arity = max_arity.min(MAXARITY);
    let mut result = Type::empty();
    for a in &self.entries {
      for b in &other.entries {
        let arity = a.arity() + b.arity();
        if arity > max_arity {
          return Err(ErrorKind::TypeArity { max_arity });
        }
        result.insert_canonical(a.concat(b));
      }
    }
    Ok(result)
  }

  /// `{ a∩b : arity(a)=arity(b) }`, pointwise sig intersect, dropping NONE-canonical results.
  pub fn intersect(&self, other: &Type, none: PrimSigPtr) -> Type {
    let mut result = Type::empty();
    for a in &self.entries {
      for b in &other.entries {
        if let Some(entry) = Type::intersect_entries(a, b, none) {
          result.insert_canonical(entry);
        }
      }
    }
    result
  }

  /// Entries of `self ∪ other` whose arity occurs in both operands; flags are dropped.
  pub fn union_with_common_arity(&self, other: &Type) -> Type {
    let mask = self.arities & other.arities;
    if mask == 0 {
      return Type::empty();
    }
    let mut result = Type::empty();
    for entry in self.entries.iter().chain(other.entries.iter()) {
      if mask & arity_bit(entry.arity()) != 0 {
        result.insert_canonical(entry.clone());
      }
    }
    if result.entries == self.entries {
      // Unchanged: return a value equal to `self` (sans flags, per the operator's contract).
      return Type { entries: self.entries.clone(), arities: self.arities, flags: BitFlags::EMPTY };
    }
    result
  }

  /// Entries of `self` whose arity also exists in `other`.
  pub fn pick_common_arity(&self, other: &Type) -> Type {
    let mask = self.arities & other.arities;
    if mask == self.arities {
      return self.clone();
    }
    let mut result = Type::empty();
    for entry in &self.entries {
      if mask & arity_bit(entry.arity()) != 0 {
        result.insert_canonical(entry.clone());
      }
    }
    result
  }

  /// `{ a⋈b : arity(a)+arity(b) > 2 }`: relational join, dropping unary-joins-unary pairs and
  /// pairs whose shared column is disjoint. Fails `TypeArity` if a result would exceed
  /// `max_arity` (clamped to, never above, the hard `MAXARITY` ceiling — see
  /// `AnalysisOptions::max_arity`).
  pub fn join(&self, other: &Type, none: PrimSigPtr, max_arity: u32) -> Result<Type, ErrorKind> {
    let max_arity = max_arity.min(MAXARITY);
    let mut result = Type::empty();
    for a in &self.entries {
      for b in &other.entries {
        if a.arity() + b.arity() <= 2 {
          continue;
        }
        let last = a.columns()[a.columns().len() - 1];
        let first = b.columns()[0];
        let Some(shared) = PrimSig::intersect(last, first) else { continue };
        if shared.addr_eq(none) {
          continue;
        }
        let arity = a.arity() + b.arity() - 2;
        if arity > max_arity {
          return Err(ErrorKind::TypeArity { max_arity });
        }
        result.insert_canonical(a.joined(b));
      }
    }
    Ok(result)
  }

  /// Binary entries of `self`, flipped; empty if `self` has no binary entries.
  pub fn transpose(&self) -> Type {
    let mut result = Type::empty();
    for entry in &self.entries {
      if entry.arity() == 2 {
        result.insert_canonical(entry.transposed());
      }
    }
    result
  }

  /// Restricts the first column of each entry of `self` by each unary entry of `other`.
  pub fn domain_restrict(&self, other: &Type, none: PrimSigPtr) -> Type {
    let mut result = Type::empty();
    for a in &self.entries {
      for b in &other.entries {
        if b.arity() != 1 {
          continue;
        }
        let Some(restricted) = PrimSig::intersect(a.columns()[0], b.columns()[0]) else { continue };
        if restricted.addr_eq(none) {
          continue;
        }
        let mut columns = a.columns().to_vec();
        columns[0] = restricted;
        result.insert_canonical(ProductType::new(columns.into_iter().collect()));
      }
    }
    result
  }

  /// Restricts the last column of each entry of `self` by each unary entry of `other`.
  pub fn range_restrict(&self, other: &Type, none: PrimSigPtr) -> Type {
    let mut result = Type::empty();
    for a in &self.entries {
      for b in &other.entries {
        if b.arity() != 1 {
          continue;
        }
        let last = a.columns().len() - 1;
        let Some(restricted) = PrimSig::intersect(a.columns()[last], b.columns()[0]) else { continue };
        if restricted.addr_eq(none) {
          continue;
        }
        let mut columns = a.columns().to_vec();
        columns[last] = restricted;
        result.insert_canonical(ProductType::new(columns.into_iter().collect()));
      }
    }
    result
  }

  /// Entries of `self` with arity exactly `k`.
  pub fn extract(&self, k: u32) -> Type {
    let mut result = Type::empty();
    for entry in &self.entries {
      if entry.arity() == k {
        result.insert_canonical(entry.clone());
      }
    }
    result
  }

  /// `u ∪ u·u ∪ u·u·u ∪ …` where `u = self.extract(2)`. Every intermediate stays binary (a join
  /// of two binary relations is itself binary), so this can never fail with `TypeArity`; it can
  /// only be abandoned via `cancellation` (§5).
  pub fn closure(&self, none: PrimSigPtr, cancellation: &CancellationToken) -> Result<Type, ErrorKind> {
    let u = self.extract(2);
    let mut answer = u.clone();
    let mut u_i = u.clone();
    loop {
      if cancellation.is_cancelled() {
        return Err(ErrorKind::Cancelled);
      }
      let u_next = u.join(&u_i, none, MAXARITY)?;
      if u_next.entries.is_empty() {
        break;
      }
      let new_answer = answer.union_with_common_arity(&u_next);
      let stable = new_answer.entries == answer.entries && u_next.entries == u_i.entries;
      answer = new_answer;
      if stable {
        break;
      }
      u_i = u_next;
    }
    Ok(answer)
  }

  /// `A ⊑ B`: every entry of `self` is subsumed by some entry of `other`, and `self`'s flags are
  /// a subset of `other`'s.
  pub fn subsumes(&self, other: &Type) -> bool {
    other.flags.contains(self.flags)
      && self
        .entries
        .iter()
        .all(|entry| other.entries.iter().any(|o| o.subsumes(entry)))
  }

  /// A cosmetic, non-algebraic rendering: when a set of entries differs only in one column and
  /// that column exhausts the direct subsigs of a common abstract parent, fold them into a single
  /// entry naming the parent. Never called from any algebraic decision path (§9's Open Question:
  /// fold is purely cosmetic and its failures are silent, falling back to the un-folded form).
  pub fn fold_for_display(&self) -> Vec<String> {
    let mut rendered: Vec<String> = Vec::new();
    'entries: for entry in &self.entries {
      for position in 0..entry.columns().len() {
        let parent = match entry.columns()[position].parent {
          Some(parent) if parent.is_abstract => parent,
          _ => continue,
        };
        let siblings_accounted_for = parent.children.iter().all(|child| {
          let mut candidate = entry.columns().to_vec();
          candidate[position] = *child;
          self.entries.iter().any(|e| e.columns() == candidate.as_slice())
        });
        if siblings_accounted_for && !parent.children.is_empty() {
          let mut folded = entry.columns().to_vec();
          folded[position] = parent;
          let text = render_columns(&folded);
          if !rendered.contains(&text) {
            rendered.push(text);
          }
          continue 'entries;
        }
      }
      rendered.push(render_columns(entry.columns()));
    }
    rendered
  }
}

fn render_columns(columns: &[PrimSigPtr]) -> String {
  let mut out = String::new();
  for (i, col) in columns.iter().enumerate() {
    if i > 0 {
      out.push_str("->");
    }
    let _ = write!(out, "{}", col.name);
  }
  out
}

impl PartialEq for Type {
  /// Equality is the symmetric subsumption check (§4.C): two canonical `Type`s are equal iff each
  /// subsumes the other, rather than requiring identical entry order.
  fn eq(&self, other: &Self) -> bool {
    self.flags == other.flags && self.subsumes(other) && other.subsumes(self)
  }
}

impl Formattable for Type {
  fn repr(&self, out: &mut dyn Write, style: FormatStyle) -> std::fmt::Result {
    if style == FormatStyle::Folded {
      write!(out, "{}", self.fold_for_display().join(" + "))
    } else {
      let mut parts: Vec<String> = self.entries.iter().map(|e| render_columns(e.columns())).collect();
      if self.is_int() {
        parts.push("int".to_string());
      }
      if self.is_bool() {
        parts.push("formula".to_string());
      }
      write!(out, "{}", parts.join(" + "))
    }
  }
}

impl_display_debug_for_formattable!(Type);

#[cfg(test)]
mod tests {
  use super::*;
  use alloy_abs::{heap_construct, IString};

  fn sig(name: &str, index: u32, parent: Option<PrimSigPtr>, is_abstract: bool) -> PrimSigPtr {
    let mut s = PrimSigPtr::new(heap_construct!(PrimSig::new(IString::from(name), index, is_abstract)));
    s.parent = parent;
    s.ancestors.insert(index as usize);
    if let Some(mut p) = parent {
      s.ancestors.union_in_place(&p.ancestors);
      p.children.push(s);
    }
    s
  }

  fn fixture() -> (PrimSigPtr, PrimSigPtr, PrimSigPtr, PrimSigPtr) {
    let univ = sig("univ", 0, None, false);
    let none = sig("none", 1, None, false);
    let a = sig("A", 2, Some(univ), false);
    let b = sig("B", 3, Some(univ), false);
    (univ, none, a, b)
  }

  #[test]
  fn product_arity_and_canonicalization() {
    let (_univ, _none, a, b) = fixture();
    let ta = Type::make_sig(a, _none);
    let tb = Type::make_sig(b, _none);
    let product = ta.product(&tb, MAXARITY).unwrap();
    assert!(product.has_arity(2));
    assert_eq!(product.entries().len(), 1);
  }

  #[test]
  fn product_arity_overflow_is_type_arity_error() {
    let (_univ, none, a, _b) = fixture();
    let wide = ProductType::new((0..20).map(|_| a).collect());
    let mut big_a = Type::empty();
    big_a.insert_canonical(wide);
    let narrow = ProductType::new((0..15).map(|_| a).collect());
    let mut big_b = Type::empty();
    big_b.insert_canonical(narrow);
    let result = big_a.product(&big_b, MAXARITY);
    assert!(matches!(result, Err(ErrorKind::TypeArity { .. })));
    let _ = none;
  }

  #[test]
  fn intersect_disjoint_sigs_is_empty() {
    let (_univ, none, a, b) = fixture();
    let ta = Type::make_sig(a, none);
    let tb = Type::make_sig(b, none);
    let intersection = ta.intersect(&tb, none);
    assert!(intersection.is_empty());
  }

  #[test]
  fn transpose_is_involutive_on_binary_entries() {
    let (_univ, none, a, b) = fixture();
    let ta = Type::make_sig(a, none);
    let tb = Type::make_sig(b, none);
    let rel = ta.product(&tb, MAXARITY).unwrap();
    let twice = rel.transpose().transpose();
    assert_eq!(twice, rel);
  }

  #[test]
  fn closure_is_fixed_point() {
    let (_univ, none, a, _b) = fixture();
    let ta = Type::make_sig(a, none);
    let rel = ta.product(&ta, MAXARITY).unwrap();
    let token = CancellationToken::new();
    let closed = rel.closure(none, &token).unwrap();
    let next = closed.union_with_common_arity(&closed.join(&rel.extract(2), none, MAXARITY).unwrap());
    assert_eq!(next, closed);
  }
}
