/*!

A `Field` belongs to a `PrimSig`; it has a name, a declared `Type`, and a multiplicity mark.
Fields contribute relations of arity ≥ 2 whose first column is restricted to the declaring sig
(§3) — that restriction is computed once by the Resolver and stored as `Field::ty`, not
recomputed by every reader.

*/

use alloy_abs::{IString, UnsafePtr};

use crate::error::Position;
use crate::sig::PrimSigPtr;
use crate::ty::Type;

/// A non-owning pointer to a `Field`, valid for the lifetime of the owning `Module` (fields are
/// heap-allocated by the Resolver the same way `PrimSig`s are by `SigGraph`, see §3's ownership
/// notes).
pub type FieldPtr = UnsafePtr<Field>;

/// Multiplicity marks Alloy allows on a field declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Multiplicity {
  #[default]
  Unmarked,
  One,
  Lone,
  Some,
  Set,
}

pub struct Field {
  pub name: IString,
  pub owner: PrimSigPtr,
  /// The full field type: `product(Type.make(owner), declared)` with the first column
  /// domain-restricted to `owner`, per §4.F step 3.
  pub ty: Type,
  pub multiplicity: Multiplicity,
  pub position: Position,
}

impl Field {
  pub fn new(name: IString, owner: PrimSigPtr, ty: Type, multiplicity: Multiplicity, position: Position) -> Self {
    Field { name, owner, ty, multiplicity, position }
  }
}
