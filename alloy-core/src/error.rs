/*!

The error taxonomy (§7 of the design): `Syntax`, `Type`, `TypeArity`, `Ambiguous`, `Fatal`,
`Cancelled`, and the separately-tracked `Warning`. `Diagnostic` pairs an `ErrorKind` with the
source `Position` of the offending untyped node; `Diagnostics` is the per-analysis accumulator
the Resolver and Elaborator append to instead of aborting at the first failure.

*/

use std::fmt;

use alloy_abs::IString;
use thiserror::Error;

use crate::ty::Type;

/// A `(file, line, column)` triple attached to every untyped node and carried forward onto every
/// diagnostic and every typed expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, PartialOrd, Ord, Hash)]
pub struct Position {
  pub file: u32,
  pub line: u32,
  pub column: u32,
}

impl Position {
  pub const fn new(file: u32, line: u32, column: u32) -> Self {
    Position { file, line, column }
  }

  /// A placeholder position for synthesized nodes (built-ins, elaboration-inserted casts) that do
  /// not correspond to any source text.
  pub const fn synthetic() -> Self {
    Position { file: u32::MAX, line: 0, column: 0 }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// One fully-elaborated typed candidate, kept around only so an `Ambiguous` diagnostic can list
/// every elaboration the top-down pass was unable to choose between.
#[derive(Clone, Debug)]
pub struct CandidateDescription {
  pub description: String,
  pub ty: Type,
}

#[derive(Debug, Error)]
pub enum ErrorKind {
  #[error("unknown name '{name}'")]
  UnknownName { name: IString },

  #[error("cannot extend '{parent}'")]
  IllegalExtension { parent: IString },

  #[error("sig '{name}' already declared in this module")]
  DuplicateName { name: IString },

  #[error("{message}")]
  Type { message: String, expected: Option<Type> },

  #[error("relation of arity > {max_arity} is unsupported")]
  TypeArity { max_arity: u32 },

  #[error("integer literal {value} does not fit in a 32-bit signed range")]
  IntegerOutOfRange { value: i64 },

  #[error("internal invariant violated: {message}")]
  Fatal { message: String },

  #[error("ambiguous elaboration: {} candidates", candidates.len())]
  Ambiguous { candidates: Vec<CandidateDescription> },

  #[error("analysis cancelled")]
  Cancelled,
}

/// Advisory, non-fatal diagnostics collected separately from errors (e.g. S2's "equality between
/// disjoint Types always false").
#[derive(Debug, Error)]
pub enum WarningKind {
  #[error("equality between disjoint types is always false")]
  DisjointEquality,

  #[error("join is always empty")]
  EmptyJoin,
}

#[derive(Debug, Error)]
#[error("{kind} at {position}")]
pub struct Diagnostic {
  pub kind: ErrorKind,
  pub position: Position,
}

impl Diagnostic {
  pub fn new(kind: ErrorKind, position: Position) -> Self {
    Diagnostic { kind, position }
  }
}

#[derive(Debug)]
pub struct Warning {
  pub kind: WarningKind,
  pub position: Position,
}

/// Accumulates errors and warnings across an entire analysis. The Resolver and Elaborator append
/// to this instead of returning early, so that one malformed declaration does not poison the
/// elaboration of its siblings (§7's per-declaration recovery policy).
#[derive(Default)]
pub struct Diagnostics {
  errors: Vec<Diagnostic>,
  warnings: Vec<Warning>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Diagnostics::default()
  }

  pub fn error(&mut self, kind: ErrorKind, position: Position) {
    alloy_abs::warning!(1, "diagnostic: {} at {}", kind, position);
    self.errors.push(Diagnostic::new(kind, position));
  }

  pub fn warn(&mut self, kind: WarningKind, position: Position) {
    alloy_abs::debug!(1, "warning: {} at {}", kind, position);
    self.warnings.push(Warning { kind, position });
  }

  pub fn has_errors(&self) -> bool {
    !self.errors.is_empty()
  }

  pub fn errors(&self) -> &[Diagnostic] {
    &self.errors
  }

  pub fn warnings(&self) -> &[Warning] {
    &self.warnings
  }

  pub fn extend(&mut self, other: Diagnostics) {
    self.errors.extend(other.errors);
    self.warnings.extend(other.warnings);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accumulates_without_aborting() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error(ErrorKind::UnknownName { name: IString::from("Foo") }, Position::new(0, 1, 1));
    diagnostics.error(ErrorKind::TypeArity { max_arity: 30 }, Position::new(0, 2, 1));
    assert!(diagnostics.has_errors());
    assert_eq!(diagnostics.errors().len(), 2);
  }

  #[test]
  fn warnings_do_not_count_as_errors() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.warn(WarningKind::DisjointEquality, Position::new(0, 1, 1));
    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.warnings().len(), 1);
  }
}
