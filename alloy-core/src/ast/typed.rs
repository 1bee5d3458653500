/*!

The elaborated expression tree (§4.E). Unlike the parser-facing `UntypedExpr`, every `TypedExpr`
carries its final `Type`, a source `Position`, and a non-negative `extraWeight` used to break ties
during top-down selection (§4.G). Nodes are immutable once constructed; rewrites produce new trees
rather than mutating in place.

`ExprChoice` is the one variant that is *not* immutable in that sense: bottom-up elaboration
deliberately produces a set of candidate elaborations, and top-down selection narrows an `Open`
choice to `Selected` (or `Failed`). Resolving an already-`Selected`/`Failed` node is a no-op
(idempotent), so a tree half-walked by a previous pass can always be safely re-walked.

*/

use alloy_abs::IString;

use crate::error::Position;
use crate::field::FieldPtr;
use crate::module::FunctionPtr;
use crate::sig::{PrimSigPtr, SubsetSigPtr};
use crate::ty::Type;
use crate::ast::untyped::{BinaryOp, Quantifier, UnaryOp};

/// Metadata every non-transient `TypedExpr` variant carries.
#[derive(Clone, Debug)]
pub struct ExprMeta {
  pub position: Position,
  pub ty: Type,
  /// Tie-break weight; zero for a direct match, positive for elaboration-inserted coercions
  /// (e.g. `cast2sigint`). Smaller is preferred (§4.G tie-break rule 1).
  pub extra_weight: u32,
  /// Set when this node was synthesized by elaboration rather than appearing in the source
  /// (kept for diagnostics, e.g. explaining an inserted cast).
  pub synthesized: bool,
}

impl ExprMeta {
  pub fn new(position: Position, ty: Type) -> Self {
    ExprMeta { position, ty, extra_weight: 0, synthesized: false }
  }

  pub fn with_weight(mut self, extra_weight: u32) -> Self {
    self.extra_weight = extra_weight;
    self
  }

  pub fn synthesized(mut self) -> Self {
    self.synthesized = true;
    self
  }
}

#[derive(Clone, Debug)]
pub struct QuantBinding {
  pub name: IString,
  pub domain: TypedExpr,
}

/// A fully elaborated expression node, or (transiently) a set of candidates awaiting top-down
/// selection.
#[derive(Clone, Debug)]
pub enum TypedExpr {
  SigRef { sig: PrimSigPtr, meta: ExprMeta },
  /// A reference to a subset sig. Its `Type` is the union of its `upper_bound` (§3: "the type
  /// algebra treats its elements via its union-of-primitive upper bound"); unlike `SigRef` there
  /// is no single `PrimSig` backing it.
  SubsetSigRef { sig: SubsetSigPtr, meta: ExprMeta },
  FieldRef { field: FieldPtr, meta: ExprMeta },
  /// A bound variable: a quantifier variable, `let` binding, or function parameter.
  Var { name: IString, meta: ExprMeta },
  IntLit { value: i64, meta: ExprMeta },
  Unary { op: UnaryOp, operand: Box<TypedExpr>, meta: ExprMeta },
  Binary { op: BinaryOp, left: Box<TypedExpr>, right: Box<TypedExpr>, meta: ExprMeta },
  /// Relational join `L.R` once disambiguated away from a function call.
  Join { left: Box<TypedExpr>, right: Box<TypedExpr>, meta: ExprMeta },
  /// An elaborator-inserted coercion from an integer-typed operand to `SIGINT`.
  Cast2SigInt { operand: Box<TypedExpr>, meta: ExprMeta },
  Call { function: FunctionPtr, args: Vec<TypedExpr>, meta: ExprMeta },
  /// A function applied to fewer arguments than it declares, produced by `L.R` when `R` is a
  /// function reference; consumed by an enclosing `Dot` that supplies the next argument, or else
  /// reported as a `Type` error (never itself a well-typed leaf).
  BadCall { function: FunctionPtr, args: Vec<TypedExpr>, meta: ExprMeta },
  Quant { quantifier: Quantifier, vars: Vec<QuantBinding>, body: Box<TypedExpr>, meta: ExprMeta },
  Let { name: IString, value: Box<TypedExpr>, body: Box<TypedExpr>, meta: ExprMeta },
  IfThenElse {
    condition: Box<TypedExpr>,
    then_branch: Box<TypedExpr>,
    else_branch: Box<TypedExpr>,
    meta: ExprMeta,
  },
  /// The fallback node `resolve_top_down` produces in place of an `ExprChoice` that failed to
  /// resolve (no candidates, none compatible, or an unresolved ambiguity) — the diagnostic has
  /// already been recorded by that point, so this just carries `Type::empty()` onward, letting
  /// callers keep reading `ty()` per §7's per-declaration recovery policy instead of aborting.
  Error { meta: ExprMeta },
  Choice(ExprChoice),
}

impl TypedExpr {
  pub fn position(&self) -> Position {
    match self {
      TypedExpr::SigRef { meta, .. }
      | TypedExpr::SubsetSigRef { meta, .. }
      | TypedExpr::FieldRef { meta, .. }
      | TypedExpr::Var { meta, .. }
      | TypedExpr::IntLit { meta, .. }
      | TypedExpr::Unary { meta, .. }
      | TypedExpr::Binary { meta, .. }
      | TypedExpr::Join { meta, .. }
      | TypedExpr::Cast2SigInt { meta, .. }
      | TypedExpr::Call { meta, .. }
      | TypedExpr::BadCall { meta, .. }
      | TypedExpr::Quant { meta, .. }
      | TypedExpr::Let { meta, .. }
      | TypedExpr::IfThenElse { meta, .. }
      | TypedExpr::Error { meta, .. } => meta.position,
      TypedExpr::Choice(choice) => choice.position,
    }
  }

  /// The `Type` of this node. Every variant — including `Error`, `resolve_top_down`'s fallback
  /// for a choice that failed to resolve — carries a concrete `Type`, so this never panics; a
  /// `Choice` still open or failed (which `resolve_top_down` should never hand back to a caller)
  /// falls back to `Type::empty()` rather than aborting the analysis.
  pub fn ty(&self) -> &Type {
    match self {
      TypedExpr::SigRef { meta, .. }
      | TypedExpr::SubsetSigRef { meta, .. }
      | TypedExpr::FieldRef { meta, .. }
      | TypedExpr::Var { meta, .. }
      | TypedExpr::IntLit { meta, .. }
      | TypedExpr::Unary { meta, .. }
      | TypedExpr::Binary { meta, .. }
      | TypedExpr::Join { meta, .. }
      | TypedExpr::Cast2SigInt { meta, .. }
      | TypedExpr::Call { meta, .. }
      | TypedExpr::BadCall { meta, .. }
      | TypedExpr::Quant { meta, .. }
      | TypedExpr::Let { meta, .. }
      | TypedExpr::IfThenElse { meta, .. }
      | TypedExpr::Error { meta, .. } => &meta.ty,
      TypedExpr::Choice(choice) => choice.selected_ty(),
    }
  }

  pub fn extra_weight(&self) -> u32 {
    match self {
      TypedExpr::SigRef { meta, .. }
      | TypedExpr::SubsetSigRef { meta, .. }
      | TypedExpr::FieldRef { meta, .. }
      | TypedExpr::Var { meta, .. }
      | TypedExpr::IntLit { meta, .. }
      | TypedExpr::Unary { meta, .. }
      | TypedExpr::Binary { meta, .. }
      | TypedExpr::Join { meta, .. }
      | TypedExpr::Cast2SigInt { meta, .. }
      | TypedExpr::Call { meta, .. }
      | TypedExpr::BadCall { meta, .. }
      | TypedExpr::Quant { meta, .. }
      | TypedExpr::Let { meta, .. }
      | TypedExpr::IfThenElse { meta, .. }
      | TypedExpr::Error { meta, .. } => meta.extra_weight,
      TypedExpr::Choice(_) => 0,
    }
  }

  pub fn is_bad_call(&self) -> bool {
    matches!(self, TypedExpr::BadCall { .. })
  }

  pub fn is_error(&self) -> bool {
    matches!(self, TypedExpr::Error { .. })
  }
}

/// The state machine driving an `ExprChoice` through bottom-up candidate generation and top-down
/// selection (§4.G). `Open` candidates are produced once, bottom-up, and never added to or
/// removed from except by a `select`/`fail` transition.
#[derive(Clone, Debug)]
pub enum ChoiceState {
  Open(Vec<TypedExpr>),
  Selected(Box<TypedExpr>),
  Failed,
}

#[derive(Clone, Debug)]
pub struct ExprChoice {
  pub position: Position,
  pub state: ChoiceState,
  /// `Type::empty()`, returned by `ty()` if this choice is read while still `Open`/`Failed`.
  /// Ordinary callers never observe this: `resolve_top_down` always hands back either the
  /// selected candidate or a `TypedExpr::Error` in place of the `Choice` itself. This field
  /// exists purely so `ty()` stays total instead of panicking if a `Choice` somehow does escape.
  fallback_ty: Type,
}

impl ExprChoice {
  pub fn open(position: Position, candidates: Vec<TypedExpr>) -> Self {
    ExprChoice { position, state: ChoiceState::Open(candidates), fallback_ty: Type::empty() }
  }

  pub fn candidates(&self) -> &[TypedExpr] {
    match &self.state {
      ChoiceState::Open(candidates) => candidates,
      _ => &[],
    }
  }

  pub fn is_open(&self) -> bool {
    matches!(self.state, ChoiceState::Open(_))
  }

  /// Idempotent: selecting on an already-`Selected`/`Failed` node leaves it unchanged.
  pub fn select(&mut self, chosen: TypedExpr) {
    if matches!(self.state, ChoiceState::Open(_)) {
      self.state = ChoiceState::Selected(Box::new(chosen));
    }
  }

  pub fn fail(&mut self) {
    if matches!(self.state, ChoiceState::Open(_)) {
      self.state = ChoiceState::Failed;
    }
  }

  fn selected_ty(&self) -> &Type {
    match &self.state {
      ChoiceState::Selected(expr) => expr.ty(),
      ChoiceState::Open(_) | ChoiceState::Failed => &self.fallback_ty,
    }
  }
}
