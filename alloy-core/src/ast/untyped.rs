/*!

The parse-tree node variants handed to this crate by an external parser (§1, §6): every node
carries a source `Position`; children are other untyped nodes. This crate never constructs these
except in tests — they are the Resolver's and Elaborator's sole input.

*/

use alloy_abs::IString;

use crate::error::Position;
use crate::field::Multiplicity;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
  Not,
  Transpose,
  Closure,
  ReflexiveClosure,
  Neg,
  Cardinality,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
  And,
  Or,
  Implies,
  Iff,
  Eq,
  In,
  Union,
  Intersect,
  Difference,
  Product,
  Plus,
  Minus,
  Lt,
  Gt,
  Lte,
  Gte,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Quantifier {
  All,
  No,
  Some,
  One,
  Lone,
}

#[derive(Clone, Debug)]
pub struct QuantVar {
  pub name: IString,
  pub domain: UntypedExpr,
}

#[derive(Clone, Debug)]
pub enum UntypedExpr {
  Name { name: IString, position: Position },
  Int { value: i64, position: Position },
  Unary { op: UnaryOp, operand: Box<UntypedExpr>, position: Position },
  Binary { op: BinaryOp, left: Box<UntypedExpr>, right: Box<UntypedExpr>, position: Position },
  /// Relational join (or, after elaboration, a function call): `L.R`.
  Dot { left: Box<UntypedExpr>, right: Box<UntypedExpr>, position: Position },
  Call { function: IString, args: Vec<UntypedExpr>, position: Position },
  Quant { quantifier: Quantifier, vars: Vec<QuantVar>, body: Box<UntypedExpr>, position: Position },
  Let { name: IString, value: Box<UntypedExpr>, body: Box<UntypedExpr>, position: Position },
  IfThenElse {
    condition: Box<UntypedExpr>,
    then_branch: Box<UntypedExpr>,
    else_branch: Box<UntypedExpr>,
    position: Position,
  },
}

impl UntypedExpr {
  pub fn position(&self) -> Position {
    match self {
      UntypedExpr::Name { position, .. }
      | UntypedExpr::Int { position, .. }
      | UntypedExpr::Unary { position, .. }
      | UntypedExpr::Binary { position, .. }
      | UntypedExpr::Dot { position, .. }
      | UntypedExpr::Call { position, .. }
      | UntypedExpr::Quant { position, .. }
      | UntypedExpr::Let { position, .. }
      | UntypedExpr::IfThenElse { position, .. } => *position,
    }
  }
}

#[derive(Clone, Debug)]
pub struct FieldDecl {
  pub name: IString,
  pub ty_expr: UntypedExpr,
  pub multiplicity: Multiplicity,
  pub position: Position,
}

#[derive(Clone, Debug)]
pub enum SigKind {
  /// `sig Name extends Parent {}`; `extends == None` means implicit `extends univ`.
  Prim { extends: Option<IString> },
  /// `sig Name in P1 + P2 {}`.
  Subset { parents: Vec<IString> },
}

#[derive(Clone, Debug)]
pub struct SigDecl {
  pub name: IString,
  pub kind: SigKind,
  pub is_abstract: bool,
  pub fields: Vec<FieldDecl>,
  pub position: Position,
}

#[derive(Clone, Debug)]
pub struct ParamDecl {
  pub name: IString,
  pub ty_expr: UntypedExpr,
}

#[derive(Clone, Debug)]
pub struct FunDecl {
  pub name: IString,
  pub params: Vec<ParamDecl>,
  pub return_ty: UntypedExpr,
  pub body: UntypedExpr,
  pub position: Position,
}

#[derive(Clone, Debug)]
pub struct PredDecl {
  pub name: IString,
  pub params: Vec<ParamDecl>,
  pub body: UntypedExpr,
  pub position: Position,
}

#[derive(Clone, Debug)]
pub struct FactDecl {
  pub name: Option<IString>,
  pub body: UntypedExpr,
  pub position: Position,
}

#[derive(Clone, Debug)]
pub struct AssertDecl {
  pub name: Option<IString>,
  pub body: UntypedExpr,
  pub position: Position,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandKind {
  Run,
  Check,
}

#[derive(Clone, Debug)]
pub struct CommandDecl {
  pub name: Option<IString>,
  pub kind: CommandKind,
  /// The pred/assert this command exercises.
  pub target: IString,
  pub position: Position,
}

/// The whole of a parsed module, as handed to `Analyzer::elaborate_module`.
#[derive(Clone, Debug, Default)]
pub struct UntypedModule {
  pub sigs: Vec<SigDecl>,
  pub functions: Vec<FunDecl>,
  pub predicates: Vec<PredDecl>,
  pub facts: Vec<FactDecl>,
  pub asserts: Vec<AssertDecl>,
  pub commands: Vec<CommandDecl>,
}
