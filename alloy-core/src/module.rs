/*!

A `Module` owns every sig, field, function, predicate, fact, assert, and command produced by a
single analysis, mirroring the teacher's own `core::module::Module`: a `status` enum tracking how
far construction has progressed, and a handful of owned collections built up across Pass 1 (Resolver)
and Pass 2 (Elaborator).

`Module::status` generalizes the teacher's `ModuleStatus::{Open, SortSetClosed, SignatureClosed, ...}`
progression (`core::module::Module::compute_kind_closures`'s `assert_eq!` guard) to this crate's own
two-pass pipeline: a module is `Open` until `SigGraph::resolve_hierarchy` succeeds (`SigSetClosed`),
then `SignatureResolved` once every field/function/predicate Type has been computed, then `Frozen`
once the Elaborator has produced typed bodies for every function, predicate, fact, and assert. §5
forbids any further sig/Type construction once a module reaches `Frozen`.

*/

use std::fmt::Write;

use alloy_abs::{join_string, IString, UnsafePtr};

use crate::ast::typed::TypedExpr;
use crate::ast::untyped::CommandKind;
use crate::error::Position;
use crate::format::{FormatStyle, Formattable};
use crate::impl_display_debug_for_formattable;
use crate::sig::SigGraph;
use crate::ty::Type;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default, Debug)]
pub enum ModuleStatus {
  #[default]
  Open,
  SigSetClosed,
  SignatureResolved,
  Frozen,
}

/// A non-owning pointer to a `Function`, valid for the lifetime of the owning `Module`. Both
/// ordinary functions and predicates (whose return type is always `FORMULA`) are represented as
/// `Function`s, distinguished by `is_predicate`.
pub type FunctionPtr = UnsafePtr<Function>;

#[derive(Clone, Debug)]
pub struct Param {
  pub name: IString,
  pub ty: Type,
}

/// A function or predicate declaration. `body` is `None` until Pass 2 (Elaborator) fills it in;
/// Pass 1 (Resolver) only computes `params`/`return_ty` (§4.F step 4: "Body elaboration is
/// deferred to pass 2 with parameters bound in scope").
pub struct Function {
  pub name: IString,
  pub params: Vec<Param>,
  pub return_ty: Type,
  pub is_predicate: bool,
  pub body: Option<TypedExpr>,
  pub position: Position,
}

impl Function {
  pub fn new(name: IString, params: Vec<Param>, return_ty: Type, is_predicate: bool, position: Position) -> Self {
    Function { name, params, return_ty, is_predicate, body: None, position }
  }
}

pub struct Fact {
  pub name: Option<IString>,
  pub body: TypedExpr,
  pub position: Position,
}

pub struct Assert {
  pub name: Option<IString>,
  pub body: TypedExpr,
  pub position: Position,
}

/// What a `Command` exercises: a predicate (run) or an assertion (check). Resolved from the
/// untyped `CommandDecl::target` name once every predicate/assert is known (Pass 2).
#[derive(Copy, Clone)]
pub enum CommandTarget {
  Predicate(FunctionPtr),
  /// Index into `Module::asserts`; asserts aren't heap-allocated individually since nothing else
  /// holds a long-lived pointer to one.
  Assert(usize),
}

pub struct Command {
  pub name: Option<IString>,
  pub kind: CommandKind,
  pub target: CommandTarget,
  pub position: Position,
}

/// The frozen output of an analysis (§6's Outputs): every sig, function, predicate, fact, assert,
/// and command, each carrying fully elaborated `Type`s and (for expressions) `TypedExpr` bodies.
pub struct Module {
  pub sig_graph: SigGraph,
  pub functions: Vec<FunctionPtr>,
  pub predicates: Vec<FunctionPtr>,
  pub facts: Vec<Fact>,
  pub asserts: Vec<Assert>,
  pub commands: Vec<Command>,
  pub status: ModuleStatus,
}

impl Module {
  pub fn lookup_function(&self, name: &IString) -> Option<FunctionPtr> {
    self.functions.iter().chain(self.predicates.iter()).find(|f| &f.name == name).copied()
  }
}

impl Formattable for Module {
  fn repr(&self, out: &mut dyn Write, style: FormatStyle) -> std::fmt::Result {
    writeln!(out, "module {{")?;
    writeln!(out, "  status: {:?}", self.status)?;
    if !self.sig_graph.prim_sigs().is_empty() {
      let names = join_string(self.sig_graph.prim_sigs().iter().map(|s| s.name.as_ref()), ", ");
      writeln!(out, "  sigs: [{}]", names)?;
    }
    if !self.functions.is_empty() {
      let names = join_string(self.functions.iter().map(|f| f.name.as_ref()), ", ");
      writeln!(out, "  functions: [{}]", names)?;
    }
    if !self.predicates.is_empty() {
      let names = join_string(self.predicates.iter().map(|f| f.name.as_ref()), ", ");
      writeln!(out, "  predicates: [{}]", names)?;
    }
    if style == FormatStyle::Debug {
      writeln!(out, "  facts: {}", self.facts.len())?;
      writeln!(out, "  asserts: {}", self.asserts.len())?;
      writeln!(out, "  commands: {}", self.commands.len())?;
    }
    write!(out, "}}")
  }
}

impl_display_debug_for_formattable!(Module);
