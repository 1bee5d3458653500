/*!

Pass 2 (§4.G) — the disambiguation engine. Alloy is overloaded: the same identifier may resolve to
a sig, a field, or a function parameter; `.` is both relational join and (curried) function call.
Bottom-up elaboration therefore produces, for each untyped node, an [`ast::typed::ExprChoice`] set
of every candidate typed elaboration whose subexpressions themselves type-check; a single top-down
step then selects the unique well-typed candidate (or reports `Ambiguous`/`Type`).

Bottom-up candidate generation already builds each candidate as a complete concrete subtree (a
cross product of its children's own candidate lists, not a further-nested `Choice`), so in practice
only the outermost node of an elaborated expression is ever an open `ExprChoice` by the time
top-down selection runs; [`resolve_top_down`] therefore performs the selection once, on the whole
tree, rather than re-walking node by node. This is the one intentional shortcut on §4.G's "walk
downward... for each ExprChoice" framing — recorded in DESIGN.md — and is equivalent in effect (one
well-typed tree chosen, or an `Ambiguous`/`Type` diagnostic at the point of failure) while avoiding
a second full tree traversal the cross-product already makes redundant.

A quantifier domain and a `let`-bound value are the one exception: their concrete `Type` is needed
immediately to extend the scope the rest of bottom-up elaboration runs in, so each is resolved
top-down as soon as its own candidate set is built rather than carried onward inside a larger
choice.

*/

use alloy_abs::{HashMap, IString};

use crate::ast::typed::{ChoiceState, ExprChoice, ExprMeta, QuantBinding, TypedExpr};
use crate::ast::untyped::{BinaryOp, CommandKind, UnaryOp, UntypedExpr};
use crate::cancel::CancellationToken;
use crate::error::{CandidateDescription, Diagnostics, ErrorKind, Position, WarningKind};
use crate::field::FieldPtr;
use crate::module::{Assert, Command, CommandTarget, Fact, FunctionPtr, Module, ModuleStatus, Param};
use crate::resolve::{collect_fields_by_name, PendingFunction, ResolvedModule};
use crate::sig::{PrimSigPtr, SigGraph, SigRef};
use crate::ty::{ProductType, Type};
use crate::AnalysisOptions;

/// Whatever is visible to a name lookup at a point in an expression tree: variables bound by an
/// enclosing function/predicate/quantifier/`let`, plus every field and function declared anywhere
/// in the module (Alloy has no further visibility restriction within a module) and the `SigGraph`
/// itself for sig names.
#[derive(Clone)]
pub struct Scope<'m> {
  sig_graph: &'m SigGraph,
  fields_by_name: &'m HashMap<IString, Vec<FieldPtr>>,
  functions_by_name: &'m HashMap<IString, Vec<FunctionPtr>>,
  options: &'m AnalysisOptions,
  vars: Vec<(IString, Type)>,
}

impl<'m> Scope<'m> {
  pub fn new(
    sig_graph: &'m SigGraph,
    fields_by_name: &'m HashMap<IString, Vec<FieldPtr>>,
    functions_by_name: &'m HashMap<IString, Vec<FunctionPtr>>,
    options: &'m AnalysisOptions,
  ) -> Self {
    Scope { sig_graph, fields_by_name, functions_by_name, options, vars: Vec::new() }
  }

  /// A child scope with one additional (innermost) variable binding, shadowing any outer binding
  /// of the same name.
  pub fn with_var(&self, name: IString, ty: Type) -> Scope<'m> {
    let mut vars = self.vars.clone();
    vars.push((name, ty));
    Scope { vars, ..self.clone() }
  }

  fn lookup_var(&self, name: &IString) -> Option<&Type> {
    self.vars.iter().rev().find(|(n, _)| n == name).map(|(_, ty)| ty)
  }

  /// Every candidate binding `name` could refer to at this point: at most one variable (lexical
  /// shadowing picks the innermost), at most one sig, any number of same-named fields, and a
  /// `Call`/`BadCall` per same-named function overload.
  fn lookup_name(&self, name: &IString, position: Position) -> Vec<TypedExpr> {
    let none = self.sig_graph.builtins.none;
    let mut candidates = Vec::new();

    if let Some(ty) = self.lookup_var(name) {
      candidates.push(TypedExpr::Var { name: name.clone(), meta: ExprMeta::new(position, ty.clone()) });
    }

    match self.sig_graph.lookup(name) {
      Some(SigRef::Prim(sig)) => {
        candidates.push(TypedExpr::SigRef { sig, meta: ExprMeta::new(position, Type::make_sig(sig, none)) });
      }
      Some(SigRef::Subset(sig)) => {
        let entries: Vec<ProductType> = sig.upper_bound.iter().map(|&s| ProductType::unary(s)).collect();
        candidates.push(TypedExpr::SubsetSigRef { sig, meta: ExprMeta::new(position, Type::from_entries(entries)) });
      }
      None => {}
    }

    if let Some(fields) = self.fields_by_name.get(name) {
      for &field in fields {
        candidates.push(TypedExpr::FieldRef { field, meta: ExprMeta::new(position, field.ty.clone()) });
      }
    }

    if let Some(functions) = self.functions_by_name.get(name) {
      for &function in functions {
        if function.params.is_empty() {
          candidates.push(TypedExpr::Call {
            function,
            args: Vec::new(),
            meta: ExprMeta::new(position, function.return_ty.clone()),
          });
        } else {
          candidates.push(TypedExpr::BadCall { function, args: Vec::new(), meta: ExprMeta::new(position, Type::empty()) });
        }
      }
    }

    candidates
  }
}

/// `applicable(f, args)` (§4.G): `f.params.size() ≤ args.size()`; for each parameter position,
/// the argument's Type shares an arity with the parameter's, and when both carry entries they
/// intersect.
pub(crate) fn applicable(params: &[Param], args: &[TypedExpr], none: PrimSigPtr) -> bool {
  if params.len() > args.len() {
    return false;
  }
  for (param, arg) in params.iter().zip(args.iter()) {
    let arg_ty = arg.ty();
    if !arg_ty.has_common_arity(&param.ty) {
      return false;
    }
    if !arg_ty.entries().is_empty() && !param.ty.entries().is_empty() && arg_ty.intersect(&param.ty, none).is_empty() {
      return false;
    }
  }
  true
}

fn extract_candidates(expr: TypedExpr) -> Vec<TypedExpr> {
  match expr {
    TypedExpr::Choice(choice) => match choice.state {
      ChoiceState::Open(candidates) => candidates,
      _ => Vec::new(),
    },
    other => vec![other],
  }
}

fn cartesian_product(lists: &[Vec<TypedExpr>]) -> Vec<Vec<TypedExpr>> {
  let mut result: Vec<Vec<TypedExpr>> = vec![Vec::new()];
  for list in lists {
    let mut next = Vec::with_capacity(result.len() * list.len().max(1));
    for prefix in &result {
      for item in list {
        let mut combo = prefix.clone();
        combo.push(item.clone());
        next.push(combo);
      }
    }
    result = next;
  }
  result
}

fn unary_result_type(
  op: UnaryOp,
  ty: &Type,
  none: PrimSigPtr,
  cancellation: &CancellationToken,
  diagnostics: &mut Diagnostics,
  position: Position,
) -> Option<Type> {
  match op {
    UnaryOp::Not => ty.is_bool().then(Type::formula),
    UnaryOp::Transpose => {
      let transposed = ty.transpose();
      (!transposed.is_empty()).then_some(transposed)
    }
    UnaryOp::Closure => match ty.closure(none, cancellation) {
      Ok(closed) => Some(closed),
      Err(err) => {
        diagnostics.error(err, position);
        None
      }
    },
    // Not itself one of §4.C's named operators; modeled as the closure unioned with the
    // relation's own binary entries rather than the full `^r + iden` Alloy gives `*r`, since
    // building `iden` would require a `univ x univ` product this crate has no other use for.
    UnaryOp::ReflexiveClosure => match ty.closure(none, cancellation) {
      Ok(closed) => Some(closed.union_with_common_arity(&ty.extract(2))),
      Err(err) => {
        diagnostics.error(err, position);
        None
      }
    },
    UnaryOp::Neg => ty.is_int().then(Type::int),
    UnaryOp::Cardinality => (!ty.entries().is_empty()).then(Type::int),
  }
}

fn binary_result_type(
  op: BinaryOp,
  l: &Type,
  r: &Type,
  none: PrimSigPtr,
  max_arity: u32,
  position: Position,
  diagnostics: &mut Diagnostics,
) -> Result<Option<Type>, ErrorKind> {
  use BinaryOp::*;
  Ok(match op {
    And | Or | Implies | Iff => (l.is_bool() && r.is_bool()).then(Type::formula),
    Eq => {
      if l.is_int() && r.is_int() {
        Some(Type::formula())
      } else if l.has_common_arity(r) {
        if l.intersect(r, none).is_empty() {
          diagnostics.warn(WarningKind::DisjointEquality, position);
        }
        Some(Type::formula())
      } else {
        None
      }
    }
    In => ((l.is_int() && r.is_int()) || l.has_common_arity(r)).then(Type::formula),
    Union => {
      if l.is_int() && r.is_int() {
        Some(Type::int())
      } else if l.is_bool() && r.is_bool() {
        Some(Type::formula())
      } else if l.has_common_arity(r) {
        Some(l.union_with_common_arity(r))
      } else {
        None
      }
    }
    Intersect => l.has_common_arity(r).then(|| l.intersect(r, none)),
    Difference => l.has_common_arity(r).then(|| l.pick_common_arity(r)),
    Product => return l.product(r, max_arity).map(Some),
    Plus | Minus => (l.is_int() && r.is_int()).then(Type::int),
    Lt | Gt | Lte | Gte => (l.is_int() && r.is_int()).then(Type::formula),
  })
}

fn combine_branch_types(t: &Type, e: &Type) -> Option<Type> {
  if t.is_int() && e.is_int() {
    return Some(Type::int());
  }
  if t.is_bool() && e.is_bool() {
    return Some(Type::formula());
  }
  if t.has_common_arity(e) {
    return Some(t.union_with_common_arity(e));
  }
  None
}

/// Bottom-up typecheck (§4.G): produces an `ExprChoice` of every candidate typed elaboration of
/// `expr` whose subexpressions themselves type-check. Never fails outright — a node with no
/// well-typed candidates simply produces an empty choice set, diagnosed when (if) top-down
/// selection finds nothing compatible.
pub(crate) fn elaborate_bottom_up(
  expr: &UntypedExpr,
  scope: &Scope,
  cancellation: &CancellationToken,
  diagnostics: &mut Diagnostics,
) -> TypedExpr {
  let none = scope.sig_graph.builtins.none;

  match expr {
    UntypedExpr::Name { name, position } => {
      TypedExpr::Choice(ExprChoice::open(*position, scope.lookup_name(name, *position)))
    }

    UntypedExpr::Int { value, position } => {
      if *value < i32::MIN as i64 || *value > i32::MAX as i64 {
        diagnostics.error(ErrorKind::IntegerOutOfRange { value: *value }, *position);
      }
      let meta = ExprMeta::new(*position, Type::int());
      TypedExpr::Choice(ExprChoice::open(*position, vec![TypedExpr::IntLit { value: *value, meta }]))
    }

    UntypedExpr::Unary { op, operand, position } => {
      let operand_choice = elaborate_bottom_up(operand, scope, cancellation, diagnostics);
      let mut candidates = Vec::new();
      for candidate in extract_candidates(operand_choice) {
        if let Some(ty) = unary_result_type(*op, candidate.ty(), none, cancellation, diagnostics, *position) {
          let weight = candidate.extra_weight();
          candidates.push(TypedExpr::Unary {
            op: *op,
            operand: Box::new(candidate),
            meta: ExprMeta::new(*position, ty).with_weight(weight),
          });
        }
      }
      TypedExpr::Choice(ExprChoice::open(*position, candidates))
    }

    UntypedExpr::Binary { op, left, right, position } => {
      let lefts = extract_candidates(elaborate_bottom_up(left, scope, cancellation, diagnostics));
      let rights = extract_candidates(elaborate_bottom_up(right, scope, cancellation, diagnostics));
      let mut candidates = Vec::new();
      for l in &lefts {
        for r in &rights {
          match binary_result_type(*op, l.ty(), r.ty(), none, scope.options.max_arity, *position, diagnostics) {
            Ok(Some(ty)) => {
              let weight = l.extra_weight() + r.extra_weight();
              candidates.push(TypedExpr::Binary {
                op: *op,
                left: Box::new(l.clone()),
                right: Box::new(r.clone()),
                meta: ExprMeta::new(*position, ty).with_weight(weight),
              });
            }
            Ok(None) => {}
            Err(err) => diagnostics.error(err, *position),
          }
        }
      }
      TypedExpr::Choice(ExprChoice::open(*position, candidates))
    }

    UntypedExpr::Dot { left, right, position } => {
      let lefts = extract_candidates(elaborate_bottom_up(left, scope, cancellation, diagnostics));
      let rights = extract_candidates(elaborate_bottom_up(right, scope, cancellation, diagnostics));
      let mut candidates = Vec::new();
      let mut reported_unary_join = false;
      for l in &lefts {
        for r in &rights {
          if l.ty().is_int() {
            if let TypedExpr::SigRef { sig, .. } = r {
              if sig.addr_eq(scope.sig_graph.builtins.sigint) {
                let weight = l.extra_weight() + 1;
                let mut meta = ExprMeta::new(*position, Type::make_sig(*sig, none)).with_weight(weight);
                if scope.options.keep_synthesized_flags {
                  meta = meta.synthesized();
                }
                candidates.push(TypedExpr::Cast2SigInt { operand: Box::new(l.clone()), meta });
                continue;
              }
            }
          }

          if let TypedExpr::BadCall { function, args, .. } = r {
            let mut new_args = args.clone();
            new_args.push(l.clone());
            if applicable(&function.params, &new_args, none) {
              let weight: u32 = new_args.iter().map(|a| a.extra_weight()).sum();
              candidates.push(TypedExpr::Call {
                function: *function,
                args: new_args,
                meta: ExprMeta::new(*position, function.return_ty.clone()).with_weight(weight),
              });
            } else if function.params.len() > new_args.len() {
              candidates.push(TypedExpr::BadCall {
                function: *function,
                args: new_args,
                meta: ExprMeta::new(*position, Type::empty()),
              });
            }
            continue;
          }

          match l.ty().join(r.ty(), none, scope.options.max_arity) {
            Ok(joined) if joined.is_empty() && l.ty().arities() == 1 && r.ty().arities() == 1 => {
              if !reported_unary_join {
                diagnostics.error(
                  ErrorKind::Type { message: "cannot join two unary sets".to_string(), expected: None },
                  *position,
                );
                reported_unary_join = true;
              }
            }
            Ok(joined) => {
              if joined.is_empty() {
                diagnostics.warn(WarningKind::EmptyJoin, *position);
              }
              let weight = l.extra_weight() + r.extra_weight();
              candidates.push(TypedExpr::Join {
                left: Box::new(l.clone()),
                right: Box::new(r.clone()),
                meta: ExprMeta::new(*position, joined).with_weight(weight),
              });
            }
            Err(err) => diagnostics.error(err, *position),
          }
        }
      }
      TypedExpr::Choice(ExprChoice::open(*position, candidates))
    }

    UntypedExpr::Call { function, args, position } => {
      let arg_choices: Vec<Vec<TypedExpr>> =
        args.iter().map(|a| extract_candidates(elaborate_bottom_up(a, scope, cancellation, diagnostics))).collect();
      let mut candidates = Vec::new();
      match scope.functions_by_name.get(function) {
        Some(overloads) => {
          for &f in overloads {
            for combo in cartesian_product(&arg_choices) {
              if f.params.len() == combo.len() {
                if applicable(&f.params, &combo, none) {
                  let weight: u32 = combo.iter().map(|a| a.extra_weight()).sum();
                  candidates.push(TypedExpr::Call {
                    function: f,
                    args: combo,
                    meta: ExprMeta::new(*position, f.return_ty.clone()).with_weight(weight),
                  });
                }
              } else if f.params.len() > combo.len() {
                candidates.push(TypedExpr::BadCall { function: f, args: combo, meta: ExprMeta::new(*position, Type::empty()) });
              }
            }
          }
        }
        None => diagnostics.error(ErrorKind::UnknownName { name: function.clone() }, *position),
      }
      TypedExpr::Choice(ExprChoice::open(*position, candidates))
    }

    UntypedExpr::Quant { quantifier, vars, body, position } => {
      let mut inner_scope = scope.clone();
      let mut bindings = Vec::with_capacity(vars.len());
      for var in vars {
        let domain_choice = elaborate_bottom_up(&var.domain, &inner_scope, cancellation, diagnostics);
        let domain = resolve_top_down(domain_choice, None, none, diagnostics);
        inner_scope = inner_scope.with_var(var.name.clone(), domain.ty().clone());
        bindings.push(QuantBinding { name: var.name.clone(), domain });
      }
      let body_choice = elaborate_bottom_up(body, &inner_scope, cancellation, diagnostics);
      let body = resolve_top_down(body_choice, Some(&Type::formula()), none, diagnostics);
      let meta = ExprMeta::new(*position, Type::formula());
      let quant = TypedExpr::Quant { quantifier: *quantifier, vars: bindings, body: Box::new(body), meta };
      TypedExpr::Choice(ExprChoice::open(*position, vec![quant]))
    }

    UntypedExpr::Let { name, value, body, position } => {
      let value_choice = elaborate_bottom_up(value, scope, cancellation, diagnostics);
      let value = resolve_top_down(value_choice, None, none, diagnostics);
      let inner_scope = scope.with_var(name.clone(), value.ty().clone());
      let body_choice = elaborate_bottom_up(body, &inner_scope, cancellation, diagnostics);
      let candidates = extract_candidates(body_choice)
        .into_iter()
        .map(|body_candidate| {
          let ty = body_candidate.ty().clone();
          let weight = body_candidate.extra_weight();
          TypedExpr::Let {
            name: name.clone(),
            value: Box::new(value.clone()),
            body: Box::new(body_candidate),
            meta: ExprMeta::new(*position, ty).with_weight(weight),
          }
        })
        .collect();
      TypedExpr::Choice(ExprChoice::open(*position, candidates))
    }

    UntypedExpr::IfThenElse { condition, then_branch, else_branch, position } => {
      let condition_choice = elaborate_bottom_up(condition, scope, cancellation, diagnostics);
      let condition = resolve_top_down(condition_choice, Some(&Type::formula()), none, diagnostics);
      let thens = extract_candidates(elaborate_bottom_up(then_branch, scope, cancellation, diagnostics));
      let elses = extract_candidates(elaborate_bottom_up(else_branch, scope, cancellation, diagnostics));
      let mut candidates = Vec::new();
      for t in &thens {
        for e in &elses {
          if let Some(ty) = combine_branch_types(t.ty(), e.ty()) {
            let weight = t.extra_weight() + e.extra_weight();
            candidates.push(TypedExpr::IfThenElse {
              condition: Box::new(condition.clone()),
              then_branch: Box::new(t.clone()),
              else_branch: Box::new(e.clone()),
              meta: ExprMeta::new(*position, ty).with_weight(weight),
            });
          }
        }
      }
      TypedExpr::Choice(ExprChoice::open(*position, candidates))
    }
  }
}

fn is_compatible(actual: &Type, expected: &Type, none: PrimSigPtr) -> bool {
  if expected.is_int() || expected.is_bool() {
    return (!expected.is_int() || actual.is_int()) && (!expected.is_bool() || actual.is_bool());
  }
  if expected.entries().is_empty() {
    return true;
  }
  actual.has_common_arity(expected) && !actual.intersect(expected, none).is_empty()
}

/// Tie-break rule 2 (§4.G): keep only candidates whose Type is not strictly subsumed by some
/// other surviving candidate's (i.e. keep the most specific ones).
fn most_specific(candidates: Vec<TypedExpr>) -> Vec<TypedExpr> {
  let mut keep = Vec::with_capacity(candidates.len());
  for (i, d) in candidates.iter().enumerate() {
    let dominated = candidates.iter().enumerate().any(|(j, c)| j != i && c.ty().subsumes(d.ty()) && c.ty() != d.ty());
    if !dominated {
      keep.push(d.clone());
    }
  }
  keep
}

fn describe_candidate(expr: &TypedExpr) -> CandidateDescription {
  CandidateDescription { description: format!("{:?}", expr), ty: expr.ty().clone() }
}

/// `resolve_top_down`'s fallback for any failure branch: the diagnostic has already been
/// recorded, so this hands the caller a concrete, well-typed (`Type::empty()`) node instead of
/// the unresolved `Choice` — §7's per-declaration recovery depends on every `.ty()` call downstream
/// of a bad declaration staying total rather than panicking.
fn error_node(position: Position) -> TypedExpr {
  TypedExpr::Error { meta: ExprMeta::new(position, Type::empty()).synthesized() }
}

/// Top-down selection (§4.G): given an outermost Type constraint (`None` for an unconstrained
/// context, e.g. a field/function type expression), narrows `expr`'s `ExprChoice` to its unique
/// compatible candidate, applying the tie-break rules in order and reporting `Ambiguous`/`Type`
/// otherwise. Idempotent: resolving an already-`Selected`/`Failed` choice is a no-op. Every
/// failure path returns a concrete `TypedExpr::Error` rather than the unresolved `Choice`, so
/// callers that immediately read `.ty()` off the result (field/param/return types, quantifier
/// domains, `let` values) never panic on malformed input — they just propagate `Type::empty()`
/// and let the diagnostic already recorded explain why.
pub(crate) fn resolve_top_down(
  expr: TypedExpr,
  expected: Option<&Type>,
  none: PrimSigPtr,
  diagnostics: &mut Diagnostics,
) -> TypedExpr {
  let mut choice = match expr {
    TypedExpr::Choice(choice) => choice,
    other => return other,
  };
  let position = choice.position;
  let candidates = match std::mem::replace(&mut choice.state, ChoiceState::Failed) {
    ChoiceState::Open(candidates) => candidates,
    ChoiceState::Selected(expr) => return *expr,
    ChoiceState::Failed => return error_node(position),
  };

  if candidates.is_empty() {
    diagnostics.error(
      ErrorKind::Type { message: "no candidate elaboration type-checks".to_string(), expected: expected.cloned() },
      position,
    );
    return error_node(position);
  }

  let mut compatible: Vec<TypedExpr> = match expected {
    Some(exp) => candidates.into_iter().filter(|c| is_compatible(c.ty(), exp, none)).collect(),
    None => candidates,
  };

  if compatible.is_empty() {
    diagnostics.error(
      ErrorKind::Type {
        message: "no elaboration is compatible with the expected type".to_string(),
        expected: expected.cloned(),
      },
      position,
    );
    return error_node(position);
  }

  if compatible.len() > 1 {
    let min_weight = compatible.iter().map(TypedExpr::extra_weight).min().unwrap();
    compatible.retain(|c| c.extra_weight() == min_weight);
  }

  if compatible.len() > 1 {
    compatible = most_specific(compatible);
  }

  if compatible.len() > 1 {
    let descriptions = compatible.iter().map(describe_candidate).collect();
    diagnostics.error(ErrorKind::Ambiguous { candidates: descriptions }, position);
    return error_node(position);
  }

  let chosen = compatible.into_iter().next().unwrap();
  choice.select(chosen.clone());
  chosen
}

/// Pass 2: elaborates every function/predicate body, fact, assert, and command of a resolved
/// module, producing the frozen [`Module`].
pub struct Elaborator<'a> {
  options: &'a AnalysisOptions,
}

impl<'a> Elaborator<'a> {
  pub fn new(options: &'a AnalysisOptions) -> Self {
    Elaborator { options }
  }

  pub fn elaborate(&self, resolved: ResolvedModule, diagnostics: &mut Diagnostics) -> Module {
    let ResolvedModule { sig_graph, functions, predicates, facts, asserts, commands } = resolved;
    let none = sig_graph.builtins.none;

    let fields_by_name = collect_fields_by_name(&sig_graph);
    let mut functions_by_name: HashMap<IString, Vec<FunctionPtr>> = HashMap::new();
    for pending in functions.iter().chain(predicates.iter()) {
      functions_by_name.entry(pending.function.name.clone()).or_default().push(pending.function);
    }

    let function_ptrs: Vec<FunctionPtr> = functions
      .into_iter()
      .map(|pending| self.elaborate_body(pending, &sig_graph, &fields_by_name, &functions_by_name, diagnostics))
      .collect();

    let predicate_ptrs: Vec<FunctionPtr> = predicates
      .into_iter()
      .map(|pending| self.elaborate_body(pending, &sig_graph, &fields_by_name, &functions_by_name, diagnostics))
      .collect();

    let module_facts: Vec<Fact> = facts
      .into_iter()
      .map(|pending| {
        let scope = Scope::new(&sig_graph, &fields_by_name, &functions_by_name, self.options);
        let choice = elaborate_bottom_up(&pending.body, &scope, &self.options.cancellation, diagnostics);
        let body = resolve_top_down(choice, Some(&Type::formula()), none, diagnostics);
        Fact { name: pending.name, body, position: pending.position }
      })
      .collect();

    let module_asserts: Vec<Assert> = asserts
      .into_iter()
      .map(|pending| {
        let scope = Scope::new(&sig_graph, &fields_by_name, &functions_by_name, self.options);
        let choice = elaborate_bottom_up(&pending.body, &scope, &self.options.cancellation, diagnostics);
        let body = resolve_top_down(choice, Some(&Type::formula()), none, diagnostics);
        Assert { name: pending.name, body, position: pending.position }
      })
      .collect();

    let module_commands: Vec<Command> = commands
      .into_iter()
      .filter_map(|command_decl| {
        let target = match command_decl.kind {
          CommandKind::Run => {
            predicate_ptrs.iter().find(|p| p.name == command_decl.target).map(|&p| CommandTarget::Predicate(p))
          }
          CommandKind::Check => module_asserts
            .iter()
            .position(|a| a.name.as_ref() == Some(&command_decl.target))
            .map(CommandTarget::Assert),
        };
        match target {
          Some(target) => Some(Command {
            name: command_decl.name,
            kind: command_decl.kind,
            target,
            position: command_decl.position,
          }),
          None => {
            diagnostics.error(ErrorKind::UnknownName { name: command_decl.target.clone() }, command_decl.position);
            None
          }
        }
      })
      .collect();

    Module {
      sig_graph,
      functions: function_ptrs,
      predicates: predicate_ptrs,
      facts: module_facts,
      asserts: module_asserts,
      commands: module_commands,
      status: ModuleStatus::Frozen,
    }
  }

  fn elaborate_body(
    &self,
    pending: PendingFunction,
    sig_graph: &SigGraph,
    fields_by_name: &HashMap<IString, Vec<FieldPtr>>,
    functions_by_name: &HashMap<IString, Vec<FunctionPtr>>,
    diagnostics: &mut Diagnostics,
  ) -> FunctionPtr {
    let none = sig_graph.builtins.none;
    let PendingFunction { function, body } = pending;

    let mut scope = Scope::new(sig_graph, fields_by_name, functions_by_name, self.options);
    for param in &function.params {
      scope = scope.with_var(param.name.clone(), param.ty.clone());
    }

    let expected = if function.is_predicate { Type::formula() } else { function.return_ty.clone() };
    let choice = elaborate_bottom_up(&body, &scope, &self.options.cancellation, diagnostics);
    let typed_body = resolve_top_down(choice, Some(&expected), none, diagnostics);

    let mut function_mut = function;
    function_mut.body = Some(typed_body);
    function_mut
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::untyped::{BinaryOp, UntypedExpr};
  use crate::error::Position;
  use crate::sig::{PrimSig, PrimSigPtr};
  use alloy_abs::heap_construct;

  fn pos() -> Position {
    Position::new(0, 1, 1)
  }

  #[test]
  fn name_resolves_to_sig_reference() {
    let mut graph = SigGraph::new();
    graph.add_prim_sig(IString::from("A"), None, false).unwrap();
    graph.resolve_hierarchy().unwrap();

    let fields: HashMap<IString, Vec<FieldPtr>> = HashMap::new();
    let functions: HashMap<IString, Vec<FunctionPtr>> = HashMap::new();
    let options = AnalysisOptions::default();
    let scope = Scope::new(&graph, &fields, &functions, &options);
    let cancellation = CancellationToken::new();
    let mut diagnostics = Diagnostics::new();

    let expr = UntypedExpr::Name { name: IString::from("A"), position: pos() };
    let choice = elaborate_bottom_up(&expr, &scope, &cancellation, &mut diagnostics);
    let resolved = resolve_top_down(choice, None, graph.builtins.none, &mut diagnostics);
    assert!(!diagnostics.has_errors());
    assert!(matches!(resolved, TypedExpr::SigRef { .. }));
  }

  #[test]
  fn joining_two_unary_sets_is_a_type_error() {
    let mut graph = SigGraph::new();
    graph.add_prim_sig(IString::from("A"), None, false).unwrap();
    graph.add_prim_sig(IString::from("B"), None, false).unwrap();
    graph.resolve_hierarchy().unwrap();

    let fields: HashMap<IString, Vec<FieldPtr>> = HashMap::new();
    let functions: HashMap<IString, Vec<FunctionPtr>> = HashMap::new();
    let options = AnalysisOptions::default();
    let scope = Scope::new(&graph, &fields, &functions, &options);
    let cancellation = CancellationToken::new();
    let mut diagnostics = Diagnostics::new();

    let expr = UntypedExpr::Dot {
      left: Box::new(UntypedExpr::Name { name: IString::from("A"), position: pos() }),
      right: Box::new(UntypedExpr::Name { name: IString::from("B"), position: pos() }),
      position: pos(),
    };
    let choice = elaborate_bottom_up(&expr, &scope, &cancellation, &mut diagnostics);
    let _ = resolve_top_down(choice, None, graph.builtins.none, &mut diagnostics);
    assert!(diagnostics.has_errors());
    assert!(matches!(diagnostics.errors()[0].kind, ErrorKind::Type { .. }));
  }

  #[test]
  fn disjoint_equality_is_a_warning_not_an_error() {
    let mut graph = SigGraph::new();
    graph.add_prim_sig(IString::from("A"), None, false).unwrap();
    graph.add_prim_sig(IString::from("B"), None, false).unwrap();
    graph.resolve_hierarchy().unwrap();

    let fields: HashMap<IString, Vec<FieldPtr>> = HashMap::new();
    let functions: HashMap<IString, Vec<FunctionPtr>> = HashMap::new();
    let options = AnalysisOptions::default();
    let scope = Scope::new(&graph, &fields, &functions, &options);
    let cancellation = CancellationToken::new();
    let mut diagnostics = Diagnostics::new();

    let expr = UntypedExpr::Binary {
      op: BinaryOp::Eq,
      left: Box::new(UntypedExpr::Name { name: IString::from("A"), position: pos() }),
      right: Box::new(UntypedExpr::Name { name: IString::from("B"), position: pos() }),
      position: pos(),
    };
    let choice = elaborate_bottom_up(&expr, &scope, &cancellation, &mut diagnostics);
    let resolved = resolve_top_down(choice, Some(&Type::formula()), graph.builtins.none, &mut diagnostics);
    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.warnings().len(), 1);
    assert!(matches!(resolved, TypedExpr::Binary { .. }));
  }

  fn leaf(name: &str, index: u32) -> PrimSigPtr {
    PrimSigPtr::new(heap_construct!(PrimSig::new(IString::from(name), index, false)))
  }

  #[test]
  fn applicable_checks_arity_and_intersection() {
    let none = leaf("none", 0);
    let mut a = leaf("A", 1);
    a.ancestors.insert(1);
    let params = vec![Param { name: IString::from("x"), ty: Type::make_sig(a, none) }];
    let arg = TypedExpr::SigRef { sig: a, meta: ExprMeta::new(pos(), Type::make_sig(a, none)) };
    assert!(applicable(&params, &[arg], none));
  }
}
