/*!

Pass 1 (§4.F): registers every sig, resolves `extends`/`in` parent references into the `SigGraph`,
computes each field's full relational `Type`, and elaborates every function/predicate's parameter
and return type expressions. Body elaboration is deferred to pass 2 (the Elaborator), with
parameters already bound in scope by the time it reaches them — the [`PendingFunction`] pairing
carries a function's already-resolved `FunctionPtr` alongside its still-untyped body for exactly
that handoff.

*/

use alloy_abs::{heap_construct, HashMap, IString};

use crate::ast::untyped::{CommandDecl, FunDecl, PredDecl, SigDecl, SigKind, UntypedExpr, UntypedModule};
use crate::elaborate::{elaborate_bottom_up, resolve_top_down, Scope};
use crate::error::{Diagnostics, ErrorKind, Position};
use crate::field::{Field, FieldPtr};
use crate::module::{Function, FunctionPtr, Param};
use crate::sig::{SigGraph, SigRef};
use crate::ty::Type;
use crate::AnalysisOptions;

/// A function or predicate whose signature (`params`/`return_ty`) is resolved but whose `body` is
/// still the parser's untyped tree, awaiting pass 2.
pub struct PendingFunction {
  pub function: FunctionPtr,
  pub body: UntypedExpr,
}

pub struct PendingFact {
  pub name: Option<IString>,
  pub body: UntypedExpr,
  pub position: Position,
}

pub struct PendingAssert {
  pub name: Option<IString>,
  pub body: UntypedExpr,
  pub position: Position,
}

/// Pass 1's output, handed whole into [`crate::elaborate::Elaborator::elaborate`].
pub struct ResolvedModule {
  pub sig_graph: SigGraph,
  pub functions: Vec<PendingFunction>,
  pub predicates: Vec<PendingFunction>,
  pub facts: Vec<PendingFact>,
  pub asserts: Vec<PendingAssert>,
  pub commands: Vec<CommandDecl>,
}

pub struct Resolver<'a> {
  options: &'a AnalysisOptions,
}

impl<'a> Resolver<'a> {
  pub fn new(options: &'a AnalysisOptions) -> Self {
    Resolver { options }
  }

  /// Runs the full four-step algorithm of §4.F. Returns `None` only when the sig graph itself
  /// fails to resolve (unknown parent, illegal extension, a cycle) — every other error is
  /// accumulated per-declaration and resolution continues with whatever did elaborate.
  pub fn resolve(&self, untyped: &UntypedModule, diagnostics: &mut Diagnostics) -> Option<ResolvedModule> {
    let mut sig_graph = SigGraph::new();

    // Step 1: register every sig name, then resolve extends/in parent references.
    for sig_decl in &untyped.sigs {
      let result = match &sig_decl.kind {
        SigKind::Prim { extends } => {
          sig_graph.add_prim_sig(sig_decl.name.clone(), extends.clone(), sig_decl.is_abstract).map(|_| ())
        }
        SigKind::Subset { parents } => sig_graph.add_subset_sig(sig_decl.name.clone(), parents.clone()).map(|_| ()),
      };
      if let Err(err) = result {
        diagnostics.error(err, sig_decl.position);
      }
    }

    if let Err(errors) = sig_graph.resolve_hierarchy() {
      for err in errors {
        diagnostics.error(err, Position::synthetic());
      }
      return None;
    }

    // Step 2 (computing each sig's singleton Type) needs no separate storage: `Type::make_sig`
    // computes it on demand, used below and by every `SigRef` candidate the Elaborator produces.

    // Step 3: elaborate field declarations.
    let empty_fields: HashMap<IString, Vec<FieldPtr>> = HashMap::new();
    let empty_functions: HashMap<IString, Vec<FunctionPtr>> = HashMap::new();
    for sig_decl in &untyped.sigs {
      self.resolve_fields(sig_decl, &sig_graph, &empty_fields, &empty_functions, diagnostics);
    }

    let fields_by_name = collect_fields_by_name(&sig_graph);

    // Step 4: elaborate function/predicate parameter and return type expressions.
    let functions = untyped
      .functions
      .iter()
      .map(|fun_decl| self.resolve_function(fun_decl, &sig_graph, &fields_by_name, diagnostics))
      .collect();

    let predicates = untyped
      .predicates
      .iter()
      .map(|pred_decl| self.resolve_predicate(pred_decl, &sig_graph, &fields_by_name, diagnostics))
      .collect();

    let facts = untyped
      .facts
      .iter()
      .map(|f| PendingFact { name: f.name.clone(), body: f.body.clone(), position: f.position })
      .collect();

    let asserts = untyped
      .asserts
      .iter()
      .map(|a| PendingAssert { name: a.name.clone(), body: a.body.clone(), position: a.position })
      .collect();

    Some(ResolvedModule {
      sig_graph,
      functions,
      predicates,
      facts,
      asserts,
      commands: untyped.commands.clone(),
    })
  }

  /// §4.F step 3: elaborates every `FieldDecl` of `sig_decl` into a heap-allocated `Field` whose
  /// `ty` is `product(Type.make(owner), declared)` — the owner column is exact by construction,
  /// not merely an upper bound, since `Type.make(owner)` is a single-sig singleton. Subset sigs
  /// cannot declare fields: there is no tree-structured owner sig to build that product against.
  fn resolve_fields(
    &self,
    sig_decl: &SigDecl,
    sig_graph: &SigGraph,
    empty_fields: &HashMap<IString, Vec<FieldPtr>>,
    empty_functions: &HashMap<IString, Vec<FunctionPtr>>,
    diagnostics: &mut Diagnostics,
  ) {
    if sig_decl.fields.is_empty() {
      return;
    }
    let none = sig_graph.builtins.none;
    let owner = match sig_graph.lookup(&sig_decl.name) {
      Some(SigRef::Prim(sig)) => sig,
      Some(SigRef::Subset(_)) => {
        for field in &sig_decl.fields {
          diagnostics.error(ErrorKind::IllegalExtension { parent: sig_decl.name.clone() }, field.position);
        }
        return;
      }
      None => return,
    };
    let owner_ty = Type::make_sig(owner, none);

    for field_decl in &sig_decl.fields {
      let scope = Scope::new(sig_graph, empty_fields, empty_functions, self.options);
      let choice = elaborate_bottom_up(&field_decl.ty_expr, &scope, &self.options.cancellation, diagnostics);
      let declared = resolve_top_down(choice, None, none, diagnostics);

      let ty = match owner_ty.product(declared.ty(), self.options.max_arity) {
        Ok(ty) => ty,
        Err(err) => {
          diagnostics.error(err, field_decl.position);
          continue;
        }
      };

      let field = FieldPtr::new(heap_construct!(Field::new(
        field_decl.name.clone(),
        owner,
        ty,
        field_decl.multiplicity,
        field_decl.position,
      )));
      let mut owner_mut = owner;
      owner_mut.fields.push(field);
    }
  }

  fn resolve_function(
    &self,
    fun_decl: &FunDecl,
    sig_graph: &SigGraph,
    fields_by_name: &HashMap<IString, Vec<FieldPtr>>,
    diagnostics: &mut Diagnostics,
  ) -> PendingFunction {
    let empty_functions: HashMap<IString, Vec<FunctionPtr>> = HashMap::new();
    let none = sig_graph.builtins.none;
    let scope = Scope::new(sig_graph, fields_by_name, &empty_functions, self.options);

    let params = fun_decl
      .params
      .iter()
      .map(|param| {
        let choice = elaborate_bottom_up(&param.ty_expr, &scope, &self.options.cancellation, diagnostics);
        let resolved = resolve_top_down(choice, None, none, diagnostics);
        Param { name: param.name.clone(), ty: resolved.ty().clone() }
      })
      .collect();

    let return_choice = elaborate_bottom_up(&fun_decl.return_ty, &scope, &self.options.cancellation, diagnostics);
    let return_ty = resolve_top_down(return_choice, None, none, diagnostics).ty().clone();

    let function = FunctionPtr::new(heap_construct!(Function::new(
      fun_decl.name.clone(),
      params,
      return_ty,
      false,
      fun_decl.position,
    )));
    PendingFunction { function, body: fun_decl.body.clone() }
  }

  fn resolve_predicate(
    &self,
    pred_decl: &PredDecl,
    sig_graph: &SigGraph,
    fields_by_name: &HashMap<IString, Vec<FieldPtr>>,
    diagnostics: &mut Diagnostics,
  ) -> PendingFunction {
    let empty_functions: HashMap<IString, Vec<FunctionPtr>> = HashMap::new();
    let none = sig_graph.builtins.none;
    let scope = Scope::new(sig_graph, fields_by_name, &empty_functions, self.options);

    let params = pred_decl
      .params
      .iter()
      .map(|param| {
        let choice = elaborate_bottom_up(&param.ty_expr, &scope, &self.options.cancellation, diagnostics);
        let resolved = resolve_top_down(choice, None, none, diagnostics);
        Param { name: param.name.clone(), ty: resolved.ty().clone() }
      })
      .collect();

    let function = FunctionPtr::new(heap_construct!(Function::new(
      pred_decl.name.clone(),
      params,
      Type::formula(),
      true,
      pred_decl.position,
    )));
    PendingFunction { function, body: pred_decl.body.clone() }
  }
}

/// Flattens every `PrimSig::fields` across the whole graph into a name-keyed lookup table — the
/// shape `Scope::lookup_name` needs to find every same-named field overload in O(1).
pub(crate) fn collect_fields_by_name(sig_graph: &SigGraph) -> HashMap<IString, Vec<FieldPtr>> {
  let mut map: HashMap<IString, Vec<FieldPtr>> = HashMap::new();
  for &sig in sig_graph.prim_sigs() {
    for &field in &sig.fields {
      map.entry(field.name.clone()).or_default().push(field);
    }
  }
  map
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::untyped::{FieldDecl, SigDecl, SigKind};
  use crate::error::Position;
  use crate::field::Multiplicity;

  fn pos() -> Position {
    Position::new(0, 1, 1)
  }

  fn name_expr(name: &str) -> UntypedExpr {
    UntypedExpr::Name { name: IString::from(name), position: pos() }
  }

  #[test]
  fn resolves_sig_and_field_type() {
    let options = AnalysisOptions::default();
    let mut diagnostics = Diagnostics::new();
    let module = UntypedModule {
      sigs: vec![
        SigDecl {
          name: IString::from("A"),
          kind: SigKind::Prim { extends: None },
          is_abstract: false,
          fields: vec![],
          position: pos(),
        },
        SigDecl {
          name: IString::from("B"),
          kind: SigKind::Prim { extends: None },
          is_abstract: false,
          fields: vec![FieldDecl {
            name: IString::from("next"),
            ty_expr: name_expr("A"),
            multiplicity: Multiplicity::Unmarked,
            position: pos(),
          }],
          position: pos(),
        },
      ],
      ..Default::default()
    };

    let resolved = Resolver::new(&options).resolve(&module, &mut diagnostics).expect("resolves");
    assert!(!diagnostics.has_errors());
    let b = match resolved.sig_graph.lookup(&IString::from("B")) {
      Some(SigRef::Prim(sig)) => sig,
      _ => panic!("B should be a prim sig"),
    };
    assert_eq!(b.fields.len(), 1);
    assert!(b.fields[0].ty.has_arity(2));
  }

  #[test]
  fn subset_sig_cannot_declare_fields() {
    let options = AnalysisOptions::default();
    let mut diagnostics = Diagnostics::new();
    let module = UntypedModule {
      sigs: vec![
        SigDecl {
          name: IString::from("A"),
          kind: SigKind::Prim { extends: None },
          is_abstract: false,
          fields: vec![],
          position: pos(),
        },
        SigDecl {
          name: IString::from("Sub"),
          kind: SigKind::Subset { parents: vec![IString::from("A")] },
          is_abstract: false,
          fields: vec![FieldDecl {
            name: IString::from("bad"),
            ty_expr: name_expr("A"),
            multiplicity: Multiplicity::Unmarked,
            position: pos(),
          }],
          position: pos(),
        },
      ],
      ..Default::default()
    };

    Resolver::new(&options).resolve(&module, &mut diagnostics);
    assert!(diagnostics.has_errors());
  }
}
