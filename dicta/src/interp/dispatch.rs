//! Trait method resolution
//!
//! A [`ClassMethod`] names a trait method without saying which instance
//! implements it. [`Interpreter::resolve`] picks one, trying in order:
//!
//! 1. dictionaries passed explicitly in front of the arguments
//! 2. the witness stack, for nullary methods
//! 3. the type the caller expects back (container hint, type context,
//!    annotation, analyzer node type)
//! 4. the runtime types of the arguments, first as an exact instance key,
//!    then by scoring every registered key
//!
//! Context and argument candidates can disagree; see [`Choice`].

use super::apply::CallSite;
use super::error::{InterpResult, RuntimeError};
use super::registry::TypeKey;
use super::stacks::RESULT_KEY;
use super::value::{ClassMethod, Closure, Dictionary, Value};
use super::Interpreter;
use crate::ast::{is_type_variable_name, DispatchSource, Type};
use std::sync::Arc;
use tracing::debug;

/// Outcome of resolving a trait method
#[derive(Debug)]
pub struct Resolution {
    /// Concrete callable, not yet applied
    pub callee: Value,
    /// Arguments left after consuming an explicit dictionary
    pub args: Vec<Value>,
    /// Evidence to make visible while the callee runs: trait and the type
    /// it was resolved for
    pub witness: Option<(String, Type)>,
}

/// Where the expected result type came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextSource {
    Container,
    TypeContext,
    Annotation,
    NodeType,
    ResultWitness,
}

impl ContextSource {
    /// Written by the programmer rather than inferred
    fn is_annotation(self) -> bool {
        matches!(self, ContextSource::TypeContext | ContextSource::Annotation)
    }
}

struct Candidate {
    key: TypeKey,
    callee: Value,
    /// Found under the exact argument key rather than by scoring
    exact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Context,
    Argument,
    Neither,
}

/// Methods whose dispatched type only shows up in the result.
fn context_only(trait_name: &str, method: &str) -> bool {
    trait_name == "Applicative" && matches!(method, "pure" | "lift")
}

/// Arguments after any leading dictionaries
pub(super) fn plain_args(args: &[Value]) -> &[Value] {
    let skip = args
        .iter()
        .take_while(|a| matches!(a, Value::Dictionary(_)))
        .count();
    &args[skip..]
}

/// Runtime type names of the arguments that carry the dispatched type.
fn dispatch_types(method: &ClassMethod, args: &[Value]) -> Vec<String> {
    let positions: Vec<usize> = method
        .dispatch
        .iter()
        .flatten()
        .filter_map(|source| match source {
            DispatchSource::Arg(i) => Some(*i),
            DispatchSource::Return => None,
        })
        .collect();
    if positions.is_empty() {
        args.iter().map(|a| a.type_name().to_string()).collect()
    } else {
        positions
            .iter()
            .filter_map(|&i| args.get(i))
            .map(|a| a.type_name().to_string())
            .collect()
    }
}

fn return_only(method: &ClassMethod) -> bool {
    method
        .dispatch
        .as_ref()
        .is_some_and(|d| !d.is_empty() && d.iter().all(|s| *s == DispatchSource::Return))
}

/// `Option<Int>` wraps an `Int` argument.
fn wraps_argument(expected: &Type, types: &[String]) -> bool {
    expected
        .type_args()
        .iter()
        .filter_map(Type::constructor_name)
        .any(|inner| types.iter().any(|t| t == inner))
}

impl Interpreter {
    pub fn resolve(&mut self, method: &Arc<ClassMethod>, args: Vec<Value>, site: &CallSite) -> InterpResult<Resolution> {
        let trait_name = method.trait_name.as_str();
        let mut args = args;

        // Explicit dictionaries
        loop {
            let dict = match args.first() {
                Some(Value::Dictionary(dict)) => Arc::clone(dict),
                _ => break,
            };
            if dict.is_placeholder() {
                args.remove(0);
                continue;
            }
            let Some(found) = self.method_in_dictionary(&dict, trait_name, &method.method) else {
                break;
            };
            args.remove(0);
            if self.accepts_args(&found, &args) {
                debug!(trait_name, method = %method.method, source = %dict.trait_name, "dispatched by dictionary");
                return Ok(Resolution {
                    callee: found,
                    args,
                    witness: None,
                });
            }
            debug!(trait_name, method = %method.method, "skipping incompatible dictionary");
        }

        // Nullary methods take their evidence from the witness stack
        if method.arity == 0 {
            if let Some(types) = self.stacks.witnesses.lookup(trait_name) {
                let key = TypeKey::from_types(&types);
                if let Some(found) = self.lookup_with_alias(trait_name, &key, &method.method) {
                    debug!(trait_name, method = %method.method, %key, "dispatched by witness");
                    return Ok(Resolution {
                        callee: found,
                        args,
                        witness: None,
                    });
                }
            }
        }

        let plain = plain_args(&args);
        let types = dispatch_types(method, plain);
        let context = self.expected_type(method, site);
        let context_name = context
            .as_ref()
            .and_then(|(ty, _)| ty.constructor_name())
            .map(str::to_string);
        let by_context = context
            .as_ref()
            .and_then(|(ty, _)| self.context_candidate(method, ty, plain));
        let by_argument = if return_only(method) || types.is_empty() {
            None
        } else {
            self.argument_candidate(method, &types, plain, context_name.as_deref())
        };

        let choice = if trait_name == "Show" {
            match (&by_argument, &by_context) {
                (Some(_), _) => Choice::Argument,
                (None, Some(_)) if plain.is_empty() => Choice::Context,
                _ => Choice::Neither,
            }
        } else if context_only(trait_name, &method.method) {
            if by_context.is_some() {
                Choice::Context
            } else {
                Choice::Neither
            }
        } else {
            match (&by_context, &by_argument, &context) {
                (Some(ctx), Some(arg), Some((expected, source))) => {
                    if wraps_argument(expected, &types) {
                        Choice::Context
                    } else if arg.exact {
                        Choice::Argument
                    } else if method.arity == 0 {
                        Choice::Context
                    } else if source.is_annotation() && ctx.key != arg.key {
                        Choice::Context
                    } else {
                        Choice::Argument
                    }
                }
                (Some(_), None, _) => Choice::Context,
                (None, Some(_), _) => Choice::Argument,
                _ => Choice::Neither,
            }
        };

        match (choice, by_context, by_argument) {
            (Choice::Context, Some(found), _) => {
                let witness = context.map(|(ty, _)| (trait_name.to_string(), ty));
                debug!(trait_name, method = %method.method, key = %found.key, "dispatched by context");
                Ok(Resolution {
                    callee: found.callee,
                    args,
                    witness,
                })
            }
            (Choice::Argument, _, Some(found)) => {
                debug!(
                    trait_name,
                    method = %method.method,
                    key = %found.key,
                    exact = found.exact,
                    "dispatched by argument"
                );
                Ok(Resolution {
                    callee: found.callee,
                    args,
                    witness: None,
                })
            }
            _ => {
                let has_args = !plain.is_empty();
                self.resolve_default(method, args, &types, context, has_args)
            }
        }
    }

    /// Look a method up by name in a dictionary or its supers.
    fn method_in_dictionary(&self, dict: &Dictionary, trait_name: &str, method: &str) -> Option<Value> {
        if dict.trait_name == trait_name {
            let position = self
                .registry
                .method_names(trait_name)
                .iter()
                .position(|m| m == method)?;
            return dict.methods.get(position).cloned();
        }
        dict.supers
            .iter()
            .find_map(|sup| self.method_in_dictionary(sup, trait_name, method))
    }

    fn lookup_with_alias(&self, trait_name: &str, key: &TypeKey, method: &str) -> Option<Value> {
        if let Some(found) = self.registry.lookup_method(trait_name, key, method) {
            return Some(found);
        }
        match key.parts() {
            [single] => {
                let target = self.registry.alias_target(single)?;
                self.registry
                    .lookup_method(trait_name, &TypeKey::single(target), method)
            }
            _ => None,
        }
    }

    /// The type the caller expects this call to produce, if anything says.
    fn expected_type(&self, method: &ClassMethod, site: &CallSite) -> Option<(Type, ContextSource)> {
        if let Some(container) = self.stacks.containers.top() {
            return Some((Type::con(container), ContextSource::Container));
        }
        if let Some(ty) = self.stacks.type_context.top() {
            if !ty.has_var_head() && ty.constructor_name().is_some() {
                return Some((ty, ContextSource::TypeContext));
            }
        }
        if let Some(annotation) = &site.annotation {
            let ty = self.resolve_at_site(annotation, site);
            if !ty.has_var_head() {
                return Some((ty, ContextSource::Annotation));
            }
        }
        if let Some(node_ty) = site.node.and_then(|id| self.hints.node_type(id)) {
            let ty = self.resolve_at_site(node_ty, site);
            if !ty.has_var_head() {
                return Some((ty, ContextSource::NodeType));
            }
            return self.result_witness();
        }
        if method.arity == 0 {
            return self.result_witness();
        }
        None
    }

    fn resolve_at_site(&self, ty: &Type, site: &CallSite) -> Type {
        match &site.env {
            Some(env) => self.resolve_type(ty, env),
            None => ty.clone(),
        }
    }

    fn result_witness(&self) -> Option<(Type, ContextSource)> {
        let types = self.stacks.witnesses.lookup(RESULT_KEY)?;
        types
            .into_iter()
            .next()
            .map(|ty| (ty, ContextSource::ResultWitness))
    }

    fn context_candidate(&self, method: &ClassMethod, expected: &Type, args: &[Value]) -> Option<Candidate> {
        let name = expected.constructor_name()?;
        let mut names = vec![name];
        if let Some(target) = self.registry.alias_target(name) {
            names.push(target);
        }
        for name in names {
            let mut keys = vec![TypeKey::single(name)];
            keys.extend(
                self.registry
                    .instance_keys(&method.trait_name)
                    .into_iter()
                    .filter(|k| k.len() > 1 && k.parts()[0] == name),
            );
            for key in keys {
                let Some(callee) = self.registry.lookup_method(&method.trait_name, &key, &method.method) else {
                    continue;
                };
                if self.accepts_args(&callee, args) {
                    return Some(Candidate {
                        key,
                        callee,
                        exact: true,
                    });
                }
            }
        }
        None
    }

    fn argument_candidate(
        &self,
        method: &ClassMethod,
        types: &[String],
        args: &[Value],
        context_name: Option<&str>,
    ) -> Option<Candidate> {
        let trait_name = &method.trait_name;
        if self.registry.key_arity(trait_name) == Some(types.len()) {
            let key = TypeKey(types.to_vec());
            if let Some(callee) = self.registry.lookup_method(trait_name, &key, &method.method) {
                if self.accepts_args(&callee, args) {
                    return Some(Candidate {
                        key,
                        callee,
                        exact: true,
                    });
                }
            }
        }

        let mut scored: Vec<(usize, TypeKey)> = self
            .registry
            .instance_keys(trait_name)
            .into_iter()
            .map(|key| (score_key(&key, types, context_name), key))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Stable: equal scores stay in registration order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().find_map(|(_, key)| {
            let callee = self.registry.lookup_method(trait_name, &key, &method.method)?;
            self.accepts_args(&callee, args).then_some(Candidate {
                key,
                callee,
                exact: false,
            })
        })
    }

    /// Whether a candidate's declared parameters fit the arguments.
    fn accepts_args(&self, callee: &Value, args: &[Value]) -> bool {
        let args = plain_args(args);
        match callee {
            Value::Function(closure) => {
                let def = &closure.def;
                if !def.is_variadic() && args.len() > def.params.len() {
                    return false;
                }
                def.fixed_params()
                    .iter()
                    .zip(args)
                    .all(|(param, arg)| param.ty.as_ref().map_or(true, |ty| self.type_accepts(ty, arg)))
            }
            Value::Builtin(builtin) => match builtin.signature.as_ref().and_then(Type::fn_params) {
                Some(params) => {
                    args.len() <= params.len()
                        && params.iter().zip(args).all(|(ty, arg)| self.type_accepts(ty, arg))
                }
                None => true,
            },
            _ => true,
        }
    }

    fn type_accepts(&self, ty: &Type, value: &Value) -> bool {
        match ty.constructor_name() {
            None => true,
            Some(name) if name == "Any" || is_type_variable_name(name) => true,
            Some(name) => name == value.type_name() || self.registry.alias_target(name) == Some(value.type_name()),
        }
    }

    fn resolve_default(
        &mut self,
        method: &ClassMethod,
        args: Vec<Value>,
        types: &[String],
        context: Option<(Type, ContextSource)>,
        has_args: bool,
    ) -> InterpResult<Resolution> {
        let trait_name = method.trait_name.clone();
        let arg_key = (!types.is_empty()).then(|| {
            let n = self.registry.key_arity(&trait_name).unwrap_or(1).min(types.len());
            TypeKey(types[..n].to_vec())
        });
        let context_key = context
            .as_ref()
            .and_then(|(ty, _)| ty.constructor_name())
            .map(|name| TypeKey::single(self.registry.alias_target(name).unwrap_or(name)));

        let prefers_context = context_only(&trait_name, &method.method) || method.arity == 0 || !has_args;
        let key = if prefers_context {
            context_key.map(|k| (k, true)).or(arg_key.map(|k| (k, false)))
        } else {
            arg_key.map(|k| (k, false)).or(context_key.map(|k| (k, true)))
        };
        let witness = match &key {
            Some((_, true)) => context.map(|(ty, _)| (trait_name.clone(), ty)),
            _ => None,
        };

        if let Some(def) = self.registry.user_default(&trait_name, &method.method) {
            let closure = Closure {
                owner_trait: Some(trait_name.clone()),
                ..Closure::new(def, Arc::clone(&self.global_env))
            };
            let callee = Value::Function(Arc::new(closure));
            if let Some((key, _)) = key {
                debug!(trait_name = %trait_name, method = %method.method, %key, "materialized trait default");
                self.registry
                    .register_method(&trait_name, key, &method.method, callee.clone());
            }
            return Ok(Resolution { callee, args, witness });
        }

        if let Some(builtin) = self.registry.builtin_default(&trait_name, &method.method) {
            return Ok(Resolution {
                callee: builtin,
                args,
                witness,
            });
        }

        let type_name = if types.is_empty() {
            "unknown".to_string()
        } else {
            types.join(", ")
        };
        Err(RuntimeError::no_implementation(&trait_name, &type_name, &method.method))
    }
}

/// Parts matching an argument type (or any argument, for variables), plus
/// one if a part past the arguments names the expected type.
fn score_key(key: &TypeKey, types: &[String], context_name: Option<&str>) -> usize {
    let mut score = 0;
    let mut boosted = false;
    for (i, part) in key.parts().iter().enumerate() {
        match types.get(i) {
            Some(ty) if ty == part => score += 1,
            Some(_) if is_type_variable_name(part) => score += 1,
            Some(_) => {}
            None if !boosted && context_name == Some(part.as_str()) => {
                score += 1;
                boosted = true;
            }
            None => {}
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::{Item, Program, TraitDef, TraitMethod};
    use crate::hints::{AnalyzedProgram, AnalyzerHints};
    use crate::interp::ErrorKind;

    fn load_with(items: Vec<Item>, hints: AnalyzerHints) -> Interpreter {
        let mut interp = Interpreter::new();
        interp
            .load(&AnalyzedProgram::new(
                Program {
                    file: "dispatch.dc".into(),
                    items,
                },
                hints,
            ))
            .unwrap();
        interp
    }

    fn load(items: Vec<Item>) -> Interpreter {
        load_with(items, AnalyzerHints::default())
    }

    fn tagged(name: &str, arity: usize, tag: &str) -> crate::ast::FnDef {
        let names = ["x", "y", "z"];
        func(name, params(&names[..arity]), string(tag))
    }

    fn show_program() -> Vec<Item> {
        vec![
            trait_("Show", &[("show", 1)]),
            instance("Show", vec![Type::con("Int")], vec![tagged("show", 1, "int")]),
            instance(
                "Show",
                vec![Type::app("List", vec![Type::var("a")])],
                vec![tagged("show", 1, "list")],
            ),
        ]
    }

    fn monoid_program() -> Vec<Item> {
        vec![
            trait_("Monoid", &[("empty", 0), ("append", 2)]),
            instance(
                "Monoid",
                vec![Type::app("List", vec![Type::var("a")])],
                vec![tagged("empty", 0, "list-empty")],
            ),
            instance(
                "Monoid",
                vec![Type::app("Option", vec![Type::var("a")])],
                vec![tagged("empty", 0, "option-empty")],
            ),
        ]
    }

    #[test]
    fn test_argument_type_dispatch() {
        let mut interp = load(show_program());
        let int = interp.call_function("show", vec![Value::Int(1)]).unwrap();
        assert_eq!(int, Value::string("int"));
        let list = interp
            .call_function("show", vec![Value::list(vec![Value::Int(1)])])
            .unwrap();
        assert_eq!(list, Value::string("list"));
    }

    #[test]
    fn test_show_prefers_argument_over_annotation() {
        let mut interp = load(show_program());
        let expr = annotated(call(var("show"), vec![int(42)]), Type::app("List", vec![Type::con("Int")]));
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("int"));
    }

    #[test]
    fn test_show_falls_back_to_builtin_default() {
        let mut interp = load(show_program());
        let shown = interp.call_function("show", vec![Value::Bool(true)]).unwrap();
        assert_eq!(shown, Value::string("true"));
    }

    #[test]
    fn test_explicit_dictionary_wins() {
        let mut interp = load(show_program());
        let dict = interp.build_dictionary("Show", &TypeKey::single("Int")).unwrap();
        let shown = interp
            .call_function("show", vec![Value::Dictionary(dict), Value::string("text")])
            .unwrap();
        assert_eq!(shown, Value::string("int"));
    }

    #[test]
    fn test_marker_dictionary_reaches_callee() {
        let mut show = func("show", params(&["x"]), var("marker"));
        show.witness_params = vec![crate::ast::WitnessParam {
            name: "marker".into(),
            trait_name: "Marker".into(),
        }];
        let items = vec![
            trait_("Marker", &[]),
            trait_("Show", &[("show", 1)]),
            instance("Show", vec![Type::con("Int")], vec![show]),
        ];
        let mut interp = load(items);
        let marker = Arc::new(Dictionary {
            trait_name: "Marker".into(),
            type_key: Some(TypeKey::single("Int")),
            methods: vec![],
            supers: vec![],
        });
        let bound = interp
            .call_function("show", vec![Value::Dictionary(Arc::clone(&marker)), Value::Int(1)])
            .unwrap();
        assert_eq!(bound, Value::Dictionary(marker));
    }

    #[test]
    fn test_placeholder_dictionary_is_stripped() {
        let mut interp = load(show_program());
        let placeholder = Value::Dictionary(Arc::new(Dictionary::placeholder("Show")));
        let shown = interp
            .call_function("show", vec![placeholder, Value::list(vec![])])
            .unwrap();
        assert_eq!(shown, Value::string("list"));
    }

    #[test]
    fn test_nullary_uses_annotation() {
        let mut interp = load(monoid_program());
        let expr = annotated(call(var("empty"), vec![]), Type::app("Option", vec![Type::con("Int")]));
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("option-empty"));
        assert_eq!(interp.type_context_depth(), 0);
    }

    #[test]
    fn test_nullary_uses_return_type() {
        let mut items = monoid_program();
        let mut make = func("make", vec![], call(var("empty"), vec![]));
        make.ret_ty = Some(Type::app("List", vec![Type::con("Int")]));
        items.push(fn_item(make));
        let mut interp = load(items);
        assert_eq!(interp.call_function("make", vec![]).unwrap(), Value::string("list-empty"));
        assert_eq!(interp.witness_depth(), 0);
    }

    #[test]
    fn test_nullary_uses_witness_stack() {
        let mut interp = load(monoid_program());
        let frame = crate::interp::WitnessFrame::new().with("Monoid", Type::con("Option"));
        let _guard = interp.stacks.witnesses.push(Arc::new(frame));
        assert_eq!(interp.call_function("empty", vec![]).unwrap(), Value::string("option-empty"));
    }

    #[test]
    fn test_node_type_hint() {
        let mut hints = AnalyzerHints::default();
        hints.node_types.insert(7, Type::app("Option", vec![Type::con("Int")]));
        let mut interp = load_with(monoid_program(), hints);
        let expr = call_at(7, var("empty"), vec![]);
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("option-empty"));
    }

    #[test]
    fn test_alias_resolves_context() {
        let mut hints = AnalyzerHints::default();
        hints
            .aliases
            .insert("Maybe".into(), Type::app("Option", vec![Type::var("a")]));
        let mut interp = load_with(monoid_program(), hints);
        let expr = annotated(call(var("empty"), vec![]), Type::con("Maybe"));
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("option-empty"));
    }

    #[test]
    fn test_pure_never_uses_argument() {
        let items = vec![
            trait_("Applicative", &[("pure", 1)]),
            instance("Applicative", vec![Type::con("Int")], vec![tagged("pure", 1, "int")]),
            instance(
                "Applicative",
                vec![Type::app("List", vec![Type::var("a")])],
                vec![tagged("pure", 1, "list")],
            ),
        ];
        let mut interp = load(items);
        let expr = annotated(call(var("pure"), vec![int(1)]), Type::app("List", vec![Type::con("Int")]));
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("list"));

        let err = interp.call_function("pure", vec![Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Dispatch);
    }

    #[test]
    fn test_context_wraps_argument() {
        let items = vec![
            trait_("Wrap", &[("wrap", 1)]),
            instance("Wrap", vec![Type::con("Int")], vec![tagged("wrap", 1, "int")]),
            instance("Wrap", vec![Type::con("Option")], vec![tagged("wrap", 1, "option")]),
        ];
        let mut interp = load(items);
        let expr = annotated(call(var("wrap"), vec![int(1)]), Type::app("Option", vec![Type::con("Int")]));
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("option"));
        let plain = interp.call_function("wrap", vec![Value::Int(1)]).unwrap();
        assert_eq!(plain, Value::string("int"));
    }

    #[test]
    fn test_exact_argument_beats_unrelated_context() {
        let items = vec![
            trait_("Wrap", &[("wrap", 1)]),
            instance("Wrap", vec![Type::con("Int")], vec![tagged("wrap", 1, "int")]),
            instance("Wrap", vec![Type::con("Bool")], vec![tagged("wrap", 1, "bool")]),
        ];
        let mut interp = load(items);
        let expr = annotated(call(var("wrap"), vec![int(1)]), Type::con("Bool"));
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("int"));
    }

    #[test]
    fn test_annotation_beats_scored_argument() {
        let items = vec![
            trait_("Gen", &[("gen", 1)]),
            instance("Gen", vec![Type::var("a")], vec![tagged("gen", 1, "any")]),
            instance("Gen", vec![Type::con("Bool")], vec![tagged("gen", 1, "bool")]),
        ];
        let mut interp = load(items);
        let expr = annotated(call(var("gen"), vec![int(1)]), Type::con("Bool"));
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("bool"));
        // Without the annotation the variable key still matches
        let plain = interp.call_function("gen", vec![Value::Int(1)]).unwrap();
        assert_eq!(plain, Value::string("any"));
    }

    #[test]
    fn test_context_win_pushes_witness_for_body() {
        let items = vec![
            trait_("Gen", &[("gen", 1), ("seed", 0)]),
            instance(
                "Gen",
                vec![Type::con("Int")],
                vec![tagged("gen", 1, "int"), tagged("seed", 0, "int-seed")],
            ),
            instance(
                "Gen",
                vec![Type::con("Bool")],
                vec![
                    func("gen", params(&["x"]), call(var("seed"), vec![])),
                    tagged("seed", 0, "bool-seed"),
                ],
            ),
        ];
        let mut hints = AnalyzerHints::default();
        hints.node_types.insert(9, Type::con("Bool"));
        let mut interp = load_with(items, hints);
        // No instance matches String, so the node type decides
        let expr = call_at(9, var("gen"), vec![string("s")]);
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("bool-seed"));
        assert_eq!(interp.witness_depth(), 0);
        assert_eq!(interp.type_context_depth(), 0);
    }

    #[test]
    fn test_return_only_hint_skips_arguments() {
        let parse = Item::Trait(TraitDef {
            name: "Parse".into(),
            methods: vec![TraitMethod {
                name: "parse".into(),
                arity: 1,
                dispatch: Some(vec![DispatchSource::Return]),
            }],
        });
        let items = vec![
            parse,
            instance("Parse", vec![Type::con("Bool")], vec![tagged("parse", 1, "bool")]),
            instance("Parse", vec![Type::con("String")], vec![tagged("parse", 1, "string")]),
        ];
        let mut interp = load(items);
        let expr = annotated(call(var("parse"), vec![string("yes")]), Type::con("Bool"));
        assert_eq!(interp.eval_expr(&expr).unwrap(), Value::string("bool"));

        let err = interp
            .call_function("parse", vec![Value::string("yes")])
            .unwrap_err();
        assert_eq!(err.message, "no implementation of trait Parse for type String, method parse");
    }

    #[test]
    fn test_fuzzy_matches_type_variable_key() {
        let items = vec![
            trait_("Convert", &[("convert", 2)]),
            instance(
                "Convert",
                vec![Type::con("Int"), Type::var("b")],
                vec![tagged("convert", 2, "int-any")],
            ),
        ];
        let mut interp = load(items);
        // One argument type against a two-part key: no exact match possible
        let partial = interp.call_function("convert", vec![Value::Int(1)]).unwrap();
        assert!(matches!(partial, Value::Partial(_)));
        let out = interp
            .call_function("convert", vec![Value::Int(1), Value::string("s")])
            .unwrap();
        assert_eq!(out, Value::string("int-any"));
    }

    #[test]
    fn test_partial_trait_method_dispatches_on_full_arguments() {
        let items = vec![
            trait_("Convert", &[("convert", 2)]),
            instance(
                "Convert",
                vec![Type::con("Int"), Type::con("String")],
                vec![tagged("convert", 2, "int-string")],
            ),
            instance(
                "Convert",
                vec![Type::con("Int"), Type::con("Bool")],
                vec![tagged("convert", 2, "int-bool")],
            ),
        ];
        let mut interp = load(items);
        let direct = interp
            .call_function("convert", vec![Value::Int(1), Value::Bool(true)])
            .unwrap();
        assert_eq!(direct, Value::string("int-bool"));

        let partial = interp.call_function("convert", vec![Value::Int(1)]).unwrap();
        match &partial {
            Value::Partial(p) => {
                assert!(matches!(p.callee, Value::ClassMethod(_)));
                assert_eq!(p.remaining, 1);
            }
            other => panic!("expected partial, got {other}"),
        }
        let later = interp
            .apply(partial, vec![Value::Bool(true)], &CallSite::named("convert"))
            .unwrap();
        assert_eq!(later, direct);
    }

    #[test]
    fn test_user_default_is_materialized() {
        let mut hints = AnalyzerHints::default();
        hints.trait_defaults.insert(
            "Describe".into(),
            vec![Arc::new(tagged("describe", 1, "described"))],
        );
        let items = vec![
            trait_("Describe", &[("describe", 1)]),
            instance("Describe", vec![Type::con("Int")], vec![tagged("describe", 1, "int")]),
        ];
        let mut interp = load_with(items, hints);
        let key = TypeKey::single("Bool");
        assert!(interp.registry().lookup_method("Describe", &key, "describe").is_none());
        let out = interp.call_function("describe", vec![Value::Bool(false)]).unwrap();
        assert_eq!(out, Value::string("described"));
        assert!(interp.registry().lookup_method("Describe", &key, "describe").is_some());
    }

    #[test]
    fn test_builtin_default_and_missing() {
        let items = vec![trait_("Eq", &[("eq", 2), ("neq", 2)]), trait_("Size", &[("size", 1)])];
        let mut interp = load(items);
        let same = interp
            .call_function("eq", vec![Value::Int(2), Value::Int(2)])
            .unwrap();
        assert_eq!(same, Value::Bool(true));

        let err = interp
            .call_function("size", vec![Value::string("abc")])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Dispatch);
        assert_eq!(err.message, "no implementation of trait Size for type String, method size");
    }

    #[test]
    fn test_typed_parameters_filter_candidates() {
        let mut def = tagged("pick", 1, "int-only");
        def.params = vec![crate::ast::Param::typed("x", Type::con("Int"))];
        let items = vec![
            trait_("Pick", &[("pick", 1)]),
            instance("Pick", vec![Type::var("a")], vec![def]),
        ];
        let mut interp = load(items);
        assert_eq!(
            interp.call_function("pick", vec![Value::Int(3)]).unwrap(),
            Value::string("int-only")
        );
        let err = interp.call_function("pick", vec![Value::Bool(true)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Dispatch);
    }

    #[test]
    fn test_score_key() {
        let key = TypeKey(vec!["Int".into(), "b".into(), "Option".into()]);
        let types = vec!["Int".to_string(), "String".to_string()];
        assert_eq!(score_key(&key, &types, None), 2);
        assert_eq!(score_key(&key, &types, Some("Option")), 3);
        assert_eq!(score_key(&TypeKey::single("Bool"), &types, None), 0);
    }
}
