//! Interpreter for the System Design Language.
//!
//! Programs declare component types, instantiate them and call methods on
//! the instances. Host components come from the registry snapshot taken when
//! the interpreter is created; components declared with `component` blocks
//! are kept in a per-interpreter table. Both kinds of instance are called
//! with the same `receiver.Method(args)` syntax.

/// Abstract syntax tree definitions.
pub mod ast;
/// Method call evaluation.
pub mod call;
/// DSL-declared component instances.
pub mod dsl;
/// Lexical environments.
pub mod env;
/// Instance declaration evaluation.
pub mod instance;
/// Parser for the DSL.
pub mod parser;
/// Result trees.
pub mod tree;
/// Runtime values and parameter bundles.
pub mod value;

pub use ast::{CallExpr, ComponentDecl, Expr, InstanceDecl, Literal, Program, Span, Stmt, TypeTag};
pub use dsl::DslInstance;
pub use env::{Environment, WeakEnvironment};
pub use parser::parse_program;
pub use tree::{IntoVarState, LeafNode, OpNode, OutcomeValue, ResultNode, VarState};
pub use value::{FromLiteral, ParamBundle, Value};

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use crate::runtime::InterpreterConfig;
use crate::runtime::error::{EvalError, EvalErrorKind, EvalResult, Result};
use crate::runtime::registry::{ComponentCatalog, ComponentRegistry};

/// Evaluates programs against a registry snapshot.
pub struct Interpreter {
    registry: ComponentRegistry,
    components: HashMap<String, Rc<ComponentDecl>>,
    config: InterpreterConfig,
    depth: Cell<usize>,
}

impl Interpreter {
    /// Interpreter over the global catalog. Freezes the catalog first when
    /// `freeze_on_start` is set.
    pub fn new(config: InterpreterConfig) -> Self {
        let catalog = ComponentCatalog::global();
        if config.freeze_on_start {
            catalog.freeze();
        }
        Self::with_registry(catalog.snapshot(), config)
    }

    /// Interpreter over an explicit registry snapshot.
    pub fn with_registry(registry: ComponentRegistry, config: InterpreterConfig) -> Self {
        Self {
            registry,
            components: HashMap::new(),
            config,
            depth: Cell::new(0),
        }
    }

    /// Registry snapshot in use.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// DSL component declaration by name.
    pub fn component(&self, name: &str) -> Option<&Rc<ComponentDecl>> {
        self.components.get(name)
    }

    /// Add a `component` declaration to the DSL table.
    pub fn declare_component(&mut self, decl: ComponentDecl) -> EvalResult<()> {
        self.check_component(&decl)?;
        self.insert_component(decl);
        Ok(())
    }

    /// Validate a declaration without adding it.
    ///
    /// Parameter and method names must be unique, as must parameter names
    /// within each method. Defaults must match their declared types. Types
    /// that also exist in the registry may only declare parameters their
    /// descriptor accepts.
    pub fn check_component(&self, decl: &ComponentDecl) -> EvalResult<()> {
        if self.components.contains_key(&decl.name) {
            return Err(EvalError::new(
                EvalErrorKind::DuplicateComponent(decl.name.clone()),
                decl.span,
            ));
        }

        let native = self.registry.lookup(&decl.name);
        for (idx, param) in decl.params.iter().enumerate() {
            if decl.params[..idx].iter().any(|p| p.name == param.name) {
                return Err(EvalError::new(
                    EvalErrorKind::DuplicateParameter(param.name.clone()),
                    param.span,
                ));
            }
            if native.is_some_and(|descriptor| !descriptor.accepts_param(&param.name)) {
                return Err(EvalError::new(
                    EvalErrorKind::UnknownParameter {
                        component: decl.name.clone(),
                        param: param.name.clone(),
                    },
                    param.span,
                ));
            }
            if let Some(default) = &param.default {
                if !param.ty.accepts(default) {
                    return Err(EvalError::new(
                        EvalErrorKind::ParameterType {
                            param: param.name.clone(),
                            expected: param.ty,
                            found: default.type_name(),
                        },
                        param.span,
                    ));
                }
            }
        }

        if native.is_some() && !decl.methods.is_empty() {
            return Err(EvalError::new(
                EvalErrorKind::MixedComponent(decl.name.clone()),
                decl.span,
            ));
        }

        for (idx, method) in decl.methods.iter().enumerate() {
            if decl.methods[..idx].iter().any(|m| m.name == method.name) {
                return Err(EvalError::new(
                    EvalErrorKind::DuplicateMethod {
                        component: decl.name.clone(),
                        method: method.name.clone(),
                    },
                    method.span,
                ));
            }
            for (pos, param) in method.params.iter().enumerate() {
                if method.params[..pos].iter().any(|p| p.name == param.name) {
                    return Err(EvalError::new(
                        EvalErrorKind::DuplicateParameter(param.name.clone()),
                        method.span,
                    ));
                }
            }
        }
        Ok(())
    }

    fn insert_component(&mut self, decl: ComponentDecl) {
        debug!(
            component = %decl.name,
            params = decl.params.len(),
            methods = decl.methods.len(),
            "declared component"
        );
        self.components.insert(decl.name.clone(), Rc::new(decl));
    }

    /// Evaluate a statement. Expression statements produce a result node;
    /// declarations and `let` bind into `env` and produce nothing.
    pub fn eval_stmt(&self, stmt: &Stmt, env: &Environment) -> EvalResult<Option<ResultNode>> {
        match stmt {
            Stmt::Instance(decl) => {
                self.eval_instance(decl, env)?;
                Ok(None)
            }
            Stmt::Let(binding) => {
                if env.contains_local(&binding.name) {
                    return Err(EvalError::new(
                        EvalErrorKind::DuplicateBinding(binding.name.clone()),
                        binding.span,
                    ));
                }
                let node = self.eval_expr(&binding.value, env)?;
                env.define(&binding.name, Value::Result(node));
                Ok(None)
            }
            Stmt::Expr(expr) => self.eval_expr(expr, env).map(Some),
        }
    }

    /// Evaluate an expression to a result node.
    pub fn eval_expr(&self, expr: &Expr, env: &Environment) -> EvalResult<ResultNode> {
        match expr {
            Expr::Literal { value, .. } => Ok(LeafNode::new(VarState::from_literal(value)).into()),
            Expr::Identifier { name, span } => match env.lookup(name) {
                Some(Value::Result(node)) => Ok(node),
                Some(Value::Literal(literal)) => {
                    Ok(LeafNode::new(VarState::from_literal(&literal)).into())
                }
                Some(Value::Native(_)) | Some(Value::Dsl(_)) => Err(EvalError::new(
                    EvalErrorKind::InstanceAsValue(name.clone()),
                    *span,
                )),
                None => Err(EvalError::new(EvalErrorKind::Unbound(name.clone()), *span)),
            },
            Expr::Call(call) => self.eval_call(call, env),
        }
    }

    /// Resolve an operand that must be a literal: a literal expression or an
    /// identifier bound to an evaluated parameter.
    pub(crate) fn operand_literal(&self, expr: &Expr, env: &Environment) -> EvalResult<Literal> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Identifier { name, span } => match env.lookup(name) {
                Some(Value::Literal(literal)) => Ok(literal),
                Some(_) => Err(EvalError::new(
                    EvalErrorKind::NonLiteral(name.clone()),
                    *span,
                )),
                None => Err(EvalError::new(EvalErrorKind::Unbound(name.clone()), *span)),
            },
            Expr::Call(call) => Err(EvalError::new(
                EvalErrorKind::NonLiteral(call.to_string()),
                call.span,
            )),
        }
    }

    /// Evaluate a parsed program: every component declaration first, then
    /// the statements in source order. Declarations are all checked before
    /// any is added, so a rejected program leaves the component table as it
    /// was. Returns the results of top-level
    /// expression statements.
    pub fn run_program(
        &mut self,
        program: &Program,
        env: &Environment,
    ) -> EvalResult<Vec<ResultNode>> {
        let decls: Vec<&ComponentDecl> = program.components().collect();
        for (idx, decl) in decls.iter().enumerate() {
            self.check_component(decl)?;
            if decls[..idx].iter().any(|earlier| earlier.name == decl.name) {
                return Err(EvalError::new(
                    EvalErrorKind::DuplicateComponent(decl.name.clone()),
                    decl.span,
                ));
            }
        }
        for decl in decls {
            self.insert_component(decl.clone());
        }
        let mut results = Vec::new();
        for stmt in program.statements() {
            if let Some(node) = self.eval_stmt(stmt, env)? {
                results.push(node);
            }
        }
        Ok(results)
    }

    /// Parse and evaluate DSL source.
    pub fn run_source(&mut self, source: &str, env: &Environment) -> Result<Vec<ResultNode>> {
        let program = parse_program(source)?;
        Ok(self.run_program(&program, env)?)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::register_defaults;

    fn interpreter() -> Interpreter {
        let catalog = ComponentCatalog::new();
        register_defaults(&catalog).unwrap();
        Interpreter::with_registry(catalog.snapshot(), InterpreterConfig::default())
    }

    #[test]
    fn let_binds_result_and_identifier_returns_it() {
        let mut interp = interpreter();
        let env = Environment::new();
        let results = interp
            .run_source("instance d: Disk {}\nlet r = d.Read();\nr", &env)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(env.lookup("r"), Some(Value::Result(_))));
        assert!(results[0].as_leaf().is_some());
    }

    #[test]
    fn instance_identifier_is_not_a_value() {
        let mut interp = interpreter();
        let env = Environment::new();
        let err = interp.run_source("instance d: Disk {}\nd", &env).unwrap_err();
        assert!(err.to_string().contains("d is a component instance"));
    }

    #[test]
    fn default_type_mismatch_rejected_at_declaration() {
        let mut interp = interpreter();
        let env = Environment::new();
        let err = interp
            .run_source("component Q { param Size: int = \"big\"; }", &env)
            .unwrap_err();
        assert!(err.to_string().contains("parameter 'Size' expects int, found string"));
    }

    #[test]
    fn native_type_cannot_gain_dsl_methods() {
        let mut interp = interpreter();
        let env = Environment::new();
        let err = interp
            .run_source("component Disk { method Spin() { } }", &env)
            .unwrap_err();
        assert!(err.to_string().contains("cannot define DSL methods"));
    }

    #[test]
    fn let_rebinding_leaves_first_binding() {
        let mut interp = interpreter();
        let env = Environment::new();
        let err = interp.run_source("let x = 1;\nlet x = 2;", &env).unwrap_err();
        assert!(err.to_string().contains("duplicate binding: x"));
        assert!(matches!(
            interp.eval_expr(
                &Expr::Identifier { name: "x".into(), span: Span::default() },
                &env
            ),
            Ok(ResultNode::Leaf(leaf)) if leaf.state == VarState::from_literal(&Literal::Int(1))
        ));
    }
}
