//! Components declared in the DSL itself.

use std::rc::Rc;
use tracing::debug;

use super::Interpreter;
use super::ast::{ComponentDecl, Literal, MethodDef, Stmt};
use super::env::{Environment, WeakEnvironment};
use super::tree::ResultNode;
use super::value::{ParamBundle, Value};
use crate::runtime::error::{EvalError, EvalErrorKind, EvalResult};

/// Instance of a DSL-declared component.
///
/// The instance is bound in its declaring scope, so it refers back to that
/// scope weakly. Each call rebuilds the parameter scope on top of it.
pub struct DslInstance {
    decl: Rc<ComponentDecl>,
    params: ParamBundle,
    enclosing: WeakEnvironment,
}

impl DslInstance {
    /// Instance with evaluated parameters `bundle`, declared in `enclosing`.
    pub fn new(decl: Rc<ComponentDecl>, bundle: &ParamBundle, enclosing: &Environment) -> Self {
        Self {
            decl,
            params: bundle.clone(),
            enclosing: enclosing.downgrade(),
        }
    }

    /// Component type name.
    pub fn type_name(&self) -> &str {
        &self.decl.name
    }

    /// The component declaration.
    pub fn decl(&self) -> &ComponentDecl {
        &self.decl
    }

    /// Evaluated parameters, defaults included.
    pub fn params(&self) -> &ParamBundle {
        &self.params
    }

    /// Scope the instance was declared in, unless it has been dropped.
    pub fn enclosing(&self) -> Option<Environment> {
        self.enclosing.upgrade()
    }

    /// Current value of a parameter.
    pub fn param(&self, name: &str) -> Option<Literal> {
        self.params.get(name).cloned()
    }

    /// Parameter scope nested in the declaring scope.
    fn param_scope(&self) -> Option<Environment> {
        let scope = self.enclosing()?.enclosed();
        for (name, literal) in self.params.iter() {
            scope.define(name, Value::Literal(literal.clone()));
        }
        Some(scope)
    }
}

impl Interpreter {
    /// Evaluate a DSL method body with already evaluated arguments.
    ///
    /// The body runs in a fresh scope nested in the instance's parameter
    /// scope; bindings made by the body never leak out of the call.
    pub(crate) fn eval_method_body(
        &self,
        receiver: &str,
        instance: &DslInstance,
        method: &MethodDef,
        args: Vec<Literal>,
    ) -> EvalResult<ResultNode> {
        let limit = self.config().max_call_depth;
        let depth = self.depth.get();
        if depth >= limit {
            return Err(EvalError::new(
                EvalErrorKind::RecursionLimit(limit),
                method.span,
            ));
        }

        let Some(params) = instance.param_scope() else {
            return Err(EvalError::new(
                EvalErrorKind::DetachedInstance(receiver.to_string()),
                method.span,
            ));
        };
        // Parameter names are unique per method (checked at declaration).
        let scope = params.enclosed();
        for (param, arg) in method.params.iter().zip(args) {
            scope.define(&param.name, Value::Literal(arg));
        }

        debug!(
            receiver,
            component = instance.type_name(),
            method = %method.name,
            depth,
            path = "dsl",
            "dispatch"
        );

        self.depth.set(depth + 1);
        let results = self.eval_body(&method.body, &scope);
        self.depth.set(depth);
        Ok(ResultNode::compose(results?))
    }

    fn eval_body(&self, body: &[Stmt], scope: &Environment) -> EvalResult<Vec<ResultNode>> {
        let mut results = Vec::new();
        for stmt in body {
            if let Some(node) = self.eval_stmt(stmt, scope)? {
                results.push(node);
            }
        }
        Ok(results)
    }
}
