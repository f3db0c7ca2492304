use tracing::{debug, trace};

use super::Interpreter;
use super::ast::{CallExpr, Expr, Literal};
use super::dsl::DslInstance;
use super::env::Environment;
use super::tree::{LeafNode, ResultNode};
use super::value::Value;
use crate::runtime::error::{EvalError, EvalErrorKind, EvalResult, NativeCallError};
use crate::runtime::registry::{MethodEntry, NativeHandle};

/// How a native method was resolved.
enum Dispatch<'a> {
    Table(&'a MethodEntry),
    Reflective,
}

impl Dispatch<'_> {
    fn path(&self) -> &'static str {
        match self {
            Dispatch::Table(_) => "table",
            Dispatch::Reflective => "reflective",
        }
    }
}

impl Interpreter {
    /// Evaluate `receiver.Method(args)`.
    ///
    /// The receiver must be an identifier. Dispatch depends on what it is
    /// bound to; result values are never callable. The environment is not
    /// modified.
    pub fn eval_call(&self, call: &CallExpr, env: &Environment) -> EvalResult<ResultNode> {
        let Expr::Identifier { name, .. } = call.receiver.as_ref() else {
            return Err(EvalError::new(
                EvalErrorKind::InvalidReceiver(call.receiver.to_string()),
                call.span,
            ));
        };
        let receiver = env.lookup(name).ok_or_else(|| {
            EvalError::new(EvalErrorKind::Unbound(name.clone()), call.span)
        })?;

        match receiver {
            Value::Native(handle) => self.call_native(name, &handle, call, env),
            Value::Dsl(instance) => self.call_dsl(name, &instance, call, env),
            Value::Result(_) => Err(EvalError::new(
                EvalErrorKind::NotCallable(name.clone()),
                call.span,
            )),
            other @ Value::Literal(_) => Err(EvalError::new(
                EvalErrorKind::UnexpectedReceiver(other.describe()),
                call.span,
            )),
        }
    }

    fn eval_args(&self, call: &CallExpr, env: &Environment) -> EvalResult<Vec<Literal>> {
        call.args
            .iter()
            .map(|arg| self.operand_literal(arg, env))
            .collect()
    }

    fn check_arity(&self, call: &CallExpr, expected: usize) -> EvalResult<()> {
        if call.args.len() == expected {
            return Ok(());
        }
        Err(EvalError::new(
            EvalErrorKind::ArityMismatch {
                method: call.method.clone(),
                expected,
                found: call.args.len(),
            },
            call.span,
        ))
    }

    fn call_native(
        &self,
        receiver: &str,
        handle: &NativeHandle,
        call: &CallExpr,
        env: &Environment,
    ) -> EvalResult<ResultNode> {
        let component = handle.type_name();
        let (dispatch, arity) = match handle.descriptor().method(&call.method) {
            Some(entry) => (Dispatch::Table(entry), entry.arity()),
            None => match handle.component().method_arity(&call.method) {
                Some(arity) => (Dispatch::Reflective, arity),
                None => {
                    return Err(EvalError::new(
                        EvalErrorKind::UnknownMethod {
                            component: component.to_string(),
                            method: call.method.clone(),
                        },
                        call.span,
                    ));
                }
            },
        };
        self.check_arity(call, arity)?;
        let args = self.eval_args(call, env)?;

        debug!(
            receiver,
            component,
            method = %call.method,
            path = dispatch.path(),
            "dispatch"
        );
        let outcome = match dispatch {
            Dispatch::Table(entry) => entry.invoke(handle.component(), &args),
            Dispatch::Reflective => handle.component().invoke(&call.method, &args),
        };

        let state = outcome.map_err(|err| native_error(err, component, call))?;
        trace!(receiver, method = %call.method, result = %state, "native result");
        Ok(LeafNode::new(state).into())
    }

    fn call_dsl(
        &self,
        receiver: &str,
        instance: &DslInstance,
        call: &CallExpr,
        env: &Environment,
    ) -> EvalResult<ResultNode> {
        let Some(method) = instance.decl().method(&call.method) else {
            return Err(EvalError::new(
                EvalErrorKind::UnknownMethod {
                    component: instance.type_name().to_string(),
                    method: call.method.clone(),
                },
                call.span,
            ));
        };
        self.check_arity(call, method.params.len())?;
        let args = self.eval_args(call, env)?;

        for (index, (param, arg)) in method.params.iter().zip(&args).enumerate() {
            if !param.ty.accepts(arg) {
                return Err(EvalError::new(
                    EvalErrorKind::ArgumentType {
                        method: call.method.clone(),
                        index,
                        expected: param.ty.to_string(),
                        found: arg.type_name(),
                    },
                    call.args[index].span(),
                ));
            }
        }

        self.eval_method_body(receiver, instance, method, args)
    }
}

fn native_error(err: NativeCallError, component: &str, call: &CallExpr) -> EvalError {
    let kind = match err {
        NativeCallError::Argument {
            index,
            expected,
            found,
        } => EvalErrorKind::ArgumentType {
            method: call.method.clone(),
            index,
            expected: expected.to_string(),
            found,
        },
        NativeCallError::NoSuchMethod => EvalErrorKind::UnknownMethod {
            component: component.to_string(),
            method: call.method.clone(),
        },
        NativeCallError::Failed(source) => EvalErrorKind::NativeFailure {
            component: component.to_string(),
            method: call.method.clone(),
            source,
        },
        other @ NativeCallError::HandleType { .. } => EvalErrorKind::NativeFailure {
            component: component.to_string(),
            method: call.method.clone(),
            source: anyhow::Error::new(other),
        },
    };
    EvalError::new(kind, call.span)
}
