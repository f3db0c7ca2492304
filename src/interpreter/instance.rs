use std::rc::Rc;
use tracing::debug;

use super::Interpreter;
use super::ast::{ComponentDecl, InstanceDecl};
use super::dsl::DslInstance;
use super::env::Environment;
use super::value::{ParamBundle, Value};
use crate::runtime::error::{EvalError, EvalErrorKind, EvalResult};
use crate::runtime::registry::NativeHandle;

impl Interpreter {
    /// Evaluate `instance name: TypeName { overrides }` and bind the new
    /// instance in `env`.
    ///
    /// Overrides are evaluated in source order. The registry is consulted
    /// before the DSL component table. Nothing is bound, and no constructor
    /// runs, if any check fails.
    pub fn eval_instance(&self, decl: &InstanceDecl, env: &Environment) -> EvalResult<Value> {
        let mut bundle = ParamBundle::new();
        for item in &decl.overrides {
            let literal = self.operand_literal(&item.value, env)?;
            if !bundle.insert(item.name.clone(), literal) {
                return Err(EvalError::new(
                    EvalErrorKind::DuplicateParameter(item.name.clone()),
                    item.span,
                ));
            }
        }

        let native = self.registry().lookup(&decl.type_name).cloned();
        let declared = self.component(&decl.type_name).cloned();
        if native.is_none() && declared.is_none() {
            return Err(EvalError::new(
                EvalErrorKind::UnknownComponent(decl.type_name.clone()),
                decl.span,
            ));
        }

        if let Some(descriptor) = &native {
            if let Some(item) = decl
                .overrides
                .iter()
                .find(|item| !descriptor.accepts_param(&item.name))
            {
                return Err(EvalError::new(
                    EvalErrorKind::UnknownParameter {
                        component: decl.type_name.clone(),
                        param: item.name.clone(),
                    },
                    item.span,
                ));
            }
        }
        if let Some(component) = &declared {
            apply_declaration(component, decl, &mut bundle)?;
        }

        if env.contains_local(&decl.name) {
            return Err(EvalError::new(
                EvalErrorKind::DuplicateBinding(decl.name.clone()),
                decl.span,
            ));
        }

        let value = match (native, declared) {
            (Some(descriptor), _) => {
                let handle = NativeHandle::construct(descriptor, &bundle).map_err(|err| {
                    EvalError::new(
                        EvalErrorKind::ConstructorFailed {
                            component: decl.type_name.clone(),
                            source: err,
                        },
                        decl.span,
                    )
                })?;
                debug!(
                    name = %decl.name,
                    component = %decl.type_name,
                    id = %handle.id(),
                    kind = "native",
                    "instance created"
                );
                Value::Native(handle)
            }
            (None, Some(component)) => {
                debug!(
                    name = %decl.name,
                    component = %decl.type_name,
                    kind = "dsl",
                    "instance created"
                );
                Value::Dsl(Rc::new(DslInstance::new(component, &bundle, env)))
            }
            (None, None) => {
                return Err(EvalError::new(
                    EvalErrorKind::UnknownComponent(decl.type_name.clone()),
                    decl.span,
                ));
            }
        };

        env.define(&decl.name, value.clone());
        Ok(value)
    }
}

/// Check overrides against a `component` declaration and fill in defaults.
fn apply_declaration(
    component: &ComponentDecl,
    decl: &InstanceDecl,
    bundle: &mut ParamBundle,
) -> EvalResult<()> {
    for item in &decl.overrides {
        let Some(param) = component.param(&item.name) else {
            return Err(EvalError::new(
                EvalErrorKind::UnknownParameter {
                    component: component.name.clone(),
                    param: item.name.clone(),
                },
                item.span,
            ));
        };
        if let Some(literal) = bundle.get(&item.name) {
            if !param.ty.accepts(literal) {
                return Err(EvalError::new(
                    EvalErrorKind::ParameterType {
                        param: item.name.clone(),
                        expected: param.ty,
                        found: literal.type_name(),
                    },
                    item.span,
                ));
            }
        }
    }

    for param in &component.params {
        if let Some(default) = &param.default {
            if !bundle.contains(&param.name) {
                bundle.insert(param.name.clone(), default.clone());
            }
        }
    }
    Ok(())
}
