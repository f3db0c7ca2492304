//! Error types for the SDL runtime
//!
//! Every domain gets its own `thiserror` enum and `Result` alias. Host
//! components report failures through `anyhow`, which is carried unchanged
//! as the error source.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use thiserror::Error;

use crate::interpreter::ast::{Span, TypeTag};

/// Top-level error returned by the driver entry points.
#[derive(Debug, Error)]
pub enum SdlError {
    /// Registration errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Parse errors
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Evaluation errors
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type using SdlError
pub type Result<T> = std::result::Result<T, SdlError>;

/// Component registration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A component with this name is already registered
    #[error("Component type '{0}' is already registered")]
    Duplicate(String),

    /// Registration attempted after the catalog was frozen
    #[error("Registry frozen: cannot register '{0}'")]
    Frozen(String),
}

/// Convenience result alias for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type for host constructors and host methods.
pub type ComponentResult<T> = anyhow::Result<T>;

/// Failure raised while invoking a native method.
#[derive(Debug, Error)]
pub enum NativeCallError {
    /// An argument could not be converted to the host parameter type
    #[error("argument {index}: expected {expected}, found {found}")]
    Argument {
        /// Zero-based argument position
        index: usize,
        /// Expected host type
        expected: &'static str,
        /// Literal type that was supplied
        found: &'static str,
    },

    /// The handle does not hold the type the method was registered for
    #[error("handle is not a {expected}")]
    HandleType {
        /// Expected concrete type
        expected: &'static str,
    },

    /// The handle has no reflective method of this name
    #[error("no such method")]
    NoSuchMethod,

    /// The host method itself failed
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Convenience result alias for native invocations
pub type NativeCallResult<T> = std::result::Result<T, NativeCallError>;

/// Syntax error produced by the parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct SyntaxError {
    /// Description of the problem
    pub message: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

/// Convenience result alias for parsing
pub type SyntaxResult<T> = std::result::Result<T, SyntaxError>;

/// What went wrong during evaluation.
#[derive(Debug, Error)]
pub enum EvalErrorKind {
    /// Neither the registry nor the DSL declares the type
    #[error("unknown component type: {0}")]
    UnknownComponent(String),

    /// Method not found on the receiver's type
    #[error("unknown method: {method} on {component}")]
    UnknownMethod {
        /// Component type name
        component: String,
        /// Method name as written
        method: String,
    },

    /// Name already bound in the current scope
    #[error("duplicate binding: {0}")]
    DuplicateBinding(String),

    /// Two `component` declarations share a name
    #[error("duplicate component declaration: {0}")]
    DuplicateComponent(String),

    /// A `component` declaration defines methods for a native type
    #[error("component {0} is native and cannot define DSL methods")]
    MixedComponent(String),

    /// A `component` declaration defines the same method twice
    #[error("duplicate method definition: {method} on {component}")]
    DuplicateMethod {
        /// Component type name
        component: String,
        /// Method name
        method: String,
    },

    /// The same parameter is overridden or declared twice
    #[error("duplicate parameter: {0}")]
    DuplicateParameter(String),

    /// Override names a parameter the component does not declare
    #[error("unknown parameter '{param}' for {component}")]
    UnknownParameter {
        /// Component type name
        component: String,
        /// Parameter name
        param: String,
    },

    /// Override literal does not match the declared parameter type
    #[error("parameter '{param}' expects {expected}, found {found}")]
    ParameterType {
        /// Parameter name
        param: String,
        /// Declared type
        expected: TypeTag,
        /// Supplied literal type
        found: &'static str,
    },

    /// Wrong number of arguments
    #[error("{method} expects {expected} argument(s), found {found}")]
    ArityMismatch {
        /// Method name
        method: String,
        /// Declared arity
        expected: usize,
        /// Supplied arguments
        found: usize,
    },

    /// Argument cannot be passed to the method's parameter
    #[error("argument {index} of {method}: expected {expected}, found {found}")]
    ArgumentType {
        /// Method name
        method: String,
        /// Zero-based argument position
        index: usize,
        /// Expected type
        expected: String,
        /// Supplied type
        found: &'static str,
    },

    /// Operand is not a literal
    #[error("non-literal operand: {0}")]
    NonLiteral(String),

    /// Receiver holds a result value
    #[error("non-callable receiver: {0} is a result value")]
    NotCallable(String),

    /// Receiver holds something that is neither a component nor a result
    #[error("unexpected receiver type: {0}")]
    UnexpectedReceiver(String),

    /// Receiver is not a bare identifier
    #[error("receiver must be an identifier, found {0}")]
    InvalidReceiver(String),

    /// Identifier is not bound in any enclosing scope
    #[error("unbound identifier: {0}")]
    Unbound(String),

    /// A component instance was used where a value is required
    #[error("{0} is a component instance, not a value")]
    InstanceAsValue(String),

    /// The scope a DSL instance was declared in no longer exists
    #[error("instance {0} outlived the scope it was declared in")]
    DetachedInstance(String),

    /// DSL method calls nested too deeply
    #[error("call depth limit of {0} exceeded")]
    RecursionLimit(usize),

    /// Native constructor failed
    #[error("constructing {component} failed")]
    ConstructorFailed {
        /// Component type name
        component: String,
        /// Host error
        #[source]
        source: anyhow::Error,
    },

    /// Native method failed
    #[error("{component}.{method} failed")]
    NativeFailure {
        /// Component type name
        component: String,
        /// Method name
        method: String,
        /// Host error
        #[source]
        source: anyhow::Error,
    },
}

/// Evaluation error annotated with the DSL source location.
///
/// `source()` skips the kind and yields the host error directly, so native
/// failure payloads are one hop away.
#[derive(Debug)]
pub struct EvalError {
    /// What went wrong
    pub kind: EvalErrorKind,
    /// Where in the DSL source it happened
    pub span: Span,
}

impl EvalError {
    /// Attach a location to an error kind.
    pub fn new(kind: EvalErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The error kind.
    pub fn kind(&self) -> &EvalErrorKind {
        &self.kind
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.kind)
    }
}

impl StdError for EvalError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.kind.source()
    }
}

/// Convenience result alias for evaluation
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Configuration load/save errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for configuration
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
