use serde::{Deserialize, Serialize};
use std::fmt;

use crate::outcome::Duration;

/// Source location of a construct (1-based line and column, byte offsets).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// Line of the first character.
    pub line: usize,
    /// Column of the first character.
    pub column: usize,
}

impl Span {
    /// Construct a span.
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Literal values accepted in overrides and arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Literal {
    /// Signed integer literal.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// Boolean literal.
    Bool(bool),
    /// String literal.
    String(String),
    /// Duration literal (`10ms`, `2s`, ...).
    Duration(Duration),
}

impl Literal {
    /// Short name of the literal's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "bool",
            Literal::String(_) => "string",
            Literal::Duration(_) => "duration",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{}", value),
            Literal::Float(value) => write!(f, "{:?}", value),
            Literal::Bool(value) => write!(f, "{}", value),
            Literal::String(value) => write!(f, "{:?}", value),
            Literal::Duration(value) => write!(f, "{}", value),
        }
    }
}

/// Declared type of a component parameter or method parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `duration`
    Duration,
}

impl TypeTag {
    /// Parse a type tag keyword.
    pub fn from_keyword(text: &str) -> Option<Self> {
        match text {
            "int" => Some(TypeTag::Int),
            "float" => Some(TypeTag::Float),
            "bool" => Some(TypeTag::Bool),
            "string" => Some(TypeTag::String),
            "duration" => Some(TypeTag::Duration),
            _ => None,
        }
    }

    /// Whether a literal may be bound to a slot of this type.
    ///
    /// Integer literals widen to `float`; no other conversions happen.
    pub fn accepts(self, literal: &Literal) -> bool {
        matches!(
            (self, literal),
            (TypeTag::Int, Literal::Int(_))
                | (TypeTag::Float, Literal::Float(_))
                | (TypeTag::Float, Literal::Int(_))
                | (TypeTag::Bool, Literal::Bool(_))
                | (TypeTag::String, Literal::String(_))
                | (TypeTag::Duration, Literal::Duration(_))
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::String => "string",
            TypeTag::Duration => "duration",
        };
        f.write_str(text)
    }
}

/// Expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value.
    Literal {
        /// The value.
        value: Literal,
        /// Location.
        span: Span,
    },
    /// A bare identifier.
    Identifier {
        /// Identifier text.
        name: String,
        /// Location.
        span: Span,
    },
    /// `receiver.Method(args)`
    Call(CallExpr),
}

impl Expr {
    /// Location of the expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. } | Expr::Identifier { span, .. } => *span,
            Expr::Call(call) => call.span,
        }
    }

    /// The literal value, if this expression is a literal.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Literal { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => write!(f, "{}", value),
            Expr::Identifier { name, .. } => f.write_str(name),
            Expr::Call(call) => write!(f, "{}", call),
        }
    }
}

/// Method invocation on a receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    /// Receiver expression (a bare identifier in well-formed programs).
    pub receiver: Box<Expr>,
    /// Method name, matched exactly.
    pub method: String,
    /// Argument expressions, evaluated left to right.
    pub args: Vec<Expr>,
    /// Location of the whole call.
    pub span: Span,
}

impl fmt::Display for CallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.receiver, self.method)?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

/// `name = expr` inside an instance declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    /// Parameter being overridden.
    pub name: String,
    /// Value expression.
    pub value: Expr,
    /// Location of the override.
    pub span: Span,
}

/// `instance name: TypeName { overrides }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDecl {
    /// Name bound in the environment.
    pub name: String,
    /// Component type to instantiate.
    pub type_name: String,
    /// Overrides in source order.
    pub overrides: Vec<Override>,
    /// Location of the declaration.
    pub span: Span,
}

/// `let name = expr`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetStmt {
    /// Name bound in the environment.
    pub name: String,
    /// Value expression.
    pub value: Expr,
    /// Location of the statement.
    pub span: Span,
}

/// Statements allowed at top level and inside method bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Instance declaration.
    Instance(InstanceDecl),
    /// Result binding.
    Let(LetStmt),
    /// Expression evaluated for its result.
    Expr(Expr),
}

impl Stmt {
    /// Location of the statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Instance(decl) => decl.span,
            Stmt::Let(stmt) => stmt.span,
            Stmt::Expr(expr) => expr.span(),
        }
    }
}

/// `param name: type [= default];`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: TypeTag,
    /// Default value used when no override is supplied.
    pub default: Option<Literal>,
    /// Location.
    pub span: Span,
}

/// Formal parameter of a DSL method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParam {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: TypeTag,
}

/// `method Name(params) { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    /// Method name.
    pub name: String,
    /// Formal parameters.
    pub params: Vec<MethodParam>,
    /// Body statements.
    pub body: Vec<Stmt>,
    /// Location.
    pub span: Span,
}

/// `component TypeName { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDecl {
    /// Component type name.
    pub name: String,
    /// Declared parameters.
    pub params: Vec<ParamDecl>,
    /// Methods defined in the DSL (empty for native-backed components).
    pub methods: Vec<MethodDef>,
    /// Location.
    pub span: Span,
}

impl ComponentDecl {
    /// Find a declared parameter.
    pub fn param(&self, name: &str) -> Option<&ParamDecl> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Find a method by exact name.
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// Top-level program items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    /// Component declaration.
    Component(ComponentDecl),
    /// Statement.
    Stmt(Stmt),
}

/// Parsed program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Items in source order.
    pub items: Vec<Item>,
    /// Original source text, retained for error reporting.
    pub source: String,
}

impl Program {
    /// Construct a program from parsed items.
    pub fn new(source: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            source: source.into(),
            items,
        }
    }

    /// Component declarations in source order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Component(decl) => Some(decl),
            Item::Stmt(_) => None,
        })
    }

    /// Statements in source order.
    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.items.iter().filter_map(|item| match item {
            Item::Stmt(stmt) => Some(stmt),
            Item::Component(_) => None,
        })
    }
}
