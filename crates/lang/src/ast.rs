//! Abstract syntax tree for the manifest language
//!
//! The parser produces this tree and never mutates it afterwards; the
//! evaluator consumes it by reference. Every node carries the position of
//! its opening token so later stages can report located errors.

/// Position of a token in the manifest source (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// One segment of a double-quoted string.
///
/// `"a ${name}"` lexes to `[Lit("a "), Var("name")]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrSeg {
    /// Literal text with escapes already resolved
    Lit(String),
    /// A `$var` / `${var}` interpolation point
    Var(String),
}

/// Equality operators allowed in `if` conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
}

/// An expression; evaluates to a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Double-quoted string, interpolated at evaluation time
    Str { segs: Vec<StrSeg>, span: Span },
    /// Single-quoted string, taken literally
    Raw { value: String, span: Span },
    /// Bare word, treated as a string value
    Word { value: String, span: Span },
    /// Numeric literal, kept exactly as written (`755` stays `"755"`)
    Number { value: String, span: Span },
    Bool { value: bool, span: Span },
    /// `$name`
    Variable { name: String, span: Span },
    Array { items: Vec<Expr>, span: Span },
    /// `Type["title"]` reference to a declared resource
    ResourceRef {
        type_name: String,
        title: Box<Expr>,
        span: Span,
    },
    /// `control ? { match => result, ..., default => result }`
    Selector {
        control: Box<Expr>,
        arms: Vec<SelectorArm>,
        span: Span,
    },
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    /// Position of the expression's first token.
    pub fn span(&self) -> Span {
        match self {
            Expr::Str { span, .. }
            | Expr::Raw { span, .. }
            | Expr::Word { span, .. }
            | Expr::Number { span, .. }
            | Expr::Bool { span, .. }
            | Expr::Variable { span, .. }
            | Expr::Array { span, .. }
            | Expr::ResourceRef { span, .. }
            | Expr::Selector { span, .. }
            | Expr::Compare { span, .. } => *span,
        }
    }
}

/// A match pattern in a case arm or selector arm.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// The literal `default` arm; matches anything
    Default,
    Expr(Expr),
}

/// One `pattern => result` arm of a selector.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorArm {
    pub pattern: Pattern,
    pub result: Expr,
}

/// A `name => value` pair in a resource body or defaults declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

/// One `titles: params` body inside a resource declaration.
///
/// `file { "/a", "/b": mode => 755 }` has one body with two titles;
/// bodies are separated by `;`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBody {
    pub titles: Vec<Expr>,
    pub params: Vec<Param>,
}

/// `class name [inherits parent] { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A formal argument of a define, with an optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct DefineArg {
    pub name: String,
    pub default: Option<Expr>,
}

/// `define name(arg, arg = default) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct DefineDecl {
    pub name: String,
    pub args: Vec<DefineArg>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `if cond { ... } [else { ... }]`
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_body: Vec<Stmt>,
    pub else_body: Option<Vec<Stmt>>,
    pub span: Span,
}

/// One arm of a case statement; several patterns may share a body.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub patterns: Vec<Pattern>,
    pub body: Vec<Stmt>,
}

/// `case control { v1: {...} v2, v3: {...} default: {...} }`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseStmt {
    pub control: Expr,
    pub arms: Vec<CaseArm>,
    pub span: Span,
}

/// A top-level or block statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `type { title: param => value, ... }`
    Resource {
        type_name: String,
        bodies: Vec<InstanceBody>,
        span: Span,
    },
    /// `Type { param => value }` — type-level defaults, no title
    Defaults {
        type_name: String,
        params: Vec<Param>,
        span: Span,
    },
    Class(ClassDecl),
    Define(DefineDecl),
    /// `include name[, name]`
    Include { names: Vec<String>, span: Span },
    /// `$name = expr`
    Assign {
        name: String,
        value: Expr,
        span: Span,
    },
    If(IfStmt),
    Case(CaseStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Resource { span, .. }
            | Stmt::Defaults { span, .. }
            | Stmt::Include { span, .. }
            | Stmt::Assign { span, .. } => *span,
            Stmt::Class(c) => c.span,
            Stmt::Define(d) => d.span,
            Stmt::If(i) => i.span,
            Stmt::Case(c) => c.span,
        }
    }
}

/// A parsed manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// The source name the manifest was parsed under
    pub source_name: String,
    pub stmts: Vec<Stmt>,
}
