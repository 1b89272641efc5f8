//! AST node types for the Cinder language.
//!
//! Every node carries a [`Span`] for error reporting.
//! Large recursive types are boxed to keep enum sizes reasonable.
//! Member and statement lists preserve source order.

use crate::Span;
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A chunk parsed as the body of the implicit host method.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementUnit {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A chunk parsed as a declaration unit: usings, namespaces and types.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub usings: Vec<UsingDirective>,
    pub members: Vec<NamespaceMember>,
    pub span: Span,
}

/// `using A.B;` or `using X = A.B;`
#[derive(Debug, Clone, PartialEq)]
pub struct UsingDirective {
    pub alias: Option<Ident>,
    pub target: QualifiedName,
    pub span: Span,
}

/// Something that may appear directly inside a namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceMember {
    Namespace(NamespaceDecl),
    Type(TypeDecl),
}

/// `namespace A.B { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    pub name: QualifiedName,
    pub members: Vec<NamespaceMember>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers & Names
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A dotted name: `System.Math`, `N.Inner.Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedName {
    pub parts: Vec<Ident>,
    pub span: Span,
}

impl QualifiedName {
    pub fn new(parts: Vec<Ident>, span: Span) -> Self {
        Self { parts, span }
    }

    /// The segments as plain strings.
    pub fn segments(&self) -> Vec<String> {
        self.parts.iter().map(|p| p.name.clone()).collect()
    }

    /// The last segment.
    pub fn last(&self) -> Option<&Ident> {
        self.parts.last()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", part.name)?;
        }
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Type References
// ══════════════════════════════════════════════════════════════════════════════

/// A type as written in source.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub span: Span,
}

impl TypeRef {
    pub fn new(kind: TypeRefKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefKind {
    Bool,
    Int,
    Long,
    /// `double` and `float` (both 64-bit).
    Double,
    String,
    Object,
    Void,
    /// `var`: inferred from the initializer.
    Var,
    Named(QualifiedName),
}

impl fmt::Display for TypeRefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "string"),
            Self::Object => write!(f, "object"),
            Self::Void => write!(f, "void"),
            Self::Var => write!(f, "var"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Type Declarations
// ══════════════════════════════════════════════════════════════════════════════

/// `[Attr] public class Name : IFace { members }`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    /// Attribute names; parsed and otherwise ignored.
    pub attributes: Vec<QualifiedName>,
    pub modifiers: Vec<Modifier>,
    pub kind: TypeKind,
    pub name: Ident,
    /// Implemented interfaces.
    pub bases: Vec<QualifiedName>,
    pub members: Vec<MemberDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Struct => write!(f, "struct"),
            Self::Interface => write!(f, "interface"),
            Self::Enum => write!(f, "enum"),
        }
    }
}

/// Declaration modifiers. Accessibility is parsed but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Internal,
    Static,
    Abstract,
    Sealed,
    Readonly,
    Const,
    Virtual,
    Override,
}

/// Returns `true` if `modifiers` contains `m`.
pub fn has_modifier(modifiers: &[Modifier], m: Modifier) -> bool {
    modifiers.contains(&m)
}

/// A member of a type declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberDecl {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    EnumMember(EnumMemberDecl),
    NestedType(TypeDecl),
}

/// `static int a = 1, b;`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
    pub span: Span,
}

/// One `name [= init]` inside a field or local declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub name: Ident,
    pub init: Option<Expr>,
    pub span: Span,
}

/// `int Add(int a, int b) { ... }` or `abstract void Run();`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub modifiers: Vec<Modifier>,
    pub return_type: TypeRef,
    pub name: Ident,
    pub params: Vec<Param>,
    /// `None` for abstract and interface methods.
    pub body: Option<Block>,
    pub span: Span,
}

/// `Name(params) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub modifiers: Vec<Modifier>,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

/// `Red` or `Red = 4` inside an enum.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDecl {
    pub name: Ident,
    pub value: Option<Expr>,
    pub span: Span,
}

/// A method or constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: TypeRef,
    pub name: Ident,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// `{ stmts }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `;`
    Empty,
    Block(Block),
    /// `int x = 1, y;` / `var s = "a";` / `const int K = 3;`
    LocalDecl(LocalDecl),
    /// A bare expression.
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Throw(Option<Expr>),
}

/// A local variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub is_const: bool,
    pub ty: TypeRef,
    pub declarators: Vec<VarDeclarator>,
    pub span: Span,
}

/// The first clause of a `for` statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Decl(LocalDecl),
    Exprs(Vec<Expr>),
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Uses `Box` for recursive variants.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// `42`, `42L`
    IntLit(i64),
    /// `3.14`, `2d`, `1.5f`
    DoubleLit(f64),
    StringLit(String),
    BoolLit(bool),
    Null,
    This,

    // ── Names & Access ──
    /// `x`, `Console`
    Name(Ident),
    /// `expr.name`
    Member {
        target: Box<Expr>,
        name: Ident,
    },
    /// `callee(args...)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `new T(args...)`
    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },

    // ── Operators ──
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `a = b`, `a += b`
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
    /// `++a`, `a--`
    IncDec {
        target: Box<Expr>,
        increment: bool,
        prefix: bool,
    },
    /// `c ? a : b`
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    // ── Grouping ──
    Paren(Box<Expr>),
}

// ── Binary Operators ──────────────────────────────────────────────────────────

/// Binary operators (in precedence order, lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `??`
    Coalesce,
    // Logical
    Or,
    And,
    // Equality
    Eq,
    NotEq,
    // Relational
    Less,
    LessEq,
    Greater,
    GreaterEq,
    // Additive
    Add,
    Sub,
    // Multiplicative
    Mul,
    Div,
    Rem,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Coalesce => "??",
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        };
        write!(f, "{s}")
    }
}

// ── Unary Operators ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `!x`
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neg => write!(f, "-"),
            Self::Plus => write!(f, "+"),
            Self::Not => write!(f, "!"),
        }
    }
}

// ── Assignment Operators ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any.
    pub fn binary_op(self) -> Option<BinOp> {
        match self {
            Self::Assign => None,
            Self::Add => Some(BinOp::Add),
            Self::Sub => Some(BinOp::Sub),
            Self::Mul => Some(BinOp::Mul),
            Self::Div => Some(BinOp::Div),
            Self::Rem => Some(BinOp::Rem),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::point(1, 1))
    }

    #[test]
    fn test_qualified_name_display() {
        let name = QualifiedName::new(vec![ident("System"), ident("Math")], Span::point(1, 1));
        assert_eq!(name.to_string(), "System.Math");
        assert_eq!(name.segments(), vec!["System".to_string(), "Math".to_string()]);
        assert_eq!(name.last().map(|i| i.name.as_str()), Some("Math"));
    }

    #[test]
    fn test_compound_assign_maps_to_binop() {
        assert_eq!(AssignOp::Assign.binary_op(), None);
        assert_eq!(AssignOp::Add.binary_op(), Some(BinOp::Add));
        assert_eq!(AssignOp::Rem.binary_op(), Some(BinOp::Rem));
    }

    #[test]
    fn test_has_modifier() {
        let mods = [Modifier::Public, Modifier::Static];
        assert!(has_modifier(&mods, Modifier::Static));
        assert!(!has_modifier(&mods, Modifier::Readonly));
    }
}
