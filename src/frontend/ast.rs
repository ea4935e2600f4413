//! Abstract Syntax Tree definitions for the C++ front end
//!
//! Every composite node owns its children. The tree is handed to an
//! external code generator, so all nodes serialize.

use serde::Serialize;

use crate::utils::Span;

/// A complete translation unit
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub decls: Vec<Decl>,
    pub span: Span,
}

// ==================== Declarations ====================

/// Declarations, at file scope or nested in namespaces, classes and blocks
#[derive(Debug, Clone, Serialize)]
pub enum Decl {
    Function(Function),
    Variable(VarDecl),
    Class(ClassDef),
    Struct(ClassDef),
    Union(ClassDef),
    Enum(EnumDef),
    Namespace(NamespaceDef),
    Template(TemplateDecl),
    Typedef(TypedefDecl),
    Using(UsingDecl),
    /// Preprocessor directive preserved for the consumer
    Directive(Directive),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Function(f) => f.span,
            Decl::Variable(v) => v.span,
            Decl::Class(c) | Decl::Struct(c) | Decl::Union(c) => c.span,
            Decl::Enum(e) => e.span,
            Decl::Namespace(n) => n.span,
            Decl::Template(t) => t.span,
            Decl::Typedef(t) => t.span,
            Decl::Using(u) => u.span(),
            Decl::Directive(d) => d.span,
        }
    }
}

/// Storage-class and function specifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Specifier {
    Static,
    Extern,
    Register,
    Inline,
    Virtual,
    Explicit,
    Friend,
}

/// Function definition or prototype. Constructors and destructors have no
/// return type.
#[derive(Debug, Clone, Serialize)]
pub struct Function {
    pub specs: Vec<Specifier>,
    pub ret_type: Option<Type>,
    /// Possibly qualified (`Point::length`), `~Name` for destructors
    pub name: Ident,
    pub params: Vec<Param>,
    /// Constructor member initializers (`: x(0), y(0)`)
    pub initializers: Vec<MemberInit>,
    pub is_const: bool,
    pub is_override: bool,
    /// `= 0`
    pub is_pure: bool,
    /// `None` for a prototype
    pub body: Option<Block>,
    pub span: Span,
}

/// Function parameter
#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub ty: Type,
    pub name: Option<Ident>,
    pub default: Option<Expr>,
    pub span: Span,
}

/// Constructor member initializer
#[derive(Debug, Clone, Serialize)]
pub struct MemberInit {
    pub name: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Variable declaration: one base type, one or more declarators
#[derive(Debug, Clone, Serialize)]
pub struct VarDecl {
    pub specs: Vec<Specifier>,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

/// A single declared name with its complete type
#[derive(Debug, Clone, Serialize)]
pub struct Declarator {
    pub name: Ident,
    pub ty: Type,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Member access level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    Public,
    Private,
    Protected,
}

/// Class, struct or union body
#[derive(Debug, Clone, Serialize)]
pub struct ClassDef {
    pub name: Ident,
    pub bases: Vec<BaseClass>,
    pub members: Vec<Member>,
    /// Forward declaration (`class Foo;`)
    pub is_forward: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseClass {
    pub access: Option<Access>,
    pub is_virtual: bool,
    pub ty: Type,
    pub span: Span,
}

/// Class member with the access level in effect where it was declared
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub access: Access,
    pub decl: Decl,
}

/// Enum definition
#[derive(Debug, Clone, Serialize)]
pub struct EnumDef {
    pub name: Option<Ident>,
    /// `enum class`
    pub scoped: bool,
    pub underlying: Option<Type>,
    pub enumerators: Vec<Enumerator>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct Enumerator {
    pub name: Ident,
    pub value: Option<Expr>,
    pub span: Span,
}

/// Namespace definition; anonymous namespaces have no name
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceDef {
    pub name: Option<Ident>,
    pub decls: Vec<Decl>,
    pub span: Span,
}

/// `template <...>` wrapping a declaration
#[derive(Debug, Clone, Serialize)]
pub struct TemplateDecl {
    pub params: Vec<TemplateParam>,
    pub decl: Box<Decl>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum TemplateParam {
    /// `typename T` / `class T`
    Type {
        name: Ident,
        default: Option<Type>,
        span: Span,
    },
    /// `int N`
    Value {
        ty: Type,
        name: Ident,
        default: Option<Expr>,
        span: Span,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TypedefDecl {
    pub ty: Type,
    pub name: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum UsingDecl {
    /// `using namespace std;`
    Namespace { name: Ident, span: Span },
    /// `using Alias = Type;`
    Alias { name: Ident, ty: Type, span: Span },
    /// `using std::cout;`
    Name { name: Ident, span: Span },
}

impl UsingDecl {
    pub fn span(&self) -> Span {
        match self {
            UsingDecl::Namespace { span, .. }
            | UsingDecl::Alias { span, .. }
            | UsingDecl::Name { span, .. } => *span,
        }
    }
}

/// Preprocessor directive
#[derive(Debug, Clone, Serialize)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Directive arguments (header spelling, macro definition, condition)
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DirectiveKind {
    Include,
    Define,
    Undef,
    Ifdef,
    Ifndef,
    If,
    Elif,
    Else,
    Endif,
    Pragma,
    Unknown,
}

// ==================== Statements ====================

/// Code block
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    Block(Block),
    /// Local declaration
    Decl(Decl),
    /// Expression statement
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    /// for (init; cond; step)
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    /// for (T x : range)
    RangeFor {
        ty: Type,
        name: Ident,
        range: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
        span: Span,
    },
    Switch {
        cond: Expr,
        cases: Vec<SwitchCase>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Break { span: Span },
    Continue { span: Span },
    Goto { label: Ident, span: Span },
    /// `name:`
    Label { name: Ident, span: Span },
    Try {
        body: Block,
        handlers: Vec<CatchClause>,
        span: Span,
    },
    Throw {
        value: Option<Expr>,
        span: Span,
    },
    /// Empty statement (;)
    Empty { span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block(b) => b.span,
            Stmt::Decl(d) => d.span(),
            Stmt::Expr(e) => e.span(),
            Stmt::If { span, .. }
            | Stmt::For { span, .. }
            | Stmt::RangeFor { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Goto { span, .. }
            | Stmt::Label { span, .. }
            | Stmt::Try { span, .. }
            | Stmt::Throw { span, .. }
            | Stmt::Empty { span } => *span,
        }
    }
}

/// One `case`/`default` arm of a switch with the statements that follow it
#[derive(Debug, Clone, Serialize)]
pub struct SwitchCase {
    /// `None` for `default`
    pub value: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatchClause {
    /// `None` for `catch (...)`
    pub param: Option<Param>,
    pub body: Block,
    pub span: Span,
}

// ==================== Expressions ====================

/// Expression
#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    Literal(Literal),
    Ident(Ident),
    /// Binary operation, including assignments
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        span: Span,
    },
    /// cond ? a : b
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    /// expr.member / expr->member
    Member {
        expr: Box<Expr>,
        member: Ident,
        arrow: bool,
        span: Span,
    },
    /// expr[index]
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// scope::name
    Scope {
        scope: Box<Expr>,
        name: Ident,
        span: Span,
    },
    /// { a, b, c }
    InitList {
        elements: Vec<Expr>,
        span: Span,
    },
    Cast {
        kind: CastKind,
        ty: Type,
        expr: Box<Expr>,
        span: Span,
    },
    /// Temporary of a template type: `T<A>(args)` / `T<A>{args}`
    Construct {
        ty: Type,
        args: Vec<Expr>,
        braced: bool,
        span: Span,
    },
    /// new T(args) / new T[size]
    New {
        ty: Type,
        args: Vec<Expr>,
        array_size: Option<Box<Expr>>,
        span: Span,
    },
    /// delete p / delete[] p
    Delete {
        expr: Box<Expr>,
        array: bool,
        span: Span,
    },
    Lambda {
        captures: Vec<Capture>,
        params: Vec<Param>,
        ret_type: Option<Type>,
        body: Block,
        span: Span,
    },
    Typeid {
        operand: Box<TypeOrExpr>,
        span: Span,
    },
    SizeOf {
        operand: Box<TypeOrExpr>,
        span: Span,
    },
    // Library calls with a dedicated shape
    Sort {
        first: Box<Expr>,
        last: Box<Expr>,
        comparator: Option<Box<Expr>>,
        span: Span,
    },
    Find {
        first: Box<Expr>,
        last: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Accumulate {
        first: Box<Expr>,
        last: Box<Expr>,
        init: Box<Expr>,
        span: Span,
    },
    Printf {
        format: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Scanf {
        format: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Malloc {
        size: Box<Expr>,
        span: Span,
    },
    Free {
        ptr: Box<Expr>,
        span: Span,
    },
    Abs {
        value: Box<Expr>,
        span: Span,
    },
    Getline {
        stream: Box<Expr>,
        target: Box<Expr>,
        delimiter: Option<Box<Expr>>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span(),
            Expr::Ident(ident) => ident.span,
            Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Member { span, .. }
            | Expr::Index { span, .. }
            | Expr::Scope { span, .. }
            | Expr::InitList { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Construct { span, .. }
            | Expr::New { span, .. }
            | Expr::Delete { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::Typeid { span, .. }
            | Expr::SizeOf { span, .. }
            | Expr::Sort { span, .. }
            | Expr::Find { span, .. }
            | Expr::Accumulate { span, .. }
            | Expr::Printf { span, .. }
            | Expr::Scanf { span, .. }
            | Expr::Malloc { span, .. }
            | Expr::Free { span, .. }
            | Expr::Abs { span, .. }
            | Expr::Getline { span, .. } => *span,
        }
    }
}

/// Operand of `sizeof` / `typeid`
#[derive(Debug, Clone, Serialize)]
pub enum TypeOrExpr {
    Type(Type),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CastKind {
    Static,
    Dynamic,
    Const,
    Reinterpret,
    /// (T)expr
    CStyle,
}

/// Lambda capture
#[derive(Debug, Clone, Serialize)]
pub enum Capture {
    /// [=]
    DefaultByValue,
    /// [&]
    DefaultByRef,
    ByValue(Ident),
    ByRef(Ident),
}

/// Literal value. String and character literals keep escapes verbatim.
#[derive(Debug, Clone, Serialize)]
pub enum Literal {
    Int(i64, Span),
    /// Integer literal outside the `i64` range, kept as written
    BigInt(String, Span),
    Float(f64, Span),
    String(String, Span),
    Char(String, Span),
    Bool(bool, Span),
    Null(Span),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::Int(_, s) => *s,
            Literal::BigInt(_, s) => *s,
            Literal::Float(_, s) => *s,
            Literal::String(_, s) => *s,
            Literal::Char(_, s) => *s,
            Literal::Bool(_, s) => *s,
            Literal::Null(s) => *s,
        }
    }
}

/// Identifier. After macro substitution `name` holds the replacement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    // Assignment
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Unary plus (+)
    Plus,
    /// Logical not (!)
    Not,
    /// Bitwise not (~)
    BitNot,
    /// Dereference (*)
    Deref,
    /// Address-of (&)
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

// ==================== Types ====================

/// `const unsigned signed short long`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeQualifier {
    Const,
    Unsigned,
    Signed,
    Short,
    Long,
}

/// Type representation
#[derive(Debug, Clone, Serialize)]
pub enum Type {
    /// Builtin, user or library type name, possibly `::`-qualified
    Named(String, Span),
    /// Qualifiers applied to an inner type (`const unsigned int`)
    Qualified {
        qualifiers: Vec<TypeQualifier>,
        inner: Box<Type>,
        span: Span,
    },
    /// `base<args...>`
    Template {
        base: String,
        args: Vec<TemplateArg>,
        span: Span,
    },
    Pointer(Box<Type>, Span),
    Reference(Box<Type>, Span),
    /// `T&&`
    RvalueReference(Box<Type>, Span),
    /// `T name[N]`
    Array {
        elem: Box<Type>,
        size: Option<Box<Expr>>,
        span: Span,
    },
}

impl Type {
    pub fn span(&self) -> Span {
        match self {
            Type::Named(_, s) => *s,
            Type::Qualified { span, .. } => *span,
            Type::Template { span, .. } => *span,
            Type::Pointer(_, s) => *s,
            Type::Reference(_, s) => *s,
            Type::RvalueReference(_, s) => *s,
            Type::Array { span, .. } => *span,
        }
    }

    /// Name of the outermost named or template type, looking through
    /// qualifiers, pointers and references
    pub fn base_name(&self) -> &str {
        match self {
            Type::Named(name, _) => name,
            Type::Template { base, .. } => base,
            Type::Qualified { inner, .. }
            | Type::Pointer(inner, _)
            | Type::Reference(inner, _)
            | Type::RvalueReference(inner, _) => inner.base_name(),
            Type::Array { elem, .. } => elem.base_name(),
        }
    }
}

/// Template argument: a type, or a constant expression (`array<int, 4>`)
#[derive(Debug, Clone, Serialize)]
pub enum TemplateArg {
    Type(Type),
    Expr(Expr),
}
