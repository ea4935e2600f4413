//! Token definitions for the C++ front end

use crate::utils::Span;
use serde::Serialize;
use std::fmt;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text; for error tokens, the diagnostic
    pub text: String,
    pub span: Span,
    /// Parsed value of numeric literals
    pub value: Option<NumericValue>,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self { kind, text: text.into(), span, value: None }
    }

    pub fn eof(span: Span) -> Self {
        Self::new(TokenKind::Eof, "", span)
    }

    pub fn with_value(mut self, value: NumericValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn column(&self) -> u32 {
        self.span.column
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Error => write!(f, "invalid token ({})", self.text),
            _ if self.kind.is_directive() => write!(f, "directive `#{}`", self.kind.describe()),
            _ => write!(f, "`{}`", self.text),
        }
    }
}

/// Numeric payload of integer and float literals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum NumericValue {
    Int(i64),
    Float(f64),
}

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // ============ Special ============
    /// End of file
    Eof,
    /// Lexical error; the token text carries the diagnostic
    Error,

    // ============ Identifiers and Literals ============
    Ident,
    IntLit,
    FloatLit,
    StringLit,
    CharLit,

    // ============ Primitive types ============
    Int,
    Void,
    Char,
    Float,
    Double,
    Bool,

    // ============ Aggregates ============
    Class,
    Struct,
    Enum,
    Union,

    // ============ Type qualifiers ============
    Const,
    Unsigned,
    Signed,
    Short,
    Long,

    // ============ Declaration specifiers ============
    Static,
    Extern,
    Register,
    Inline,
    Virtual,
    Explicit,
    Friend,

    // ============ Access specifiers ============
    Private,
    Public,
    Protected,

    // ============ Control flow ============
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Try,
    Catch,
    Throw,

    // ============ Namespaces and templates ============
    Namespace,
    Using,
    Template,
    Typedef,

    // ============ Expression keywords ============
    New,
    Delete,
    StaticCast,
    DynamicCast,
    ConstCast,
    ReinterpretCast,
    Typeid,
    Sizeof,
    True,
    False,
    Nullptr,

    // ============ Standard containers ============
    Vector,
    Map,
    Set,
    List,
    Deque,
    UnorderedMap,
    UnorderedSet,
    Multimap,
    Multiset,
    Stack,
    Queue,
    PriorityQueue,
    Bitset,
    Array,
    ForwardList,
    Pair,
    Tuple,
    String,
    Optional,
    Variant,
    Any,
    StdSpan,
    Valarray,

    // ============ C library ============
    Printf,
    Scanf,
    Malloc,
    Free,
    Memcpy,
    Strcpy,
    Strlen,

    // ============ Streams ============
    Cin,
    Cout,
    Cerr,
    Clog,
    Getline,

    // ============ Algorithms ============
    Sort,
    Find,
    Count,
    Copy,
    Reverse,
    Accumulate,
    AllOf,
    AnyOf,
    NoneOf,
    LowerBound,
    UpperBound,

    // ============ Math ============
    Abs,
    Fabs,
    Pow,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Floor,
    Ceil,
    Round,
    Rand,
    Srand,
    Exit,

    // ============ Strings ============
    Stoi,
    Stof,
    Stod,
    ToString,
    Strcmp,
    Strncmp,
    Strchr,
    Strrchr,
    Strstr,
    Strcat,
    Strncat,

    // ============ Memory ============
    Allocate,
    Deallocate,

    // ============ Time ============
    Time,
    Clock,
    Difftime,
    Strftime,
    Localtime,
    Gmtime,

    // ============ Concurrency ============
    Thread,
    Mutex,
    LockGuard,
    UniqueLock,
    Async,
    Future,
    Promise,

    // ============ Exception types ============
    Exception,
    LogicError,
    RuntimeError,

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// &
    Amp,
    /// |
    Pipe,
    /// ^
    Caret,
    /// ~
    Tilde,
    /// !
    Bang,
    /// =
    Assign,
    /// <
    Lt,
    /// >
    Gt,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// +=
    PlusEq,
    /// -=
    MinusEq,
    /// *=
    StarEq,
    /// /=
    SlashEq,
    /// %=
    PercentEq,
    /// &=
    AmpEq,
    /// |=
    PipeEq,
    /// ^=
    CaretEq,
    /// <<
    Shl,
    /// >>
    Shr,
    /// <<=
    ShlEq,
    /// >>=
    ShrEq,
    /// ==
    EqEq,
    /// !=
    NotEq,
    /// <=
    LtEq,
    /// >=
    GtEq,
    /// &&
    AndAnd,
    /// ||
    OrOr,
    /// ?
    Question,
    /// ->
    Arrow,

    // ============ Delimiters ============
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    /// ...
    Ellipsis,
    Colon,
    /// ::
    ColonColon,
    /// # outside a directive line
    Hash,

    // ============ Preprocessor directives ============
    PpInclude,
    PpDefine,
    PpUndef,
    PpIfdef,
    PpIfndef,
    PpIf,
    PpElif,
    PpElse,
    PpEndif,
    PpPragma,
    PpUnknown,
}

impl TokenKind {
    /// Try to convert an identifier to a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        use TokenKind::*;
        let kind = match s {
            "int" => Int,
            "void" => Void,
            "char" => Char,
            "float" => Float,
            "double" => Double,
            "bool" => Bool,
            "class" => Class,
            "struct" => Struct,
            "enum" => Enum,
            "union" => Union,
            "const" => Const,
            "unsigned" => Unsigned,
            "signed" => Signed,
            "short" => Short,
            "long" => Long,
            "static" => Static,
            "extern" => Extern,
            "register" => Register,
            "inline" => Inline,
            "virtual" => Virtual,
            "explicit" => Explicit,
            "friend" => Friend,
            "private" => Private,
            "public" => Public,
            "protected" => Protected,
            "if" => If,
            "else" => Else,
            "for" => For,
            "while" => While,
            "do" => Do,
            "switch" => Switch,
            "case" => Case,
            "default" => Default,
            "break" => Break,
            "continue" => Continue,
            "return" => Return,
            "goto" => Goto,
            "try" => Try,
            "catch" => Catch,
            "throw" => Throw,
            "namespace" => Namespace,
            "using" => Using,
            "template" => Template,
            "typedef" => Typedef,
            "new" => New,
            "delete" => Delete,
            "static_cast" => StaticCast,
            "dynamic_cast" => DynamicCast,
            "const_cast" => ConstCast,
            "reinterpret_cast" => ReinterpretCast,
            "typeid" => Typeid,
            "sizeof" => Sizeof,
            "true" => True,
            "false" => False,
            "nullptr" => Nullptr,
            // Containers
            "vector" => Vector,
            "map" => Map,
            "set" => Set,
            "list" => List,
            "deque" => Deque,
            "unordered_map" => UnorderedMap,
            "unordered_set" => UnorderedSet,
            "multimap" => Multimap,
            "multiset" => Multiset,
            "stack" => Stack,
            "queue" => Queue,
            "priority_queue" => PriorityQueue,
            "bitset" => Bitset,
            "array" => Array,
            "forward_list" => ForwardList,
            "pair" => Pair,
            "tuple" => Tuple,
            "string" => String,
            "optional" => Optional,
            "variant" => Variant,
            "any" => Any,
            "span" => StdSpan,
            "valarray" => Valarray,
            // C library
            "printf" => Printf,
            "scanf" => Scanf,
            "malloc" => Malloc,
            "free" => Free,
            "memcpy" => Memcpy,
            "strcpy" => Strcpy,
            "strlen" => Strlen,
            // Streams
            "cin" => Cin,
            "cout" => Cout,
            "cerr" => Cerr,
            "clog" => Clog,
            "getline" => Getline,
            // Algorithms
            "sort" => Sort,
            "find" => Find,
            "count" => Count,
            "copy" => Copy,
            "reverse" => Reverse,
            "accumulate" => Accumulate,
            "all_of" => AllOf,
            "any_of" => AnyOf,
            "none_of" => NoneOf,
            "lower_bound" => LowerBound,
            "upper_bound" => UpperBound,
            // Math
            "abs" => Abs,
            "fabs" => Fabs,
            "pow" => Pow,
            "sqrt" => Sqrt,
            "sin" => Sin,
            "cos" => Cos,
            "tan" => Tan,
            "floor" => Floor,
            "ceil" => Ceil,
            "round" => Round,
            "rand" => Rand,
            "srand" => Srand,
            "exit" => Exit,
            // Strings
            "stoi" => Stoi,
            "stof" => Stof,
            "stod" => Stod,
            "to_string" => ToString,
            "strcmp" => Strcmp,
            "strncmp" => Strncmp,
            "strchr" => Strchr,
            "strrchr" => Strrchr,
            "strstr" => Strstr,
            "strcat" => Strcat,
            "strncat" => Strncat,
            // Memory
            "allocate" => Allocate,
            "deallocate" => Deallocate,
            // Time
            "time" => Time,
            "clock" => Clock,
            "difftime" => Difftime,
            "strftime" => Strftime,
            "localtime" => Localtime,
            "gmtime" => Gmtime,
            // Concurrency
            "thread" => Thread,
            "mutex" => Mutex,
            "lock_guard" => LockGuard,
            "unique_lock" => UniqueLock,
            "async" => Async,
            "future" => Future,
            "promise" => Promise,
            // Exceptions
            "exception" => Exception,
            "logic_error" => LogicError,
            "runtime_error" => RuntimeError,
            _ => return None,
        };
        Some(kind)
    }

    /// Primitive type keywords
    pub fn is_primitive_type(&self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Void
                | TokenKind::Char
                | TokenKind::Float
                | TokenKind::Double
                | TokenKind::Bool
        )
    }

    /// `const unsigned signed short long`
    pub fn is_type_qualifier(&self) -> bool {
        matches!(
            self,
            TokenKind::Const
                | TokenKind::Unsigned
                | TokenKind::Signed
                | TokenKind::Short
                | TokenKind::Long
        )
    }

    /// Standard container type names
    pub fn is_container(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Vector | Map | Set | List | Deque | UnorderedMap | UnorderedSet | Multimap
                | Multiset | Stack | Queue | PriorityQueue | Bitset | Array | ForwardList
                | Pair | Tuple | String | Optional | Variant | Any | StdSpan | Valarray
        )
    }

    /// Standard-library function, stream and class names. These are
    /// ordinary identifiers in the source language, so the parser accepts
    /// them wherever a name is expected.
    pub fn is_library_function(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Printf | Scanf | Malloc | Free | Memcpy | Strcpy | Strlen
                | Cin | Cout | Cerr | Clog | Getline
                | Sort | Find | Count | Copy | Reverse | Accumulate | AllOf | AnyOf | NoneOf
                | LowerBound | UpperBound
                | Abs | Fabs | Pow | Sqrt | Sin | Cos | Tan | Floor | Ceil | Round | Rand
                | Srand | Exit
                | Stoi | Stof | Stod | ToString | Strcmp | Strncmp | Strchr | Strrchr
                | Strstr | Strcat | Strncat
                | Allocate | Deallocate
                | Time | Clock | Difftime | Strftime | Localtime | Gmtime
                | Thread | Mutex | LockGuard | UniqueLock | Async | Future | Promise
                | Exception | LogicError | RuntimeError
        )
    }

    /// Anything usable as a name: identifiers plus library names
    pub fn is_name(&self) -> bool {
        *self == TokenKind::Ident || self.is_container() || self.is_library_function()
    }

    /// Preprocessor directive markers
    pub fn is_directive(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            PpInclude | PpDefine | PpUndef | PpIfdef | PpIfndef | PpIf | PpElif | PpElse
                | PpEndif | PpPragma | PpUnknown
        )
    }

    /// Short description used in diagnostics
    pub fn describe(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "end of file",
            Error => "invalid token",
            Ident => "identifier",
            IntLit => "integer literal",
            FloatLit => "float literal",
            StringLit => "string literal",
            CharLit => "character literal",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            Bang => "!",
            Assign => "=",
            Lt => "<",
            Gt => ">",
            PlusPlus => "++",
            MinusMinus => "--",
            PlusEq => "+=",
            MinusEq => "-=",
            StarEq => "*=",
            SlashEq => "/=",
            PercentEq => "%=",
            AmpEq => "&=",
            PipeEq => "|=",
            CaretEq => "^=",
            Shl => "<<",
            Shr => ">>",
            ShlEq => "<<=",
            ShrEq => ">>=",
            EqEq => "==",
            NotEq => "!=",
            LtEq => "<=",
            GtEq => ">=",
            AndAnd => "&&",
            OrOr => "||",
            Question => "?",
            Arrow => "->",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Semicolon => ";",
            Comma => ",",
            Dot => ".",
            Ellipsis => "...",
            Colon => ":",
            ColonColon => "::",
            Hash => "#",
            PpInclude => "include",
            PpDefine => "define",
            PpUndef => "undef",
            PpIfdef => "ifdef",
            PpIfndef => "ifndef",
            PpIf => "if",
            PpElif => "elif",
            PpElse => "else",
            PpEndif => "endif",
            PpPragma => "pragma",
            PpUnknown => "unknown directive",
            _ => "keyword",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.describe() {
            "keyword" => write!(f, "{:?}", self),
            text if text.len() <= 3 && !text.chars().all(char::is_alphabetic) => {
                write!(f, "`{}`", text)
            }
            text => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_is_exact() {
        assert_eq!(TokenKind::keyword_from_str("int"), Some(TokenKind::Int));
        assert_eq!(TokenKind::keyword_from_str("unordered_map"), Some(TokenKind::UnorderedMap));
        assert_eq!(TokenKind::keyword_from_str("Int"), None);
        assert_eq!(TokenKind::keyword_from_str("integer"), None);
    }

    #[test]
    fn test_library_names_are_names() {
        assert!(TokenKind::Sort.is_name());
        assert!(TokenKind::Vector.is_name());
        assert!(TokenKind::Ident.is_name());
        assert!(!TokenKind::Int.is_name());
        assert!(!TokenKind::Return.is_name());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TokenKind::Semicolon.to_string(), "`;`");
        assert_eq!(TokenKind::Ident.to_string(), "identifier");
        assert_eq!(TokenKind::Return.to_string(), "Return");
    }
}
