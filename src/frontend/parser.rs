//! Parser for the C++ front end
//!
//! Recursive descent over a forward-only token stream. Only the current
//! and the previous token are held. A declaration is told apart from an
//! expression by the token that follows its type-like head: a name means a
//! declaration, and after the declared name `(` means function while
//! anything else means variable.

use std::collections::HashSet;
use std::mem;

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::preprocessor::Diagnostic;
use crate::frontend::symbols::SymbolTable;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// Standard class templates that are not keywords but always name types
const STD_CLASS_TEMPLATES: &[&str] = &[
    "greater",
    "greater_equal",
    "less",
    "less_equal",
    "equal_to",
    "not_equal_to",
    "plus",
    "minus",
    "multiplies",
    "divides",
    "hash",
    "shared_ptr",
    "unique_ptr",
    "weak_ptr",
    "initializer_list",
];

/// Where a declaration appears
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum DeclContext {
    /// File or namespace scope
    File,
    /// Class body
    Class,
    /// Function body
    Block,
}

/// Possibly `::`-qualified name at the head of a declaration or expression
pub(super) struct Path {
    segments: Vec<Token>,
}

impl Path {
    pub(super) fn text(&self) -> String {
        let names: Vec<&str> = self.segments.iter().map(|t| t.text.as_str()).collect();
        names.join("::")
    }

    pub(super) fn span(&self) -> Span {
        self.segments
            .iter()
            .map(|t| t.span)
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_default()
    }

    fn is_single(&self) -> bool {
        self.segments.len() == 1
    }

    /// Last segment is a standard container name
    pub(super) fn names_container(&self) -> bool {
        self.segments.last().map_or(false, |t| t.kind.is_container())
    }

    pub(super) fn into_ident(self) -> Ident {
        Ident::new(self.text(), self.span())
    }

    /// `a::b::c` as nested scope expressions
    pub(super) fn into_expr(self) -> Expr {
        let mut segments = self.segments.into_iter();
        let Some(first) = segments.next() else {
            return Expr::Ident(Ident::new("", Span::dummy()));
        };
        segments.fold(Expr::Ident(Ident::new(first.text, first.span)), |scope, token| {
            Expr::Scope {
                span: scope.span().merge(&token.span),
                scope: Box::new(scope),
                name: Ident::new(token.text, token.span),
            }
        })
    }
}

/// First clause of a `for` header
enum ForInit {
    Stmt(Stmt),
    Range { ty: Type, name: Ident },
}

/// The parser
pub struct Parser {
    lexer: Lexer,
    pub(super) current: Token,
    pub(super) previous: Token,
    /// Directives read while advancing, emitted at the next item boundary
    pending: Vec<Directive>,
    pub(super) symbols: SymbolTable,
    /// Names declared as types: classes, enums, typedefs, template parameters
    pub(super) type_names: HashSet<String>,
}

impl Parser {
    /// Create a new parser pulling tokens from a lexer
    pub fn new(lexer: Lexer) -> Self {
        let mut parser = Self {
            lexer,
            current: Token::eof(Span::dummy()),
            previous: Token::eof(Span::dummy()),
            pending: Vec::new(),
            symbols: SymbolTable::new(),
            type_names: HashSet::new(),
        };
        parser.current = parser.next_significant();
        parser
    }

    pub fn from_source(source: &str) -> Self {
        Self::new(Lexer::new(source))
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Preprocessor warnings reported so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.lexer.diagnostics()
    }

    pub fn into_parts(self) -> (SymbolTable, Vec<Diagnostic>) {
        let diagnostics = self.lexer.diagnostics().to_vec();
        (self.symbols, diagnostics)
    }

    // ==================== Helper Methods ====================

    /// Next non-directive token; directives are queued
    fn next_significant(&mut self) -> Token {
        loop {
            let token = self.lexer.next_token();
            if !token.kind.is_directive() {
                return token;
            }
            self.pending.push(Directive {
                kind: directive_kind(token.kind),
                text: token.text,
                span: token.span,
            });
        }
    }

    pub(super) fn kind(&self) -> TokenKind {
        self.current.kind
    }

    pub(super) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Identifier with the given spelling (`override`, `typename`, ...)
    pub(super) fn check_contextual(&self, word: &str) -> bool {
        self.current.kind == TokenKind::Ident && self.current.text == word
    }

    pub(super) fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Move to the next token and return the one just consumed
    pub(super) fn advance(&mut self) -> Token {
        let next = self.next_significant();
        let consumed = mem::replace(&mut self.current, next);
        self.previous = consumed.clone();
        consumed
    }

    pub(super) fn consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    /// Span from `start` through the previous token
    pub(super) fn span_from(&self, start: Span) -> Span {
        start.merge(&self.previous.span)
    }

    fn lexical_error(&self) -> Option<Error> {
        (self.current.kind == TokenKind::Error).then(|| Error::Lexical {
            message: self.current.text.clone(),
            span: self.current.span,
        })
    }

    pub(super) fn unexpected(&self, expected: impl Into<String>) -> Error {
        self.lexical_error().unwrap_or_else(|| Error::UnexpectedToken {
            expected: expected.into(),
            got: self.current.to_string(),
            span: self.current.span,
        })
    }

    pub(super) fn expected_ident(&self) -> Error {
        self.lexical_error().unwrap_or_else(|| Error::ExpectedIdent {
            got: self.current.to_string(),
            span: self.current.span,
        })
    }

    pub(super) fn expected_type(&self) -> Error {
        self.lexical_error().unwrap_or_else(|| Error::ExpectedType {
            got: self.current.to_string(),
            span: self.current.span,
        })
    }

    pub(super) fn expected_expr(&self) -> Error {
        self.lexical_error().unwrap_or_else(|| Error::ExpectedExpr {
            got: self.current.to_string(),
            span: self.current.span,
        })
    }

    fn expect_name(&mut self) -> Result<Token> {
        if self.kind().is_name() {
            Ok(self.advance())
        } else {
            Err(self.expected_ident())
        }
    }

    pub(super) fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.expect_name()?;
        Ok(Ident::new(token.text, token.span))
    }

    /// `a`, `a::b`, `a::~b`
    pub(super) fn parse_path(&mut self) -> Result<Path> {
        let mut segments = vec![self.expect_name()?];
        while self.consume(TokenKind::ColonColon) {
            if self.check(TokenKind::Tilde) {
                let tilde = self.advance();
                let name = self.expect_name()?;
                segments.push(Token::new(
                    TokenKind::Ident,
                    format!("~{}", name.text),
                    tilde.span.merge(&name.span),
                ));
            } else {
                segments.push(self.expect_name()?);
            }
        }
        Ok(Path { segments })
    }

    /// `auto`, a declared type, or a standard class template (with or
    /// without `std::`)
    pub(super) fn is_type_name(&self, name: &str) -> bool {
        let unqualified = name.strip_prefix("std::").unwrap_or(name);
        name == "auto"
            || self.type_names.contains(name)
            || STD_CLASS_TEMPLATES.contains(&unqualified)
    }

    /// Close a template argument list. A `>>` is split: one `>` is
    /// consumed and the other becomes the current token.
    pub(super) fn close_template(&mut self) -> Result<()> {
        match self.kind() {
            TokenKind::Gt => {
                self.advance();
                Ok(())
            }
            TokenKind::Shr => {
                let span = self.current.span;
                let first = Span::new(span.start, span.start + 1, span.line, span.column);
                let second = Span::new(span.start + 1, span.end, span.line, span.column + 1);
                self.previous = Token::new(TokenKind::Gt, ">", first);
                self.current = Token::new(TokenKind::Gt, ">", second);
                Ok(())
            }
            _ => Err(self.unexpected(TokenKind::Gt.to_string())),
        }
    }

    fn take_directives(&mut self) -> Vec<Decl> {
        self.pending.drain(..).map(Decl::Directive).collect()
    }

    // ==================== Declarations ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        let start = self.current.span;
        let decls = self.parse_items(&DeclContext::File, TokenKind::Eof)?;
        Ok(Program {
            decls,
            span: start.merge(&self.current.span),
        })
    }

    /// Declarations up to (not including) `end`
    fn parse_items(&mut self, ctx: &DeclContext, end: TokenKind) -> Result<Vec<Decl>> {
        let mut decls = Vec::new();
        loop {
            decls.extend(self.take_directives());
            if self.check(end) || self.is_at_end() {
                break;
            }
            if let Some(decl) = self.parse_item(ctx)? {
                decls.push(decl);
            }
        }
        Ok(decls)
    }

    /// One declaration at file, namespace or class scope. A stray `;`
    /// yields `None`.
    fn parse_item(&mut self, ctx: &DeclContext) -> Result<Option<Decl>> {
        let start = self.current.span;
        if self.consume(TokenKind::Semicolon) {
            return Ok(None);
        }
        match self.parse_declaration(ctx, start)? {
            Stmt::Decl(decl) => Ok(Some(decl)),
            stmt => Err(Error::UnexpectedToken {
                expected: "declaration".to_string(),
                got: "statement".to_string(),
                span: stmt.span(),
            }),
        }
    }

    /// Declaration, or in a block an expression statement or label
    fn parse_declaration(&mut self, ctx: &DeclContext, start: Span) -> Result<Stmt> {
        match self.kind() {
            TokenKind::Namespace => return Ok(Stmt::Decl(self.parse_namespace()?)),
            TokenKind::Template => return Ok(Stmt::Decl(self.parse_template(ctx)?)),
            TokenKind::Typedef => return Ok(Stmt::Decl(self.parse_typedef()?)),
            TokenKind::Using => return Ok(Stmt::Decl(self.parse_using()?)),
            _ => {}
        }

        let specs = self.parse_specifiers();
        let in_block = *ctx == DeclContext::Block;
        match self.kind() {
            TokenKind::Class | TokenKind::Struct | TokenKind::Union => {
                self.parse_class(specs, start).map(Stmt::Decl)
            }
            TokenKind::Enum => self.parse_enum(specs, start).map(Stmt::Decl),
            TokenKind::Tilde if !in_block => {
                let tilde = self.advance();
                let name = self.parse_ident()?;
                let name = Ident::new(format!("~{}", name.name), tilde.span.merge(&name.span));
                let function = self.parse_function_rest(specs, None, name, start)?;
                Ok(Stmt::Decl(Decl::Function(function)))
            }
            kind if kind.is_primitive_type() || kind.is_type_qualifier() => {
                let base = self.parse_base_type()?;
                self.parse_typed_declaration(specs, base, start).map(Stmt::Decl)
            }
            kind if kind.is_name() => self.parse_named(specs, start, ctx),
            _ if !specs.is_empty() => Err(self.expected_type()),
            _ if in_block => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn parse_specifiers(&mut self) -> Vec<Specifier> {
        let mut specs = Vec::new();
        loop {
            let spec = match self.kind() {
                TokenKind::Static => Specifier::Static,
                TokenKind::Extern => Specifier::Extern,
                TokenKind::Register => Specifier::Register,
                TokenKind::Inline => Specifier::Inline,
                TokenKind::Virtual => Specifier::Virtual,
                TokenKind::Explicit => Specifier::Explicit,
                TokenKind::Friend => Specifier::Friend,
                _ => return specs,
            };
            self.advance();
            specs.push(spec);
        }
    }

    /// Whether the token after a name head makes it a type
    pub(super) fn declares_after(&self, kind: TokenKind, known_type: bool, in_block: bool) -> bool {
        match kind {
            kind if kind.is_name() => true,
            TokenKind::Const => true,
            TokenKind::Lt | TokenKind::Star | TokenKind::Amp | TokenKind::AndAnd => {
                known_type || !in_block
            }
            _ => false,
        }
    }

    /// Declaration or statement that starts with a name
    fn parse_named(&mut self, specs: Vec<Specifier>, start: Span, ctx: &DeclContext) -> Result<Stmt> {
        let path = self.parse_path()?;
        let in_block = *ctx == DeclContext::Block;
        let known_type = path.names_container() || self.is_type_name(&path.text());

        match self.kind() {
            TokenKind::Colon if in_block && path.is_single() && specs.is_empty() => {
                self.advance();
                let name = path.into_ident();
                Ok(Stmt::Label {
                    name,
                    span: self.span_from(start),
                })
            }
            // Constructor, or a destructor defined out of line
            TokenKind::LParen if !in_block => {
                let name = path.into_ident();
                let function = self.parse_function_rest(specs, None, name, start)?;
                Ok(Stmt::Decl(Decl::Function(function)))
            }
            kind if self.declares_after(kind, known_type, in_block) => {
                let base = self.type_from_path(path)?;
                self.parse_typed_declaration(specs, base, start).map(Stmt::Decl)
            }
            _ if in_block && specs.is_empty() => {
                let expr = self.parse_expr_from(path.into_expr())?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
            _ => Err(self.unexpected("declaration")),
        }
    }

    /// Declaration whose base type has been parsed; the next tokens are
    /// the first declarator
    fn parse_typed_declaration(&mut self, specs: Vec<Specifier>, base: Type, start: Span) -> Result<Decl> {
        let ty = self.parse_declarator_suffix(base.clone());
        let name = self.parse_declarator_name()?;
        if self.check(TokenKind::LParen) {
            let function = self.parse_function_rest(specs, Some(ty), name, start)?;
            return Ok(Decl::Function(function));
        }
        let var = self.finish_variable(specs, base, ty, name, start)?;
        Ok(Decl::Variable(var))
    }

    /// Declared name, including `Class::member` and `operator<<` forms
    fn parse_declarator_name(&mut self) -> Result<Ident> {
        let mut name = self.parse_path()?.into_ident();
        if name.name == "operator" || name.name.ends_with("::operator") {
            let symbol = match self.kind() {
                TokenKind::LParen => {
                    self.advance();
                    self.expect(TokenKind::RParen)?;
                    "()".to_string()
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.expect(TokenKind::RBracket)?;
                    "[]".to_string()
                }
                TokenKind::Eof | TokenKind::Error | TokenKind::LBrace | TokenKind::Semicolon => {
                    return Err(self.unexpected("operator"));
                }
                kind if kind.is_name() => return Err(self.unexpected("operator")),
                _ => self.advance().text,
            };
            name.name.push_str(&symbol);
            name.span = name.span.merge(&self.previous.span);
        }
        Ok(name)
    }

    /// Remaining declarators of a variable declaration, through the `;`
    fn finish_variable(
        &mut self,
        specs: Vec<Specifier>,
        base: Type,
        ty: Type,
        name: Ident,
        start: Span,
    ) -> Result<VarDecl> {
        let mut declarators = vec![self.parse_declarator_rest(ty, name)?];
        while self.consume(TokenKind::Comma) {
            let ty = self.parse_declarator_suffix(base.clone());
            let name = self.parse_ident()?;
            declarators.push(self.parse_declarator_rest(ty, name)?);
        }
        self.expect(TokenKind::Semicolon)?;

        Ok(VarDecl {
            specs,
            declarators,
            span: self.span_from(start),
        })
    }

    /// Array dimensions and initializer of one declarator
    fn parse_declarator_rest(&mut self, ty: Type, name: Ident) -> Result<Declarator> {
        let ty = self.parse_array_suffix(ty)?;
        let init = if self.consume(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else if self.check(TokenKind::LBrace) {
            Some(self.parse_init_list()?)
        } else {
            None
        };
        self.symbols.declare(name.name.clone(), ty.clone());

        Ok(Declarator {
            span: name.span.merge(&self.previous.span),
            name,
            ty,
            init,
        })
    }

    /// `[N]` suffixes; `int a[2][3]` is an array of 2 arrays of 3
    fn parse_array_suffix(&mut self, ty: Type) -> Result<Type> {
        let mut dims = Vec::new();
        while self.consume(TokenKind::LBracket) {
            let size = if self.check(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(TokenKind::RBracket)?;
            dims.push((size, self.previous.span));
        }
        Ok(dims.into_iter().rev().fold(ty, |elem, (size, end)| Type::Array {
            span: elem.span().merge(&end),
            elem: Box::new(elem),
            size,
        }))
    }

    /// Parameter list, suffixes and body of a function whose name has been
    /// parsed
    fn parse_function_rest(
        &mut self,
        specs: Vec<Specifier>,
        ret_type: Option<Type>,
        name: Ident,
        start: Span,
    ) -> Result<Function> {
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let mut is_const = false;
        let mut is_override = false;
        loop {
            if self.consume(TokenKind::Const) {
                is_const = true;
            } else if self.check_contextual("override") {
                self.advance();
                is_override = true;
            } else if self.check_contextual("final") || self.check_contextual("noexcept") {
                self.advance();
            } else {
                break;
            }
        }

        let mut is_pure = false;
        let mut initializers = Vec::new();
        let body = if self.consume(TokenKind::Assign) {
            // `= 0`, `= default`, `= delete`
            match self.kind() {
                TokenKind::IntLit if self.current.text == "0" => is_pure = true,
                TokenKind::Default | TokenKind::Delete => {}
                _ => return Err(self.unexpected("`0`, `default` or `delete`")),
            }
            self.advance();
            self.expect(TokenKind::Semicolon)?;
            None
        } else {
            if self.consume(TokenKind::Colon) {
                initializers = self.parse_member_inits()?;
            }
            if self.check(TokenKind::LBrace) {
                Some(self.parse_block()?)
            } else {
                self.expect(TokenKind::Semicolon)?;
                None
            }
        };

        Ok(Function {
            specs,
            ret_type,
            name,
            params,
            initializers,
            is_const,
            is_override,
            is_pure,
            body,
            span: self.span_from(start),
        })
    }

    /// Parameters up to (not including) `)`. A lone `void` means none.
    pub(super) fn parse_params(&mut self) -> Result<Vec<Param>> {
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let param = self.parse_param()?;
            let lone_void = params.is_empty()
                && param.name.is_none()
                && matches!(&param.ty, Type::Named(name, _) if name == "void")
                && self.check(TokenKind::RParen);
            if !lone_void {
                params.push(param);
            }
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_param(&mut self) -> Result<Param> {
        let start = self.current.span;
        if self.consume(TokenKind::Ellipsis) {
            return Ok(Param {
                ty: Type::Named("...".to_string(), start),
                name: None,
                default: None,
                span: start,
            });
        }

        let ty = self.parse_type()?;
        let name = if self.kind().is_name() {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let ty = self.parse_array_suffix(ty)?;
        let default = if self.consume(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        if let Some(name) = &name {
            self.symbols.declare(name.name.clone(), ty.clone());
        }

        Ok(Param {
            ty,
            name,
            default,
            span: self.span_from(start),
        })
    }

    /// `x(0), y{1}` after a constructor's `:`
    fn parse_member_inits(&mut self) -> Result<Vec<MemberInit>> {
        let mut inits = Vec::new();
        loop {
            let start = self.current.span;
            let name = self.parse_ident()?;
            let args = if self.consume(TokenKind::LParen) {
                self.parse_args(TokenKind::RParen)?
            } else {
                self.expect(TokenKind::LBrace)?;
                self.parse_args(TokenKind::RBrace)?
            };
            inits.push(MemberInit {
                name,
                args,
                span: self.span_from(start),
            });
            if !self.consume(TokenKind::Comma) {
                return Ok(inits);
            }
        }
    }

    fn parse_class(&mut self, specs: Vec<Specifier>, start: Span) -> Result<Decl> {
        let keyword = self.advance().kind;
        let name = self.parse_ident()?;
        if self.check_contextual("final") {
            self.advance();
        }

        // Elaborated type specifier: `struct Node* next;`
        if !matches!(self.kind(), TokenKind::LBrace | TokenKind::Colon | TokenKind::Semicolon) {
            let base = Type::Named(name.name, name.span);
            return self.parse_typed_declaration(specs, base, start);
        }
        self.type_names.insert(name.name.clone());

        if self.consume(TokenKind::Semicolon) {
            let def = ClassDef {
                name,
                bases: Vec::new(),
                members: Vec::new(),
                is_forward: true,
                span: self.span_from(start),
            };
            return Ok(class_decl(keyword, def));
        }

        let mut bases = Vec::new();
        if self.consume(TokenKind::Colon) {
            loop {
                let base_start = self.current.span;
                let mut access = None;
                let mut is_virtual = false;
                loop {
                    match self.kind() {
                        TokenKind::Public => access = Some(Access::Public),
                        TokenKind::Private => access = Some(Access::Private),
                        TokenKind::Protected => access = Some(Access::Protected),
                        TokenKind::Virtual => is_virtual = true,
                        _ => break,
                    }
                    self.advance();
                }
                let ty = self.parse_type()?;
                bases.push(BaseClass {
                    access,
                    is_virtual,
                    ty,
                    span: self.span_from(base_start),
                });
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::LBrace)?;
        let mut access = if keyword == TokenKind::Class {
            Access::Private
        } else {
            Access::Public
        };
        let ctx = DeclContext::Class;
        let mut members = Vec::new();
        loop {
            for decl in self.take_directives() {
                members.push(Member { access, decl });
            }
            if self.check(TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            let level = match self.kind() {
                TokenKind::Public => Some(Access::Public),
                TokenKind::Private => Some(Access::Private),
                TokenKind::Protected => Some(Access::Protected),
                _ => None,
            };
            if let Some(level) = level {
                self.advance();
                self.expect(TokenKind::Colon)?;
                access = level;
                continue;
            }
            if let Some(decl) = self.parse_item(&ctx)? {
                members.push(Member { access, decl });
            }
        }
        self.expect(TokenKind::RBrace)?;
        self.expect(TokenKind::Semicolon)?;

        let def = ClassDef {
            name,
            bases,
            members,
            is_forward: false,
            span: self.span_from(start),
        };
        Ok(class_decl(keyword, def))
    }

    fn parse_enum(&mut self, specs: Vec<Specifier>, start: Span) -> Result<Decl> {
        self.expect(TokenKind::Enum)?;
        let scoped = self.consume(TokenKind::Class) || self.consume(TokenKind::Struct);
        let name = if self.kind().is_name() {
            Some(self.parse_ident()?)
        } else {
            None
        };

        // Elaborated type specifier: `enum Color c;`
        let elaborated = !scoped
            && !matches!(self.kind(), TokenKind::LBrace | TokenKind::Colon | TokenKind::Semicolon);
        if let Some(name) = name.clone().filter(|_| elaborated) {
            let base = Type::Named(name.name, name.span);
            return self.parse_typed_declaration(specs, base, start);
        }
        if let Some(name) = &name {
            self.type_names.insert(name.name.clone());
        }

        let underlying = if self.consume(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let mut enumerators = Vec::new();
        if self.consume(TokenKind::LBrace) {
            while !self.check(TokenKind::RBrace) && !self.is_at_end() {
                let name = self.parse_ident()?;
                let value = if self.consume(TokenKind::Assign) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                enumerators.push(Enumerator {
                    span: name.span.merge(&self.previous.span),
                    name,
                    value,
                });
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace)?;
        }
        self.expect(TokenKind::Semicolon)?;

        Ok(Decl::Enum(EnumDef {
            name,
            scoped,
            underlying,
            enumerators,
            span: self.span_from(start),
        }))
    }

    fn parse_namespace(&mut self) -> Result<Decl> {
        let start = self.expect(TokenKind::Namespace)?.span;
        let name = if self.kind().is_name() {
            Some(self.parse_path()?.into_ident())
        } else {
            None
        };

        self.expect(TokenKind::LBrace)?;
        let decls = self.parse_items(&DeclContext::File, TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace)?;

        Ok(Decl::Namespace(NamespaceDef {
            name,
            decls,
            span: self.span_from(start),
        }))
    }

    fn parse_template(&mut self, ctx: &DeclContext) -> Result<Decl> {
        let start = self.expect(TokenKind::Template)?.span;
        self.expect(TokenKind::Lt)?;

        let mut params = Vec::new();
        while !matches!(self.kind(), TokenKind::Gt | TokenKind::Shr) && !self.is_at_end() {
            params.push(self.parse_template_param()?);
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        self.close_template()?;

        let decl = self
            .parse_item(ctx)?
            .ok_or_else(|| self.unexpected("declaration"))?;

        Ok(Decl::Template(TemplateDecl {
            params,
            decl: Box::new(decl),
            span: self.span_from(start),
        }))
    }

    fn parse_template_param(&mut self) -> Result<TemplateParam> {
        let start = self.current.span;
        if self.check_contextual("typename") || self.check(TokenKind::Class) {
            self.advance();
            self.consume(TokenKind::Ellipsis);
            let name = self.parse_ident()?;
            self.type_names.insert(name.name.clone());
            let default = if self.consume(TokenKind::Assign) {
                Some(self.parse_type()?)
            } else {
                None
            };
            return Ok(TemplateParam::Type {
                name,
                default,
                span: self.span_from(start),
            });
        }

        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        let default = if self.consume(TokenKind::Assign) {
            Some(self.parse_template_expr()?)
        } else {
            None
        };
        Ok(TemplateParam::Value {
            ty,
            name,
            default,
            span: self.span_from(start),
        })
    }

    fn parse_typedef(&mut self) -> Result<Decl> {
        let start = self.expect(TokenKind::Typedef)?.span;
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;
        let ty = self.parse_array_suffix(ty)?;
        self.expect(TokenKind::Semicolon)?;

        self.type_names.insert(name.name.clone());
        self.symbols.declare(name.name.clone(), ty.clone());
        Ok(Decl::Typedef(TypedefDecl {
            ty,
            name,
            span: self.span_from(start),
        }))
    }

    fn parse_using(&mut self) -> Result<Decl> {
        let start = self.expect(TokenKind::Using)?.span;

        if self.consume(TokenKind::Namespace) {
            let name = self.parse_path()?.into_ident();
            self.expect(TokenKind::Semicolon)?;
            return Ok(Decl::Using(UsingDecl::Namespace {
                name,
                span: self.span_from(start),
            }));
        }

        let path = self.parse_path()?;
        if path.is_single() && self.consume(TokenKind::Assign) {
            let name = path.into_ident();
            let ty = self.parse_type()?;
            self.expect(TokenKind::Semicolon)?;
            self.type_names.insert(name.name.clone());
            self.symbols.declare(name.name.clone(), ty.clone());
            return Ok(Decl::Using(UsingDecl::Alias {
                name,
                ty,
                span: self.span_from(start),
            }));
        }

        let name = path.into_ident();
        self.expect(TokenKind::Semicolon)?;
        Ok(Decl::Using(UsingDecl::Name {
            name,
            span: self.span_from(start),
        }))
    }

    // ==================== Statements ====================

    pub(super) fn parse_block(&mut self) -> Result<Block> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        loop {
            stmts.extend(self.take_directives().into_iter().map(Stmt::Decl));
            if self.check(TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Block {
            stmts,
            span: self.span_from(start),
        })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let start = self.current.span;
        match self.kind() {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty { span: start })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => {
                self.advance();
                let cond = self.parse_condition()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While {
                    cond,
                    body,
                    span: self.span_from(start),
                })
            }
            TokenKind::Do => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.expect(TokenKind::While)?;
                let cond = self.parse_condition()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::DoWhile {
                    body,
                    cond,
                    span: self.span_from(start),
                })
            }
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Return => {
                self.advance();
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return {
                    value,
                    span: self.span_from(start),
                })
            }
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break { span: self.span_from(start) })
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue { span: self.span_from(start) })
            }
            TokenKind::Goto => {
                self.advance();
                let label = self.parse_ident()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Goto {
                    label,
                    span: self.span_from(start),
                })
            }
            TokenKind::Try => self.parse_try(),
            TokenKind::Throw => {
                self.advance();
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Throw {
                    value,
                    span: self.span_from(start),
                })
            }
            _ => self.parse_declaration(&DeclContext::Block, start),
        }
    }

    /// `( expr )`
    fn parse_condition(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(cond)
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::If)?.span;
        let cond = self.parse_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.consume(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            span: self.span_from(start),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LParen)?;

        let init = if self.consume(TokenKind::Semicolon) {
            None
        } else {
            match self.parse_for_init()? {
                ForInit::Range { ty, name } => {
                    let range = self.parse_expr()?;
                    self.expect(TokenKind::RParen)?;
                    let body = Box::new(self.parse_statement()?);
                    return Ok(Stmt::RangeFor {
                        ty,
                        name,
                        range,
                        body,
                        span: self.span_from(start),
                    });
                }
                ForInit::Stmt(stmt) => Some(Box::new(stmt)),
            }
        };

        let cond = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon)?;
        let step = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
            span: self.span_from(start),
        })
    }

    /// Init clause through its `;`, or the `T x :` head of a range-for
    fn parse_for_init(&mut self) -> Result<ForInit> {
        let start = self.current.span;
        let base = match self.kind() {
            kind if kind.is_primitive_type() || kind.is_type_qualifier() => self.parse_base_type()?,
            kind if kind.is_name() => {
                let path = self.parse_path()?;
                let known_type = path.names_container() || self.is_type_name(&path.text());
                if !self.declares_after(self.kind(), known_type, true) {
                    let expr = self.parse_expr_from(path.into_expr())?;
                    self.expect(TokenKind::Semicolon)?;
                    return Ok(ForInit::Stmt(Stmt::Expr(expr)));
                }
                self.type_from_path(path)?
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                return Ok(ForInit::Stmt(Stmt::Expr(expr)));
            }
        };

        let ty = self.parse_declarator_suffix(base.clone());
        let name = self.parse_ident()?;
        if self.consume(TokenKind::Colon) {
            self.symbols.declare(name.name.clone(), ty.clone());
            return Ok(ForInit::Range { ty, name });
        }
        let var = self.finish_variable(Vec::new(), base, ty, name, start)?;
        Ok(ForInit::Stmt(Stmt::Decl(Decl::Variable(var))))
    }

    fn parse_switch(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::Switch)?.span;
        let cond = self.parse_condition()?;
        self.expect(TokenKind::LBrace)?;

        let mut cases: Vec<SwitchCase> = Vec::new();
        // Directives ahead of the first label
        let mut leading = Vec::new();
        loop {
            let directives = self.take_directives().into_iter().map(Stmt::Decl);
            match cases.last_mut() {
                Some(case) => case.body.extend(directives),
                None => leading.extend(directives),
            }
            if self.check(TokenKind::RBrace) || self.is_at_end() {
                break;
            }

            let case_start = self.current.span;
            let value = match self.kind() {
                TokenKind::Case => {
                    self.advance();
                    Some(Some(self.parse_expr()?))
                }
                TokenKind::Default => {
                    self.advance();
                    Some(None)
                }
                _ => None,
            };
            if let Some(value) = value {
                self.expect(TokenKind::Colon)?;
                cases.push(SwitchCase {
                    value,
                    body: mem::take(&mut leading),
                    span: self.span_from(case_start),
                });
                continue;
            }

            let stmt = self.parse_statement()?;
            match cases.last_mut() {
                Some(case) => case.body.push(stmt),
                None => {
                    return Err(Error::UnexpectedToken {
                        expected: "`case` or `default`".to_string(),
                        got: "statement".to_string(),
                        span: stmt.span(),
                    })
                }
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Stmt::Switch {
            cond,
            cases,
            span: self.span_from(start),
        })
    }

    fn parse_try(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::Try)?.span;
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        while self.check(TokenKind::Catch) {
            let catch_start = self.advance().span;
            self.expect(TokenKind::LParen)?;
            let param = if self.consume(TokenKind::Ellipsis) {
                None
            } else {
                Some(self.parse_param()?)
            };
            self.expect(TokenKind::RParen)?;
            let body = self.parse_block()?;
            handlers.push(CatchClause {
                param,
                body,
                span: self.span_from(catch_start),
            });
        }
        if handlers.is_empty() {
            return Err(self.unexpected(TokenKind::Catch.to_string()));
        }

        Ok(Stmt::Try {
            body,
            handlers,
            span: self.span_from(start),
        })
    }
}

fn class_decl(keyword: TokenKind, def: ClassDef) -> Decl {
    match keyword {
        TokenKind::Class => Decl::Class(def),
        TokenKind::Union => Decl::Union(def),
        _ => Decl::Struct(def),
    }
}

fn directive_kind(kind: TokenKind) -> DirectiveKind {
    match kind {
        TokenKind::PpInclude => DirectiveKind::Include,
        TokenKind::PpDefine => DirectiveKind::Define,
        TokenKind::PpUndef => DirectiveKind::Undef,
        TokenKind::PpIfdef => DirectiveKind::Ifdef,
        TokenKind::PpIfndef => DirectiveKind::Ifndef,
        TokenKind::PpIf => DirectiveKind::If,
        TokenKind::PpElif => DirectiveKind::Elif,
        TokenKind::PpElse => DirectiveKind::Else,
        TokenKind::PpEndif => DirectiveKind::Endif,
        TokenKind::PpPragma => DirectiveKind::Pragma,
        _ => DirectiveKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::symbols::ContainerKind;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Program> {
        Parser::from_source(source).parse_program()
    }

    fn parse_ok(source: &str) -> Program {
        match parse(source) {
            Ok(program) => program,
            Err(err) => panic!("parse failed: {}", err),
        }
    }

    fn single_var(program: &Program) -> &Declarator {
        match program.decls.as_slice() {
            [Decl::Variable(var)] => &var.declarators[0],
            other => panic!("expected one variable, got {:?}", other),
        }
    }

    fn function<'a>(program: &'a Program, name: &str) -> &'a Function {
        program
            .decls
            .iter()
            .find_map(|decl| match decl {
                Decl::Function(f) if f.name.name == name => Some(f),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no function `{}`", name))
    }

    fn body(function: &Function) -> &[Stmt] {
        &function.body.as_ref().expect("function body").stmts
    }

    fn var_init(stmt: &Stmt) -> &Expr {
        match stmt {
            Stmt::Decl(Decl::Variable(var)) => var.declarators[0].init.as_ref().expect("initializer"),
            other => panic!("expected variable, got {:?}", other),
        }
    }

    fn expr_stmt(stmt: &Stmt) -> &Expr {
        match stmt {
            Stmt::Expr(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn int_value(expr: &Expr) -> i64 {
        match expr {
            Expr::Literal(Literal::Int(value, _)) => *value,
            other => panic!("expected integer literal, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let program = parse_ok("int x = 1 + 2 * 3;");
        let decl = single_var(&program);
        assert_eq!(decl.name.name, "x");
        match decl.init.as_ref() {
            Some(Expr::Binary { op: BinOp::Add, left, right, .. }) => {
                assert_eq!(int_value(left), 1);
                match right.as_ref() {
                    Expr::Binary { op: BinOp::Mul, left, right, .. } => {
                        assert_eq!(int_value(left), 2);
                        assert_eq!(int_value(right), 3);
                    }
                    other => panic!("expected product, got {:?}", other),
                }
            }
            other => panic!("expected sum, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let program = parse_ok("void f() { a = b = 1; }");
        let stmts = body(function(&program, "f"));
        match expr_stmt(&stmts[0]) {
            Expr::Binary { op: BinOp::Assign, right, .. } => {
                assert!(matches!(right.as_ref(), Expr::Binary { op: BinOp::Assign, .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_macro_directive_then_substituted_use() {
        let program = parse_ok("#define MAX 10\nint x = MAX;");
        assert_eq!(program.decls.len(), 2);
        match &program.decls[0] {
            Decl::Directive(directive) => {
                assert_eq!(directive.kind, DirectiveKind::Define);
                assert_eq!(directive.text, "MAX 10");
            }
            other => panic!("expected directive, got {:?}", other),
        }
        let vars: Vec<_> = program
            .decls
            .iter()
            .filter(|decl| matches!(decl, Decl::Variable(_)))
            .collect();
        assert_eq!(vars.len(), 1);
        match &program.decls[1] {
            Decl::Variable(var) => match &var.declarators[0].init {
                Some(Expr::Ident(ident)) => assert_eq!(ident.name, "10"),
                other => panic!("expected substituted name, got {:?}", other),
            },
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_function_versus_variable() {
        let program = parse_ok("int foo(int a) { return a; }");
        let foo = function(&program, "foo");
        assert_eq!(foo.params.len(), 1);
        assert_eq!(foo.params[0].name.as_ref().map(|n| n.name.as_str()), Some("a"));
        assert_eq!(foo.ret_type.as_ref().map(Type::base_name), Some("int"));
        assert!(matches!(body(foo), [Stmt::Return { value: Some(Expr::Ident(_)), .. }]));

        let program = parse_ok("int foo = 5;");
        assert_eq!(int_value(single_var(&program).init.as_ref().expect("init")), 5);
    }

    #[test]
    fn test_nested_template_closes_on_shift() {
        let source = "map<string, vector<int>> m;";
        let mut parser = Parser::from_source(source);
        let program = match parser.parse_program() {
            Ok(program) => program,
            Err(err) => panic!("parse failed: {}", err),
        };
        match &single_var(&program).ty {
            Type::Template { base, args, .. } => {
                assert_eq!(base, "map");
                assert_eq!(args.len(), 2);
                assert!(matches!(&args[0], TemplateArg::Type(Type::Named(name, _)) if name == "string"));
                match &args[1] {
                    TemplateArg::Type(Type::Template { base, args, .. }) => {
                        assert_eq!(base, "vector");
                        assert_eq!(args.len(), 1);
                    }
                    other => panic!("expected vector<int>, got {:?}", other),
                }
            }
            other => panic!("expected template type, got {:?}", other),
        }
        assert_eq!(parser.symbols().container_of("m"), Some(ContainerKind::Map));
    }

    #[test]
    fn test_class_members_and_access() {
        let source = r#"
class Shape {
public:
    Shape(int w) : width(w) {}
    virtual ~Shape() {}
    virtual double area() const = 0;
    int width;
private:
    int id;
};
class Circle : public Shape {
public:
    double area() const override { return 3.14; }
};
"#;
        let program = parse_ok(source);
        assert_eq!(program.decls.len(), 2);

        let Decl::Class(shape) = &program.decls[0] else {
            panic!("expected class");
        };
        assert_eq!(shape.name.name, "Shape");
        assert_eq!(shape.members.len(), 5);

        let Decl::Function(ctor) = &shape.members[0].decl else {
            panic!("expected constructor");
        };
        assert_eq!(shape.members[0].access, Access::Public);
        assert!(ctor.ret_type.is_none());
        assert_eq!(ctor.initializers.len(), 1);
        assert_eq!(ctor.initializers[0].name.name, "width");

        let Decl::Function(dtor) = &shape.members[1].decl else {
            panic!("expected destructor");
        };
        assert_eq!(dtor.name.name, "~Shape");
        assert_eq!(dtor.specs, vec![Specifier::Virtual]);

        let Decl::Function(area) = &shape.members[2].decl else {
            panic!("expected method");
        };
        assert!(area.is_const && area.is_pure && area.body.is_none());

        assert_eq!(shape.members[4].access, Access::Private);

        let Decl::Class(circle) = &program.decls[1] else {
            panic!("expected class");
        };
        assert_eq!(circle.bases.len(), 1);
        assert_eq!(circle.bases[0].access, Some(Access::Public));
        assert_eq!(circle.bases[0].ty.base_name(), "Shape");
        let Decl::Function(area) = &circle.members[0].decl else {
            panic!("expected method");
        };
        assert!(area.is_override && area.is_const && !area.is_pure);
    }

    #[test]
    fn test_struct_defaults_to_public() {
        let program = parse_ok("struct Point { int x, y; };");
        let Decl::Struct(point) = &program.decls[0] else {
            panic!("expected struct");
        };
        assert_eq!(point.members[0].access, Access::Public);
        let Decl::Variable(var) = &point.members[0].decl else {
            panic!("expected fields");
        };
        assert_eq!(var.declarators.len(), 2);
    }

    #[test]
    fn test_enum_namespace_typedef_using() {
        let source = r#"
enum class Color : int { Red, Green = 2, Blue };
namespace geo { int origin = 0; }
typedef unsigned long ulong;
using namespace std;
using IntVec = vector<int>;
IntVec values;
"#;
        let mut parser = Parser::from_source(source);
        let program = match parser.parse_program() {
            Ok(program) => program,
            Err(err) => panic!("parse failed: {}", err),
        };
        assert_eq!(program.decls.len(), 6);

        let Decl::Enum(color) = &program.decls[0] else {
            panic!("expected enum");
        };
        assert!(color.scoped);
        assert!(color.underlying.is_some());
        assert_eq!(color.enumerators.len(), 3);
        assert_eq!(int_value(color.enumerators[1].value.as_ref().expect("value")), 2);

        let Decl::Namespace(geo) = &program.decls[1] else {
            panic!("expected namespace");
        };
        assert_eq!(geo.name.as_ref().map(|n| n.name.as_str()), Some("geo"));
        assert_eq!(geo.decls.len(), 1);

        let Decl::Typedef(ulong) = &program.decls[2] else {
            panic!("expected typedef");
        };
        match &ulong.ty {
            Type::Qualified { qualifiers, inner, .. } => {
                assert_eq!(qualifiers, &vec![TypeQualifier::Unsigned, TypeQualifier::Long]);
                assert_eq!(inner.base_name(), "int");
            }
            other => panic!("expected qualified type, got {:?}", other),
        }

        assert!(matches!(&program.decls[3], Decl::Using(UsingDecl::Namespace { name, .. }) if name.name == "std"));
        assert!(matches!(&program.decls[4], Decl::Using(UsingDecl::Alias { .. })));
        assert!(matches!(&program.decls[5], Decl::Variable(_)));
        assert_eq!(parser.symbols().container_of("values"), Some(ContainerKind::Vector));
    }

    #[test]
    fn test_function_template() {
        let program = parse_ok("template <typename T> T maxOf(T a, T b) { return a > b ? a : b; }");
        let Decl::Template(template) = &program.decls[0] else {
            panic!("expected template");
        };
        assert!(matches!(&template.params[..], [TemplateParam::Type { name, .. }] if name.name == "T"));
        let Decl::Function(max_of) = template.decl.as_ref() else {
            panic!("expected function");
        };
        assert_eq!(max_of.params.len(), 2);
        assert!(matches!(
            body(max_of),
            [Stmt::Return { value: Some(Expr::Ternary { .. }), .. }]
        ));
    }

    #[test]
    fn test_control_flow_statements() {
        let source = r#"
int main() {
    int total = 0;
    for (int i = 0; i < 10; i++) { total += i; }
    vector<int> values = {1, 2, 3};
    for (auto& v : values) { total += v; }
    switch (total) {
        case 1: total = 2; break;
        default: break;
    }
retry:
    if (total > 100) goto retry;
    while (total > 0) total--;
    do { total++; } while (total < 3);
    try { throw 1; } catch (const exception& e) { return 1; } catch (...) { }
    return 0;
}
"#;
        let program = parse_ok(source);
        let stmts = body(function(&program, "main"));
        assert_eq!(stmts.len(), 11);

        assert!(matches!(&stmts[1], Stmt::For { init: Some(_), cond: Some(_), step: Some(_), .. }));
        assert!(matches!(var_init(&stmts[2]), Expr::InitList { elements, .. } if elements.len() == 3));
        match &stmts[3] {
            Stmt::RangeFor { ty, name, .. } => {
                assert_eq!(name.name, "v");
                assert!(matches!(ty, Type::Reference(..)));
            }
            other => panic!("expected range-for, got {:?}", other),
        }
        match &stmts[4] {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].body.len(), 2);
                assert!(cases[1].value.is_none());
            }
            other => panic!("expected switch, got {:?}", other),
        }
        assert!(matches!(&stmts[5], Stmt::Label { name, .. } if name.name == "retry"));
        assert!(matches!(&stmts[6], Stmt::If { then_branch, .. } if matches!(then_branch.as_ref(), Stmt::Goto { .. })));
        assert!(matches!(&stmts[7], Stmt::While { .. }));
        assert!(matches!(&stmts[8], Stmt::DoWhile { .. }));
        match &stmts[9] {
            Stmt::Try { handlers, .. } => {
                assert_eq!(handlers.len(), 2);
                assert!(handlers[0].param.is_some());
                assert!(handlers[1].param.is_none());
            }
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn test_library_calls_get_dedicated_shapes() {
        let source = r#"
void run(vector<int>& v) {
    sort(v.begin(), v.end());
    std::sort(v.begin(), v.end(), cmp);
    int a = abs(-5);
    int b = abs(1, 2);
    printf("%d\n", a);
    int s = accumulate(v.begin(), v.end(), 0);
}
"#;
        let program = parse_ok(source);
        let stmts = body(function(&program, "run"));

        assert!(matches!(expr_stmt(&stmts[0]), Expr::Sort { comparator: None, .. }));
        assert!(matches!(expr_stmt(&stmts[1]), Expr::Sort { comparator: Some(_), .. }));
        assert!(matches!(var_init(&stmts[2]), Expr::Abs { .. }));
        assert!(matches!(var_init(&stmts[3]), Expr::Call { args, .. } if args.len() == 2));
        match expr_stmt(&stmts[4]) {
            Expr::Printf { format, args, .. } => {
                assert!(matches!(format.as_ref(), Expr::Literal(Literal::String(text, _)) if text == "%d\\n"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected printf, got {:?}", other),
        }
        assert!(matches!(var_init(&stmts[5]), Expr::Accumulate { .. }));
    }

    #[test]
    fn test_lambda_new_delete_and_casts() {
        let source = r#"
void g() {
    int* p = new int[10];
    delete[] p;
    double d = static_cast<double>(1);
    double e = (double)2;
    auto f = [&](int x) { return x * 2; };
    int n = sizeof(int);
}
"#;
        let program = parse_ok(source);
        let stmts = body(function(&program, "g"));

        assert!(matches!(var_init(&stmts[0]), Expr::New { array_size: Some(_), .. }));
        assert!(matches!(expr_stmt(&stmts[1]), Expr::Delete { array: true, .. }));
        assert!(matches!(var_init(&stmts[2]), Expr::Cast { kind: CastKind::Static, .. }));
        assert!(matches!(var_init(&stmts[3]), Expr::Cast { kind: CastKind::CStyle, .. }));
        match var_init(&stmts[4]) {
            Expr::Lambda { captures, params, body, .. } => {
                assert!(matches!(captures.as_slice(), [Capture::DefaultByRef]));
                assert_eq!(params.len(), 1);
                assert_eq!(body.stmts.len(), 1);
            }
            other => panic!("expected lambda, got {:?}", other),
        }
        assert!(matches!(var_init(&stmts[5]), Expr::SizeOf { operand, .. } if matches!(operand.as_ref(), TypeOrExpr::Type(_))));
    }

    #[test]
    fn test_known_type_decides_declaration_in_block() {
        let source = "struct Foo { int v; };\nvoid g() { Foo* p = nullptr; int r = 2; r * 3; }";
        let mut parser = Parser::from_source(source);
        let program = match parser.parse_program() {
            Ok(program) => program,
            Err(err) => panic!("parse failed: {}", err),
        };
        let stmts = body(function(&program, "g"));
        match &stmts[0] {
            Stmt::Decl(Decl::Variable(var)) => {
                assert!(matches!(var.declarators[0].ty, Type::Pointer(..)));
            }
            other => panic!("expected pointer declaration, got {:?}", other),
        }
        assert!(matches!(expr_stmt(&stmts[2]), Expr::Binary { op: BinOp::Mul, .. }));
        assert!(matches!(parser.symbols().lookup("p"), Some(Type::Pointer(..))));
    }

    #[test]
    fn test_implicit_int() {
        let program = parse_ok("unsigned x = 3;");
        match &single_var(&program).ty {
            Type::Qualified { qualifiers, inner, .. } => {
                assert_eq!(qualifiers, &vec![TypeQualifier::Unsigned]);
                assert_eq!(inner.base_name(), "int");
            }
            other => panic!("expected qualified int, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_semicolon() {
        match parse("int x = 1") {
            Err(Error::UnexpectedToken { expected, got, .. }) => {
                assert_eq!(expected, "`;`");
                assert_eq!(got, "end of file");
            }
            other => panic!("expected unexpected-token error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_expression() {
        match parse("int x = ;") {
            Err(Error::ExpectedExpr { got, span }) => {
                assert_eq!(got, "`;`");
                assert_eq!((span.line, span.column), (1, 9));
            }
            other => panic!("expected missing-expression error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_token_is_lexical_error() {
        assert!(matches!(parse("int x = @;"), Err(Error::Lexical { .. })));
        assert!(matches!(parse("char c = '';"), Err(Error::Lexical { .. })));
    }

    #[test]
    fn test_directives_inside_class_and_block() {
        let source = r#"
class A {
#pragma pack
    int x;
};
void f() {
#ifdef DEBUG
    trace();
#endif
    int y;
}
"#;
        let program = parse_ok(source);
        let Decl::Class(class) = &program.decls[0] else {
            panic!("expected class");
        };
        assert!(matches!(
            &class.members[0].decl,
            Decl::Directive(Directive { kind: DirectiveKind::Pragma, .. })
        ));
        assert!(matches!(&class.members[1].decl, Decl::Variable(_)));

        let stmts = body(function(&program, "f"));
        let kinds: Vec<_> = stmts
            .iter()
            .map(|stmt| match stmt {
                Stmt::Decl(Decl::Directive(d)) => format!("{:?}", d.kind),
                Stmt::Decl(Decl::Variable(_)) => "Variable".to_string(),
                other => format!("{:?}", other),
            })
            .collect();
        assert_eq!(kinds, vec!["Ifdef", "Endif", "Variable"]);
    }

    #[test]
    fn test_operator_overload_name() {
        let program = parse_ok("ostream& operator<<(ostream& os, const Point& p) { return os; }");
        let op = function(&program, "operator<<");
        assert_eq!(op.params.len(), 2);
        assert!(matches!(op.ret_type, Some(Type::Reference(..))));
    }

    #[test]
    fn test_template_temporaries_in_expressions() {
        let source = r#"
void run(vector<int>& v) {
    sort(v.begin(), v.end(), greater<int>());
    std::sort(v.begin(), v.end(), std::greater<int>{});
    auto w = vector<int>(5);
    string s = (string("a") + "b");
    double d = (double)2;
}
"#;
        let program = parse_ok(source);
        let stmts = body(function(&program, "run"));

        match expr_stmt(&stmts[0]) {
            Expr::Sort { comparator: Some(comparator), .. } => match comparator.as_ref() {
                Expr::Construct { ty: Type::Template { base, .. }, args, braced: false, .. } => {
                    assert_eq!(base, "greater");
                    assert!(args.is_empty());
                }
                other => panic!("expected temporary, got {:?}", other),
            },
            other => panic!("expected sort with comparator, got {:?}", other),
        }
        match expr_stmt(&stmts[1]) {
            Expr::Sort { comparator: Some(comparator), .. } => assert!(matches!(
                comparator.as_ref(),
                Expr::Construct { ty: Type::Template { base, .. }, braced: true, .. } if base == "std::greater"
            )),
            other => panic!("expected sort with comparator, got {:?}", other),
        }
        match var_init(&stmts[2]) {
            Expr::Construct { ty: Type::Template { base, args: targs, .. }, args, .. } => {
                assert_eq!(base, "vector");
                assert_eq!(targs.len(), 1);
                assert_eq!(args.len(), 1);
                assert_eq!(int_value(&args[0]), 5);
            }
            other => panic!("expected temporary, got {:?}", other),
        }
        match var_init(&stmts[3]) {
            Expr::Binary { op: BinOp::Add, left, .. } => {
                assert!(matches!(left.as_ref(), Expr::Call { args, .. } if args.len() == 1));
            }
            other => panic!("expected concatenation, got {:?}", other),
        }
        assert!(matches!(
            var_init(&stmts[4]),
            Expr::Cast { kind: CastKind::CStyle, .. }
        ));
    }

    #[test]
    fn test_functor_declaration_in_block() {
        let program = parse_ok("void f() { less<int> cmp; }");
        let stmts = body(function(&program, "f"));
        match &stmts[0] {
            Stmt::Decl(Decl::Variable(var)) => assert_eq!(var.declarators[0].name.name, "cmp"),
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_macro_keeps_operand_position() {
        let source = "#define EMPTY\nint f(int x) { if (x && EMPTY) return 1; return 0; }";
        let program = parse_ok(source);
        let stmts = body(function(&program, "f"));
        match &stmts[0] {
            Stmt::If { cond: Expr::Binary { op: BinOp::And, right, .. }, .. } => {
                assert!(matches!(right.as_ref(), Expr::Ident(ident) if ident.name.is_empty()));
            }
            other => panic!("expected conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_beyond_i64_is_kept_as_written() {
        let program = parse_ok("unsigned long long m = 0xFFFFFFFFFFFFFFFF;");
        assert!(matches!(
            &single_var(&program).init,
            Some(Expr::Literal(Literal::BigInt(text, _))) if text == "0xFFFFFFFFFFFFFFFF"
        ));

        let program = parse_ok("unsigned long long n = 18446744073709551615;");
        assert!(matches!(
            &single_var(&program).init,
            Some(Expr::Literal(Literal::BigInt(text, _))) if text == "18446744073709551615"
        ));
    }
}
