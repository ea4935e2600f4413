//! Expression and type parsing
//!
//! Binary operators are climbed through a table of tiers, lowest binding
//! first. Assignment and the conditional operator sit above the table;
//! unary, postfix and primary forms below it.

use log::debug;

use crate::frontend::ast::*;
use crate::frontend::parser::{Parser, Path};
use crate::frontend::token::{NumericValue, TokenKind};
use crate::utils::{Result, Span};

/// Binary tiers, lowest binding first
const BINARY_LEVELS: &[&[(TokenKind, BinOp)]] = &[
    &[(TokenKind::OrOr, BinOp::Or)],
    &[(TokenKind::AndAnd, BinOp::And)],
    &[(TokenKind::Pipe, BinOp::BitOr)],
    &[(TokenKind::Caret, BinOp::BitXor)],
    &[(TokenKind::Amp, BinOp::BitAnd)],
    &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::NotEq, BinOp::Ne)],
    &[
        (TokenKind::Lt, BinOp::Lt),
        (TokenKind::Gt, BinOp::Gt),
        (TokenKind::LtEq, BinOp::Le),
        (TokenKind::GtEq, BinOp::Ge),
    ],
    &[(TokenKind::Shl, BinOp::Shl), (TokenKind::Shr, BinOp::Shr)],
    &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
    &[
        (TokenKind::Star, BinOp::Mul),
        (TokenKind::Slash, BinOp::Div),
        (TokenKind::Percent, BinOp::Mod),
    ],
];

/// Tier for template arguments, above relational and shift so `>` closes
/// the list
const ADDITIVE_LEVEL: usize = 8;

fn assignment_op(kind: TokenKind) -> Option<BinOp> {
    let op = match kind {
        TokenKind::Assign => BinOp::Assign,
        TokenKind::PlusEq => BinOp::AddAssign,
        TokenKind::MinusEq => BinOp::SubAssign,
        TokenKind::StarEq => BinOp::MulAssign,
        TokenKind::SlashEq => BinOp::DivAssign,
        TokenKind::PercentEq => BinOp::ModAssign,
        TokenKind::AmpEq => BinOp::AndAssign,
        TokenKind::PipeEq => BinOp::OrAssign,
        TokenKind::CaretEq => BinOp::XorAssign,
        TokenKind::ShlEq => BinOp::ShlAssign,
        TokenKind::ShrEq => BinOp::ShrAssign,
        _ => return None,
    };
    Some(op)
}

impl Parser {
    // ==================== Expressions ====================

    pub(super) fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assignment(None)
    }

    /// Continue an expression whose leading name has already been consumed
    pub(super) fn parse_expr_from(&mut self, seed: Expr) -> Result<Expr> {
        let seed = self.parse_postfix(seed)?;
        self.parse_assignment(Some(seed))
    }

    /// Constant expression inside `<...>`
    pub(super) fn parse_template_expr(&mut self) -> Result<Expr> {
        self.parse_binary(ADDITIVE_LEVEL, None)
    }

    /// Right associative
    fn parse_assignment(&mut self, seed: Option<Expr>) -> Result<Expr> {
        let target = self.parse_ternary(seed)?;
        let Some(op) = assignment_op(self.kind()) else {
            return Ok(target);
        };
        self.advance();
        let value = self.parse_assignment(None)?;

        Ok(Expr::Binary {
            span: target.span().merge(&value.span()),
            left: Box::new(target),
            op,
            right: Box::new(value),
        })
    }

    fn parse_ternary(&mut self, seed: Option<Expr>) -> Result<Expr> {
        let cond = self.parse_binary(0, seed)?;
        if !self.consume(TokenKind::Question) {
            return Ok(cond);
        }
        let then_expr = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let else_expr = self.parse_assignment(None)?;

        Ok(Expr::Ternary {
            span: cond.span().merge(&else_expr.span()),
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    /// Left-associative tiers of [`BINARY_LEVELS`]. A seed, when present,
    /// becomes the leftmost operand.
    fn parse_binary(&mut self, level: usize, seed: Option<Expr>) -> Result<Expr> {
        let Some(ops) = BINARY_LEVELS.get(level) else {
            return match seed {
                Some(expr) => Ok(expr),
                None => self.parse_unary(),
            };
        };

        let mut left = self.parse_binary(level + 1, seed)?;
        loop {
            let kind = self.kind();
            let Some(&(_, op)) = ops.iter().find(|(k, _)| *k == kind) else {
                return Ok(left);
            };
            self.advance();
            let right = self.parse_binary(level + 1, None)?;
            left = Expr::Binary {
                span: left.span().merge(&right.span()),
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.kind() {
            TokenKind::Bang => UnOp::Not,
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Plus => UnOp::Plus,
            TokenKind::Tilde => UnOp::BitNot,
            TokenKind::Star => UnOp::Deref,
            TokenKind::Amp => UnOp::AddrOf,
            TokenKind::PlusPlus => UnOp::PreInc,
            TokenKind::MinusMinus => UnOp::PreDec,
            TokenKind::Sizeof => return self.parse_sizeof(),
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };

        let start = self.advance().span;
        let expr = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            span: start.merge(&expr.span()),
            expr: Box::new(expr),
        })
    }

    fn parse_sizeof(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::Sizeof)?.span;
        let operand = if self.consume(TokenKind::LParen) {
            let operand = self.parse_type_or_expr()?;
            self.expect(TokenKind::RParen)?;
            operand
        } else {
            TypeOrExpr::Expr(self.parse_unary()?)
        };

        Ok(Expr::SizeOf {
            operand: Box::new(operand),
            span: self.span_from(start),
        })
    }

    fn parse_type_or_expr(&mut self) -> Result<TypeOrExpr> {
        if self.starts_type() {
            Ok(TypeOrExpr::Type(self.parse_type()?))
        } else {
            Ok(TypeOrExpr::Expr(self.parse_expr()?))
        }
    }

    pub(super) fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            expr = match self.kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args(TokenKind::RParen)?;
                    let span = self.span_from(expr.span());
                    make_call(expr, args, span)
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    Expr::Index {
                        span: self.span_from(expr.span()),
                        expr: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    let arrow = self.advance().kind == TokenKind::Arrow;
                    let member = self.parse_ident()?;
                    Expr::Member {
                        span: expr.span().merge(&member.span),
                        expr: Box::new(expr),
                        member,
                        arrow,
                    }
                }
                TokenKind::ColonColon => {
                    self.advance();
                    let name = self.parse_ident()?;
                    Expr::Scope {
                        span: expr.span().merge(&name.span),
                        scope: Box::new(expr),
                        name,
                    }
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let token = self.advance();
                    let op = if token.kind == TokenKind::PlusPlus {
                        UnOp::PostInc
                    } else {
                        UnOp::PostDec
                    };
                    Expr::Unary {
                        op,
                        span: expr.span().merge(&token.span),
                        expr: Box::new(expr),
                    }
                }
                _ => return Ok(expr),
            };
        }
    }

    /// Comma-separated expressions through the closing token
    pub(super) fn parse_args(&mut self, close: TokenKind) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check(close) {
            args.push(self.parse_expr()?);
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current.clone();

        let expr = match token.kind {
            TokenKind::IntLit => {
                self.advance();
                match token.value {
                    Some(NumericValue::Int(value)) => Expr::Literal(Literal::Int(value, token.span)),
                    _ => Expr::Literal(Literal::BigInt(token.text, token.span)),
                }
            }
            TokenKind::FloatLit => {
                let Some(NumericValue::Float(value)) = token.value else {
                    return Err(self.expected_expr());
                };
                self.advance();
                Expr::Literal(Literal::Float(value, token.span))
            }
            TokenKind::StringLit => {
                self.advance();
                // Adjacent literals concatenate
                let mut text = token.text;
                while self.check(TokenKind::StringLit) {
                    text.push_str(&self.advance().text);
                }
                Expr::Literal(Literal::String(text, self.span_from(token.span)))
            }
            TokenKind::CharLit => {
                self.advance();
                Expr::Literal(Literal::Char(token.text, token.span))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Expr::Literal(Literal::Bool(token.kind == TokenKind::True, token.span))
            }
            TokenKind::Nullptr => {
                self.advance();
                Expr::Literal(Literal::Null(token.span))
            }
            TokenKind::LParen => self.parse_paren()?,
            TokenKind::StaticCast
            | TokenKind::DynamicCast
            | TokenKind::ConstCast
            | TokenKind::ReinterpretCast => self.parse_named_cast()?,
            TokenKind::Typeid => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let operand = self.parse_type_or_expr()?;
                self.expect(TokenKind::RParen)?;
                Expr::Typeid {
                    operand: Box::new(operand),
                    span: self.span_from(token.span),
                }
            }
            TokenKind::New => self.parse_new()?,
            TokenKind::Delete => {
                self.advance();
                let array = if self.consume(TokenKind::LBracket) {
                    self.expect(TokenKind::RBracket)?;
                    true
                } else {
                    false
                };
                let expr = self.parse_unary()?;
                Expr::Delete {
                    span: token.span.merge(&expr.span()),
                    expr: Box::new(expr),
                    array,
                }
            }
            TokenKind::LBracket => self.parse_lambda()?,
            TokenKind::LBrace => self.parse_init_list()?,
            kind if kind.is_name() => {
                let path = self.parse_path()?;
                let names_type = path.names_container() || self.is_type_name(&path.text());
                if names_type && self.check(TokenKind::Lt) {
                    let ty = self.type_from_path(path)?;
                    self.parse_construct(ty)?
                } else {
                    path.into_expr()
                }
            }
            _ => return Err(self.expected_expr()),
        };

        Ok(expr)
    }

    /// Parenthesized expression or C-style cast. A type not followed by
    /// `)` starts an expression in functional notation: `(string(s) + t)`.
    fn parse_paren(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::LParen)?.span;
        if self.starts_type() {
            let ty = self.parse_type()?;
            if self.consume(TokenKind::RParen) {
                let expr = self.parse_unary()?;
                return Ok(Expr::Cast {
                    kind: CastKind::CStyle,
                    ty,
                    span: start.merge(&expr.span()),
                    expr: Box::new(expr),
                });
            }

            let seed = match ty {
                Type::Named(name, span) => Expr::Ident(Ident::new(name, span)),
                ty @ Type::Template { .. } => self.parse_construct(ty)?,
                _ => return Err(self.unexpected(TokenKind::RParen.to_string())),
            };
            let expr = self.parse_expr_from(seed)?;
            self.expect(TokenKind::RParen)?;
            return Ok(expr);
        }

        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    /// Argument list after a template type in expression position
    fn parse_construct(&mut self, ty: Type) -> Result<Expr> {
        let close = match self.kind() {
            TokenKind::LParen => TokenKind::RParen,
            TokenKind::LBrace => TokenKind::RBrace,
            _ => return Err(self.unexpected(TokenKind::LParen.to_string())),
        };
        self.advance();
        let args = self.parse_args(close)?;

        Ok(Expr::Construct {
            span: self.span_from(ty.span()),
            ty,
            args,
            braced: close == TokenKind::RBrace,
        })
    }

    /// `static_cast<T>(expr)` and friends
    fn parse_named_cast(&mut self) -> Result<Expr> {
        let token = self.advance();
        let kind = match token.kind {
            TokenKind::StaticCast => CastKind::Static,
            TokenKind::DynamicCast => CastKind::Dynamic,
            TokenKind::ConstCast => CastKind::Const,
            _ => CastKind::Reinterpret,
        };

        self.expect(TokenKind::Lt)?;
        let ty = self.parse_type()?;
        self.close_template()?;
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;

        Ok(Expr::Cast {
            kind,
            ty,
            expr: Box::new(expr),
            span: self.span_from(token.span),
        })
    }

    /// `new T`, `new T(args)`, `new T{args}`, `new T[n]`
    fn parse_new(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::New)?.span;
        let base = self.parse_base_type()?;
        let ty = self.parse_declarator_suffix(base);

        let (args, array_size) = if self.consume(TokenKind::LBracket) {
            let size = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            (Vec::new(), Some(Box::new(size)))
        } else if self.consume(TokenKind::LParen) {
            (self.parse_args(TokenKind::RParen)?, None)
        } else if self.consume(TokenKind::LBrace) {
            (self.parse_args(TokenKind::RBrace)?, None)
        } else {
            (Vec::new(), None)
        };

        Ok(Expr::New {
            ty,
            args,
            array_size,
            span: self.span_from(start),
        })
    }

    /// `[captures](params) mutable -> T { body }`
    fn parse_lambda(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::LBracket)?.span;

        let mut captures = Vec::new();
        while !self.check(TokenKind::RBracket) {
            let capture = match self.kind() {
                TokenKind::Assign => {
                    self.advance();
                    Capture::DefaultByValue
                }
                TokenKind::Amp => {
                    self.advance();
                    if self.kind().is_name() {
                        Capture::ByRef(self.parse_ident()?)
                    } else {
                        Capture::DefaultByRef
                    }
                }
                _ => Capture::ByValue(self.parse_ident()?),
            };
            captures.push(capture);
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;

        let params = if self.consume(TokenKind::LParen) {
            let params = self.parse_params()?;
            self.expect(TokenKind::RParen)?;
            params
        } else {
            Vec::new()
        };
        if self.check_contextual("mutable") {
            self.advance();
        }
        let ret_type = if self.consume(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_block()?;

        Ok(Expr::Lambda {
            captures,
            params,
            ret_type,
            body,
            span: self.span_from(start),
        })
    }

    pub(super) fn parse_init_list(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let elements = self.parse_args(TokenKind::RBrace)?;
        Ok(Expr::InitList {
            elements,
            span: self.span_from(start),
        })
    }

    // ==================== Types ====================

    /// Whether the current token can only begin a type here
    pub(super) fn starts_type(&self) -> bool {
        let kind = self.kind();
        kind.is_primitive_type()
            || kind.is_type_qualifier()
            || kind.is_container()
            || matches!(
                kind,
                TokenKind::Class | TokenKind::Struct | TokenKind::Enum | TokenKind::Union
            )
            || (kind == TokenKind::Ident && self.is_type_name(&self.current.text))
    }

    /// Full type: qualifiers, base name, pointer and reference suffixes
    pub(super) fn parse_type(&mut self) -> Result<Type> {
        let base = self.parse_base_type()?;
        Ok(self.parse_declarator_suffix(base))
    }

    /// Qualifiers and base name. `unsigned`, `short` and `long` without a
    /// base name mean `int`.
    pub(super) fn parse_base_type(&mut self) -> Result<Type> {
        let start = self.current.span;
        let mut qualifiers = Vec::new();
        self.parse_qualifiers(&mut qualifiers);

        if matches!(
            self.kind(),
            TokenKind::Class | TokenKind::Struct | TokenKind::Enum | TokenKind::Union
        ) || self.check_contextual("typename")
        {
            self.advance();
        }

        let implicit_int = qualifiers.iter().any(|q| *q != TypeQualifier::Const);
        let inner = match self.kind() {
            kind if kind.is_primitive_type() => {
                let token = self.advance();
                Type::Named(token.text, token.span)
            }
            kind if kind.is_name() && !implicit_int => {
                let path = self.parse_path()?;
                self.type_from_path(path)?
            }
            _ if implicit_int => Type::Named("int".to_string(), self.previous.span),
            _ => return Err(self.expected_type()),
        };
        self.parse_qualifiers(&mut qualifiers);

        if qualifiers.is_empty() {
            return Ok(inner);
        }
        Ok(Type::Qualified {
            qualifiers,
            inner: Box::new(inner),
            span: self.span_from(start),
        })
    }

    fn parse_qualifiers(&mut self, qualifiers: &mut Vec<TypeQualifier>) {
        loop {
            let qualifier = match self.kind() {
                TokenKind::Const => TypeQualifier::Const,
                TokenKind::Unsigned => TypeQualifier::Unsigned,
                TokenKind::Signed => TypeQualifier::Signed,
                TokenKind::Short => TypeQualifier::Short,
                TokenKind::Long => TypeQualifier::Long,
                _ => return,
            };
            self.advance();
            qualifiers.push(qualifier);
        }
    }

    /// `*`, `&`, `&&` and `const` following a type
    pub(super) fn parse_declarator_suffix(&mut self, mut ty: Type) -> Type {
        while matches!(
            self.kind(),
            TokenKind::Star | TokenKind::Amp | TokenKind::AndAnd | TokenKind::Const
        ) {
            let token = self.advance();
            let span = ty.span().merge(&token.span);
            let inner = Box::new(ty);
            ty = match token.kind {
                TokenKind::Star => Type::Pointer(inner, span),
                TokenKind::Amp => Type::Reference(inner, span),
                TokenKind::AndAnd => Type::RvalueReference(inner, span),
                _ => Type::Qualified {
                    qualifiers: vec![TypeQualifier::Const],
                    inner,
                    span,
                },
            };
        }
        ty
    }

    /// Named type for a parsed path, with template arguments when `<`
    /// follows
    pub(super) fn type_from_path(&mut self, path: Path) -> Result<Type> {
        let span = path.span();
        let base = path.text();
        if !self.consume(TokenKind::Lt) {
            return Ok(Type::Named(base, span));
        }
        let args = self.parse_template_args()?;
        Ok(Type::Template {
            base,
            args,
            span: self.span_from(span),
        })
    }

    /// Arguments after `<`, through the closing `>`
    fn parse_template_args(&mut self) -> Result<Vec<TemplateArg>> {
        let mut args = Vec::new();
        while !matches!(self.kind(), TokenKind::Gt | TokenKind::Shr) {
            let arg = if self.starts_type() || self.kind().is_name() {
                TemplateArg::Type(self.parse_type()?)
            } else {
                TemplateArg::Expr(self.parse_template_expr()?)
            };
            args.push(arg);
            if !self.consume(TokenKind::Comma) {
                break;
            }
        }
        self.close_template()?;
        Ok(args)
    }
}

// ==================== Library calls ====================

/// Callee name when it is a plain or `std::`-qualified identifier
fn library_call_name(func: &Expr) -> Option<&str> {
    match func {
        Expr::Ident(ident) => Some(&ident.name),
        Expr::Scope { scope, name, .. } => match scope.as_ref() {
            Expr::Ident(scope) if scope.name == "std" => Some(&name.name),
            _ => None,
        },
        _ => None,
    }
}

/// Call node; library functions with a dedicated shape get it when the
/// argument count fits
fn make_call(func: Expr, args: Vec<Expr>, span: Span) -> Expr {
    let shaped = match library_call_name(&func) {
        Some(name) => shape_library_call(name, args, span),
        None => Err(args),
    };
    match shaped {
        Ok(expr) => expr,
        Err(args) => Expr::Call {
            func: Box::new(func),
            args,
            span,
        },
    }
}

fn shape_library_call(name: &str, args: Vec<Expr>, span: Span) -> std::result::Result<Expr, Vec<Expr>> {
    let args = match name {
        "sort" => match <[Expr; 3]>::try_from(args) {
            Ok([first, last, comparator]) => {
                return Ok(Expr::Sort {
                    first: Box::new(first),
                    last: Box::new(last),
                    comparator: Some(Box::new(comparator)),
                    span,
                })
            }
            Err(args) => match <[Expr; 2]>::try_from(args) {
                Ok([first, last]) => {
                    return Ok(Expr::Sort {
                        first: Box::new(first),
                        last: Box::new(last),
                        comparator: None,
                        span,
                    })
                }
                Err(args) => args,
            },
        },
        "find" => match <[Expr; 3]>::try_from(args) {
            Ok([first, last, value]) => {
                return Ok(Expr::Find {
                    first: Box::new(first),
                    last: Box::new(last),
                    value: Box::new(value),
                    span,
                })
            }
            Err(args) => args,
        },
        "accumulate" => match <[Expr; 3]>::try_from(args) {
            Ok([first, last, init]) => {
                return Ok(Expr::Accumulate {
                    first: Box::new(first),
                    last: Box::new(last),
                    init: Box::new(init),
                    span,
                })
            }
            Err(args) => args,
        },
        "printf" | "scanf" if !args.is_empty() => {
            let mut args = args;
            let format = Box::new(args.remove(0));
            return Ok(if name == "printf" {
                Expr::Printf { format, args, span }
            } else {
                Expr::Scanf { format, args, span }
            });
        }
        "malloc" | "free" | "abs" => match <[Expr; 1]>::try_from(args) {
            Ok([arg]) => {
                let arg = Box::new(arg);
                return Ok(match name {
                    "malloc" => Expr::Malloc { size: arg, span },
                    "free" => Expr::Free { ptr: arg, span },
                    _ => Expr::Abs { value: arg, span },
                });
            }
            Err(args) => args,
        },
        "getline" => match <[Expr; 3]>::try_from(args) {
            Ok([stream, target, delimiter]) => {
                return Ok(Expr::Getline {
                    stream: Box::new(stream),
                    target: Box::new(target),
                    delimiter: Some(Box::new(delimiter)),
                    span,
                })
            }
            Err(args) => match <[Expr; 2]>::try_from(args) {
                Ok([stream, target]) => {
                    return Ok(Expr::Getline {
                        stream: Box::new(stream),
                        target: Box::new(target),
                        delimiter: None,
                        span,
                    })
                }
                Err(args) => args,
            },
        },
        "printf" | "scanf" => args,
        _ => return Err(args),
    };

    debug!("`{}` with {} argument(s) parsed as a generic call", name, args.len());
    Err(args)
}
