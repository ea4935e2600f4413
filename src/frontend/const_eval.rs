//! Constant-expression evaluator for `#if` / `#elif`
//!
//! Precedence climbing over the directive text. Supports integer
//! literals, `defined(NAME)` / `defined NAME`, unary `! - +`, binary
//! `* / %`, `+ -`, relational, equality, `&&` and `||`, and parentheses.

use crate::frontend::preprocessor::MacroTable;
use thiserror::Error;

/// Maximum nesting when an identifier refers to a macro whose replacement
/// names another macro.
const MAX_EXPANSION_DEPTH: usize = 16;

/// Maximum combined depth of parentheses and unary operators
const MAX_NESTING: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected `{found}` at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("expected `)` at offset {offset}")]
    ExpectedCloseParen { offset: usize },

    #[error("unexpected trailing input at offset {offset}")]
    TrailingInput { offset: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("macro `{0}` expands too deeply")]
    ExpansionTooDeep(String),

    #[error("expression nested too deeply at offset {offset}")]
    NestingTooDeep { offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Or,
    And,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Binary tiers, lowest binding first. Within a tier longer spellings
/// come before their prefixes.
const LEVELS: &[&[(&str, Op)]] = &[
    &[("||", Op::Or)],
    &[("&&", Op::And)],
    &[("==", Op::Eq), ("!=", Op::Ne)],
    &[("<=", Op::Le), (">=", Op::Ge), ("<", Op::Lt), (">", Op::Gt)],
    &[("+", Op::Add), ("-", Op::Sub)],
    &[("*", Op::Mul), ("/", Op::Div), ("%", Op::Rem)],
];

/// Evaluate a directive condition against the given macro table.
pub fn evaluate(expr: &str, macros: &MacroTable) -> Result<i64, EvalError> {
    Evaluator::new(expr, macros, 0, 0).run()
}

struct Evaluator<'a> {
    chars: Vec<char>,
    pos: usize,
    macros: &'a MacroTable,
    /// Macro expansion depth
    depth: usize,
    /// Open parentheses and unary operators, carried into expansions
    nesting: usize,
}

impl<'a> Evaluator<'a> {
    fn new(expr: &str, macros: &'a MacroTable, depth: usize, nesting: usize) -> Self {
        Self {
            chars: expr.chars().collect(),
            pos: 0,
            macros,
            depth,
            nesting,
        }
    }

    fn run(mut self) -> Result<i64, EvalError> {
        let value = self.parse_binary(0)?;
        self.skip_spaces();
        if self.pos < self.chars.len() {
            return Err(EvalError::TrailingInput { offset: self.pos });
        }
        Ok(value)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn at(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn eat(&mut self, text: &str) -> bool {
        self.skip_spaces();
        if self.at(text) {
            self.pos += text.chars().count();
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> EvalError {
        match self.peek() {
            Some(found) => EvalError::UnexpectedChar { found, offset: self.pos },
            None => EvalError::UnexpectedEnd,
        }
    }

    fn parse_binary(&mut self, level: usize) -> Result<i64, EvalError> {
        if level == LEVELS.len() {
            return self.parse_unary();
        }

        let mut left = self.parse_binary(level + 1)?;
        'outer: loop {
            for &(spelling, op) in LEVELS[level] {
                if self.eat(spelling) {
                    let right = self.parse_binary(level + 1)?;
                    left = apply(op, left, right)?;
                    continue 'outer;
                }
            }
            break;
        }
        Ok(left)
    }

    /// Run `parse` one nesting level deeper
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<i64, EvalError>) -> Result<i64, EvalError> {
        if self.nesting >= MAX_NESTING {
            return Err(EvalError::NestingTooDeep { offset: self.pos });
        }
        self.nesting += 1;
        let value = parse(self);
        self.nesting -= 1;
        value
    }

    fn parse_unary(&mut self) -> Result<i64, EvalError> {
        if self.eat("!") {
            let value = self.nested(Self::parse_unary)?;
            return Ok((value == 0) as i64);
        }
        if self.eat("-") {
            let value = self.nested(Self::parse_unary)?;
            return value.checked_neg().ok_or(EvalError::Overflow);
        }
        if self.eat("+") {
            return self.nested(Self::parse_unary);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<i64, EvalError> {
        self.skip_spaces();
        let Some(c) = self.peek() else {
            return Err(EvalError::UnexpectedEnd);
        };

        if c == '(' {
            self.pos += 1;
            let value = self.nested(|this| this.parse_binary(0))?;
            if !self.eat(")") {
                return Err(match self.peek() {
                    None => EvalError::UnexpectedEnd,
                    Some(_) => EvalError::ExpectedCloseParen { offset: self.pos },
                });
            }
            return Ok(value);
        }

        if c.is_ascii_digit() {
            return self.parse_number();
        }

        if c.is_alphabetic() || c == '_' {
            let name = self.read_ident();
            if name == "defined" {
                return self.parse_defined();
            }
            return self.expand_ident(&name);
        }

        Err(self.unexpected())
    }

    fn parse_defined(&mut self) -> Result<i64, EvalError> {
        let parenthesized = self.eat("(");
        self.skip_spaces();
        let name = self.read_ident();
        if name.is_empty() {
            return Err(self.unexpected());
        }
        if parenthesized && !self.eat(")") {
            return Err(match self.peek() {
                None => EvalError::UnexpectedEnd,
                Some(_) => EvalError::ExpectedCloseParen { offset: self.pos },
            });
        }
        Ok(self.macros.is_defined(&name) as i64)
    }

    /// Macro names evaluate to their replacement; anything else is 0.
    fn expand_ident(&self, name: &str) -> Result<i64, EvalError> {
        let Some(replacement) = self.macros.get(name) else {
            return Ok(0);
        };
        if self.depth >= MAX_EXPANSION_DEPTH {
            return Err(EvalError::ExpansionTooDeep(name.to_string()));
        }
        Evaluator::new(replacement, self.macros, self.depth + 1, self.nesting).run()
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_number(&mut self) -> Result<i64, EvalError> {
        let (radix, start) = if self.at("0x") || self.at("0X") {
            self.pos += 2;
            (16, self.pos)
        } else {
            (10, self.pos)
        };
        while self.peek().map_or(false, |c| c.is_digit(radix)) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        if digits.is_empty() {
            return Err(self.unexpected());
        }
        // Integer suffixes carry no meaning here
        while matches!(self.peek(), Some('u' | 'U' | 'l' | 'L')) {
            self.pos += 1;
        }
        i64::from_str_radix(&digits, radix).map_err(|_| EvalError::Overflow)
    }
}

fn apply(op: Op, left: i64, right: i64) -> Result<i64, EvalError> {
    let value = match op {
        Op::Or => (left != 0 || right != 0) as i64,
        Op::And => (left != 0 && right != 0) as i64,
        Op::Eq => (left == right) as i64,
        Op::Ne => (left != right) as i64,
        Op::Le => (left <= right) as i64,
        Op::Ge => (left >= right) as i64,
        Op::Lt => (left < right) as i64,
        Op::Gt => (left > right) as i64,
        Op::Add => left.checked_add(right).ok_or(EvalError::Overflow)?,
        Op::Sub => left.checked_sub(right).ok_or(EvalError::Overflow)?,
        Op::Mul => left.checked_mul(right).ok_or(EvalError::Overflow)?,
        Op::Div | Op::Rem if right == 0 => return Err(EvalError::DivisionByZero),
        Op::Div => left.checked_div(right).ok_or(EvalError::Overflow)?,
        Op::Rem => left.checked_rem(right).ok_or(EvalError::Overflow)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> Result<i64, EvalError> {
        evaluate(expr, &MacroTable::new())
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Ok(7));
        assert_eq!(eval("(1 + 2) * 3"), Ok(9));
        assert_eq!(eval("10 - 4 - 3"), Ok(3));
        assert_eq!(eval("17 % 5 * 2"), Ok(4));
    }

    #[test]
    fn test_logical_and_relational() {
        assert_eq!(eval("1 < 2 && 3 >= 3"), Ok(1));
        assert_eq!(eval("0 || 2 == 3"), Ok(0));
        assert_eq!(eval("1 || 0 && 0"), Ok(1));
        assert_eq!(eval("!0 + -1"), Ok(0));
        assert_eq!(eval("2 != 2"), Ok(0));
    }

    #[test]
    fn test_defined_forms() {
        let mut macros = MacroTable::new();
        macros.define("FOO", "");
        assert_eq!(evaluate("defined(FOO)", &macros), Ok(1));
        assert_eq!(evaluate("defined FOO && !defined BAR", &macros), Ok(1));
        assert_eq!(evaluate("defined ( BAR )", &macros), Ok(0));
    }

    #[test]
    fn test_macro_values_and_unknown_identifiers() {
        let mut macros = MacroTable::new();
        macros.define("VERSION", "3");
        macros.define("ALIAS", "VERSION");
        assert_eq!(evaluate("VERSION >= 2", &macros), Ok(1));
        assert_eq!(evaluate("ALIAS * 2", &macros), Ok(6));
        assert_eq!(evaluate("UNKNOWN", &macros), Ok(0));
    }

    #[test]
    fn test_self_referential_macro_is_bounded() {
        let mut macros = MacroTable::new();
        macros.define("LOOP", "LOOP + 1");
        assert_eq!(
            evaluate("LOOP", &macros),
            Err(EvalError::ExpansionTooDeep("LOOP".to_string()))
        );
    }

    #[test]
    fn test_division_by_zero_fails() {
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("5 % (2 - 2)"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_malformed_expressions() {
        assert_eq!(eval("(1 +"), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval(""), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("1 2"), Err(EvalError::TrailingInput { offset: 2 }));
        assert_eq!(eval("(1 2)"), Err(EvalError::ExpectedCloseParen { offset: 3 }));
        assert_eq!(eval("1 << 2"), Err(EvalError::UnexpectedChar { found: '<', offset: 3 }));
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(eval(&deep), Err(EvalError::NestingTooDeep { .. })));
        assert!(matches!(eval(&"!".repeat(100_000)), Err(EvalError::NestingTooDeep { .. })));

        let moderate = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(eval(&moderate), Ok(1));
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(eval("9223372036854775807 + 1"), Err(EvalError::Overflow));
        assert_eq!(eval("99999999999999999999"), Err(EvalError::Overflow));
    }

    #[test]
    fn test_hex_and_suffixes() {
        assert_eq!(eval("0x10 == 16"), Ok(1));
        assert_eq!(eval("200L / 2UL"), Ok(100));
    }
}
