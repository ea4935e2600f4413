//! Preprocessor context owned by one lexer
//!
//! Holds the macro table, the conditional-compilation stack and the
//! warning side channel. The lexer reads directive lines and hands them to
//! [`Preprocessor::handle_directive`]; nothing here is global, so two
//! lexers never observe each other's macros.

use std::collections::HashMap;

use log::{debug, warn};
use serde::Serialize;

use crate::frontend::const_eval;
use crate::frontend::token::TokenKind;
use crate::utils::Span;

// ==================== Macro table ====================

/// An object-like macro
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Macro {
    pub name: String,
    pub replacement: String,
}

/// Name -> replacement mapping
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, replacement: impl Into<String>) {
        let name = name.into();
        let replacement = replacement.into();
        self.macros.insert(name.clone(), Macro { name, replacement });
    }

    /// Returns true if the macro existed
    pub fn undefine(&mut self, name: &str) -> bool {
        self.macros.remove(name).is_some()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Replacement text of a defined macro
    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(|m| m.replacement.as_str())
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

// ==================== Conditional stack ====================

/// One `#if`/`#ifdef`/`#ifndef` group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    /// Tokens are emitted (conjunction with every enclosing frame)
    active: bool,
    /// Some branch of this group has already been selected
    branch_taken: bool,
    seen_else: bool,
}

impl Frame {
    const SENTINEL: Frame = Frame { active: true, branch_taken: true, seen_else: false };
}

/// Conditional-compilation stack. The bottom frame is a sentinel and is
/// never popped.
#[derive(Debug, Clone)]
pub struct ConditionalStack {
    frames: Vec<Frame>,
}

impl Default for ConditionalStack {
    fn default() -> Self {
        Self { frames: vec![Frame::SENTINEL] }
    }
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether tokens at the current position are emitted
    pub fn is_active(&self) -> bool {
        self.top().active
    }

    /// Number of open conditional groups
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Whether the region enclosing the innermost open group is active
    fn parent_active(&self) -> bool {
        match self.frames.len() {
            0 | 1 => true,
            n => self.frames[n - 2].active,
        }
    }

    fn top(&self) -> &Frame {
        // The sentinel guarantees a top frame
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn push(&mut self, condition: bool) {
        let parent = self.is_active();
        self.frames.push(Frame {
            active: parent && condition,
            branch_taken: !parent || condition,
            seen_else: false,
        });
    }

    fn pop(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }
}

// ==================== Diagnostics ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    UnmatchedElse,
    UnmatchedElif,
    UnmatchedEndif,
    ElseAfterElse,
    ElifAfterElse,
    MalformedCondition,
    MissingMacroName,
    FunctionLikeMacro,
    UnterminatedConditional,
}

/// Non-fatal preprocessor warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

// ==================== Directive dispatch ====================

/// Per-lexer preprocessor state
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    macros: MacroTable,
    conditionals: ConditionalStack,
    diagnostics: Vec<Diagnostic>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn macros_mut(&mut self) -> &mut MacroTable {
        &mut self.macros
    }

    pub fn is_active(&self) -> bool {
        self.conditionals.is_active()
    }

    pub fn depth(&self) -> usize {
        self.conditionals.depth()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Replacement for an identifier token, if it names a macro
    pub fn expand(&self, ident: &str) -> Option<&str> {
        self.macros.get(ident)
    }

    /// Process one directive line. `keyword` is the word after `#`, `rest`
    /// the remainder of the (continuation-joined, comment-free) line.
    /// Returns the directive token to emit, or `None` when the directive
    /// sits in an inactive region.
    pub fn handle_directive(
        &mut self,
        keyword: &str,
        rest: &str,
        span: Span,
    ) -> Option<(TokenKind, String)> {
        match keyword {
            "ifdef" | "ifndef" => {
                let emit = self.is_active();
                let negate = keyword == "ifndef";
                let condition = if emit {
                    match leading_ident(rest) {
                        Some(name) => self.macros.is_defined(name) != negate,
                        None => {
                            self.warn(
                                DiagnosticKind::MissingMacroName,
                                format!("#{} without a macro name", keyword),
                                span,
                            );
                            false
                        }
                    }
                } else {
                    false
                };
                self.conditionals.push(condition);
                debug!("#{} {} -> active={}", keyword, rest, self.is_active());
                let kind = if negate { TokenKind::PpIfndef } else { TokenKind::PpIfdef };
                emit.then(|| (kind, rest.to_string()))
            }
            "if" => {
                let emit = self.is_active();
                let condition = emit && self.evaluate(rest, span);
                self.conditionals.push(condition);
                debug!("#if {} -> active={}", rest, self.is_active());
                emit.then(|| (TokenKind::PpIf, rest.to_string()))
            }
            "elif" => self.handle_elif(rest, span),
            "else" => self.handle_else(span),
            "endif" => {
                let emit = self.conditionals.parent_active();
                if !self.conditionals.pop() {
                    self.warn(DiagnosticKind::UnmatchedEndif, "#endif without #if".into(), span);
                }
                emit.then(|| (TokenKind::PpEndif, String::new()))
            }
            _ if !self.is_active() => None,
            "define" => {
                match leading_ident(rest) {
                    Some(name) => {
                        let after = &rest[name.len()..];
                        if after.starts_with('(') {
                            self.warn(
                                DiagnosticKind::FunctionLikeMacro,
                                format!("function-like macro `{}` is not expanded", name),
                                span,
                            );
                        } else {
                            let replacement = after.trim();
                            debug!("#define {} -> `{}`", name, replacement);
                            self.macros.define(name, replacement);
                        }
                    }
                    None => self.warn(
                        DiagnosticKind::MissingMacroName,
                        "#define without a macro name".into(),
                        span,
                    ),
                }
                Some((TokenKind::PpDefine, rest.to_string()))
            }
            "undef" => {
                match leading_ident(rest) {
                    Some(name) => {
                        let existed = self.macros.undefine(name);
                        debug!("#undef {} (was defined: {})", name, existed);
                    }
                    None => self.warn(
                        DiagnosticKind::MissingMacroName,
                        "#undef without a macro name".into(),
                        span,
                    ),
                }
                Some((TokenKind::PpUndef, rest.to_string()))
            }
            "include" => Some((TokenKind::PpInclude, rest.to_string())),
            "pragma" => Some((TokenKind::PpPragma, rest.to_string())),
            _ => {
                let text = if rest.is_empty() {
                    keyword.to_string()
                } else {
                    format!("{} {}", keyword, rest)
                };
                Some((TokenKind::PpUnknown, text))
            }
        }
    }

    /// Report groups still open at end of input
    pub fn finish(&mut self, span: Span) {
        let open = self.conditionals.depth();
        if open > 0 {
            self.warn(
                DiagnosticKind::UnterminatedConditional,
                format!("{} conditional group(s) not closed by #endif", open),
                span,
            );
        }
    }

    fn handle_elif(&mut self, rest: &str, span: Span) -> Option<(TokenKind, String)> {
        if self.conditionals.depth() == 0 {
            self.warn(DiagnosticKind::UnmatchedElif, "#elif without #if".into(), span);
            return self.is_active().then(|| (TokenKind::PpElif, rest.to_string()));
        }

        let parent = self.conditionals.parent_active();
        let frame = *self.conditionals.top();
        let active = if frame.seen_else {
            self.warn(DiagnosticKind::ElifAfterElse, "#elif after #else".into(), span);
            false
        } else if !parent || frame.branch_taken {
            false
        } else {
            self.evaluate(rest, span)
        };

        let top = self.conditionals.top_mut();
        top.active = active;
        top.branch_taken |= active;
        debug!("#elif {} -> active={}", rest, active);
        parent.then(|| (TokenKind::PpElif, rest.to_string()))
    }

    fn handle_else(&mut self, span: Span) -> Option<(TokenKind, String)> {
        if self.conditionals.depth() == 0 {
            self.warn(DiagnosticKind::UnmatchedElse, "#else without #if".into(), span);
            return self.is_active().then(|| (TokenKind::PpElse, String::new()));
        }

        let parent = self.conditionals.parent_active();
        let frame = *self.conditionals.top();
        let active = if frame.seen_else {
            self.warn(DiagnosticKind::ElseAfterElse, "duplicate #else".into(), span);
            false
        } else {
            parent && !frame.branch_taken
        };

        let top = self.conditionals.top_mut();
        top.active = active;
        top.branch_taken = true;
        top.seen_else = true;
        debug!("#else -> active={}", active);
        parent.then(|| (TokenKind::PpElse, String::new()))
    }

    /// Evaluate a condition; failures are reported and count as false
    fn evaluate(&mut self, expr: &str, span: Span) -> bool {
        match const_eval::evaluate(expr, &self.macros) {
            Ok(value) => value != 0,
            Err(err) => {
                self.warn(
                    DiagnosticKind::MalformedCondition,
                    format!("cannot evaluate `{}`: {}", expr, err),
                    span,
                );
                false
            }
        }
    }

    fn warn(&mut self, kind: DiagnosticKind, message: String, span: Span) {
        warn!("{}: {}", span, message);
        self.diagnostics.push(Diagnostic { kind, message, span });
    }
}

/// Leading identifier of a directive argument
fn leading_ident(text: &str) -> Option<&str> {
    let end = text
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '_'))
        .map_or(text.len(), |(i, _)| i);
    let ident = &text[..end];
    match ident.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => Some(ident),
        _ => None,
    }
}
