//! Symbol table
//!
//! Flat mapping from declared names to their declared types, filled in by
//! the parser. It is not interpreted here; consumers use it to tell
//! keyed (map-like) indexing from positional indexing.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::frontend::ast::Type;
use crate::frontend::token::TokenKind;

/// Bound on typedef/alias chains followed by [`SymbolTable::container_of`]
const MAX_ALIAS_DEPTH: usize = 8;

/// Standard container family of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerKind {
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
    Span,
    Valarray,
}

impl ContainerKind {
    /// Container family for a type name, with or without a `std::` prefix
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("std::").unwrap_or(name);
        let kind = match TokenKind::keyword_from_str(name)? {
            TokenKind::Vector => Self::Vector,
            TokenKind::Map => Self::Map,
            TokenKind::Set => Self::Set,
            TokenKind::List => Self::List,
            TokenKind::Deque => Self::Deque,
            TokenKind::UnorderedMap => Self::UnorderedMap,
            TokenKind::UnorderedSet => Self::UnorderedSet,
            TokenKind::Multimap => Self::Multimap,
            TokenKind::Multiset => Self::Multiset,
            TokenKind::Stack => Self::Stack,
            TokenKind::Queue => Self::Queue,
            TokenKind::PriorityQueue => Self::PriorityQueue,
            TokenKind::Bitset => Self::Bitset,
            TokenKind::Array => Self::Array,
            TokenKind::ForwardList => Self::ForwardList,
            TokenKind::Pair => Self::Pair,
            TokenKind::Tuple => Self::Tuple,
            TokenKind::String => Self::String,
            TokenKind::Optional => Self::Optional,
            TokenKind::Variant => Self::Variant,
            TokenKind::Any => Self::Any,
            TokenKind::StdSpan => Self::Span,
            TokenKind::Valarray => Self::Valarray,
            _ => return None,
        };
        Some(kind)
    }

    /// Indexing `c[k]` looks up a key rather than a position
    pub fn is_associative(&self) -> bool {
        matches!(self, Self::Map | Self::UnorderedMap | Self::Multimap)
    }
}

/// Name -> declared type. Later declarations replace earlier ones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Type>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: Type) {
        self.symbols.insert(name.into(), ty);
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.symbols.get(name)
    }

    /// Container family of a declared name, following typedef and
    /// `using` aliases
    pub fn container_of(&self, name: &str) -> Option<ContainerKind> {
        let mut ty = self.lookup(name)?;
        for _ in 0..MAX_ALIAS_DEPTH {
            let base = ty.base_name();
            if let Some(kind) = ContainerKind::from_name(base) {
                return Some(kind);
            }
            ty = self.lookup(base)?;
        }
        None
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.symbols.iter().map(|(name, ty)| (name.as_str(), ty))
    }
}
