//! Per-tree string interner.
//!
//! Identifiers, literals, operator tokens and declaration names of one tree share
//! a single table. Symbol ids are only meaningful inside the tree that produced
//! them: comparisons across trees always go through the resolved text.
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

#[derive(Debug, Default, Clone)]
pub struct StringInterner {
    map: HashMap<String, SymbolId>,
    rev: Vec<String>,
}

impl StringInterner {
    pub fn new() -> Self { Self::default() }

    pub fn intern<S: AsRef<str>>(&mut self, s: S) -> SymbolId {
        let st = s.as_ref();
        if let Some(id) = self.map.get(st) { return *id; }
        let id = SymbolId(self.rev.len() as u32);
        self.rev.push(st.to_string());
        self.map.insert(st.to_string(), id);
        id
    }

    /// Поиск без вставки (для запросов по имени к готовому дереву).
    pub fn lookup(&self, s: &str) -> Option<SymbolId> { self.map.get(s).copied() }

    pub fn resolve(&self, sym: SymbolId) -> &str { &self.rev[sym.0 as usize] }
    pub fn len(&self) -> usize { self.rev.len() }
    pub fn is_empty(&self) -> bool { self.rev.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut i = StringInterner::new();
        let a = i.intern("Count");
        let b = i.intern("Count");
        assert_eq!(a, b);
        assert_eq!(i.len(), 1);
        assert_eq!(i.resolve(a), "Count");
        assert_eq!(i.lookup("Count"), Some(a));
        assert_eq!(i.lookup("Missing"), None);
    }
}
