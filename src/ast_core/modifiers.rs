//! Declaration modifiers as a bit set.

use crate::core::errors::{AnalysisError, Result};
use std::fmt;

bitflags::bitflags! {
    /// Модификаторы объявления. `IN`/`OUT` также кодируют вариантность параметров типа.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL = 1 << 3;
        const STATIC = 1 << 4;
        const ABSTRACT = 1 << 5;
        const VIRTUAL = 1 << 6;
        const OVERRIDE = 1 << 7;
        const EXTERN = 1 << 8;
        const ASYNC = 1 << 9;
        const SEALED = 1 << 10;
        const READONLY = 1 << 11;
        const CONST = 1 << 12;
        const UNSAFE = 1 << 13;
        const PARTIAL = 1 << 14;
        const NEW = 1 << 15;
        const FIXED = 1 << 16;
        const IN = 1 << 17;
        const OUT = 1 << 18;
        const REF = 1 << 19;
        const PARAMS = 1 << 20;
        const THIS = 1 << 21;
    }
}

const KEYWORDS: &[(&str, Modifiers)] = &[
    ("public", Modifiers::PUBLIC),
    ("private", Modifiers::PRIVATE),
    ("protected", Modifiers::PROTECTED),
    ("internal", Modifiers::INTERNAL),
    ("static", Modifiers::STATIC),
    ("abstract", Modifiers::ABSTRACT),
    ("virtual", Modifiers::VIRTUAL),
    ("override", Modifiers::OVERRIDE),
    ("extern", Modifiers::EXTERN),
    ("async", Modifiers::ASYNC),
    ("sealed", Modifiers::SEALED),
    ("readonly", Modifiers::READONLY),
    ("const", Modifiers::CONST),
    ("unsafe", Modifiers::UNSAFE),
    ("partial", Modifiers::PARTIAL),
    ("new", Modifiers::NEW),
    ("fixed", Modifiers::FIXED),
    ("in", Modifiers::IN),
    ("out", Modifiers::OUT),
    ("ref", Modifiers::REF),
    ("params", Modifiers::PARAMS),
    ("this", Modifiers::THIS),
];

impl Modifiers {
    pub fn from_keyword(keyword: &str) -> Result<Self> {
        KEYWORDS
            .iter()
            .find(|(kw, _)| *kw == keyword)
            .map(|(_, m)| *m)
            .ok_or_else(|| AnalysisError::UnknownModifier(keyword.to_string()))
    }

    pub fn from_keywords<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keywords.into_iter().try_fold(Modifiers::empty(), |acc, kw| Ok(acc | Self::from_keyword(kw.as_ref())?))
    }

    /// Ключевые слова в каноническом порядке.
    pub fn keywords(self) -> Vec<&'static str> {
        KEYWORDS.iter().filter(|(_, m)| self.contains(*m)).map(|(kw, _)| *kw).collect()
    }

    /// virtual/abstract/override: вставка таких членов требует перестройки vtable.
    pub fn is_virtual_like(self) -> bool {
        self.intersects(Modifiers::VIRTUAL | Modifiers::ABSTRACT | Modifiers::OVERRIDE)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keywords().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keywords() {
        let m = Modifiers::from_keywords(["public", "static"]).unwrap();
        assert_eq!(m, Modifiers::PUBLIC | Modifiers::STATIC);
        assert_eq!(m.to_string(), "public static");
        assert!(!m.is_virtual_like());
        assert!(Modifiers::OVERRIDE.is_virtual_like());
    }

    #[test]
    fn rejects_unknown_keyword() {
        let err = Modifiers::from_keyword("volatile").unwrap_err();
        assert_eq!(err.to_string(), "Unknown modifier keyword: volatile");
    }
}
