//! String interning.
//!
//! Property names are compared by identity. Every name an interpreter sees is
//! turned into an [`Atom`] first: the well-known names come from a
//! [`LiteralTable`] that is built once and shared read-only between
//! interpreters, everything else is added to the interpreter's own
//! [`Interner`].

use crate::types::JsString;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Canonical handle for an interned string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

impl Atom {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

macro_rules! well_known_atoms {
    ($($name:ident = $text:literal,)*) => {
        /// Atoms the engine refers to directly. Their indices are fixed by the
        /// order of this list, which is also the seed order of every
        /// [`LiteralTable`].
        pub mod atoms {
            use super::Atom;
            well_known_atoms!(@consts 0u32; $($name,)*);
        }

        const WELL_KNOWN: &[&str] = &[$($text,)*];
    };
    (@consts $n:expr; $name:ident, $($rest:ident,)*) => {
        pub const $name: Atom = Atom($n);
        well_known_atoms!(@consts $n + 1u32; $($rest,)*);
    };
    (@consts $n:expr;) => {};
}

well_known_atoms! {
    EMPTY = "",
    LENGTH = "length",
    PROTOTYPE = "prototype",
    CONSTRUCTOR = "constructor",
    TO_STRING = "toString",
    VALUE_OF = "valueOf",
    ARGUMENTS = "arguments",
    CALLEE = "callee",
    NAME = "name",
    MESSAGE = "message",
    UNDEFINED = "undefined",
    NAN = "NaN",
    INFINITY = "Infinity",
    EVAL = "eval",
    OBJECT = "Object",
    FUNCTION = "Function",
    ARRAY = "Array",
    STRING = "String",
    NUMBER = "Number",
    BOOLEAN = "Boolean",
    MATH = "Math",
    ERROR = "Error",
    EVAL_ERROR = "EvalError",
    RANGE_ERROR = "RangeError",
    REFERENCE_ERROR = "ReferenceError",
    SYNTAX_ERROR = "SyntaxError",
    TYPE_ERROR = "TypeError",
    URI_ERROR = "URIError",
    JOIN = "join",
    TO_LOCALE_STRING = "toLocaleString",
}

/// Process-wide, read-only table of literal strings.
///
/// Built once (usually through [`LiteralTable::standard`]) and handed to each
/// interpreter at construction. Hosts may add their own literals with
/// [`LiteralTable::with_extra`] before sharing the table.
#[derive(Debug)]
pub struct LiteralTable {
    names: Vec<Box<[u16]>>,
}

impl LiteralTable {
    pub fn standard() -> Arc<LiteralTable> {
        Arc::new(Self::with_extra(&[]))
    }

    pub fn with_extra(extra: &[&str]) -> LiteralTable {
        let mut names: Vec<Box<[u16]>> = Vec::with_capacity(WELL_KNOWN.len() + extra.len());
        for s in WELL_KNOWN.iter().chain(extra) {
            let units: Box<[u16]> = s.encode_utf16().collect();
            if !names.contains(&units) {
                names.push(units);
            }
        }
        LiteralTable { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per-interpreter intern table, seeded from a shared [`LiteralTable`].
/// Entries are never removed.
pub struct Interner {
    literals: Arc<LiteralTable>,
    strings: Vec<JsString>,
    index: FxHashMap<JsString, Atom>,
}

impl Interner {
    pub fn new(literals: Arc<LiteralTable>) -> Self {
        let mut interner = Interner {
            strings: Vec::with_capacity(literals.len()),
            index: FxHashMap::default(),
            literals,
        };
        for i in 0..interner.literals.len() {
            let s = JsString::from_units(interner.literals.names[i].to_vec());
            interner.insert(s);
        }
        interner
    }

    fn insert(&mut self, s: JsString) -> Atom {
        let atom = Atom(self.strings.len() as u32);
        self.strings.push(s.clone());
        self.index.insert(s, atom);
        atom
    }

    pub fn intern(&mut self, s: &JsString) -> Atom {
        match self.index.get(s) {
            Some(&atom) => atom,
            None => self.insert(s.clone()),
        }
    }

    pub fn intern_str(&mut self, s: &str) -> Atom {
        self.intern(&JsString::from_str(s))
    }

    pub fn intern_units(&mut self, units: &[u16]) -> Atom {
        self.intern(&JsString::from_units(units.to_vec()))
    }

    /// Looks a string up without adding it.
    pub fn lookup(&self, s: &JsString) -> Option<Atom> {
        self.index.get(s).copied()
    }

    pub fn resolve(&self, atom: Atom) -> &JsString {
        &self.strings[atom.index()]
    }

    /// True when the atom came from the shared literal table.
    pub fn is_literal(&self, atom: Atom) -> bool {
        atom.index() < self.literals.len()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_atoms_resolve_to_their_text() {
        let interner = Interner::new(LiteralTable::standard());
        assert_eq!(interner.resolve(atoms::LENGTH).to_rust_string(), "length");
        assert_eq!(interner.resolve(atoms::TO_LOCALE_STRING).to_rust_string(), "toLocaleString");
        assert!(interner.is_literal(atoms::PROTOTYPE));
    }

    #[test]
    fn interning_is_identity_preserving() {
        let mut interner = Interner::new(LiteralTable::standard());
        let a = interner.intern_str("foo");
        let b = interner.intern(&JsString::from_str("foo"));
        assert_eq!(a, b);
        assert!(!interner.is_literal(a));
        assert_eq!(interner.intern_str("length"), atoms::LENGTH);
    }

    #[test]
    fn literal_table_is_shared_between_interpreters() {
        let table = Arc::new(LiteralTable::with_extra(&["hostName", "length"]));
        let mut first = Interner::new(table.clone());
        let mut second = Interner::new(table);
        assert_eq!(first.intern_str("hostName"), second.intern_str("hostName"));
        let host_name = first.intern_str("hostName");
        assert!(first.is_literal(host_name));
        let local = first.intern_str("onlyHere");
        assert_eq!(second.lookup(&JsString::from_str("onlyHere")), None);
        assert_eq!(first.resolve(local).to_rust_string(), "onlyHere");
    }
}
