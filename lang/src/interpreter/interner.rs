//! Interning store for symbol, keyword and namespace names.
//!
//! Every name the reader or the runtime produces is mapped to a small
//! integer identifier so that comparisons, hashing and namespace tables work
//! on `Copy` keys instead of strings.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::value::Symbol;

/// Stable identifier for an interned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternedId(u32);

impl InternedId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InternedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Names interned at construction, in this order, so their ids are constants.
const PRELOADED: [&str; 7] = ["core", "user", "&", "*ns*", "*1", "*2", "*3"];

#[derive(Debug)]
pub struct Interner {
    ids: HashMap<Rc<str>, InternedId>,
    names: Vec<Rc<str>>,
    gensym_counter: u64,
}

impl Interner {
    pub const CORE: InternedId = InternedId(0);
    pub const USER: InternedId = InternedId(1);
    pub const AMPERSAND: InternedId = InternedId(2);
    pub const CURRENT_NS: InternedId = InternedId(3);
    pub const RESULT_1: InternedId = InternedId(4);
    pub const RESULT_2: InternedId = InternedId(5);
    pub const RESULT_3: InternedId = InternedId(6);

    pub fn new() -> Self {
        let mut interner = Self {
            ids: HashMap::with_capacity(512),
            names: Vec::with_capacity(512),
            gensym_counter: 0,
        };
        for name in PRELOADED {
            interner.intern(name);
        }
        interner
    }

    /// Return the id for `name`, interning it if it has not been seen.
    pub fn intern(&mut self, name: &str) -> InternedId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = InternedId(self.names.len() as u32);
        let name: Rc<str> = Rc::from(name);
        self.names.push(name.clone());
        self.ids.insert(name, id);
        id
    }

    /// Look up an existing id without interning.
    pub fn lookup(&self, name: &str) -> Option<InternedId> {
        self.ids.get(name).copied()
    }

    /// The name behind an id.
    ///
    /// Ids are only ever handed out by this store, so an unknown id means the
    /// value was built against a different interpreter. That is a bug in the
    /// host program, not a user error.
    pub fn name(&self, id: InternedId) -> Rc<str> {
        match self.names.get(id.index()) {
            Some(name) => name.clone(),
            None => panic!("interned id {id} has no registered name"),
        }
    }

    /// Produce an unqualified symbol whose name has never been issued by
    /// this store.
    pub fn produce_gensym(&mut self, prefix: &str, suffix: Option<&str>) -> Symbol {
        loop {
            self.gensym_counter += 1;
            let candidate = match suffix {
                Some(suffix) => format!("{prefix}__{}__{suffix}", self.gensym_counter),
                None => format!("{prefix}__{}", self.gensym_counter),
            };
            if !self.ids.contains_key(candidate.as_str()) {
                return Symbol::unqualified(self.intern(&candidate));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preloaded_constants_are_stable() {
        let interner = Interner::new();
        assert_eq!(interner.lookup("core"), Some(Interner::CORE));
        assert_eq!(interner.lookup("user"), Some(Interner::USER));
        assert_eq!(interner.lookup("&"), Some(Interner::AMPERSAND));
        assert_eq!(interner.lookup("*ns*"), Some(Interner::CURRENT_NS));
        assert_eq!(interner.lookup("*1"), Some(Interner::RESULT_1));
        assert_eq!(interner.lookup("*3"), Some(Interner::RESULT_3));
    }

    #[test]
    fn interning_is_one_to_one_and_reversible() {
        let mut interner = Interner::new();
        let a = interner.intern("alpha");
        let b = interner.intern("beta");
        assert_ne!(a, b);
        assert_eq!(interner.intern("alpha"), a);
        assert_eq!(&*interner.name(b), "beta");
    }

    #[test]
    fn gensyms_never_collide_with_existing_names() {
        let mut interner = Interner::new();
        interner.intern("G__1");
        let sym = interner.produce_gensym("G", None);
        assert_eq!(&*interner.name(sym.name), "G__2");

        let other = interner.produce_gensym("x", Some("auto"));
        assert_eq!(&*interner.name(other.name), "x__3__auto");
        assert!(other.ns.is_none());
    }

    #[test]
    #[should_panic(expected = "has no registered name")]
    fn unknown_id_is_fatal() {
        let interner = Interner::new();
        interner.name(InternedId(9_999));
    }
}
