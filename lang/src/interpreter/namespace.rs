//! Namespaces and the vars they own.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::interner::InternedId;
use super::value::{Symbol, Value};

#[derive(Debug, Clone)]
enum VarState {
    Unbound,
    Bound(Value),
}

/// A named global cell. Reads hand out a clone of the current value.
pub struct Var {
    name: Symbol,
    state: RefCell<VarState>,
}

impl Var {
    pub fn new(name: Symbol, value: Option<Value>) -> Self {
        let state = match value {
            Some(value) => VarState::Bound(value),
            None => VarState::Unbound,
        };
        Self {
            name,
            state: RefCell::new(state),
        }
    }

    /// Fully qualified name of the var.
    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn get(&self) -> Option<Value> {
        match &*self.state.borrow() {
            VarState::Bound(value) => Some(value.clone()),
            VarState::Unbound => None,
        }
    }

    pub fn set(&self, value: Value) {
        *self.state.borrow_mut() = VarState::Bound(value);
    }

    pub fn is_bound(&self) -> bool {
        matches!(&*self.state.borrow(), VarState::Bound(_))
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("name", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[derive(Debug)]
pub struct Namespace {
    name: InternedId,
    /// Vars owned by this namespace.
    mappings: HashMap<InternedId, Rc<Var>>,
    /// Vars referred from other namespaces.
    refers: HashMap<InternedId, Rc<Var>>,
}

impl Namespace {
    pub fn new(name: InternedId) -> Self {
        Self {
            name,
            mappings: HashMap::new(),
            refers: HashMap::new(),
        }
    }

    pub fn name(&self) -> InternedId {
        self.name
    }

    /// Own vars shadow referred ones.
    pub fn lookup(&self, name: InternedId) -> Option<Rc<Var>> {
        self.mappings
            .get(&name)
            .or_else(|| self.refers.get(&name))
            .cloned()
    }

    pub fn own(&self, name: InternedId) -> Option<Rc<Var>> {
        self.mappings.get(&name).cloned()
    }

    /// The var owned under `name`, created unbound if missing.
    pub fn intern(&mut self, name: InternedId) -> Rc<Var> {
        let ns = self.name;
        self.mappings
            .entry(name)
            .or_insert_with(|| Rc::new(Var::new(Symbol::qualified(ns, name), None)))
            .clone()
    }

    /// Remove an own or referred mapping. Returns whether anything was removed.
    pub fn unmap(&mut self, name: InternedId) -> bool {
        let own = self.mappings.remove(&name).is_some();
        let referred = self.refers.remove(&name).is_some();
        own || referred
    }

    pub fn mappings(&self) -> impl Iterator<Item = (InternedId, &Rc<Var>)> {
        self.mappings.iter().map(|(name, var)| (*name, var))
    }
}

/// Every namespace known to one interpreter.
#[derive(Debug, Default)]
pub struct Namespaces {
    table: HashMap<InternedId, Namespace>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: InternedId) -> Option<&Namespace> {
        self.table.get(&name)
    }

    pub fn get_mut(&mut self, name: InternedId) -> Option<&mut Namespace> {
        self.table.get_mut(&name)
    }

    pub fn contains(&self, name: InternedId) -> bool {
        self.table.contains_key(&name)
    }

    /// Returns the namespace and whether it was created by this call.
    pub fn get_or_create(&mut self, name: InternedId) -> (&mut Namespace, bool) {
        let created = !self.table.contains_key(&name);
        let ns = self.table.entry(name).or_insert_with(|| Namespace::new(name));
        (ns, created)
    }

    pub fn remove(&mut self, name: InternedId) -> Option<Namespace> {
        self.table.remove(&name)
    }

    /// Make every var currently owned by `source` visible from `target`.
    ///
    /// The copy is a snapshot: vars defined in `source` later are not seen.
    /// If any name already maps to a different var in `target`, nothing is
    /// changed and the conflicting name is returned.
    pub fn refer(&mut self, target: InternedId, source: InternedId) -> Result<usize, ReferError> {
        let incoming: Vec<(InternedId, Rc<Var>)> = match self.table.get(&source) {
            Some(ns) => ns.mappings().map(|(name, var)| (name, var.clone())).collect(),
            None => return Err(ReferError::MissingNamespace(source)),
        };
        let target_ns = self
            .table
            .get_mut(&target)
            .ok_or(ReferError::MissingNamespace(target))?;

        for (name, var) in &incoming {
            if let Some(existing) = target_ns.lookup(*name)
                && !Rc::ptr_eq(&existing, var)
            {
                return Err(ReferError::Conflict(*name));
            }
        }

        let count = incoming.len();
        for (name, var) in incoming {
            target_ns.refers.insert(name, var);
        }
        Ok(count)
    }

    pub fn names(&self) -> impl Iterator<Item = InternedId> + '_ {
        self.table.keys().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferError {
    MissingNamespace(InternedId),
    Conflict(InternedId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::interner::Interner;

    #[test]
    fn var_starts_unbound_until_set() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let var = Var::new(Symbol::qualified(Interner::USER, x), None);
        assert!(!var.is_bound());
        assert_eq!(var.get(), None);
        var.set(Value::Int(3));
        assert_eq!(var.get(), Some(Value::Int(3)));
    }

    #[test]
    fn intern_reuses_existing_var() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut ns = Namespace::new(Interner::USER);
        let a = ns.intern(x);
        let b = ns.intern(x);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.name(), Symbol::qualified(Interner::USER, x));
    }

    #[test]
    fn refer_is_a_snapshot() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let mut namespaces = Namespaces::new();
        namespaces.get_or_create(Interner::CORE);
        namespaces.get_or_create(Interner::USER);

        namespaces.get_mut(Interner::CORE).unwrap().intern(a);
        assert_eq!(namespaces.refer(Interner::USER, Interner::CORE), Ok(1));
        namespaces.get_mut(Interner::CORE).unwrap().intern(b);

        let user = namespaces.get(Interner::USER).unwrap();
        assert!(user.lookup(a).is_some());
        assert!(user.lookup(b).is_none());
    }

    #[test]
    fn refer_conflict_changes_nothing() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let mut namespaces = Namespaces::new();
        namespaces.get_or_create(Interner::CORE);
        namespaces.get_or_create(Interner::USER);
        {
            let core = namespaces.get_mut(Interner::CORE).unwrap();
            core.intern(a);
            core.intern(b);
        }
        namespaces.get_mut(Interner::USER).unwrap().intern(b);

        assert_eq!(
            namespaces.refer(Interner::USER, Interner::CORE),
            Err(ReferError::Conflict(b))
        );
        assert!(namespaces.get(Interner::USER).unwrap().lookup(a).is_none());
    }

    #[test]
    fn unmap_removes_referred_names() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let mut namespaces = Namespaces::new();
        namespaces.get_or_create(Interner::CORE).0.intern(a);
        namespaces.get_or_create(Interner::USER);
        namespaces.refer(Interner::USER, Interner::CORE).unwrap();

        let user = namespaces.get_mut(Interner::USER).unwrap();
        assert!(user.unmap(a));
        assert!(user.lookup(a).is_none());
        assert!(!user.unmap(a));
    }
}
