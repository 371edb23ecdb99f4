//! Lexical scope chains and the root runtime that owns every namespace.

use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::{Rc, Weak};

use super::error::EvalError;
use super::interner::{InternedId, Interner};
use super::namespace::{Namespaces, Var};
use super::value::{Symbol, Value};
use crate::config::{LogDomain, LogDomains};

/// State shared by every context of one interpreter.
///
/// Borrows of the interner and the namespace table are always short-lived:
/// nothing evaluates while one is held.
pub struct Runtime {
    interner: RefCell<Interner>,
    namespaces: RefCell<Namespaces>,
    current_ns: Cell<InternedId>,
    log: Cell<LogDomains>,
    output: RefCell<Box<dyn Write>>,
}

impl Runtime {
    pub fn new(log: LogDomains, output: Box<dyn Write>) -> Rc<Self> {
        let mut namespaces = Namespaces::new();
        namespaces.get_or_create(Interner::CORE);
        Rc::new(Self {
            interner: RefCell::new(Interner::new()),
            namespaces: RefCell::new(namespaces),
            current_ns: Cell::new(Interner::CORE),
            log: Cell::new(log),
            output: RefCell::new(output),
        })
    }

    pub fn intern(&self, name: &str) -> InternedId {
        self.interner.borrow_mut().intern(name)
    }

    pub fn lookup_name(&self, name: &str) -> Option<InternedId> {
        self.interner.borrow().lookup(name)
    }

    pub fn name(&self, id: InternedId) -> Rc<str> {
        self.interner.borrow().name(id)
    }

    pub fn gensym(&self, prefix: &str, suffix: Option<&str>) -> Symbol {
        self.interner.borrow_mut().produce_gensym(prefix, suffix)
    }

    /// `ns/name` for qualified symbols, `name` otherwise.
    pub fn symbol_name(&self, symbol: Symbol) -> String {
        let interner = self.interner.borrow();
        match symbol.ns {
            Some(ns) => format!("{}/{}", interner.name(ns), interner.name(symbol.name)),
            None => interner.name(symbol.name).to_string(),
        }
    }

    pub fn current_namespace(&self) -> InternedId {
        self.current_ns.get()
    }

    pub fn set_current_namespace(&self, ns: InternedId) {
        self.current_ns.set(ns);
    }

    /// Run `f` with the namespace table borrowed mutably. `f` must not
    /// evaluate anything.
    pub fn with_namespaces<R>(&self, f: impl FnOnce(&mut Namespaces) -> R) -> R {
        f(&mut self.namespaces.borrow_mut())
    }

    pub fn log_domains(&self) -> LogDomains {
        self.log.get()
    }

    pub fn set_log(&self, domain: LogDomain, enabled: bool) {
        let mut domains = self.log.get();
        domains.set(domain, enabled);
        self.log.set(domains);
    }

    pub fn logging(&self, domain: LogDomain) -> bool {
        self.log.get().is_enabled(domain)
    }

    pub fn write_output(&self, text: &str) -> Result<(), EvalError> {
        let mut output = self.output.borrow_mut();
        output
            .write_all(text.as_bytes())
            .and_then(|_| output.flush())
            .map_err(|err| EvalError::invalid_argument("print", err.to_string()))
    }

    pub fn set_output(&self, output: Box<dyn Write>) {
        *self.output.borrow_mut() = output;
    }
}

/// One lexical frame. Bindings are searched newest first.
#[derive(Debug)]
pub struct Frame {
    bindings: RefCell<SmallVec<[(Symbol, Value); 4]>>,
    parent: Scope,
}

/// A possibly empty chain of lexical frames.
#[derive(Debug, Clone, Default)]
pub struct Scope(Option<Rc<Frame>>);

impl Scope {
    fn lookup(&self, symbol: Symbol) -> Option<Value> {
        let mut scope = self;
        while let Some(frame) = &scope.0 {
            if let Some((_, value)) = frame
                .bindings
                .borrow()
                .iter()
                .rev()
                .find(|(bound, _)| *bound == symbol)
            {
                return Some(value.clone());
            }
            scope = &frame.parent;
        }
        None
    }
}

/// An evaluation context: the runtime plus the current lexical scope.
#[derive(Clone)]
pub struct Context {
    runtime: Rc<Runtime>,
    scope: Scope,
}

impl Context {
    pub fn root(runtime: Rc<Runtime>) -> Self {
        Self {
            runtime,
            scope: Scope::default(),
        }
    }

    pub fn with_scope(runtime: Rc<Runtime>, scope: Scope) -> Self {
        Self { runtime, scope }
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    pub fn weak_runtime(&self) -> Weak<Runtime> {
        Rc::downgrade(&self.runtime)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// A context with a fresh, empty frame on top of this one.
    pub fn child(&self) -> Context {
        Context {
            runtime: self.runtime.clone(),
            scope: Scope(Some(Rc::new(Frame {
                bindings: RefCell::new(SmallVec::new()),
                parent: self.scope.clone(),
            }))),
        }
    }

    /// Bind `symbol` in the innermost frame, shadowing earlier bindings.
    pub fn push(&mut self, value: Value, symbol: Symbol) {
        if self.scope.0.is_none() {
            *self = self.child();
        }
        if let Some(frame) = &self.scope.0 {
            frame.bindings.borrow_mut().push((symbol, value));
        }
    }

    /// Replace the newest binding of `symbol` in the innermost frame.
    /// Returns false when the frame does not bind it.
    pub fn update(&self, value: Value, symbol: Symbol) -> bool {
        let Some(frame) = &self.scope.0 else {
            return false;
        };
        let mut bindings = frame.bindings.borrow_mut();
        match bindings.iter_mut().rev().find(|(bound, _)| *bound == symbol) {
            Some(slot) => {
                slot.1 = value;
                true
            }
            None => false,
        }
    }

    /// Number of bindings in the innermost frame.
    pub fn frame_len(&self) -> usize {
        self.scope
            .0
            .as_ref()
            .map_or(0, |frame| frame.bindings.borrow().len())
    }

    /// Overwrite the innermost frame's bindings in order.
    pub fn rebind_positional(&self, values: impl IntoIterator<Item = Value>) {
        if let Some(frame) = &self.scope.0 {
            let mut bindings = frame.bindings.borrow_mut();
            for (slot, value) in bindings.iter_mut().zip(values) {
                slot.1 = value;
            }
        }
    }

    /// Lexical bindings first, then namespace vars. An unbound var yields
    /// `Value::Unbound` rather than failing.
    pub fn resolve_binding(&self, symbol: Symbol) -> Option<Value> {
        if symbol.ns.is_none() {
            if let Some(value) = self.scope.lookup(symbol) {
                return Some(value);
            }
            if symbol.name == Interner::CURRENT_NS {
                return Some(Value::Namespace(self.runtime.current_namespace()));
            }
        }
        let var = self.resolve_var(symbol)?;
        Some(var.get().unwrap_or(Value::Unbound(var)))
    }

    /// Namespace lookup only. Qualified symbols see the named namespace's
    /// own vars; unqualified ones see the current namespace and its refers.
    pub fn resolve_var(&self, symbol: Symbol) -> Option<Rc<Var>> {
        self.runtime.with_namespaces(|namespaces| match symbol.ns {
            Some(ns) => namespaces.get(ns)?.own(symbol.name),
            None => namespaces
                .get(self.runtime.current_namespace())?
                .lookup(symbol.name),
        })
    }

    /// Intern `name` in the current namespace and bind it.
    pub fn set_var(&self, name: InternedId, value: Value) -> Result<Rc<Var>, EvalError> {
        let var = self.set_unbound_var(name)?;
        var.set(value);
        Ok(var)
    }

    /// Intern `name` in the current namespace without touching its value.
    pub fn set_unbound_var(&self, name: InternedId) -> Result<Rc<Var>, EvalError> {
        let current = self.runtime.current_namespace();
        let var = self
            .runtime
            .with_namespaces(|namespaces| namespaces.get_mut(current).map(|ns| ns.intern(name)));
        var.ok_or_else(|| EvalError::InvalidNamespace {
            namespace: self.runtime.name(current).to_string(),
        })
    }

    pub fn intern(&self, name: &str) -> InternedId {
        self.runtime.intern(name)
    }

    pub fn name(&self, id: InternedId) -> Rc<str> {
        self.runtime.name(id)
    }

    pub fn symbol_name(&self, symbol: Symbol) -> String {
        self.runtime.symbol_name(symbol)
    }

    pub fn logging(&self, domain: LogDomain) -> bool {
        self.runtime.logging(domain)
    }
}
