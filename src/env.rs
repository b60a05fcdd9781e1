// Layered name environment, shared by the typechecker's value environment
// (spec §4.1) and the affine range environment (spec §4.2): a
// RefCell-guarded scope plus an Rc-linked parent chain, so child scopes can
// be created and dropped cheaply while lookups still walk outward to
// enclosing scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::Rc;

pub type Node<T> = Rc<T>;

pub struct Env<T> {
    scope: RefCell<HashMap<String, Node<T>>>,
    parent: Option<Node<Env<T>>>,
}

impl<T> Env<T>
where
    T: Clone + Debug,
{
    fn new(parent: Option<Node<Env<T>>>) -> Env<T> {
        Env { scope: RefCell::new(HashMap::new()), parent }
    }

    /// A fresh top-level scope with no parent.
    pub fn root() -> Env<T> {
        Self::new(None)
    }

    /// A child scope chained off `parent`. Lookups that miss locally fall
    /// through to `parent`, and on up the chain.
    pub fn chain(parent: &Node<Env<T>>) -> Env<T> {
        Self::new(Some(parent.clone()))
    }

    /// Look up an identifier anywhere in the scope chain, innermost first.
    pub fn get(&self, key: &str) -> Option<Node<T>> {
        if let Some(value) = self.scope.borrow().get(key) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.get(key)
        } else {
            None
        }
    }

    /// Bind `key` to `value` in the current (innermost) scope, shadowing
    /// any binding of the same name in an enclosing scope.
    pub fn define(&self, key: &str, value: T) {
        self.scope.borrow_mut().insert(key.to_string(), Rc::new(value));
    }

    /// Import a whole batch of bindings into the current scope at once.
    pub fn import<'a, I>(&self, bindings: I)
    where
        I: IntoIterator<Item = (&'a str, T)>,
    {
        for (k, v) in bindings {
            self.define(k, v);
        }
    }
}
