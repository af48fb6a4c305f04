use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

/// Something that caches results derived from a variable, a custom
/// function or a solve block and must drop them when it changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subscriber {
    Function(usize),
    SolveBlock(usize),
}

pub trait Invalidate {
    /// Drops cached results and compiled code.
    fn invalidate(&self);
    /// Dependents to invalidate next.
    fn subscribers(&self) -> Vec<Subscriber>;
}

#[derive(Debug, Default)]
pub struct Variable {
    pub value: Value,
    pub initialized: bool,
    subscribers: Vec<Subscriber>,
}

pub type VarRef = Rc<RefCell<Variable>>;

impl Variable {
    pub fn new(value: Value) -> VarRef {
        Rc::new(RefCell::new(Variable{value, initialized: true, subscribers: Vec::new()}))
    }

    /// A variable referenced before anything was assigned to it.
    pub fn undefined() -> VarRef {
        Rc::new(RefCell::new(Variable::default()))
    }

    /// Stores a new value and hands back who has to be told about it.
    pub fn assign(&mut self, value: Value) -> Vec<Subscriber> {
        self.value = value;
        self.initialized = true;
        self.subscribers.clone()
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        if !self.subscribers.contains(&subscriber) {
            self.subscribers.push(subscriber);
        }
    }
}
