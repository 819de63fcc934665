//! A minimal effect node for exercising the graph without a real effect.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::effect::DebuggerEvent;
use super::subscriber::{EffectId, EffectNode};
use crate::graph::DepId;

pub(crate) struct TestNode {
    id: EffectId,
    computed: bool,
    active: Cell<bool>,
    deps: RefCell<Vec<DepId>>,
    notified: Cell<usize>,
    on_notify: RefCell<Option<Box<dyn Fn()>>>,
}

impl TestNode {
    pub(crate) fn new() -> Rc<Self> {
        Self::build(false)
    }

    pub(crate) fn computed() -> Rc<Self> {
        Self::build(true)
    }

    fn build(computed: bool) -> Rc<Self> {
        Rc::new(Self {
            id: EffectId::new(),
            computed,
            active: Cell::new(true),
            deps: RefCell::new(Vec::new()),
            notified: Cell::new(0),
            on_notify: RefCell::new(None),
        })
    }

    pub(crate) fn erased(self: &Rc<Self>) -> Rc<dyn EffectNode> {
        self.clone()
    }

    /// Run `f` every time the node is notified.
    pub(crate) fn on_notify(&self, f: impl Fn() + 'static) {
        self.on_notify.replace(Some(Box::new(f)));
    }

    pub(crate) fn notified(&self) -> usize {
        self.notified.get()
    }

    pub(crate) fn recorded(&self) -> usize {
        self.deps.borrow().len()
    }
}

impl EffectNode for TestNode {
    fn id(&self) -> EffectId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn is_computed(&self) -> bool {
        self.computed
    }

    fn record_dep(&self, dep: DepId) {
        self.deps.borrow_mut().push(dep);
    }

    fn notify(self: Rc<Self>) {
        self.notified.set(self.notified.get() + 1);
        if let Some(f) = self.on_notify.borrow().as_ref() {
            f();
        }
    }

    fn stop(&self) {
        self.active.set(false);
    }

    fn on_track(&self, _event: &DebuggerEvent) {}
}
