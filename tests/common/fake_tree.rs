use std::cell::Cell;
use std::rc::Rc;

use ui_scrape::tree::node::{NodeError, UiNode};

/// Counts handle acquisitions and releases across one fake tree.
#[derive(Debug, Default)]
pub struct Tracker {
    acquired: Cell<usize>,
    released: Cell<usize>,
    double_released: Cell<usize>,
}

impl Tracker {
    pub fn acquired(&self) -> usize {
        self.acquired.get()
    }

    pub fn released(&self) -> usize {
        self.released.get()
    }

    pub fn double_released(&self) -> usize {
        self.double_released.get()
    }

    pub fn outstanding(&self) -> usize {
        self.acquired.get() - self.released.get()
    }
}

/// Blueprint of one fake node.
#[derive(Clone, Default)]
pub struct FakeSpec {
    pub class_name: String,
    pub text: Option<String>,
    pub description: Option<String>,
    pub resource_id: Option<String>,
    pub clickable: bool,
    pub editable: bool,
    pub children: Vec<FakeSpec>,
    /// Acquisition succeeds but every read reports a stale node.
    pub stale: bool,
    /// Acquiring this node fails outright.
    pub unreachable: bool,
    /// Runs when the node's class name is read.
    pub on_visit: Option<Rc<dyn Fn()>>,
}

impl FakeSpec {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            ..Self::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn stale(mut self) -> Self {
        self.stale = true;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn on_visit(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_visit = Some(Rc::new(hook));
        self
    }

    pub fn child(mut self, child: FakeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = FakeSpec>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A tree the walker can traverse, with release tracking.
pub struct FakeTree {
    spec: Rc<FakeSpec>,
    tracker: Rc<Tracker>,
}

impl FakeTree {
    pub fn new(spec: FakeSpec) -> Self {
        Self {
            spec: Rc::new(spec),
            tracker: Rc::new(Tracker::default()),
        }
    }

    /// Acquire the root handle.
    pub fn root(&self) -> FakeNode {
        FakeNode::acquire(Rc::clone(&self.spec), Rc::clone(&self.tracker))
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}

pub struct FakeNode {
    spec: Rc<FakeSpec>,
    tracker: Rc<Tracker>,
    released: bool,
}

impl FakeNode {
    fn acquire(spec: Rc<FakeSpec>, tracker: Rc<Tracker>) -> Self {
        tracker.acquired.set(tracker.acquired.get() + 1);
        Self {
            spec,
            tracker,
            released: false,
        }
    }

    fn live(&self) -> Result<&FakeSpec, NodeError> {
        if self.spec.stale {
            Err(NodeError::Stale)
        } else {
            Ok(&self.spec)
        }
    }
}

impl UiNode for FakeNode {
    fn class_name(&self) -> Result<String, NodeError> {
        let spec = self.live()?;
        if let Some(hook) = &spec.on_visit {
            hook();
        }
        Ok(spec.class_name.clone())
    }

    fn text(&self) -> Result<Option<String>, NodeError> {
        Ok(self.live()?.text.clone())
    }

    fn content_description(&self) -> Result<Option<String>, NodeError> {
        Ok(self.live()?.description.clone())
    }

    fn resource_id(&self) -> Result<Option<String>, NodeError> {
        Ok(self.live()?.resource_id.clone())
    }

    fn is_clickable(&self) -> Result<bool, NodeError> {
        Ok(self.live()?.clickable)
    }

    fn is_editable(&self) -> Result<bool, NodeError> {
        Ok(self.live()?.editable)
    }

    fn child_count(&self) -> Result<usize, NodeError> {
        Ok(self.live()?.children.len())
    }

    fn child(&self, index: usize) -> Result<Option<Self>, NodeError> {
        let Some(child) = self.live()?.children.get(index) else {
            return Ok(None);
        };
        if child.unreachable {
            return Err(NodeError::Stale);
        }
        Ok(Some(FakeNode::acquire(
            Rc::new(child.clone()),
            Rc::clone(&self.tracker),
        )))
    }

    fn release(&mut self) {
        if self.released {
            self.tracker
                .double_released
                .set(self.tracker.double_released.get() + 1);
            return;
        }
        self.released = true;
        self.tracker.released.set(self.tracker.released.get() + 1);
    }
}
