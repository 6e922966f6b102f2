//! Tree visualization for hop subgraphs.
//!
//! Hops form a DAG, so shared inputs are printed once and referenced as
//! `[id] → (see above)` afterwards.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use ptree::{Style, TreeItem};

use crate::{HopGraph, HopId};

#[derive(Clone)]
struct HopTree<'g> {
    graph: &'g HopGraph,
    id: HopId,
    visited: Rc<RefCell<HashSet<HopId>>>,
    is_backref: RefCell<bool>,
}

impl TreeItem for HopTree<'_> {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        let mut visited = self.visited.borrow_mut();
        if !visited.insert(self.id) {
            *self.is_backref.borrow_mut() = true;
            return write!(f, "[{}] → (see above)", self.id);
        }
        match self.graph.get(self.id) {
            Some(hop) => write!(f, "{hop}"),
            None => write!(f, "[{}] <unknown>", self.id),
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        if *self.is_backref.borrow() {
            return Cow::Borrowed(&[]);
        }
        let inputs = self.graph.get(self.id).map(|h| h.inputs()).unwrap_or_default();
        Cow::Owned(
            inputs
                .iter()
                .map(|&id| HopTree {
                    graph: self.graph,
                    id,
                    visited: self.visited.clone(),
                    is_backref: RefCell::new(false),
                })
                .collect(),
        )
    }
}

impl HopGraph {
    /// Render the subgraph rooted at `root` as an ASCII tree.
    pub fn tree(&self, root: HopId) -> String {
        let tree = HopTree { graph: self, id: root, visited: Rc::default(), is_backref: RefCell::new(false) };
        let mut buf = Vec::new();
        if ptree::write_tree(&tree, &mut buf).is_err() {
            return format!("[{root}] <unrenderable>");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
