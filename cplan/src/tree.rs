//! Tree visualization for CNode DAGs.
//!
//! Shared sub-expressions are printed once; later occurrences render as a
//! back-reference to their first appearance.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use ptree::{Style, TreeItem};

use crate::cnode::{CNode, CNodeOp};
use crate::template::{CNodeTpl, CPlan};

#[derive(Clone)]
struct CNodeTree {
    node: Arc<CNode>,
    /// First-visit numbering of shared nodes.
    visited: Rc<RefCell<HashMap<*const CNode, usize>>>,
    is_backref: RefCell<bool>,
}

impl CNodeTree {
    fn new(node: &Arc<CNode>) -> Self {
        Self { node: node.clone(), visited: Rc::default(), is_backref: RefCell::new(false) }
    }
}

impl TreeItem for CNodeTree {
    type Child = Self;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        let mut visited = self.visited.borrow_mut();
        let key = Arc::as_ptr(&self.node);
        if let Some(n) = visited.get(&key) {
            *self.is_backref.borrow_mut() = true;
            return write!(f, "#{n} → (see above)");
        }
        let n = visited.len();
        visited.insert(key, n);
        write!(f, "#{n} {}", format_node(&self.node))
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        if *self.is_backref.borrow() {
            return Cow::Borrowed(&[]);
        }
        let children = self
            .node
            .inputs()
            .into_iter()
            .map(|c| CNodeTree { node: c.clone(), visited: self.visited.clone(), is_backref: RefCell::new(false) })
            .collect::<Vec<_>>();
        Cow::Owned(children)
    }
}

/// Format a single CNode: `OP : dtype shape`.
fn format_node(node: &CNode) -> String {
    let op = match node.op() {
        CNodeOp::Data { hop, name } => format!("DATA({name}@{hop})"),
        CNodeOp::Literal(v) => format!("LIT({v})"),
        CNodeOp::Unary(ty, _) => ty.as_ref().to_string(),
        CNodeOp::Binary(ty, ..) => ty.as_ref().to_string(),
        CNodeOp::Ternary(ty, ..) => ty.as_ref().to_string(),
    };
    if node.is_matrix() { format!("{op} : Matrix {}", node.shape()) } else { format!("{op} : Scalar") }
}

fn render(tree: &CNodeTree) -> String {
    let mut buf = Vec::new();
    if ptree::write_tree(tree, &mut buf).is_err() {
        return "<unrenderable>".to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

impl CNode {
    /// Render the DAG rooted at this node as an ASCII tree.
    pub fn tree(self: &Arc<Self>) -> String {
        render(&CNodeTree::new(self))
    }
}

impl CPlan {
    /// Render the template header, bound inputs and kernel body.
    pub fn tree(&self) -> String {
        let header = match &self.template {
            CNodeTpl::OuterProduct(t) => format!(
                "OUTER_PRODUCT({}, transpose_output={})",
                t.out_prod_type.as_ref(),
                t.transpose_output
            ),
            CNodeTpl::RowAgg(t) => format!("ROW_AGG(vector_intermediates={})", t.num_vector_intermediates),
        };
        let inputs = self.inputs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        format!("{header} inputs=[{inputs}]\n{}", self.output().tree())
    }
}
