use std::sync::Arc;

use kernfuse_hops::HopGraph;

use crate::{BinType, CNode, CNodeRowAgg, CNodeTpl, CPlan, UnaryType};

#[test]
fn test_tree_backreferences_shared_nodes() {
    let mut g = HopGraph::new();
    let x = g.data("X", 10, 10);
    let cx = Arc::new(CNode::data(g.hop(x).unwrap()));
    let e = Arc::new(CNode::unary(cx, UnaryType::Exp));
    let root = Arc::new(CNode::binary(e.clone(), e, BinType::Plus));

    let tree = root.tree();
    assert!(tree.contains("#0 PLUS"));
    assert!(tree.contains("#1 EXP"));
    assert!(tree.contains("DATA(X@h0)"));
    assert!(tree.contains("#1 → (see above)"));
}

#[test]
fn test_plan_tree_header() {
    let mut g = HopGraph::new();
    let x = g.data("X", 10, 10);
    let cx = Arc::new(CNode::data(g.hop(x).unwrap()));
    let out = Arc::new(CNode::unary(cx.clone(), UnaryType::RowSums));
    let plan = CPlan {
        inputs: vec![x],
        template: CNodeTpl::RowAgg(CNodeRowAgg { inputs: vec![cx], output: out, num_vector_intermediates: 0 }),
    };
    let tree = plan.tree();
    assert!(tree.starts_with("ROW_AGG(vector_intermediates=0) inputs=[h0]"));
    assert!(tree.contains("ROW_SUMS : Scalar"));
    assert_eq!(plan.input_position(x), Some(0));
}
