use test_case::test_case;

use kernfuse_cplan::{BinType, CNodeOp, OutProdType, UnaryType};
use kernfuse_hops::{BinaryOp, HopGraph, UnaryOp};

use crate::test::helpers::*;
use crate::{CloseType, Error, TemplateConfig, TemplateType};

fn template(closed: bool) -> Box<dyn crate::Template> {
    TemplateType::OuterProduct.instantiate(closed, TemplateConfig::default())
}

// ============================================================================
// Predicates
// ============================================================================

#[test_case(256, false; "at_threshold")]
#[test_case(257, true; "above_threshold")]
fn test_open_threshold(n: u64, expected: bool) {
    // R = t(U) %*% V
    let mut g = HopGraph::new();
    let u = g.data("U", 10, n);
    let v = g.data("V", 10, n);
    let tu = g.transpose(u).unwrap();
    let r = g.matmul(tu, v).unwrap();
    assert_eq!(template(false).open(&g, r), expected);
}

#[test]
fn test_open_threshold_is_configurable() {
    let f = OuterProductGraph::new(200, 10);
    let config = TemplateConfig::builder().outer_product_threshold(100).build();
    assert!(!template(false).open(&f.graph, f.uv));
    assert!(TemplateType::OuterProduct.instantiate(false, config).open(&f.graph, f.uv));
}

#[test]
fn test_open_rejects_square_multiply() {
    let mut g = HopGraph::new();
    let a = g.data("A", 1000, 1000);
    let b = g.data("B", 1000, 1000);
    let ab = g.matmul(a, b).unwrap();
    assert!(!template(false).open(&g, ab));
}

#[test]
fn test_fuse() {
    let mut f = OuterProductGraph::new(1000, 10);
    let g = &mut f.graph;
    let s = g.scalar("s");
    let c = g.data("c", 1000, 1);
    let exp = g.unary(UnaryOp::Exp, f.uv).unwrap();
    let cast = g.unary(UnaryOp::Cast, f.uv).unwrap();
    let mult = g.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let plus = g.binary(BinaryOp::Plus, f.x, f.uv).unwrap();
    let scalar = g.binary(BinaryOp::Plus, f.uv, s).unwrap();
    let col = g.binary(BinaryOp::Mult, f.uv, c).unwrap();
    let t = g.transpose(f.uv).unwrap();
    let sum = g.sum(f.uv).unwrap();
    let row_sums = g.row_sums(f.uv).unwrap();
    let final_mm = g.matmul(mult, f.v).unwrap();

    let tpl = template(false);
    let g = &f.graph;
    assert!(tpl.fuse(g, exp, f.uv));
    assert!(!tpl.fuse(g, cast, f.uv));
    assert!(tpl.fuse(g, mult, f.uv));
    assert!(!tpl.fuse(g, plus, f.uv));
    assert!(tpl.fuse(g, scalar, f.uv));
    assert!(tpl.fuse(g, col, f.uv));
    assert!(tpl.fuse(g, t, f.uv));
    assert!(tpl.fuse(g, sum, f.uv));
    assert!(!tpl.fuse(g, row_sums, f.uv));
    assert!(tpl.fuse(g, final_mm, mult));
    assert!(!tpl.fuse(g, f.uv, f.tv));

    assert!(!template(true).fuse(g, exp, f.uv));
}

#[test]
fn test_merge() {
    let mut f = OuterProductGraph::new(1000, 10);
    let g = &mut f.graph;
    let s = g.scalar("s");
    let r = g.data("r", 1, 1000);
    let row = g.binary(BinaryOp::Minus, f.uv, r).unwrap();
    let scalar = g.binary(BinaryOp::Mult, f.uv, s).unwrap();
    let matrix = g.binary(BinaryOp::Mult, f.x, f.uv).unwrap();

    let tpl = template(false);
    let g = &f.graph;
    assert!(tpl.merge(g, row, f.uv));
    assert!(tpl.merge(g, scalar, f.uv));
    assert!(!tpl.merge(g, matrix, f.uv));
    assert!(!template(true).merge(g, row, f.uv));
}

#[test]
fn test_close() {
    let mut f = OuterProductGraph::new(1000, 10);
    let g = &mut f.graph;
    let w = g.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let sum_uv = g.sum(f.uv).unwrap();
    let sum_w = g.sum(w).unwrap();
    let row_sums_w = g.row_sums(w).unwrap();
    let final_mm = g.matmul(w, f.v).unwrap();

    let tpl = template(false);
    assert_eq!(tpl.close(&f.graph, sum_uv), CloseType::ClosedInvalid);
    assert_eq!(tpl.close(&f.graph, sum_w), CloseType::ClosedValid);
    assert_eq!(tpl.close(&f.graph, row_sums_w), CloseType::ClosedValid);
    assert_eq!(tpl.close(&f.graph, w), CloseType::Open);
    assert_eq!(tpl.close(&f.graph, f.uv), CloseType::Open);
    assert_eq!(tpl.close(&f.graph, final_mm), CloseType::ClosedValid);

    // a transpose consumer keeps the multiply open and closes instead
    let t = f.graph.transpose(final_mm).unwrap();
    assert_eq!(tpl.close(&f.graph, final_mm), CloseType::Open);
    assert_eq!(tpl.close(&f.graph, t), CloseType::ClosedValid);
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_agg_outer_product() {
    // sum(X * (U %*% t(V)))
    let mut f = OuterProductGraph::new(1000, 10);
    let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let root = f.graph.sum(w).unwrap();
    let memo = explore(&f.graph, root);
    assert!(memo.get_best(root, TemplateType::OuterProduct).unwrap().is_closed());

    let plan = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    assert_eq!(plan.inputs, vec![f.x, f.u, f.v]);
    let tpl = plan.template.as_outer_product().unwrap();
    assert_eq!(tpl.out_prod_type, OutProdType::AggOuterProduct);
    assert!(!tpl.transpose_output);
    assert_eq!(tpl.inputs.len(), 3);

    let CNodeOp::Binary(BinType::Mult, a, b) = plan.output().op() else {
        panic!("expected a multiply root, got {:?}", plan.output().op());
    };
    assert_eq!(a.data_hop(), Some(f.x));
    let CNodeOp::Binary(BinType::DotProduct, u, v) = b.op() else {
        panic!("expected a dot product, got {:?}", b.op());
    };
    assert_eq!(u.data_hop(), Some(f.u));
    assert_eq!(v.data_hop(), Some(f.v));
}

#[test]
fn test_main_matrix_as_right_operand() {
    // sum((U %*% t(V)) * X)
    let mut f = OuterProductGraph::new(1000, 10);
    let w = f.graph.binary(BinaryOp::Mult, f.uv, f.x).unwrap();
    let root = f.graph.sum(w).unwrap();
    let memo = explore(&f.graph, root);
    assert!(memo.get_best(root, TemplateType::OuterProduct).unwrap().is_closed());

    let plan = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    assert_eq!(plan.inputs, vec![f.x, f.u, f.v]);
    assert_eq!(plan.template.as_outer_product().unwrap().out_prod_type, OutProdType::AggOuterProduct);

    let CNodeOp::Binary(BinType::Mult, a, b) = plan.output().op() else {
        panic!("expected a multiply root, got {:?}", plan.output().op());
    };
    assert!(matches!(a.op(), CNodeOp::Binary(BinType::DotProduct, ..)));
    assert_eq!(b.data_hop(), Some(f.x));
}

#[test]
fn test_right_outer_product() {
    // (X * (U %*% t(V))) %*% V
    let mut f = OuterProductGraph::new(1000, 10);
    let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let root = f.graph.matmul(w, f.v).unwrap();
    let memo = explore(&f.graph, root);

    let plan = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    assert_eq!(plan.inputs, vec![f.x, f.u, f.v]);
    let tpl = plan.template.as_outer_product().unwrap();
    assert_eq!(tpl.out_prod_type, OutProdType::RightOuterProduct);
    assert!(!tpl.transpose_output);
    assert!(matches!(plan.output().op(), CNodeOp::Binary(BinType::VectMultAdd, ..)));
    assert_eq!(plan.output().shape(), f.graph.hop(root).unwrap().shape);
}

#[test]
fn test_left_outer_product_absorbs_transpose() {
    // t(U) %*% (X * (U %*% t(V)))
    let mut f = OuterProductGraph::new(1000, 10);
    let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let tu = f.graph.transpose(f.u).unwrap();
    let root = f.graph.matmul(tu, w).unwrap();
    let memo = explore(&f.graph, root);

    let plan = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    assert_eq!(plan.inputs, vec![f.x, f.u, f.v]);
    let tpl = plan.template.as_outer_product().unwrap();
    assert_eq!(tpl.out_prod_type, OutProdType::LeftOuterProduct);
    assert!(tpl.transpose_output);

    let CNodeOp::Binary(BinType::VectMultAdd, a, _) = plan.output().op() else {
        panic!("expected a vector multiply-add, got {:?}", plan.output().op());
    };
    assert_eq!(a.data_hop(), Some(f.u));
    assert!(!plan.output().data_hops().contains(&tu));
}

#[test]
fn test_transposed_root_is_left_outer_product() {
    // t((X * (U %*% t(V))) %*% V)
    let mut f = OuterProductGraph::new(1000, 10);
    let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let mm = f.graph.matmul(w, f.v).unwrap();
    let root = f.graph.transpose(mm).unwrap();
    let memo = explore(&f.graph, root);
    assert!(!memo.get_best(mm, TemplateType::OuterProduct).unwrap().is_closed());
    assert!(memo.get_best(root, TemplateType::OuterProduct).unwrap().is_closed());

    let plan = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    let tpl = plan.template.as_outer_product().unwrap();
    assert_eq!(tpl.out_prod_type, OutProdType::LeftOuterProduct);
    assert!(!tpl.transpose_output);
    assert_eq!(plan.output().shape(), f.graph.hop(root).unwrap().shape);
}

#[test]
fn test_cellwise_outer_product() {
    let mut f = OuterProductGraph::new(1000, 10);
    let root = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let memo = explore(&f.graph, root);

    let plan = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    let tpl = plan.template.as_outer_product().unwrap();
    assert_eq!(tpl.out_prod_type, OutProdType::CellwiseOuterProduct);
    assert!(!tpl.transpose_output);
}

#[test]
fn test_vector_operand_is_looked_up() {
    // sum((X * (U %*% t(V))) * c)
    let mut f = OuterProductGraph::new(1000, 10);
    let c = f.graph.data("c", 1000, 1);
    let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let wc = f.graph.binary(BinaryOp::Mult, w, c).unwrap();
    let root = f.graph.sum(wc).unwrap();
    let memo = explore(&f.graph, root);

    let plan = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    assert_eq!(plan.inputs, vec![f.x, f.u, f.v, c]);
    let CNodeOp::Binary(BinType::Mult, _, b) = plan.output().op() else {
        panic!("expected a multiply root, got {:?}", plan.output().op());
    };
    assert!(matches!(b.op(), CNodeOp::Unary(UnaryType::LookupR, v) if v.data_hop() == Some(c)));
}

#[test]
fn test_aggregate_of_bare_product_is_discarded() {
    let mut f = OuterProductGraph::new(1000, 10);
    let root = f.graph.sum(f.uv).unwrap();
    let memo = explore(&f.graph, root);
    assert!(!memo.contains(root, TemplateType::OuterProduct));
    assert!(memo.contains(f.uv, TemplateType::OuterProduct));

    let err = construct(&f.graph, f.uv, &memo, TemplateType::OuterProduct).unwrap_err();
    assert_eq!(err, Error::MissingOuterProductInput { role: "X" });
}

#[test]
fn test_unsupported_operator_aborts() {
    let mut f = OuterProductGraph::new(1000, 10);
    let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let root = f.graph.row_sums(w).unwrap();
    let memo = memo_of(TemplateType::OuterProduct, &[(root, &[0]), (w, &[1]), (f.uv, &[])]);

    let err = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperator { hop, template: TemplateType::OuterProduct, .. } if hop == root));
}

#[test]
fn test_missing_memo_entry() {
    let mut f = OuterProductGraph::new(1000, 10);
    let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let memo = memo_of(TemplateType::OuterProduct, &[(w, &[1])]);

    let err = construct(&f.graph, w, &memo, TemplateType::OuterProduct).unwrap_err();
    assert_eq!(err, Error::MissingMemoEntry { hop: f.uv, template: TemplateType::OuterProduct });
}

#[test]
fn test_construction_is_idempotent() {
    let mut f = OuterProductGraph::new(1000, 10);
    let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
    let root = f.graph.sum(w).unwrap();
    let memo = explore(&f.graph, root);
    let before = f.graph.clone();

    let first = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    let second = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();
    assert_eq!(first, second);
    assert_eq!(f.graph, before);
}
