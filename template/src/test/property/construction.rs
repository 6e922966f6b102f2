//! Property tests for region exploration and CPlan construction.

use std::collections::HashSet;

use proptest::prelude::*;

use kernfuse_cplan::OutProdType;
use kernfuse_hops::test::generators::{OperandSpec, arb_operand};
use kernfuse_hops::{BinaryOp, HopGraph, HopId};

use crate::ordering::InputRank;
use crate::test::helpers::*;
use crate::{MemoEntry, MemoTable, TemplateConfig, TemplateType};

const VECTOR_OPS: [BinaryOp; 8] = [
    BinaryOp::Mult,
    BinaryOp::Div,
    BinaryOp::Equal,
    BinaryOp::NotEqual,
    BinaryOp::Less,
    BinaryOp::LessEqual,
    BinaryOp::Greater,
    BinaryOp::GreaterEqual,
];

/// Row-wise chain `((X op1 a1) op2 a2) ...` under a row or column aggregate.
#[derive(Debug, Clone)]
struct RowChain {
    rows: u64,
    cols: u64,
    steps: Vec<(BinaryOp, OperandSpec)>,
    col_agg: bool,
}

impl RowChain {
    /// Graph, aggregate root and the chain hops in construction order.
    fn build(&self) -> (HopGraph, HopId, Vec<HopId>) {
        let mut g = HopGraph::new();
        let mut cur = g.data("X", self.rows, self.cols);
        let mut chain = Vec::new();
        for (i, (op, operand)) in self.steps.iter().enumerate() {
            let name = format!("a{i}");
            let b = match operand {
                OperandSpec::ColVector(_) => g.data(&name, self.rows, 1),
                other => other.add_to(&mut g, &name),
            };
            cur = g.binary(*op, cur, b).unwrap();
            chain.push(cur);
        }
        let root = if self.col_agg { g.col_sums(cur).unwrap() } else { g.row_sums(cur).unwrap() };
        (g, root, chain)
    }

    /// The whole chain as one row-aggregate region.
    fn memo(root: HopId, chain: &[HopId]) -> MemoTable {
        let mut memo = memo_of(TemplateType::RowAgg, &[(root, &[0])]);
        for (i, &hop) in chain.iter().enumerate() {
            let entry = match i {
                0 => MemoEntry::new(TemplateType::RowAgg),
                _ => MemoEntry::with_refs(TemplateType::RowAgg, &[0]),
            };
            memo.add(hop, entry);
        }
        memo
    }
}

fn arb_row_chain() -> impl Strategy<Value = RowChain> {
    (
        2..=200u64,
        2..=50u64,
        prop::collection::vec((proptest::sample::select(VECTOR_OPS.to_vec()), arb_operand()), 1..6),
        any::<bool>(),
    )
        .prop_map(|(rows, cols, steps, col_agg)| RowChain { rows, cols, steps, col_agg })
}

proptest! {
    #[test]
    fn row_agg_inputs_are_unique_and_ordered(chain in arb_row_chain()) {
        let (g, root, hops) = chain.build();
        let memo = RowChain::memo(root, &hops);
        let plan = construct(&g, root, &memo, TemplateType::RowAgg).unwrap();

        let unique: HashSet<_> = plan.inputs.iter().collect();
        prop_assert_eq!(unique.len(), plan.inputs.len());

        let ranks: Vec<_> = plan.inputs.iter().map(|&h| InputRank::of(g.hop(h).unwrap(), None)).collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] >= w[1]), "ranks not ordered: {:?}", ranks);

        let referenced: HashSet<_> = plan.output().data_hops().into_iter().collect();
        prop_assert_eq!(referenced, plan.inputs.iter().copied().collect::<HashSet<_>>());
        // every step is a vector-scalar op; a column aggregate accumulates the last one
        let expected = chain.steps.len() - usize::from(chain.col_agg);
        prop_assert_eq!(plan.template.as_row_agg().unwrap().num_vector_intermediates, expected);
    }

    #[test]
    fn row_agg_construction_is_deterministic(chain in arb_row_chain(), compile_literals in any::<bool>()) {
        let (g, root, hops) = chain.build();
        let memo = RowChain::memo(root, &hops);
        let config = TemplateConfig::builder().compile_literals(compile_literals).build();

        let first = construct_with(&g, root, &memo, TemplateType::RowAgg, config).unwrap();
        let second = construct_with(&g, root, &memo, TemplateType::RowAgg, config).unwrap();
        prop_assert_eq!(&first, &second);

        let literals = first.inputs.iter().filter(|&&h| g.hop(h).unwrap().literal().is_some()).count();
        if compile_literals {
            prop_assert_eq!(literals, 0);
        } else {
            let expected = chain.steps.iter().filter(|(_, o)| matches!(o, OperandSpec::Literal(_))).count();
            prop_assert_eq!(literals, expected);
        }
    }

    #[test]
    fn explored_regions_satisfy_predicates(chain in arb_row_chain()) {
        let (g, root, _) = chain.build();
        let memo = explore(&g, root);
        let config = TemplateConfig::default();

        for id in g.topological_order(&[root]).unwrap() {
            let hop = g.hop(id).unwrap();
            for entry in memo.entries(id) {
                let tpl = entry.template.instantiate(false, config);
                for (i, &input) in hop.inputs().iter().enumerate().filter(|&(i, _)| entry.is_plan_ref(i)) {
                    prop_assert!(memo.contains(input, entry.template), "{} refs {} without entry", id, input);
                    prop_assert!(
                        tpl.fuse(&g, id, input) || tpl.merge(&g, id, input),
                        "{} absorbed input {} of {}", id, i, input
                    );
                }
            }
        }
    }

    #[test]
    fn outer_product_pins_factors(n in 257..=2000u64, k in 1..=16u64, shape in 0..3usize) {
        let mut f = OuterProductGraph::new(n, k);
        let w = f.graph.binary(BinaryOp::Mult, f.x, f.uv).unwrap();
        let (root, expected) = match shape {
            0 => (f.graph.sum(w).unwrap(), OutProdType::AggOuterProduct),
            1 => (f.graph.matmul(w, f.v).unwrap(), OutProdType::RightOuterProduct),
            _ => {
                let tu = f.graph.transpose(f.u).unwrap();
                (f.graph.matmul(tu, w).unwrap(), OutProdType::LeftOuterProduct)
            }
        };
        let memo = explore(&f.graph, root);
        let plan = construct(&f.graph, root, &memo, TemplateType::OuterProduct).unwrap();

        prop_assert_eq!(&plan.inputs[..3], &[f.x, f.u, f.v][..]);
        prop_assert!(plan.inputs.iter().all(|&h| !f.graph.is_transpose(h)));
        let tpl = plan.template.as_outer_product().unwrap();
        prop_assert_eq!(tpl.out_prod_type, expected);
        prop_assert_eq!(tpl.transpose_output, expected == OutProdType::LeftOuterProduct);
    }
}
