//! Row assignment: pair detected photo blocks with product rows.
//!
//! The pairing itself is pure; cropping and file writes happen in the
//! orchestrator, so a strategy swap never touches I/O.

use crate::manifest::ProductRecord;
use crate::pipeline::contours::BlockBox;

/// Outcome of pairing one page's blocks with its product group.
#[derive(Debug, Clone, Default)]
pub struct RowPairing {
    /// `(block, product)` pairs, following the block reading order.
    pub assigned: Vec<(BlockBox, ProductRecord)>,
    /// Products left without a block, in source order. Fed to the fallback
    /// matcher and the shortfall log.
    pub unresolved: Vec<ProductRecord>,
}

/// Strategy seam for block-to-product pairing.
pub trait AssignStrategy {
    fn pair(&self, boxes: &[BlockBox], group: &[ProductRecord]) -> RowPairing;
}

/// Positional assignment: block *i* belongs to product *i*.
///
/// This trusts that the page lays photos out in the same order as the table
/// lists products. Nothing verifies the pairing against content, which makes
/// it the single largest source of mismatch in the pipeline. It is isolated
/// behind [`AssignStrategy`] so a content-verified matcher (OCR of the
/// description region, say) can replace it without touching the surrounding
/// stages.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadingOrderAssigner;

impl AssignStrategy for ReadingOrderAssigner {
    fn pair(&self, boxes: &[BlockBox], group: &[ProductRecord]) -> RowPairing {
        let n = boxes.len().min(group.len());
        RowPairing {
            assigned: boxes[..n]
                .iter()
                .copied()
                .zip(group[..n].iter().cloned())
                .collect(),
            unresolved: group[n..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(x: u32) -> BlockBox {
        BlockBox {
            x,
            y: 0,
            width: 100,
            height: 100,
            area: 10_000,
        }
    }

    fn product(item: &str) -> ProductRecord {
        ProductRecord {
            item: item.into(),
            description: format!("desc {item}"),
            page: "6".into(),
        }
    }

    #[test]
    fn pairs_at_most_the_shorter_length_without_box_reuse() {
        let boxes = vec![block(0), block(200)];
        let group = vec![product("1"), product("2"), product("3")];
        let pairing = ReadingOrderAssigner.pair(&boxes, &group);

        assert_eq!(pairing.assigned.len(), 2);
        let used_x: Vec<u32> = pairing.assigned.iter().map(|(b, _)| b.x).collect();
        assert_eq!(used_x, vec![0, 200]);

        let unresolved: Vec<&str> = pairing.unresolved.iter().map(|p| p.item.as_str()).collect();
        assert_eq!(unresolved, vec!["3"]);
    }

    #[test]
    fn surplus_boxes_are_ignored() {
        let boxes = vec![block(0), block(200), block(400)];
        let group = vec![product("1")];
        let pairing = ReadingOrderAssigner.pair(&boxes, &group);
        assert_eq!(pairing.assigned.len(), 1);
        assert_eq!(pairing.assigned[0].1.item, "1");
        assert!(pairing.unresolved.is_empty());
    }

    #[test]
    fn no_boxes_leaves_everyone_unresolved() {
        let group = vec![product("1"), product("2")];
        let pairing = ReadingOrderAssigner.pair(&[], &group);
        assert!(pairing.assigned.is_empty());
        assert_eq!(pairing.unresolved.len(), 2);
    }

    #[test]
    fn order_follows_inputs() {
        let boxes = vec![block(50), block(300)];
        let group = vec![product("a"), product("b")];
        let pairing = ReadingOrderAssigner.pair(&boxes, &group);
        assert_eq!(pairing.assigned[0].1.item, "a");
        assert_eq!(pairing.assigned[0].0.x, 50);
        assert_eq!(pairing.assigned[1].1.item, "b");
        assert_eq!(pairing.assigned[1].0.x, 300);
    }
}
