//! Basic Block Discovery
//!
//! Blocks are never materialized: a block is a `start..end` range over the
//! compacted instruction list, found on demand and consumed front to back.
//!
//! A block ends
//! - after its first control transfer (jump, call or return), or
//! - right before a labeled instruction other than its own first one.

use crate::backend::ir::{Instr, InstrKind};
use std::ops::Range;

/// Length of the leading run of global initializers
///
/// Lowering emits globals first as unlabeled copies; every function starts
/// with a labeled entry, so the run ends at the first function.
pub fn global_prefix_len(instrs: &[Instr]) -> usize {
    instrs
        .iter()
        .take_while(|i| i.label.is_none() && matches!(i.kind, InstrKind::Copy { .. }))
        .count()
}

/// Scan position over one instruction list
pub struct BlockFinder<'a> {
    instrs: &'a [Instr],
    prefix: usize,
    position: usize,
}

impl<'a> BlockFinder<'a> {
    /// Start scanning right after the global prefix
    pub fn new(instrs: &'a [Instr]) -> Self {
        let prefix = global_prefix_len(instrs);
        Self {
            instrs,
            prefix,
            position: prefix,
        }
    }

    pub fn global_prefix_len(&self) -> usize {
        self.prefix
    }

    /// The next block, or `None` once the list is exhausted
    pub fn next_block(&mut self) -> Option<Range<usize>> {
        let start = self.position;
        if start >= self.instrs.len() {
            return None;
        }

        let mut end = start;
        while end < self.instrs.len() {
            let instr = &self.instrs[end];
            if end != start && instr.label.is_some() {
                break;
            }
            end += 1;
            if instr.is_control_transfer() {
                break;
            }
        }

        self.position = end;
        Some(start..end)
    }
}

impl Iterator for BlockFinder<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ir::{Label, Value, Variable};
    use crate::common::types::Type;

    fn copy(name: &str, global: bool) -> Instr {
        let dst = if global {
            Variable::global(name, Type::LONG)
        } else {
            Variable::local(name, Type::LONG)
        };
        Instr::new(InstrKind::Copy {
            dst,
            src: Value::Lit(0),
        })
    }

    fn goto(n: u32) -> Instr {
        Instr::new(InstrKind::Goto {
            target: Label::Local(n),
        })
    }

    fn ret() -> Instr {
        Instr::new(InstrKind::Return {
            value: None,
            is_last: true,
        })
    }

    #[test]
    fn test_blocks_split_on_jumps_and_labels() {
        let instrs = vec![
            copy("g", true),                              // 0 prefix
            Instr::label(Label::Function("f".into())),    // 1
            copy("a", false),                             // 2
            goto(0),                                      // 3
            copy("b", false),                             // 4
            Instr::label(Label::Local(0)),                // 5
            ret(),                                        // 6
        ];

        let mut finder = BlockFinder::new(&instrs);
        assert_eq!(finder.global_prefix_len(), 1);
        let blocks: Vec<_> = finder.by_ref().collect();
        assert_eq!(blocks, vec![1..4, 4..5, 5..7]);
        assert_eq!(finder.next_block(), None);
    }

    #[test]
    fn test_empty_and_prefix_only_lists() {
        assert_eq!(BlockFinder::new(&[]).count(), 0);

        let instrs = vec![copy("x", true), copy("y", true)];
        assert_eq!(BlockFinder::new(&instrs).count(), 0);
    }
}
