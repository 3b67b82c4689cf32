// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{INVALID, NodeId};
use super::store::ShellTree;

/// An iterator over the direct children of a node, in stacking order.
///
/// Created by [`ShellTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a ShellTree,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a ShellTree, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

impl ShellTree {
    /// Collects `idx` and its descendants, children before their parent.
    pub(crate) fn collect_post_order(&self, idx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![(idx, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                out.push(node);
                continue;
            }
            stack.push((node, true));
            let mut child = self.first_child[node as usize];
            while child != INVALID {
                stack.push((child, false));
                child = self.next_sibling[child as usize];
            }
        }
        out
    }

    /// Appends `idx` and its descendants in depth-first pre-order.
    pub(crate) fn dfs_collect(&self, idx: u32, out: &mut Vec<u32>) {
        out.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child, out);
            child = self.next_sibling[child as usize];
        }
    }
}
