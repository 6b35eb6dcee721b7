//! The page tree
//!
//! Pages live as leaves (`/Type /Page`) under interior nodes
//! (`/Type /Pages`) that carry `/Kids` and a `/Count` of leaf descendants.
//! Mutations keep the tree balanced: a node that grows past the branching
//! factor splits, a node that shrinks below half of it merges with or
//! borrows from a sibling, and a root left with one interior child absorbs
//! it. The root itself is exempt from the fill bounds.

use crate::error::{Error, Result};
use crate::pdf::context::Context;
use crate::pdf::object::{Dict, DictExt, Name, Object, ObjRef};
use std::collections::HashSet;

/// Default branching factor.
pub const DEFAULT_BRANCHING: usize = 16;

/// Bound on `/Parent` chain walks, so malformed loops terminate.
const MAX_PARENT_DEPTH: usize = 64;

/// Handle over the `/Pages` tree rooted at a node ref.
#[derive(Debug, Clone, Copy)]
pub struct PageTree {
    pub root: ObjRef,
    branching: usize,
}

impl PageTree {
    pub fn new(root: ObjRef) -> Self {
        Self {
            root,
            branching: DEFAULT_BRANCHING,
        }
    }

    pub fn with_branching(root: ObjRef, branching: usize) -> Self {
        Self {
            root,
            branching: branching.max(2),
        }
    }

    /// Create an empty root node in the context.
    pub fn create_root(ctx: &mut Context) -> ObjRef {
        ctx.register(Object::Dict(crate::dict! {
            "Type" => "Pages",
            "Kids" => Vec::new(),
            "Count" => 0,
        }))
    }

    /// Total number of page leaves.
    pub fn count(&self, ctx: &Context) -> usize {
        subtree_count(ctx, self.root)
    }

    /// Pre-order depth-first walk over the leaves; the callback order is
    /// the rendering order.
    pub fn traverse(&self, ctx: &Context, visit: &mut dyn FnMut(ObjRef, &Dict)) {
        let mut stack = vec![self.root];
        let mut seen: HashSet<ObjRef> = HashSet::new();
        while let Some(r) = stack.pop() {
            if !seen.insert(r) {
                log::warn!("page tree cycle at object {}; skipping revisit", r.num);
                continue;
            }
            let Some(dict) = ctx.dict_at(r) else { continue };
            if is_leaf(dict) {
                visit(r, dict);
            } else {
                for kid in kids_of(dict).into_iter().rev() {
                    stack.push(kid);
                }
            }
        }
    }

    /// All leaves in rendering order.
    pub fn leaves(&self, ctx: &Context) -> Vec<ObjRef> {
        let mut out = Vec::new();
        self.traverse(ctx, &mut |r, _| out.push(r));
        out
    }

    /// The leaf at a rendering-order index.
    pub fn leaf_at(&self, ctx: &Context, index: usize) -> Option<ObjRef> {
        let mut current = self.root;
        let mut idx = index;
        'descend: loop {
            let dict = ctx.dict_at(current)?;
            for kid in kids_of(dict) {
                let c = subtree_count(ctx, kid);
                if idx < c {
                    if is_leaf(ctx.dict_at(kid)?) {
                        return Some(kid);
                    }
                    current = kid;
                    continue 'descend;
                }
                idx -= c;
            }
            return None;
        }
    }

    /// Insert a leaf so it lands at rendering-order `index`; `index` may
    /// equal the current count to append. Returns the leaf's new parent.
    ///
    /// A leaf already linked into this tree is moved: it is detached from
    /// its current parent first, so no leaf is ever reachable from two
    /// parents. The index is interpreted with the leaf already detached.
    pub fn insert(&self, ctx: &mut Context, leaf: ObjRef, index: usize) -> Result<ObjRef> {
        let linked = self.is_linked(ctx, leaf);
        let count = self.count(ctx);
        let limit = if linked { count.saturating_sub(1) } else { count };
        if index > limit {
            return Err(Error::PageIndexOutOfRange {
                index,
                count: limit,
            });
        }
        if linked {
            self.detach(ctx, leaf);
        }

        // Descend to the node and local position that should take the leaf
        let mut path = vec![self.root];
        let mut idx = index;
        let position = 'descend: loop {
            let current = *path.last().expect("path never empty");
            let kid_list = ctx
                .dict_at(current)
                .map(kids_of)
                .unwrap_or_default();
            if kid_list.is_empty() {
                break 0;
            }
            let last = kid_list.len() - 1;
            for (i, kid) in kid_list.iter().enumerate() {
                let c = subtree_count(ctx, *kid);
                let leaf_kid = ctx.dict_at(*kid).map(is_leaf).unwrap_or(true);
                if idx < c || (i == last && idx <= c) {
                    if leaf_kid {
                        break 'descend if idx >= c { i + 1 } else { i };
                    }
                    path.push(*kid);
                    continue 'descend;
                }
                idx -= c;
            }
            // Counts disagreed with the walk; append at this level
            log::warn!("page tree counts inconsistent during insert");
            break kid_list.len();
        };

        let parent = *path.last().expect("path never empty");
        if let Some(dict) = ctx.dict_at_mut(parent) {
            let mut kid_list = kids_of(dict);
            kid_list.insert(position.min(kid_list.len()), leaf);
            set_kids(dict, kid_list);
        }
        if let Some(dict) = ctx.dict_at_mut(leaf) {
            dict.set("Parent", parent);
        }
        for node in &path {
            bump_count(ctx, *node, 1);
        }

        self.split_overfull(ctx, &path);
        Ok(parent)
    }

    /// Remove and return the leaf at rendering-order `index`.
    pub fn remove(&self, ctx: &mut Context, index: usize) -> Result<ObjRef> {
        let count = self.count(ctx);
        if index >= count {
            return Err(Error::PageIndexOutOfRange { index, count });
        }

        let mut path = vec![self.root];
        let mut idx = index;
        let removed = 'descend: loop {
            let current = *path.last().expect("path never empty");
            let kid_list = ctx
                .dict_at(current)
                .map(kids_of)
                .unwrap_or_default();
            let mut advanced = false;
            for (i, kid) in kid_list.iter().enumerate() {
                let c = subtree_count(ctx, *kid);
                if idx < c {
                    if ctx.dict_at(*kid).map(is_leaf).unwrap_or(true) {
                        let mut list = kid_list.clone();
                        list.remove(i);
                        if let Some(dict) = ctx.dict_at_mut(current) {
                            set_kids(dict, list);
                        }
                        break 'descend *kid;
                    }
                    path.push(*kid);
                    advanced = true;
                    break;
                }
                idx -= c;
            }
            if !advanced {
                return Err(Error::PageIndexOutOfRange { index, count });
            }
        };

        for node in &path {
            bump_count(ctx, *node, -1);
        }
        if let Some(dict) = ctx.dict_at_mut(removed) {
            dict.shift_remove(&Name::new("Parent"));
        }

        self.fill_underfull(ctx, &path);
        self.collapse_root(ctx);
        Ok(removed)
    }

    /// Whether a leaf's parent chain reaches this tree's root.
    fn is_linked(&self, ctx: &Context, leaf: ObjRef) -> bool {
        let mut current = ctx.dict_at(leaf).and_then(|d| d.get_ref("Parent"));
        for _ in 0..MAX_PARENT_DEPTH {
            match current {
                Some(r) if r == self.root => return true,
                Some(r) => current = ctx.dict_at(r).and_then(|d| d.get_ref("Parent")),
                None => return false,
            }
        }
        false
    }

    /// Unlink a leaf from wherever it currently sits in this tree: the
    /// unlink half of `remove`, driven by the leaf's `/Parent` chain
    /// instead of an index walk.
    fn detach(&self, ctx: &mut Context, leaf: ObjRef) {
        let Some(parent) = ctx.dict_at(leaf).and_then(|d| d.get_ref("Parent")) else {
            return;
        };

        // Ancestor chain from the parent up to the root
        let mut chain = vec![parent];
        for _ in 0..MAX_PARENT_DEPTH {
            let top = *chain.last().expect("chain never empty");
            if top == self.root {
                break;
            }
            match ctx.dict_at(top).and_then(|d| d.get_ref("Parent")) {
                Some(up) => chain.push(up),
                None => break,
            }
        }
        if chain.last() != Some(&self.root) {
            log::warn!(
                "leaf {} parent chain does not reach the tree root; leaving it linked",
                leaf.num
            );
            return;
        }

        if let Some(dict) = ctx.dict_at_mut(parent) {
            let mut list = kids_of(dict);
            list.retain(|k| *k != leaf);
            set_kids(dict, list);
        }
        for node in &chain {
            bump_count(ctx, *node, -1);
        }
        if let Some(dict) = ctx.dict_at_mut(leaf) {
            dict.shift_remove(&Name::new("Parent"));
        }

        let mut path = chain;
        path.reverse();
        self.fill_underfull(ctx, &path);
        self.collapse_root(ctx);
    }

    /// Bottom-up pass splitting any node on the path that grew past the
    /// branching factor.
    fn split_overfull(&self, ctx: &mut Context, path: &[ObjRef]) {
        for depth in (0..path.len()).rev() {
            let node = path[depth];
            let kid_list = match ctx.dict_at(node) {
                Some(d) => kids_of(d),
                None => continue,
            };
            if kid_list.len() <= self.branching {
                continue;
            }
            let parent = if depth > 0 { Some(path[depth - 1]) } else { None };
            self.split(ctx, node, parent, kid_list);
        }
    }

    fn split(&self, ctx: &mut Context, node: ObjRef, parent: Option<ObjRef>, kids: Vec<ObjRef>) {
        let half = kids.len() / 2;
        let left: Vec<ObjRef> = kids[..half].to_vec();
        let right: Vec<ObjRef> = kids[half..].to_vec();

        match parent {
            Some(parent) => {
                // Keep the left half; promote the right half as a sibling
                let right_count = sum_counts(ctx, &right);
                let sibling = ctx.register(Object::Dict(crate::dict! {
                    "Type" => "Pages",
                    "Parent" => parent,
                    "Kids" => refs_array(&right),
                    "Count" => right_count as i64,
                }));
                reparent(ctx, &right, sibling);

                if let Some(dict) = ctx.dict_at_mut(node) {
                    set_kids(dict, left.clone());
                }
                let left_count = sum_counts(ctx, &left);
                set_count(ctx, node, left_count);

                if let Some(dict) = ctx.dict_at_mut(parent) {
                    let mut list = kids_of(dict);
                    let at = list.iter().position(|k| *k == node).map(|p| p + 1);
                    list.insert(at.unwrap_or(list.len()), sibling);
                    set_kids(dict, list);
                }
            }
            None => {
                // The root keeps its identity: both halves become new kids
                let left_count = sum_counts(ctx, &left);
                let right_count = sum_counts(ctx, &right);
                let left_node = ctx.register(Object::Dict(crate::dict! {
                    "Type" => "Pages",
                    "Parent" => node,
                    "Kids" => refs_array(&left),
                    "Count" => left_count as i64,
                }));
                let right_node = ctx.register(Object::Dict(crate::dict! {
                    "Type" => "Pages",
                    "Parent" => node,
                    "Kids" => refs_array(&right),
                    "Count" => right_count as i64,
                }));
                reparent(ctx, &left, left_node);
                reparent(ctx, &right, right_node);
                if let Some(dict) = ctx.dict_at_mut(node) {
                    set_kids(dict, vec![left_node, right_node]);
                }
            }
        }
    }

    /// Bottom-up pass refilling nodes that dropped below ⌈B/2⌉ kids.
    fn fill_underfull(&self, ctx: &mut Context, path: &[ObjRef]) {
        let min = self.branching.div_ceil(2);
        for depth in (1..path.len()).rev() {
            let node = path[depth];
            let parent = path[depth - 1];
            if !ctx.contains(node) {
                continue;
            }
            let len = ctx.dict_at(node).map(|d| kids_of(d).len()).unwrap_or(0);
            if len >= min {
                continue;
            }
            self.borrow_or_merge(ctx, node, parent, min);
        }
    }

    fn borrow_or_merge(&self, ctx: &mut Context, node: ObjRef, parent: ObjRef, min: usize) {
        let siblings = ctx.dict_at(parent).map(kids_of).unwrap_or_default();
        let Some(pos) = siblings.iter().position(|k| *k == node) else {
            return;
        };
        let left = pos.checked_sub(1).map(|i| siblings[i]);
        let right = siblings.get(pos + 1).copied();

        // Borrow a kid from a sibling with spare capacity
        if let Some(left) = left {
            let left_kids = ctx.dict_at(left).map(kids_of).unwrap_or_default();
            if left_kids.len() > min && !ctx.dict_at(left).map(is_leaf).unwrap_or(true) {
                let moved = *left_kids.last().expect("nonempty");
                self.move_kid(ctx, left, node, moved, true);
                return;
            }
        }
        if let Some(right) = right {
            let right_kids = ctx.dict_at(right).map(kids_of).unwrap_or_default();
            if right_kids.len() > min && !ctx.dict_at(right).map(is_leaf).unwrap_or(true) {
                let moved = right_kids[0];
                self.move_kid(ctx, right, node, moved, false);
                return;
            }
        }

        // Merge into a sibling node
        let target = left.or(right);
        let Some(target) = target else { return };
        if ctx.dict_at(target).map(is_leaf).unwrap_or(true) {
            return;
        }
        let node_kids = ctx.dict_at(node).map(kids_of).unwrap_or_default();
        let node_count = subtree_count(ctx, node);
        reparent(ctx, &node_kids, target);
        if let Some(dict) = ctx.dict_at_mut(target) {
            let mut list = kids_of(dict);
            if Some(target) == left {
                list.extend_from_slice(&node_kids);
            } else {
                let mut merged = node_kids.clone();
                merged.extend_from_slice(&list);
                list = merged;
            }
            set_kids(dict, list);
        }
        bump_count(ctx, target, node_count as i64);
        if let Some(dict) = ctx.dict_at_mut(parent) {
            let mut list = kids_of(dict);
            list.retain(|k| *k != node);
            set_kids(dict, list);
        }
        ctx.delete(node);
    }

    /// Move one kid across adjacent siblings; `from_end` takes the donor's
    /// last kid (left sibling), otherwise its first (right sibling).
    fn move_kid(&self, ctx: &mut Context, donor: ObjRef, taker: ObjRef, moved: ObjRef, from_end: bool) {
        let moved_count = subtree_count(ctx, moved) as i64;
        if let Some(dict) = ctx.dict_at_mut(donor) {
            let mut list = kids_of(dict);
            list.retain(|k| *k != moved);
            set_kids(dict, list);
        }
        if let Some(dict) = ctx.dict_at_mut(taker) {
            let mut list = kids_of(dict);
            if from_end {
                list.insert(0, moved);
            } else {
                list.push(moved);
            }
            set_kids(dict, list);
        }
        if let Some(dict) = ctx.dict_at_mut(moved) {
            dict.set("Parent", taker);
        }
        bump_count(ctx, donor, -moved_count);
        bump_count(ctx, taker, moved_count);
    }

    /// While the root has a single interior child, absorb it so the
    /// catalog keeps pointing at the same root object.
    fn collapse_root(&self, ctx: &mut Context) {
        loop {
            let root_kids = ctx.dict_at(self.root).map(kids_of).unwrap_or_default();
            if root_kids.len() != 1 {
                return;
            }
            let only = root_kids[0];
            let Some(dict) = ctx.dict_at(only) else { return };
            if is_leaf(dict) {
                return;
            }
            let grand_kids = kids_of(dict);
            reparent(ctx, &grand_kids, self.root);
            if let Some(root_dict) = ctx.dict_at_mut(self.root) {
                set_kids(root_dict, grand_kids);
            }
            ctx.delete(only);
        }
    }
}

fn is_leaf(dict: &Dict) -> bool {
    dict.is_type("Page") || (!dict.is_type("Pages") && !dict.contains_key(&Name::new("Kids")))
}

fn kids_of(dict: &Dict) -> Vec<ObjRef> {
    dict.get_key("Kids")
        .and_then(Object::as_array)
        .map(|a| a.iter().filter_map(Object::as_ref_obj).collect())
        .unwrap_or_default()
}

fn set_kids(dict: &mut Dict, kids: Vec<ObjRef>) {
    dict.set("Kids", refs_array(&kids));
}

fn refs_array(kids: &[ObjRef]) -> Vec<Object> {
    kids.iter().map(|k| Object::Ref(*k)).collect()
}

fn subtree_count(ctx: &Context, r: ObjRef) -> usize {
    match ctx.dict_at(r) {
        Some(dict) if is_leaf(dict) => 1,
        Some(dict) => dict.get_int("Count").unwrap_or(0).max(0) as usize,
        None => 0,
    }
}

fn sum_counts(ctx: &Context, kids: &[ObjRef]) -> usize {
    kids.iter().map(|k| subtree_count(ctx, *k)).sum()
}

fn set_count(ctx: &mut Context, node: ObjRef, count: usize) {
    if let Some(dict) = ctx.dict_at_mut(node) {
        dict.set("Count", count as i64);
    }
}

fn bump_count(ctx: &mut Context, node: ObjRef, delta: i64) {
    if let Some(dict) = ctx.dict_at_mut(node) {
        let current = dict.get_int("Count").unwrap_or(0);
        dict.set("Count", (current + delta).max(0));
    }
}

fn reparent(ctx: &mut Context, kids: &[ObjRef], new_parent: ObjRef) {
    for kid in kids {
        if let Some(dict) = ctx.dict_at_mut(*kid) {
            dict.set("Parent", new_parent);
        }
    }
}
