//! Persistent byte rope.
//!
//! Content is a height-balanced binary tree whose leaves are sub-ranges of
//! shared, immutable byte buffers. Splitting a leaf only narrows the range, so
//! a splice allocates `O(log n)` nodes and never copies untouched content.
//! Every operation returns a new [`Rope`]; existing values are never modified.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Neighbouring leaves whose combined length fits here are merged on join.
const MERGE_LEAF_LEN: usize = 256;

/// Leaf size used when building a rope from a contiguous buffer.
const BUILD_LEAF_LEN: usize = 4096;

#[derive(Debug)]
enum Node {
    Leaf {
        bytes: Arc<[u8]>,
        range: Range<usize>,
    },
    Branch {
        left: Arc<Node>,
        right: Arc<Node>,
        len: usize,
        height: usize,
    },
}

impl Node {
    fn len(&self) -> usize {
        match self {
            Node::Leaf { range, .. } => range.len(),
            Node::Branch { len, .. } => *len,
        }
    }

    fn height(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Branch { height, .. } => *height,
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Branch { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }
}

fn empty_node() -> Arc<Node> {
    Arc::new(Node::Leaf {
        bytes: Arc::from(Vec::new()),
        range: 0..0,
    })
}

fn leaf(bytes: Arc<[u8]>, range: Range<usize>) -> Arc<Node> {
    Arc::new(Node::Leaf { bytes, range })
}

fn owned_leaf(bytes: Vec<u8>) -> Arc<Node> {
    let len = bytes.len();
    leaf(Arc::from(bytes), 0..len)
}

fn branch(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
    let len = left.len() + right.len();
    let height = left.height().max(right.height()) + 1;
    Arc::new(Node::Branch {
        left,
        right,
        len,
        height,
    })
}

/// Rebuild a node whose children differ in height by at most two.
fn balance(left: Arc<Node>, right: Arc<Node>) -> Arc<Node> {
    let (left_height, right_height) = (left.height(), right.height());
    if left_height > right_height + 1 {
        if let Node::Branch {
            left: outer,
            right: inner,
            ..
        } = &*left
        {
            if outer.height() >= inner.height() {
                return branch(outer.clone(), branch(inner.clone(), right));
            }
            if let Node::Branch {
                left: inner_left,
                right: inner_right,
                ..
            } = &**inner
            {
                return branch(
                    branch(outer.clone(), inner_left.clone()),
                    branch(inner_right.clone(), right),
                );
            }
        }
    } else if right_height > left_height + 1 {
        if let Node::Branch {
            left: inner,
            right: outer,
            ..
        } = &*right
        {
            if outer.height() >= inner.height() {
                return branch(branch(left, inner.clone()), outer.clone());
            }
            if let Node::Branch {
                left: inner_left,
                right: inner_right,
                ..
            } = &**inner
            {
                return branch(
                    branch(left, inner_left.clone()),
                    branch(inner_right.clone(), outer.clone()),
                );
            }
        }
    }
    branch(left, right)
}

/// Concatenate two balanced trees into a balanced tree.
fn join(left: &Arc<Node>, right: &Arc<Node>) -> Arc<Node> {
    if left.len() == 0 {
        return right.clone();
    }
    if right.len() == 0 {
        return left.clone();
    }
    if let (
        Node::Leaf {
            bytes: left_bytes,
            range: left_range,
        },
        Node::Leaf {
            bytes: right_bytes,
            range: right_range,
        },
    ) = (&**left, &**right)
    {
        if left_range.len() + right_range.len() <= MERGE_LEAF_LEN {
            let mut merged = Vec::with_capacity(left_range.len() + right_range.len());
            merged.extend_from_slice(&left_bytes[left_range.clone()]);
            merged.extend_from_slice(&right_bytes[right_range.clone()]);
            return owned_leaf(merged);
        }
    }

    let (left_height, right_height) = (left.height(), right.height());
    if left_height > right_height + 1 {
        if let Node::Branch {
            left: outer,
            right: inner,
            ..
        } = &**left
        {
            return balance(outer.clone(), join(inner, right));
        }
    } else if right_height > left_height + 1 {
        if let Node::Branch {
            left: inner,
            right: outer,
            ..
        } = &**right
        {
            return balance(join(left, inner), outer.clone());
        }
    }
    branch(left.clone(), right.clone())
}

/// Split a tree at `at`, which must lie within `0..=node.len()`.
fn split(node: &Arc<Node>, at: usize) -> (Arc<Node>, Arc<Node>) {
    if at == 0 {
        return (empty_node(), node.clone());
    }
    if at >= node.len() {
        return (node.clone(), empty_node());
    }
    match &**node {
        Node::Leaf { bytes, range } => {
            let mid = range.start + at;
            (
                leaf(bytes.clone(), range.start..mid),
                leaf(bytes.clone(), mid..range.end),
            )
        }
        Node::Branch { left, right, .. } => {
            let left_len = left.len();
            if at < left_len {
                let (head, tail) = split(left, at);
                (head, join(&tail, right))
            } else {
                let (head, tail) = split(right, at - left_len);
                (join(left, &head), tail)
            }
        }
    }
}

/// Immutable byte sequence with cheap splicing.
///
/// Cloning a rope is `O(1)` and every returned value is independent: a splice
/// on one value can never be observed through another.
#[derive(Clone)]
pub struct Rope {
    root: Arc<Node>,
}

impl Default for Rope {
    fn default() -> Self {
        Self::new()
    }
}

impl Rope {
    /// Create an empty rope.
    pub fn new() -> Self {
        Self { root: empty_node() }
    }

    /// Build a rope holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() <= BUILD_LEAF_LEN {
            return Self {
                root: owned_leaf(bytes.to_vec()),
            };
        }
        let root = bytes
            .chunks(BUILD_LEAF_LEN)
            .map(|chunk| owned_leaf(chunk.to_vec()))
            .fold(empty_node(), |acc, next| join(&acc, &next));
        Self { root }
    }

    /// Returns the content length in bytes.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Returns `true` when the rope holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tree height (a single leaf has height zero).
    pub fn height(&self) -> usize {
        self.root.height()
    }

    /// Returns the number of leaf fragments.
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// Split into `[0, offset)` and `[offset, len)`.
    ///
    /// `offset` is clamped to the rope length.
    pub fn split_at(&self, offset: usize) -> (Rope, Rope) {
        let (head, tail) = split(&self.root, offset.min(self.len()));
        (Rope { root: head }, Rope { root: tail })
    }

    /// Returns `self` followed by `other`.
    pub fn concat(&self, other: &Rope) -> Rope {
        Rope {
            root: join(&self.root, &other.root),
        }
    }

    /// Returns the bytes in `range`, clamped to the rope length.
    pub fn slice(&self, range: Range<usize>) -> Rope {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        let (_, tail) = split(&self.root, start);
        let (middle, _) = split(&tail, end - start);
        Rope { root: middle }
    }

    /// Returns a rope with `bytes` inserted at `offset`.
    ///
    /// Offsets past the end append.
    pub fn splice_insert(&self, offset: usize, bytes: &[u8]) -> Rope {
        if bytes.is_empty() {
            return self.clone();
        }
        let (head, tail) = self.split_at(offset);
        let inserted = Rope::from_bytes(bytes);
        Rope {
            root: join(&join(&head.root, &inserted.root), &tail.root),
        }
    }

    /// Returns a rope with `len` bytes removed starting at `offset`.
    ///
    /// The removed range is clamped to the rope length.
    pub fn splice_delete(&self, offset: usize, len: usize) -> Rope {
        if len == 0 || offset >= self.len() {
            return self.clone();
        }
        let (head, rest) = split(&self.root, offset);
        let (_, tail) = split(&rest, len.min(rest.len()));
        Rope {
            root: join(&head, &tail),
        }
    }

    /// Iterate over the leaf fragments in order.
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            stack: vec![self.root.as_ref()],
        }
    }

    /// Copy the whole content into one contiguous buffer.
    pub fn materialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in self.chunks() {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Copy the bytes in `range` (clamped) into a contiguous buffer.
    pub fn copy_range(&self, range: Range<usize>) -> Vec<u8> {
        self.slice(range).materialize()
    }
}

impl From<&[u8]> for Rope {
    fn from(bytes: &[u8]) -> Self {
        Rope::from_bytes(bytes)
    }
}

impl From<&str> for Rope {
    fn from(text: &str) -> Self {
        Rope::from_bytes(text.as_bytes())
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.root, &other.root) {
            return true;
        }
        self.len() == other.len() && self.materialize() == other.materialize()
    }
}

impl Eq for Rope {}

impl PartialEq<[u8]> for Rope {
    fn eq(&self, other: &[u8]) -> bool {
        self.len() == other.len() && self.materialize() == other
    }
}

impl PartialEq<&str> for Rope {
    fn eq(&self, other: &&str) -> bool {
        *self == *other.as_bytes()
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rope")
            .field("len", &self.len())
            .field("height", &self.height())
            .field("content", &String::from_utf8_lossy(&self.materialize()))
            .finish()
    }
}

/// Iterator over the leaf fragments of a [`Rope`].
pub struct Chunks<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Node::Leaf { bytes, range } => {
                    if !range.is_empty() {
                        return Some(&bytes[range.clone()]);
                    }
                }
                Node::Branch { left, right, .. } => {
                    self.stack.push(right.as_ref());
                    self.stack.push(left.as_ref());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn insert_into_empty_yields_payload() {
        let rope = Rope::new().splice_insert(0, b"hello");
        assert_eq!(rope, "hello");
        assert_eq!(rope.len(), 5);
    }

    #[test]
    fn sequential_inserts_accumulate() {
        let rope = Rope::new()
            .splice_insert(0, b"abc")
            .splice_insert(3, b"def");
        assert_eq!(rope, "abcdef");
    }

    #[test]
    fn delete_removes_exact_range() {
        let rope = Rope::from("abcdef").splice_delete(2, 2);
        assert_eq!(rope, "abef");
    }

    #[test]
    fn out_of_range_offsets_clamp() {
        let rope = Rope::from("abc");
        assert_eq!(rope.splice_insert(99, b"!"), "abc!");
        assert_eq!(rope.splice_delete(1, 99), "a");
        assert_eq!(rope.splice_delete(5, 1), "abc");
        assert_eq!(rope.slice(2..10), "c");
    }

    #[test]
    fn older_values_survive_later_splices() {
        let base = Rope::from("0123456789");
        let inserted = base.splice_insert(5, b"abc");
        let deleted = inserted.splice_delete(0, 4);
        assert_eq!(base, "0123456789");
        assert_eq!(inserted, "01234abc56789");
        assert_eq!(deleted, "4abc56789");
    }

    #[test]
    fn splitting_a_large_leaf_shares_its_buffer() {
        let payload = vec![b'x'; BUILD_LEAF_LEN];
        let rope = Rope::from_bytes(&payload);
        assert_eq!(rope.leaf_count(), 1);
        let (head, tail) = rope.split_at(1000);
        assert_eq!(head.len(), 1000);
        assert_eq!(tail.len(), BUILD_LEAF_LEN - 1000);
        match (&*head.root, &*tail.root, &*rope.root) {
            (
                Node::Leaf { bytes: a, .. },
                Node::Leaf { bytes: b, .. },
                Node::Leaf { bytes: c, .. },
            ) => {
                assert!(Arc::ptr_eq(a, c));
                assert!(Arc::ptr_eq(b, c));
            }
            _ => panic!("expected leaf nodes"),
        }
    }

    #[test]
    fn large_buffers_build_balanced_trees() {
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let rope = Rope::from_bytes(&payload);
        assert_eq!(rope.materialize(), payload);
        let leaves = rope.leaf_count();
        assert!(leaves >= payload.len() / BUILD_LEAF_LEN);
        assert!(rope.height() <= 2 * (usize::BITS - leaves.leading_zeros()) as usize + 1);
    }

    #[test]
    fn repeated_middle_inserts_stay_balanced() {
        let mut rope = Rope::from_bytes(&vec![b'-'; 64 * 1024]);
        let payload = vec![b'+'; MERGE_LEAF_LEN + 1];
        for _ in 0..2_000 {
            rope = rope.splice_insert(rope.len() / 2, &payload);
        }
        let leaves = rope.leaf_count();
        let log2 = (usize::BITS - leaves.leading_zeros()) as usize;
        assert!(
            rope.height() <= 2 * log2 + 1,
            "height {} for {} leaves",
            rope.height(),
            leaves
        );
    }

    #[test]
    fn random_splices_match_vec_model() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut model: Vec<u8> = Vec::new();
        let mut rope = Rope::new();
        for step in 0..3_000 {
            if model.is_empty() || rng.gen_bool(0.6) {
                let offset = rng.gen_range(0..=model.len());
                let len = rng.gen_range(1..40);
                let bytes: Vec<u8> = (0..len).map(|_| rng.gen_range(b'a'..=b'z')).collect();
                model.splice(offset..offset, bytes.iter().copied());
                rope = rope.splice_insert(offset, &bytes);
            } else {
                let offset = rng.gen_range(0..model.len());
                let len = rng.gen_range(1..=(model.len() - offset).min(60));
                model.drain(offset..offset + len);
                rope = rope.splice_delete(offset, len);
            }
            assert_eq!(rope.len(), model.len(), "length drift at step {}", step);
        }
        assert_eq!(rope.materialize(), model);
    }

    #[test]
    fn chunks_skip_empty_fragments() {
        let rope = Rope::new()
            .splice_insert(0, b"ab")
            .splice_delete(0, 2)
            .splice_insert(0, b"c");
        let chunks: Vec<&[u8]> = rope.chunks().collect();
        assert_eq!(chunks, vec![&b"c"[..]]);
        assert!(Rope::new().chunks().next().is_none());
    }

    #[test]
    fn concat_and_copy_range() {
        let left = Rope::from("hello ");
        let right = Rope::from("world");
        let joined = left.concat(&right);
        assert_eq!(joined, "hello world");
        assert_eq!(joined.copy_range(3..8), b"lo wo".to_vec());
    }
}
