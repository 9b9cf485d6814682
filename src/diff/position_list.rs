use super::token_index::NodeId;

pub(crate) type PosId = usize;

/// What a position matched: an interned token, or the synthetic end marker of
/// one ring. Two sentinels never compare equal to each other or to a token,
/// which is what stops every snake at the end of its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeRef {
    Token(NodeId),
    Sentinel(usize),
}

#[derive(Debug, Clone, Copy)]
struct Position {
    node: NodeRef,
    offset: usize,
    prev: PosId,
    next: PosId,
}

/// A run of consecutive token occurrences of one source. Offsets are
/// 1-based. A list built by [`PositionArena::push_list`] owns the slots
/// `base + 1 ..= base + len`, with its ring sentinel at `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PositionList {
    base: PosId,
    start: usize,
    len: usize,
}

impl PositionList {
    pub fn len(self) -> usize { self.len }

    /// Offset of the first position.
    pub fn start(self) -> usize { self.start }

    /// Offset one past the last position; the offset of the end-of-file
    /// match.
    pub fn end(self) -> usize { self.start + self.len }

    pub fn at(self, offset: usize) -> PosId {
        debug_assert!(
            offset >= self.start && offset < self.end(),
            "Offset {offset} outside of {}..{}",
            self.start,
            self.end()
        );
        self.base + offset
    }

    fn first(self) -> PosId { self.base + self.start }

    fn last(self) -> PosId { self.base + self.end() - 1 }

    /// The positions `start .. start + len` of this list.
    pub fn slice(self, start: usize, len: usize) -> Self {
        debug_assert!(
            start >= self.start && start + len <= self.end(),
            "Slice {start}+{len} outside of {}..{}",
            self.start,
            self.end()
        );
        PositionList {
            base: self.base,
            start,
            len,
        }
    }
}

/// A sentinel temporarily closing a [`PositionList`] into a ring for one LCS
/// search, together with the links it displaced.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Splice {
    pub sentinel: PosId,
    first: PosId,
    last: PosId,
    first_prev: PosId,
    last_next: PosId,
}

/// Arena holding every position of one diff invocation. Rings are expressed
/// as prev/next indices into the arena instead of pointers.
#[derive(Debug, Default)]
pub(crate) struct PositionArena {
    positions: Vec<Position>,
    sentinels: usize,
}

impl PositionArena {
    pub fn new() -> Self { Self::default() }

    fn push_sentinel(&mut self, offset: usize) -> PosId {
        let id = self.positions.len();
        self.positions.push(Position {
            node: NodeRef::Sentinel(self.sentinels),
            offset,
            prev: id,
            next: id,
        });
        self.sentinels += 1;
        id
    }

    /// Builds the position ring of one source: a sentinel followed by one
    /// position per token, closed back onto the sentinel.
    pub fn push_list(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> PositionList {
        let base = self.push_sentinel(0);

        for (index, node) in nodes.into_iter().enumerate() {
            let id = self.positions.len();
            self.positions.push(Position {
                node: NodeRef::Token(node),
                offset: index + 1,
                prev: id - 1,
                next: base,
            });
            self.positions[id - 1].next = id;
            self.positions[base].prev = id;
        }

        let len = self.positions.len() - base - 1;
        self.positions[base].offset = len + 1;

        PositionList {
            base,
            start: 1,
            len,
        }
    }

    pub fn node(&self, id: PosId) -> NodeRef { self.positions[id].node }

    pub fn offset(&self, id: PosId) -> usize { self.positions[id].offset }

    pub fn next(&self, id: PosId) -> PosId { self.positions[id].next }

    pub fn prev(&self, id: PosId) -> PosId { self.positions[id].prev }

    /// Closes a non-empty list into a private ring through a fresh sentinel,
    /// so that snakes running off either end stop there.
    pub fn splice(&mut self, list: PositionList) -> Splice {
        debug_assert!(list.len > 0, "Cannot splice an empty list");

        let first = list.first();
        let last = list.last();
        let sentinel = self.push_sentinel(list.end());

        let splice = Splice {
            sentinel,
            first,
            last,
            first_prev: self.positions[first].prev,
            last_next: self.positions[last].next,
        };

        self.positions[sentinel].next = first;
        self.positions[sentinel].prev = last;
        self.positions[first].prev = sentinel;
        self.positions[last].next = sentinel;

        splice
    }

    pub fn unsplice(&mut self, splice: Splice) {
        self.positions[splice.first].prev = splice.first_prev;
        self.positions[splice.last].next = splice.last_next;
    }
}
