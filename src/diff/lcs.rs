//! Longest common subsequence of two position lists.
//!
//! The search is Myers' O((N+M)D) greedy algorithm run from both corners of
//! the edit graph at once (see
//! [the original article by Eugene W. Myers](http://www.xmailserver.org/diff2.pdf)).
//! Unlike the linear-space variant, every frontier cell carries the list of
//! matching runs on its path, so the first overlap of the two frontiers yields
//! the whole subsequence without recursing into the halves.
//!
//! Coordinates: `x` counts consumed positions of the shorter list, `y` of the
//! longer one, and diagonal `k = x - y`. As in the article, paths are allowed
//! to run past the borders of the edit graph. Such cells rest on a sentinel
//! and never extend a snake.

use tracing::trace;

use super::position_list::{PosId, PositionArena, PositionList};

/// A maximal stretch of matching positions. `offsets` are the 1-based
/// offsets of the first matching position in each of the two lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LcsRun {
    pub offsets: [usize; 2],
    pub length: usize,
}

impl LcsRun {
    pub fn end(&self, side: usize) -> usize { self.offsets[side] + self.length }
}

/// Computes the matching runs between two lists, in increasing offset order,
/// terminated by a zero-length run at both lists' end-of-file offsets.
pub(crate) fn lcs(arena: &mut PositionArena, lists: [PositionList; 2]) -> Vec<LcsRun> {
    let eof = LcsRun {
        offsets: [lists[0].end(), lists[1].end()],
        length: 0,
    };

    if lists[0].len() == 0 || lists[1].len() == 0 {
        return vec![eof];
    }

    // The shorter list is the minor dimension.
    let swapped = lists[0].len() > lists[1].len();
    let (minor, major) = if swapped {
        (lists[1], lists[0])
    } else {
        (lists[0], lists[1])
    };

    let splices = [arena.splice(minor), arena.splice(major)];
    let mut runs = Search::new(arena, [minor, major], [splices[0].sentinel, splices[1].sentinel]).run();
    arena.unsplice(splices[1]);
    arena.unsplice(splices[0]);

    if swapped {
        for run in &mut runs {
            run.offsets.swap(0, 1);
        }
    }

    debug_assert!(
        runs.windows(2).all(|pair| pair[0].end(0) <= pair[1].offsets[0]
            && pair[0].end(1) <= pair[1].offsets[1]),
        "LCS runs must be strictly increasing: {runs:?}"
    );

    runs.push(eof);
    runs
}

type RunId = usize;

#[derive(Debug, Clone, Copy)]
struct RunNode {
    run: LcsRun,
    next: Option<RunId>,
}

/// Furthest reaching point of a path on one diagonal.
///
/// Forward cells point at the next unconsumed position of each list (the
/// sentinel once a list is exhausted); reverse cells at the last unconsumed
/// one (the sentinel once nothing is left before the cut). Paths may leave
/// the edit graph; such cells sit on a sentinel and never extend a snake.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    x: isize,
    y: isize,
    position: [PosId; 2],
    runs: Option<RunId>,
}

/// Frontier cells indexed by diagonal.
#[derive(Debug)]
struct Diagonals {
    lowest: isize,
    cells: Vec<Option<Frontier>>,
}

impl Diagonals {
    fn new(lowest: isize, highest: isize) -> Self {
        Diagonals {
            lowest,
            cells: vec![None; usize::try_from(highest - lowest + 1).unwrap_or_default()],
        }
    }

    fn slot(&self, k: isize) -> Option<usize> {
        usize::try_from(k - self.lowest)
            .ok()
            .filter(|slot| *slot < self.cells.len())
    }

    fn get(&self, k: isize) -> Option<Frontier> { self.slot(k).and_then(|slot| self.cells[slot]) }

    fn set(&mut self, k: isize, cell: Frontier) {
        if let Some(slot) = self.slot(k) {
            self.cells[slot] = Some(cell);
        }
    }
}

struct Search<'a> {
    arena: &'a PositionArena,
    lists: [PositionList; 2],
    sentinels: [PosId; 2],
    nodes: Vec<RunNode>,
}

impl<'a> Search<'a> {
    fn new(arena: &'a PositionArena, lists: [PositionList; 2], sentinels: [PosId; 2]) -> Self {
        Search {
            arena,
            lists,
            sentinels,
            nodes: Vec::new(),
        }
    }

    fn run(&mut self) -> Vec<LcsRun> {
        let n = to_isize(self.lists[0].len());
        let m = to_isize(self.lists[1].len());
        let delta = n - m;
        let odd = delta & 1 == 1;
        let d_max = (n + m + 1) / 2 + 1;

        let lowest = delta.min(0) - d_max - 1;
        let highest = delta.max(0) + d_max + 1;
        let mut forward = Diagonals::new(lowest, highest);
        let mut reverse = Diagonals::new(lowest, highest);

        let start = Frontier {
            x: 0,
            y: 0,
            position: [
                self.arena.next(self.sentinels[0]),
                self.arena.next(self.sentinels[1]),
            ],
            runs: None,
        };
        let end = Frontier {
            x: n,
            y: m,
            position: [
                self.arena.prev(self.sentinels[0]),
                self.arena.prev(self.sentinels[1]),
            ],
            runs: None,
        };

        for d in 0..=d_max {
            for k in (-d..=d).step_by(2) {
                let from = if d == 0 {
                    Some(start)
                } else {
                    self.step_forward(&forward, k)
                };
                let Some(from) = from else { continue };

                let cell = self.snake_forward(from);
                forward.set(k, cell);

                if odd && (k - delta).abs() < d {
                    if let Some(other) = reverse.get(k) {
                        if cell.x >= other.x {
                            trace!(d, k, "LCS frontiers met on the forward pass");
                            return self.join(cell, other);
                        }
                    }
                }
            }

            for k in (delta - d..=delta + d).step_by(2) {
                let from = if d == 0 {
                    Some(end)
                } else {
                    self.step_reverse(&reverse, k)
                };
                let Some(from) = from else { continue };

                let cell = self.snake_reverse(from);
                reverse.set(k, cell);

                if !odd && k.abs() <= d {
                    if let Some(other) = forward.get(k) {
                        if other.x >= cell.x {
                            trace!(d, k, "LCS frontiers met on the reverse pass");
                            return self.join(other, cell);
                        }
                    }
                }
            }
        }

        debug_assert!(false, "LCS frontiers never met");
        Vec::new()
    }

    fn advance(&self, side: usize, position: PosId) -> PosId {
        if position == self.sentinels[side] {
            position
        } else {
            self.arena.next(position)
        }
    }

    fn retreat(&self, side: usize, position: PosId) -> PosId {
        if position == self.sentinels[side] {
            position
        } else {
            self.arena.prev(position)
        }
    }

    /// Extends the previous round's cells on diagonals `k ± 1` by one
    /// non-diagonal edge onto `k`, keeping whichever lands further.
    fn step_forward(&self, cells: &Diagonals, k: isize) -> Option<Frontier> {
        let down = cells.get(k + 1).map(|cell| Frontier {
            y: cell.y + 1,
            position: [cell.position[0], self.advance(1, cell.position[1])],
            ..cell
        });
        let right = cells.get(k - 1).map(|cell| Frontier {
            x: cell.x + 1,
            position: [self.advance(0, cell.position[0]), cell.position[1]],
            ..cell
        });

        match (down, right) {
            (Some(down), Some(right)) => Some(if down.x >= right.x { down } else { right }),
            (down, right) => down.or(right),
        }
    }

    fn step_reverse(&self, cells: &Diagonals, k: isize) -> Option<Frontier> {
        let up = cells.get(k - 1).map(|cell| Frontier {
            y: cell.y - 1,
            position: [cell.position[0], self.retreat(1, cell.position[1])],
            ..cell
        });
        let left = cells.get(k + 1).map(|cell| Frontier {
            x: cell.x - 1,
            position: [self.retreat(0, cell.position[0]), cell.position[1]],
            ..cell
        });

        match (up, left) {
            (Some(up), Some(left)) => Some(if left.x <= up.x { left } else { up }),
            (up, left) => up.or(left),
        }
    }

    fn snake_forward(&mut self, from: Frontier) -> Frontier {
        let mut cell = from;
        while self.arena.node(cell.position[0]) == self.arena.node(cell.position[1]) {
            cell.position = [
                self.arena.next(cell.position[0]),
                self.arena.next(cell.position[1]),
            ];
            cell.x += 1;
            cell.y += 1;
        }

        if cell.x > from.x {
            cell.runs = Some(self.push_run(
                LcsRun {
                    offsets: [
                        self.arena.offset(from.position[0]),
                        self.arena.offset(from.position[1]),
                    ],
                    length: to_usize(cell.x - from.x),
                },
                from.runs,
            ));
        }
        cell
    }

    fn snake_reverse(&mut self, from: Frontier) -> Frontier {
        let mut cell = from;
        while self.arena.node(cell.position[0]) == self.arena.node(cell.position[1]) {
            cell.position = [
                self.arena.prev(cell.position[0]),
                self.arena.prev(cell.position[1]),
            ];
            cell.x -= 1;
            cell.y -= 1;
        }

        if cell.x < from.x {
            cell.runs = Some(self.push_run(
                LcsRun {
                    offsets: [
                        self.lists[0].start() + to_usize(cell.x),
                        self.lists[1].start() + to_usize(cell.y),
                    ],
                    length: to_usize(from.x - cell.x),
                },
                from.runs,
            ));
        }
        cell
    }

    fn push_run(&mut self, run: LcsRun, next: Option<RunId>) -> RunId {
        self.nodes.push(RunNode { run, next });
        self.nodes.len() - 1
    }

    fn collect(&self, mut current: Option<RunId>) -> Vec<LcsRun> {
        let mut runs = Vec::new();
        while let Some(id) = current {
            runs.push(self.nodes[id].run);
            current = self.nodes[id].next;
        }
        runs
    }

    /// Joins a forward path ending at `forward` with a reverse path starting
    /// at `reverse` on the same diagonal, `reverse.x <= forward.x`. Forward
    /// matches are kept only strictly before the reverse starting point; the
    /// overlap drops at most `forward.x - reverse.x` matches, exactly the
    /// amount counted twice, so the result stays a longest subsequence.
    fn join(&self, forward: Frontier, reverse: Frontier) -> Vec<LcsRun> {
        let limit = [
            to_isize(self.lists[0].start()) + reverse.x,
            to_isize(self.lists[1].start()) + reverse.y,
        ];

        let mut forward_runs = self.collect(forward.runs);
        forward_runs.reverse();

        let mut runs: Vec<LcsRun> = Vec::with_capacity(forward_runs.len());
        for run in forward_runs {
            let room = (limit[0] - to_isize(run.offsets[0]))
                .min(limit[1] - to_isize(run.offsets[1]));
            if room <= 0 {
                break;
            }

            let length = run.length.min(to_usize(room));
            runs.push(LcsRun { length, ..run });
            if length < run.length {
                break;
            }
        }

        for run in self.collect(reverse.runs) {
            match runs.last_mut() {
                Some(last) if last.end(0) == run.offsets[0] && last.end(1) == run.offsets[1] => {
                    last.length += run.length;
                }
                _ => runs.push(run),
            }
        }

        runs
    }
}

fn to_isize(value: usize) -> isize { isize::try_from(value).unwrap_or(isize::MAX) }

fn to_usize(value: isize) -> usize { usize::try_from(value).unwrap_or_default() }
