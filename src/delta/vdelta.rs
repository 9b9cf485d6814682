//! The vdelta algorithm (Hunt, Vo and Tichy, "Delta Algorithms: An
//! Empirical Analysis"), computing one window's instructions.
//!
//! The window's source view and target view sit next to each other in one
//! buffer. Every 4-byte key of the source is indexed first; the target is
//! then scanned from the left, indexing its keys as it goes, so a match may
//! refer back into the source or into target bytes already produced
//! (possibly overlapping the current position, which expresses runs).
//!
//! Finding the longest match:
//!
//! 1. Look up the key at the current position. Without candidates, the byte
//!    becomes literal data and the scan moves on by one.
//! 2. Take the candidate extending furthest as the current match.
//! 3. Look up the key made of the last three matched bytes plus the first
//!    unmatched one; any candidate extending the current match further
//!    replaces it. Repeat until nothing improves.
//! 4. Emit the copy, index the last three matched positions and continue
//!    after the match.

use super::window::WindowBuilder;

const KEY_SIZE: usize = 4;
const MULTIPLIER: u32 = 127;

/// Multimap from key hashes to positions in the buffer. Bucket chains are
/// threaded through `next`, whose slot index is the position of the key.
#[derive(Debug)]
struct HashTable {
    buckets: Vec<Option<usize>>,
    next: Vec<Option<usize>>,
}

impl HashTable {
    fn new(slots: usize) -> Self {
        HashTable {
            buckets: vec![None; (slots / 3) | 1],
            next: vec![None; slots],
        }
    }

    fn bucket(&self, key: &[u8]) -> usize {
        let hash = key[..KEY_SIZE]
            .iter()
            .fold(0_u32, |hash, byte| {
                hash.wrapping_mul(MULTIPLIER).wrapping_add(u32::from(*byte))
            });
        hash as usize % self.buckets.len()
    }

    fn store(&mut self, data: &[u8], position: usize) {
        let bucket = self.bucket(&data[position..]);
        self.next[position] = self.buckets[bucket];
        self.buckets[bucket] = Some(position);
    }

    fn candidates<'a>(&'a self, key: &[u8]) -> impl Iterator<Item = usize> + 'a {
        let mut current = self.buckets[self.bucket(key)];
        std::iter::from_fn(move || {
            let position = current?;
            current = self.next[position];
            Some(position)
        })
    }
}

/// Computes the instructions rebuilding `data[source_len..]` from
/// `data[..source_len]`.
pub fn vdelta(builder: &mut WindowBuilder, data: &[u8], source_len: usize) {
    let mut table = HashTable::new(data.len());

    scan(builder, &mut table, data, 0, source_len, false);
    scan(builder, &mut table, data, source_len, data.len(), true);
}

fn scan(
    builder: &mut WindowBuilder,
    table: &mut HashTable,
    data: &[u8],
    start: usize,
    end: usize,
    emit: bool,
) {
    let mut here = start;
    let mut insert_from: Option<usize> = None;

    loop {
        if end - here < KEY_SIZE {
            let from = insert_from.unwrap_or(here);
            if emit && from < end {
                builder.push_new(&data[from..end]);
            }
            return;
        }

        let (match_start, match_len) = longest_match(table, data, here, start, end);

        if match_len < KEY_SIZE {
            table.store(data, here);
            insert_from.get_or_insert(here);
            here += 1;
            continue;
        }

        if emit {
            if let Some(from) = insert_from.take() {
                builder.push_new(&data[from..here]);
            }

            if match_start < start {
                builder.push_source(match_start, match_len);
            } else {
                builder.push_target(match_start - start, match_len);
            }
        }

        here += match_len;
        if end - here >= KEY_SIZE {
            for position in here - (KEY_SIZE - 1)..here {
                table.store(data, position);
            }
        }
    }
}

/// Returns the start and length of the longest match for the bytes at
/// `here`, or a length below [`KEY_SIZE`] when there is none.
fn longest_match(
    table: &HashTable,
    data: &[u8],
    here: usize,
    start: usize,
    end: usize,
) -> (usize, usize) {
    let mut best = (0, 0);
    let mut key = here;

    loop {
        let mut progress = false;

        for slot in table.candidates(&data[key..]) {
            // The candidate matches the key, so the match it implies starts
            // `key - here` bytes before it.
            let Some(candidate) = slot.checked_sub(key - here) else {
                continue;
            };

            let mut length = match_length(data, candidate, here, end);

            // Copies come either from the source or from the target.
            if candidate < start && candidate + length > start {
                length = start - candidate;
            }

            if length >= KEY_SIZE && length > best.1 {
                best = (candidate, length);
                progress = true;
            }
        }

        if !progress {
            return best;
        }

        key = here + best.1 - (KEY_SIZE - 1);
        if end - key < KEY_SIZE {
            return best;
        }
    }
}

fn match_length(data: &[u8], candidate: usize, here: usize, end: usize) -> usize {
    (here..end)
        .zip(candidate..)
        .take_while(|&(from, to)| data[from] == data[to])
        .count()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::delta::{DeltaOp, DeltaWindow};

    fn delta(source: &[u8], target: &[u8]) -> DeltaWindow {
        let mut data = source.to_vec();
        data.extend_from_slice(target);

        let mut builder = WindowBuilder::new(0, source.len(), target.len());
        vdelta(&mut builder, &data, source.len());
        builder.finish()
    }

    /// Rebuilds the target of a window whose source view is `source`.
    fn rebuild(source: &[u8], window: &DeltaWindow) -> Vec<u8> {
        let mut target: Vec<u8> = Vec::new();
        for op in &window.ops {
            match *op {
                DeltaOp::Source { offset, length } => {
                    target.extend_from_slice(&source[offset..offset + length]);
                }
                DeltaOp::Target { offset, length } => {
                    for i in offset..offset + length {
                        target.push(target[i]);
                    }
                }
                DeltaOp::New { offset, length } => {
                    target.extend_from_slice(&window.new_data[offset..offset + length]);
                }
            }
        }
        target
    }

    #[test]
    fn test_identical_views_copy_from_source() {
        let bytes = (0..100_u8).collect::<Vec<_>>();
        let window = delta(&bytes, &bytes);

        assert!(window.new_data.is_empty());
        assert_eq!(
            window.ops,
            [DeltaOp::Source {
                offset: 0,
                length: 100
            }]
        );
    }

    #[test]
    fn test_repeated_target_uses_overlapping_target_copy() {
        let window = delta(b"", b"abcabcabcabcabcabc");

        assert_eq!(window.new_data, b"abc");
        assert!(
            window
                .ops
                .iter()
                .any(|op| matches!(op, DeltaOp::Target { offset: 0, .. }))
        );
        assert_eq!(rebuild(b"", &window), b"abcabcabcabcabcabc");
    }

    #[test]
    fn test_short_target_is_literal() {
        let window = delta(b"abcdef", b"abc");
        assert_eq!(
            window.ops,
            [DeltaOp::New {
                offset: 0,
                length: 3
            }]
        );
    }

    #[test]
    fn test_edited_text_rebuilds() {
        let source = b"The quick brown fox jumps over the lazy dog. The quick brown fox.";
        let target = b"The quick red fox jumps over the lazy dog! The quick brown fox...";

        let window = delta(source, target);
        assert_eq!(rebuild(source, &window), target);
        assert!(window.new_data.len() < target.len() / 2);
    }
}
