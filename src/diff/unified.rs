use std::convert::Infallible;

use super::{Diff, DiffOutput, HunkRange, TextDatasource, diff};
use crate::{BuiltinTokenizer, config::OutputConfig};

const NO_NEWLINE_AT_END: &str = "\\ No newline at end of file\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Skip,
    Context,
    Delete,
    Insert,
}

/// Renders a 2-way line diff as unified diff hunks.
///
/// Changed ranges whose context overlaps or touches are joined into one
/// hunk. Lines are tracked with one cursor per side, so the ranges fed
/// through [`DiffOutput`] must come in source order, as [`Diff::output`]
/// delivers them.
#[derive(Debug)]
pub struct UnifiedDiff<'a> {
    lines: [Vec<&'a str>; 2],
    context: usize,

    current_line: [usize; 2],
    hunk_start: [usize; 2],
    hunk_length: [usize; 2],
    hunk: String,

    output: String,
}

impl<'a> UnifiedDiff<'a> {
    pub fn new(original: &'a str, modified: &'a str, context: usize) -> Self {
        UnifiedDiff {
            lines: [
                original.split_inclusive('\n').collect(),
                modified.split_inclusive('\n').collect(),
            ],
            context,
            current_line: [0; 2],
            hunk_start: [0; 2],
            hunk_length: [0; 2],
            hunk: String::new(),
            output: String::new(),
        }
    }

    /// Renders `diff` with `---`/`+++` headers. A diff without changes
    /// renders as nothing at all.
    pub fn render(mut self, diff: &Diff, original_header: &str, modified_header: &str) -> String {
        if !diff.contains_diffs() {
            return String::new();
        }

        self.output = format!("--- {original_header}\n+++ {modified_header}\n");
        let Ok(()) = diff.output(&mut self);
        self.flush_hunk();

        self.output
    }

    /// Moves the cursor of side `index` one line ahead, copying the line
    /// into the current hunk unless skipping. The cursor keeps moving past
    /// the end of the text so trailing context can be requested blindly.
    fn output_line(&mut self, kind: LineKind, index: usize) {
        let line = self.lines[index].get(self.current_line[index]).copied();
        self.current_line[index] += 1;

        let Some(line) = line else {
            return;
        };

        let prefix = match kind {
            LineKind::Skip => return,
            LineKind::Context => {
                self.hunk_length[0] += 1;
                self.hunk_length[1] += 1;
                ' '
            }
            LineKind::Delete => {
                self.hunk_length[0] += 1;
                '-'
            }
            LineKind::Insert => {
                self.hunk_length[1] += 1;
                '+'
            }
        };

        self.hunk.push(prefix);
        self.hunk.push_str(line);
        if !line.ends_with('\n') {
            self.hunk.push('\n');
            self.hunk.push_str(NO_NEWLINE_AT_END);
        }
    }

    fn flush_hunk(&mut self) {
        if self.hunk.is_empty() {
            return;
        }

        let target_line = self.hunk_start[0] + self.hunk_length[0] + self.context;
        while self.current_line[0] < target_line {
            self.output_line(LineKind::Context, 0);
        }

        // Line numbers are 1-based, except for the position of an empty
        // range.
        let header = (0..2)
            .map(|side| {
                let start = self.hunk_start[side] + usize::from(self.hunk_length[side] > 0);
                match self.hunk_length[side] {
                    1 => start.to_string(),
                    length => format!("{start},{length}"),
                }
            })
            .collect::<Vec<_>>();

        self.output
            .push_str(&format!("@@ -{} +{} @@\n", header[0], header[1]));
        self.output.push_str(&self.hunk);

        self.hunk_length = [0; 2];
        self.hunk.clear();
    }
}

impl DiffOutput for UnifiedDiff<'_> {
    type Error = Infallible;

    fn output_diff_modified(
        &mut self,
        original: HunkRange,
        modified: HunkRange,
        _latest: HunkRange,
    ) -> Result<(), Infallible> {
        let context_start = original.start.saturating_sub(self.context);

        // Start a new hunk unless the context of this change connects to the
        // one being built.
        if self.current_line[0] < context_start
            && (self.hunk_start[0] + self.hunk_length[0] + self.context < context_start
                || self.hunk_length[0] == 0)
        {
            self.flush_hunk();

            self.hunk_start = [
                context_start,
                modified.start + context_start - original.start,
            ];
            while self.current_line[0] < context_start {
                self.output_line(LineKind::Skip, 0);
            }
        }

        while self.current_line[1] < modified.start {
            self.output_line(LineKind::Skip, 1);
        }

        while self.current_line[0] < original.start {
            self.output_line(LineKind::Context, 0);
        }

        while self.current_line[0] < original.end() {
            self.output_line(LineKind::Delete, 0);
        }
        while self.current_line[1] < modified.end() {
            self.output_line(LineKind::Insert, 1);
        }

        Ok(())
    }
}

/// Line-diffs two texts and renders the result as a unified diff.
pub fn unified_diff(
    original: &str,
    modified: &str,
    original_header: &str,
    modified_header: &str,
    config: &OutputConfig,
) -> String {
    let mut datasource = TextDatasource::new(original, modified, &*BuiltinTokenizer::Line);
    let Ok(diff) = diff(&mut datasource);

    UnifiedDiff::new(original, modified, config.context_lines).render(
        &diff,
        original_header,
        modified_header,
    )
}
