use serde::Deserialize;
use svn_delta_core::{
    Never,
    editor::TreeSnapshot,
    wc::{MemoryRowStore, NodeKind, RelPath, Revision, WcError, WorkingCopy},
};

/// A working-copy command, as written in a document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    AddFile(String),
    AddDirectory(String),
    Delete(String),
    Copy { from: String, to: String },
    Revert { path: String, recursive: bool },
    Commit { path: String, revision: u64 },
    /// The inner step must be rejected.
    Fail(Box<Step>),
}

impl Step {
    fn run(&self, wc: &mut WorkingCopy) -> Result<(), WcError> {
        match self {
            Step::AddFile(path) => wc.add(&rel(path), NodeKind::File).map(drop),
            Step::AddDirectory(path) => wc.add(&rel(path), NodeKind::Directory).map(drop),
            Step::Delete(path) => wc.delete(&rel(path), &Never),
            Step::Copy { from, to } => wc.copy(&rel(from), &rel(to), &Never).map(drop),
            Step::Revert { path, recursive } => wc.revert(&rel(path), *recursive, &Never),
            Step::Commit { path, revision } => wc.commit(&rel(path), Revision(*revision), &Never).map(drop),
            Step::Fail(step) => match step.run(wc) {
                Ok(()) => panic!("{step:?} should have failed"),
                Err(_) => Ok(()),
            },
        }
    }
}

/// A sequence of commands on a fresh checkout, followed by the rows
/// expected below one path.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpDepthDocument {
    name: String,
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    steps: Vec<Step>,
    under: String,
    rows: Vec<String>,
}

impl OpDepthDocument {
    pub fn run(&self) -> WorkingCopy {
        let mut wc = WorkingCopy::checkout(MemoryRowStore::new(), &repository(), Revision(1))
            .expect("Failed to check out");

        for step in &self.steps {
            step.run(&mut wc)
                .unwrap_or_else(|error| panic!("'{}': {step:?} failed: {error}", self.name));
        }

        wc
    }

    pub fn assert_eq(&self, wc: &WorkingCopy) {
        let rows = wc
            .rows_under(&rel(&self.under))
            .expect("Failed to read rows")
            .iter()
            .map(|row| {
                let origin = row
                    .origin
                    .as_ref()
                    .map(|origin| format!(" {origin}"))
                    .unwrap_or_default();
                format!("{} {} {:?}{origin}", row.path, row.op_depth, row.presence)
            })
            .collect::<Vec<_>>();

        pretty_assertions::assert_eq!(rows, self.rows, "rows of '{}'", self.name);
    }
}

fn rel(path: &str) -> RelPath { RelPath::new(path).expect("Invalid path in document") }

fn repository() -> TreeSnapshot {
    TreeSnapshot::from_files([
        ("A/B/lambda", "lambda\n"),
        ("A/B/E/alpha", "alpha\n"),
        ("A/B/E/beta", "beta\n"),
        ("A/D/gamma", "gamma\n"),
        ("A/mu", "mu\n"),
        ("iota", "iota\n"),
    ])
    .expect("Invalid repository tree")
}
