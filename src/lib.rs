//! Diffing, text deltas and working-copy layers for a Subversion style
//! version control client.
//!
//! - [`diff`] computes token based 2-way and 3-way diffs and renders them as
//!   unified diffs or merged text.
//! - [`delta`] expresses a target byte stream as windows of copy and insert
//!   instructions over a source stream, and moves them around as svndiff.
//! - [`editor`] describes the changes between two trees as a series of edit
//!   calls.
//! - [`wc`] keeps the working copy as layered node rows and receives updates
//!   through that editor protocol.

pub mod cancel;
pub mod config;
pub mod consts;
pub mod delta;
pub mod diff;
pub mod editor;
pub mod tokenizer;
pub mod wc;

pub use cancel::{CancelCheck, Never};
pub use config::{Config, ConfigError, ConflictDetection};
pub use diff::{MergeLabels, MergeResult, merge_text, unified_diff};
pub use tokenizer::{BuiltinTokenizer, Tokenizer, token::Token};
