//! Run-length encoding of line-level diffs.
//!
//! The primitive (`similar`) reports changes as hunks: contiguous groups of
//! operations with a few lines of context, skipping long unchanged stretches
//! entirely. [`RunEncoder`] turns that into a dense list of runs covering
//! every line of both sides, filling the skipped stretches with implicit
//! `Equal` runs.

use std::time::Instant;

use blobflow_types::{count_lines, BatchError, BatchResult};
use serde::{Deserialize, Serialize};
use similar::DiffTag;

use crate::config::{DiffConfig, CONTEXT_LINES};

/// Classification of a run of lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffOpKind {
    /// Present on both sides.
    Equal,
    /// Present only on the new side.
    Insert,
    /// Present only on the old side.
    Delete,
}

/// A maximal run of consecutive lines sharing one classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOp {
    pub kind: DiffOpKind,
    pub run_length: usize,
}

impl DiffOp {
    pub fn equal(run_length: usize) -> Self {
        Self {
            kind: DiffOpKind::Equal,
            run_length,
        }
    }

    pub fn insert(run_length: usize) -> Self {
        Self {
            kind: DiffOpKind::Insert,
            run_length,
        }
    }

    pub fn delete(run_length: usize) -> Self {
        Self {
            kind: DiffOpKind::Delete,
            run_length,
        }
    }
}

/// Coalesces line classifications into runs.
///
/// Lines are pushed in order; a run is emitted only when the kind changes or
/// the encoder is finished. At most `max_ops` runs are kept: once the output
/// is full, further runs are dropped and the output is marked truncated.
#[derive(Debug)]
pub struct RunEncoder {
    ops: Vec<DiffOp>,
    max_ops: usize,
    pending: Option<DiffOp>,
    old_pos: usize,
    new_pos: usize,
    truncated: bool,
}

/// Output of a finished [`RunEncoder`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedRuns {
    pub ops: Vec<DiffOp>,
    pub truncated: bool,
    /// Old-side lines covered by the pushed classifications.
    pub old_visited: usize,
    /// New-side lines covered by the pushed classifications.
    pub new_visited: usize,
}

impl RunEncoder {
    pub fn new(max_ops: usize) -> Self {
        Self {
            ops: Vec::new(),
            max_ops,
            pending: None,
            old_pos: 0,
            new_pos: 0,
            truncated: false,
        }
    }

    /// Record `count` consecutive lines of `kind`.
    pub fn push(&mut self, kind: DiffOpKind, count: usize) {
        if count == 0 {
            return;
        }
        match &mut self.pending {
            Some(run) if run.kind == kind => run.run_length += count,
            _ => {
                self.flush();
                self.pending = Some(DiffOp {
                    kind,
                    run_length: count,
                });
            }
        }
        match kind {
            DiffOpKind::Equal => {
                self.old_pos += count;
                self.new_pos += count;
            }
            DiffOpKind::Insert => self.new_pos += count,
            DiffOpKind::Delete => self.old_pos += count,
        }
    }

    /// Mark the start of a hunk at 0-based old line `old_start`. Old lines
    /// between the current position and the hunk were unchanged.
    pub fn start_hunk(&mut self, old_start: usize) {
        if old_start > self.old_pos {
            self.push(DiffOpKind::Equal, old_start - self.old_pos);
        }
    }

    /// Current 0-based position on the old side.
    pub fn old_position(&self) -> usize {
        self.old_pos
    }

    /// Current 0-based position on the new side.
    pub fn new_position(&self) -> usize {
        self.new_pos
    }

    /// Fill the trailing unchanged gap up to `old_line_count` and emit the
    /// last run.
    pub fn finish(mut self, old_line_count: usize) -> EncodedRuns {
        if old_line_count > self.old_pos {
            self.push(DiffOpKind::Equal, old_line_count - self.old_pos);
        }
        self.flush();
        EncodedRuns {
            ops: self.ops,
            truncated: self.truncated,
            old_visited: self.old_pos,
            new_visited: self.new_pos,
        }
    }

    fn flush(&mut self) {
        if let Some(run) = self.pending.take() {
            if self.ops.len() < self.max_ops {
                self.ops.push(run);
            } else {
                self.truncated = true;
            }
        }
    }
}

/// One side of a line diff: text content plus its line count.
#[derive(Clone, Copy, Debug)]
pub struct TextInput<'a> {
    pub data: &'a [u8],
    pub line_count: usize,
}

impl<'a> TextInput<'a> {
    /// Wrap `data`, counting its lines.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            line_count: count_lines(data),
        }
    }
}

/// Run-length encoded diff between two texts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineDiff {
    pub old_line_count: usize,
    pub new_line_count: usize,
    pub ops: Vec<DiffOp>,
    pub truncated: bool,
}

/// Diff two optional texts into runs.
///
/// An absent old side is a pure addition (one `Insert` run); an absent new
/// side is a pure deletion (one `Delete` run).
pub fn diff_lines(
    old: Option<TextInput<'_>>,
    new: Option<TextInput<'_>>,
    config: &DiffConfig,
) -> BatchResult<LineDiff> {
    let old_line_count = old.map_or(0, |t| t.line_count);
    let new_line_count = new.map_or(0, |t| t.line_count);
    let mut encoder = RunEncoder::new(config.max_ops);

    match (old, new) {
        (None, None) => {}
        (None, Some(new)) => encoder.push(DiffOpKind::Insert, new.line_count),
        (Some(old), None) => encoder.push(DiffOpKind::Delete, old.line_count),
        (Some(old), Some(new)) => encode_hunks(&mut encoder, old.data, new.data, config),
    }

    let runs = encoder.finish(old_line_count);
    if runs.old_visited != old_line_count || runs.new_visited != new_line_count {
        tracing::warn!(
            old_expected = old_line_count,
            old_visited = runs.old_visited,
            new_expected = new_line_count,
            new_visited = runs.new_visited,
            "line diff does not cover both sides"
        );
        return Err(BatchError::DiffCompute);
    }
    if runs.truncated {
        tracing::debug!(max_ops = config.max_ops, "diff runs truncated");
    }

    Ok(LineDiff {
        old_line_count,
        new_line_count,
        ops: runs.ops,
        truncated: runs.truncated,
    })
}

/// Feed the primitive's hunks into `encoder`, leaving gaps for it to fill.
fn encode_hunks(encoder: &mut RunEncoder, old: &[u8], new: &[u8], config: &DiffConfig) {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let deadline = config.timeout.map(|timeout| Instant::now() + timeout);
    let ops = similar::capture_diff_slices_deadline(
        config.algorithm.into(),
        &old_lines,
        &new_lines,
        deadline,
    );

    for hunk in similar::group_diff_ops(ops, CONTEXT_LINES) {
        let Some(first) = hunk.first() else {
            continue;
        };
        encoder.start_hunk(first.old_range().start);
        for op in &hunk {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => encoder.push(DiffOpKind::Equal, old_range.len()),
                DiffTag::Delete => encoder.push(DiffOpKind::Delete, old_range.len()),
                DiffTag::Insert => encoder.push(DiffOpKind::Insert, new_range.len()),
                DiffTag::Replace => {
                    encoder.push(DiffOpKind::Delete, old_range.len());
                    encoder.push(DiffOpKind::Insert, new_range.len());
                }
            }
        }
    }
}

/// Split on `'\n'`, keeping terminators so a missing final newline is a
/// change of its own.
fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    data.split_inclusive(|&b| b == b'\n').collect()
}
