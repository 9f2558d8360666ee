use std::collections::HashMap;

use crate::diff::Hunk;
use crate::diff::hunk::ChangeKind;

/// Per-file running sum of `new_count - old_count` over every hunk already
/// staged during the current run. Later patches shift their post-image line
/// numbers by this amount so the host's patch validator sees internally
/// consistent headers.
#[derive(Debug, Default)]
pub struct OffsetMap {
    deltas: HashMap<String, i64>,
}

impl OffsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shift_for(&self, path: &str) -> i64 {
        self.deltas.get(path).copied().unwrap_or(0)
    }

    /// Fold one staged hunk's line-count change into the running sum.
    pub fn record(&mut self, hunk: &Hunk) {
        *self.deltas.entry(hunk.file_path.clone()).or_insert(0) += hunk.line_delta();
    }
}

/// Emit one unified patch for an ordered run of hunks (normally a single
/// dependency subgroup, all from one file).
///
/// The old-side range is kept verbatim: the body encodes the pre-image
/// content and the host locates it by content where numbers have gone stale.
/// The new-side start is the old start plus the cumulative shift, adjusted
/// for git's asymmetric convention on pure insertions and deletions: an
/// insertion names the line it lands on in the post-image (one past its
/// anchor), a deletion names the line before the removed span.
pub fn synthesize_patch(hunks: &[&Hunk], offsets: &OffsetMap) -> String {
    let mut out = String::new();
    let mut local: HashMap<&str, i64> = HashMap::new();
    let mut current_file: Option<&str> = None;

    for hunk in hunks {
        if current_file != Some(hunk.file_path.as_str()) {
            out.push_str(&hunk.file_header);
            current_file = Some(hunk.file_path.as_str());
        }

        if hunk.change_kind == ChangeKind::Binary {
            for line in &hunk.lines {
                out.push_str(line);
                out.push('\n');
            }
            continue;
        }
        if hunk.is_metadata_only() {
            continue;
        }

        let shift = offsets.shift_for(&hunk.file_path)
            + local.get(hunk.file_path.as_str()).copied().unwrap_or(0);
        let new_start = adjusted_new_start(hunk, shift);
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_count, new_start, hunk.new_count
        ));
        for line in &hunk.lines {
            out.push_str(line);
            out.push('\n');
        }

        *local.entry(hunk.file_path.as_str()).or_insert(0) += hunk.line_delta();
    }

    out
}

fn adjusted_new_start(hunk: &Hunk, shift: i64) -> i64 {
    let base = i64::from(hunk.old_start) + shift;
    let start = if hunk.old_count == 0 {
        base + 1
    } else if hunk.new_count == 0 {
        base - 1
    } else {
        base
    };
    start.max(0)
}
