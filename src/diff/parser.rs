use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diff::hunk::{ChangeKind, Hunk};
use crate::error::RegroupError;

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

/// Decompose the text of `git diff <base>..<tip>` into addressable hunks.
///
/// The scan is strict: malformed headers, content lines with unknown
/// prefixes, and file blocks that promise hunks but carry none are hard
/// errors. Nothing has been mutated at parse time, so the whole run aborts
/// cleanly on the first defect.
pub fn parse_diff(diff_text: &str) -> Result<Vec<Hunk>, RegroupError> {
    let mut lines: Vec<&str> = diff_text.split('\n').collect();
    // Trailing newline produces one empty trailing fragment; drop it.
    if lines.last() == Some(&"") {
        lines.pop();
    }

    let mut hunks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].starts_with("diff --git ") {
            parse_file_block(&lines, &mut i, &mut hunks)?;
        } else {
            return Err(RegroupError::DiffParse(format!(
                "Expected 'diff --git' header, found: {}",
                lines[i]
            )));
        }
    }

    let mut seen = HashSet::new();
    for hunk in &hunks {
        if !seen.insert(hunk.id()) {
            return Err(RegroupError::DiffParse(format!(
                "Duplicate hunk id in extracted diff: {}",
                hunk.id()
            )));
        }
    }

    Ok(hunks)
}

struct FileBlock {
    header_lines: Vec<String>,
    old_path: Option<String>,
    new_path: Option<String>,
    kind: ChangeKind,
    has_mode_change: bool,
}

impl FileBlock {
    fn header_text(&self) -> String {
        let mut text = self.header_lines.join("\n");
        text.push('\n');
        text
    }

    fn path(&self, diff_git_line: &str) -> Result<String, RegroupError> {
        if let Some(p) = &self.new_path {
            return Ok(p.clone());
        }
        if let Some(p) = &self.old_path {
            return Ok(p.clone());
        }
        // Mode-only changes carry no ---/+++ lines; fall back to the
        // `diff --git a/P b/P` line itself.
        path_from_diff_git_line(diff_git_line)
    }
}

fn parse_file_block(
    lines: &[&str],
    i: &mut usize,
    hunks: &mut Vec<Hunk>,
) -> Result<(), RegroupError> {
    let diff_git_line = lines[*i].to_string();
    let mut block = FileBlock {
        header_lines: vec![diff_git_line.clone()],
        old_path: None,
        new_path: None,
        kind: ChangeKind::Modify,
        has_mode_change: false,
    };
    *i += 1;

    // Metadata lines up to the first hunk, binary block, or next file.
    while *i < lines.len() {
        let line = lines[*i];
        if line.starts_with("@@")
            || line.starts_with("diff --git ")
            || line == "GIT binary patch"
            || line.starts_with("Binary files ")
        {
            break;
        }
        if let Some(rest) = line.strip_prefix("--- ") {
            // Paths containing spaces are emitted unquoted but get a
            // trailing tab so the boundary stays unambiguous.
            let rest = rest.strip_suffix('\t').unwrap_or(rest);
            if rest != "/dev/null" {
                block.old_path = Some(strip_prefix_dir(&unquote_path(rest)?, "a/"));
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            let rest = rest.strip_suffix('\t').unwrap_or(rest);
            if rest != "/dev/null" {
                block.new_path = Some(strip_prefix_dir(&unquote_path(rest)?, "b/"));
            }
        } else if line.starts_with("new file mode ") {
            block.kind = ChangeKind::AddFile;
        } else if line.starts_with("deleted file mode ") {
            block.kind = ChangeKind::DeleteFile;
        } else if let Some(rest) = line.strip_prefix("rename from ") {
            block.kind = ChangeKind::Rename;
            block.old_path = Some(unquote_path(rest)?);
        } else if let Some(rest) = line.strip_prefix("rename to ") {
            block.kind = ChangeKind::Rename;
            block.new_path = Some(unquote_path(rest)?);
        } else if let Some(rest) = line.strip_prefix("copy from ") {
            block.kind = ChangeKind::Rename;
            block.old_path = Some(unquote_path(rest)?);
        } else if let Some(rest) = line.strip_prefix("copy to ") {
            block.kind = ChangeKind::Rename;
            block.new_path = Some(unquote_path(rest)?);
        } else if line.starts_with("old mode ") || line.starts_with("new mode ") {
            block.has_mode_change = true;
        } else if line.starts_with("index ")
            || line.starts_with("similarity index ")
            || line.starts_with("dissimilarity index ")
        {
            // Re-emitted verbatim; nothing to extract.
        } else {
            return Err(RegroupError::DiffParse(format!(
                "Unexpected line in file header: {}",
                line
            )));
        }
        block.header_lines.push(line.to_string());
        *i += 1;
    }

    let file_path = block.path(&diff_git_line)?;
    let file_header = block.header_text();

    if *i < lines.len() && (lines[*i] == "GIT binary patch" || lines[*i].starts_with("Binary files "))
    {
        // The whole binary block is carried verbatim as one hunk body and is
        // never reflowed.
        let mut body = Vec::new();
        while *i < lines.len() && !lines[*i].starts_with("diff --git ") {
            body.push(lines[*i].to_string());
            *i += 1;
        }
        hunks.push(Hunk {
            file_path,
            change_kind: ChangeKind::Binary,
            old_start: 0,
            old_count: 0,
            new_start: 0,
            new_count: 0,
            lines: body,
            file_header,
        });
        return Ok(());
    }

    let mut parsed_any = false;
    let mut prev_old_start: Option<u32> = None;
    while *i < lines.len() && lines[*i].starts_with("@@") {
        let hunk = parse_hunk(lines, i, &file_path, block.kind, &file_header)?;
        if let Some(prev) = prev_old_start
            && hunk.old_start <= prev
        {
            return Err(RegroupError::DiffParse(format!(
                "Non-monotonic hunk order in {}: {} after {}",
                file_path, hunk.old_start, prev
            )));
        }
        prev_old_start = Some(hunk.old_start);
        hunks.push(hunk);
        parsed_any = true;
    }

    if !parsed_any {
        // Renames, copies, mode-only changes, and empty file creations or
        // deletions legitimately carry no body; everything else promised
        // hunks it did not deliver.
        let synthetic_ok = block.has_mode_change
            || matches!(
                block.kind,
                ChangeKind::AddFile | ChangeKind::DeleteFile | ChangeKind::Rename
            );
        if !synthetic_ok {
            return Err(RegroupError::DiffParse(format!(
                "File header without any hunk: {}",
                file_path
            )));
        }
        hunks.push(Hunk {
            file_path,
            change_kind: block.kind,
            old_start: 0,
            old_count: 0,
            new_start: 0,
            new_count: 0,
            lines: Vec::new(),
            file_header,
        });
    }

    Ok(())
}

fn parse_hunk(
    lines: &[&str],
    i: &mut usize,
    file_path: &str,
    kind: ChangeKind,
    file_header: &str,
) -> Result<Hunk, RegroupError> {
    let header = lines[*i];
    let caps = HUNK_HEADER.captures(header).ok_or_else(|| {
        RegroupError::DiffParse(format!("Malformed hunk header: {}", header))
    })?;
    let old_start = parse_u32(caps.get(1).unwrap().as_str(), header)?;
    let old_count = match caps.get(2) {
        Some(m) => parse_u32(m.as_str(), header)?,
        None => 1,
    };
    let new_start = parse_u32(caps.get(3).unwrap().as_str(), header)?;
    let new_count = match caps.get(4) {
        Some(m) => parse_u32(m.as_str(), header)?,
        None => 1,
    };
    *i += 1;

    let mut body = Vec::new();
    let mut old_seen = 0u32;
    let mut new_seen = 0u32;
    while old_seen < old_count || new_seen < new_count {
        let line = match lines.get(*i) {
            Some(l) => *l,
            None => {
                return Err(RegroupError::DiffParse(format!(
                    "Truncated hunk body in {} (header {})",
                    file_path, header
                )));
            }
        };
        match line.bytes().next() {
            Some(b' ') => {
                old_seen += 1;
                new_seen += 1;
            }
            Some(b'-') => old_seen += 1,
            Some(b'+') => new_seen += 1,
            // Missing-trailing-newline marker for the preceding line.
            Some(b'\\') => {}
            _ => {
                return Err(RegroupError::DiffParse(format!(
                    "Unknown content line prefix in {}: {:?}",
                    file_path, line
                )));
            }
        }
        body.push(line.to_string());
        *i += 1;
    }
    // A marker after the final body line belongs to this hunk too.
    if *i < lines.len() && lines[*i].starts_with('\\') {
        body.push(lines[*i].to_string());
        *i += 1;
    }

    Ok(Hunk {
        file_path: file_path.to_string(),
        change_kind: kind,
        old_start,
        old_count,
        new_start,
        new_count,
        lines: body,
        file_header: file_header.to_string(),
    })
}

fn parse_u32(s: &str, context: &str) -> Result<u32, RegroupError> {
    s.parse::<u32>().map_err(|_| {
        RegroupError::DiffParse(format!("Invalid line number '{}' in: {}", s, context))
    })
}

fn strip_prefix_dir(path: &str, prefix: &str) -> String {
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

/// Decode git's C-style path quoting (`"a/sp\303\244ter.txt"`). Unquoted
/// paths pass through untouched.
fn unquote_path(raw: &str) -> Result<String, RegroupError> {
    if !(raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2) {
        return Ok(raw.to_string());
    }
    let inner = &raw.as_bytes()[1..raw.len() - 1];
    let mut bytes = Vec::with_capacity(inner.len());
    let mut idx = 0;
    while idx < inner.len() {
        let b = inner[idx];
        if b != b'\\' {
            bytes.push(b);
            idx += 1;
            continue;
        }
        idx += 1;
        let esc = *inner.get(idx).ok_or_else(|| {
            RegroupError::DiffParse(format!("Dangling escape in quoted path: {}", raw))
        })?;
        match esc {
            b'\\' | b'"' => {
                bytes.push(esc);
                idx += 1;
            }
            b'a' => {
                bytes.push(0x07);
                idx += 1;
            }
            b'b' => {
                bytes.push(0x08);
                idx += 1;
            }
            b'f' => {
                bytes.push(0x0c);
                idx += 1;
            }
            b'n' => {
                bytes.push(b'\n');
                idx += 1;
            }
            b'r' => {
                bytes.push(b'\r');
                idx += 1;
            }
            b't' => {
                bytes.push(b'\t');
                idx += 1;
            }
            b'v' => {
                bytes.push(0x0b);
                idx += 1;
            }
            b'0'..=b'7' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 3
                    && idx < inner.len()
                    && inner[idx].is_ascii_digit()
                    && inner[idx] < b'8'
                {
                    value = value * 8 + u32::from(inner[idx] - b'0');
                    idx += 1;
                    digits += 1;
                }
                bytes.push(value as u8);
            }
            other => {
                return Err(RegroupError::DiffParse(format!(
                    "Unknown escape '\\{}' in quoted path: {}",
                    other as char, raw
                )));
            }
        }
    }
    Ok(String::from_utf8(bytes)?)
}

/// Last-resort path extraction from `diff --git a/P b/P` for blocks with no
/// `---`/`+++` lines (mode-only changes).
fn path_from_diff_git_line(line: &str) -> Result<String, RegroupError> {
    let rest = line
        .strip_prefix("diff --git ")
        .ok_or_else(|| RegroupError::DiffParse(format!("Not a diff header: {}", line)))?;
    if rest.starts_with('"') {
        // Quoted: "a/x" "b/x" -- take the second quoted string.
        if let Some(pos) = rest.rfind(" \"") {
            return Ok(strip_prefix_dir(&unquote_path(rest[pos + 1..].trim())?, "b/"));
        }
    } else if let Some(pos) = rest.find(" b/") {
        return Ok(rest[pos + 3..].to_string());
    }
    Err(RegroupError::DiffParse(format!(
        "Cannot extract path from: {}",
        line
    )))
}
