//! Managed block parsing, rendering and splicing.
//!
//! The block is delimited by [`BEGIN_MARKER`] and [`END_MARKER`]. Content is
//! handled as raw bytes split on `\n`: only marker lines and the lines inside
//! the block are ever decoded, so everything outside the markers is carried
//! through byte-for-byte whatever its encoding.

use std::collections::BTreeSet;

use habitguard_core::normalize_domain;

pub const BEGIN_MARKER: &str = "# >>> habitguard managed block >>>";
pub const END_MARKER: &str = "# <<< habitguard managed block <<<";
pub const LOOPBACK: &str = "127.0.0.1";

/// Where the managed block sits in a file, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockScan {
    Absent,
    /// Line indices of the begin and end markers (inclusive).
    Present { begin: usize, end: usize },
    /// Markers exist but do not form exactly one ordered pair.
    Malformed { reason: String },
}

impl BlockScan {
    pub fn is_malformed(&self) -> bool {
        matches!(self, BlockScan::Malformed { .. })
    }
}

fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    content.split_inclusive(|&b| b == b'\n').collect()
}

fn ends_with_newline(line: &[u8]) -> bool {
    line.last() == Some(&b'\n')
}

fn is_marker(line: &[u8], marker: &str) -> bool {
    std::str::from_utf8(line).map(str::trim) == Ok(marker)
}

fn is_any_marker(line: &[u8]) -> bool {
    is_marker(line, BEGIN_MARKER) || is_marker(line, END_MARKER)
}

/// Locate the managed block.
pub fn scan(content: impl AsRef<[u8]>) -> BlockScan {
    let lines = split_lines(content.as_ref());
    let begins: Vec<usize> = (0..lines.len())
        .filter(|&i| is_marker(lines[i], BEGIN_MARKER))
        .collect();
    let ends: Vec<usize> = (0..lines.len())
        .filter(|&i| is_marker(lines[i], END_MARKER))
        .collect();

    match (begins.as_slice(), ends.as_slice()) {
        ([], []) => BlockScan::Absent,
        ([begin], [end]) if begin < end => BlockScan::Present {
            begin: *begin,
            end: *end,
        },
        ([begin], [end]) => BlockScan::Malformed {
            reason: format!(
                "end marker on line {} precedes begin marker on line {}",
                end + 1,
                begin + 1
            ),
        },
        (b, e) => BlockScan::Malformed {
            reason: format!("{} begin marker(s) and {} end marker(s)", b.len(), e.len()),
        },
    }
}

/// Domains listed inside a well-formed managed block.
///
/// `www.` variants fold into their base domain. Absent or malformed blocks
/// read as empty.
pub fn parse_domains(content: impl AsRef<[u8]>) -> BTreeSet<String> {
    let content = content.as_ref();
    let BlockScan::Present { begin, end } = scan(content) else {
        return BTreeSet::new();
    };
    let mut domains = BTreeSet::new();
    for line in &split_lines(content)[begin + 1..end] {
        let line = String::from_utf8_lossy(line);
        let entry = line.split('#').next().unwrap_or_default();
        domains.extend(
            entry
                .split_whitespace()
                .skip(1)
                .filter_map(normalize_domain),
        );
    }
    domains
}

/// Render a managed block mapping each domain and its `www.` variant to
/// loopback. `trailing_newline` controls the end marker's terminator.
pub fn render_block(domains: &BTreeSet<String>, trailing_newline: bool) -> String {
    let mut out = String::new();
    out.push_str(BEGIN_MARKER);
    out.push('\n');
    for domain in domains {
        out.push_str(&format!("{LOOPBACK} {domain}\n"));
        out.push_str(&format!("{LOOPBACK} www.{domain}\n"));
    }
    out.push_str(END_MARKER);
    if trailing_newline {
        out.push('\n');
    }
    out
}

/// Remove the managed block, or every stray marker line when malformed.
pub fn strip(content: impl AsRef<[u8]>) -> Vec<u8> {
    let content = content.as_ref();
    let lines = split_lines(content);
    match scan(content) {
        BlockScan::Absent => content.to_vec(),
        BlockScan::Present { begin, end } => {
            let mut prefix = lines[..begin].concat();
            let suffix = lines[end + 1..].concat();
            // A block appended to a file lacking a final newline carried its
            // own separator; drop it again so the original bytes come back.
            if suffix.is_empty() && !ends_with_newline(lines[end]) && ends_with_newline(&prefix) {
                prefix.pop();
            }
            prefix.extend_from_slice(&suffix);
            prefix
        }
        BlockScan::Malformed { .. } => lines
            .into_iter()
            .filter(|line| !is_any_marker(line))
            .collect::<Vec<_>>()
            .concat(),
    }
}

/// Produce the full file content with the managed block set to `domains`.
///
/// An empty set removes the block. An existing block is replaced in place; a
/// new one is appended at end of file.
pub fn splice(content: impl AsRef<[u8]>, domains: &BTreeSet<String>) -> Vec<u8> {
    let content = content.as_ref();
    if domains.is_empty() {
        return strip(content);
    }

    let mut base = match scan(content) {
        BlockScan::Present { begin, end } => {
            let lines = split_lines(content);
            let mut out = lines[..begin].concat();
            out.extend_from_slice(render_block(domains, ends_with_newline(lines[end])).as_bytes());
            out.extend_from_slice(&lines[end + 1..].concat());
            return out;
        }
        BlockScan::Malformed { .. } => strip(content),
        BlockScan::Absent => content.to_vec(),
    };

    let trailing_newline = base.is_empty() || ends_with_newline(&base);
    if !trailing_newline {
        base.push(b'\n');
    }
    base.extend_from_slice(render_block(domains, trailing_newline).as_bytes());
    base
}

/// Number of marker lines of either kind.
pub fn marker_count(content: impl AsRef<[u8]>) -> usize {
    split_lines(content.as_ref())
        .into_iter()
        .filter(|line| is_any_marker(line))
        .count()
}
