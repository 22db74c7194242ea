//! Parser for `git status --porcelain` (v1) output.
//!
//! Each line is `XY PATH`, or `XY ORIG -> PATH` for renames and copies, where
//! `X` is the index state and `Y` the worktree state. Paths with unusual
//! characters are C-quoted. Untracked directories are listed once with a
//! trailing slash unless git was run with `-uall`.

use crate::status::{FeedEntry, PrimaryStatus};

/// Map an `XY` code pair to a primary status. Ignored paths yield `None`.
pub fn classify(index: char, worktree: char) -> Option<PrimaryStatus> {
    match (index, worktree) {
        ('?', '?') => return Some(PrimaryStatus::Untracked),
        ('!', '!') => return None,
        ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => return Some(PrimaryStatus::Conflict),
        _ => {}
    }

    let staged = index != ' ';
    let unstaged = worktree != ' ';
    match (staged, unstaged) {
        (true, true) => Some(PrimaryStatus::PartiallyStaged),
        (true, false) => Some(PrimaryStatus::Staged),
        (false, true) if worktree == 'D' => Some(PrimaryStatus::Deleted),
        (false, true) => Some(PrimaryStatus::Modified),
        (false, false) => Some(PrimaryStatus::Clean),
    }
}

/// Parse porcelain text into primary-status feed entries.
///
/// Lines that are too short or carry an unknown code are skipped. For renames
/// and copies only the destination path is reported.
pub fn parse_porcelain(text: &str) -> Vec<FeedEntry<PrimaryStatus>> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let bytes = line.as_bytes();
        if bytes.len() < 4 || bytes[2] != b' ' {
            if !line.is_empty() {
                tracing::debug!(line, "skipping unparseable porcelain line");
            }
            continue;
        }
        let (index, worktree) = (bytes[0] as char, bytes[1] as char);
        let Some(rest) = line.get(3..) else {
            continue;
        };
        let Some(status) = classify(index, worktree) else {
            continue;
        };

        let raw_path = if matches!(index, 'R' | 'C') || matches!(worktree, 'R' | 'C') {
            rename_destination(rest)
        } else {
            rest
        };
        entries.push(FeedEntry::new(unquote(raw_path), status));
    }
    entries
}

/// Destination half of `ORIG -> PATH`, honoring a quoted origin.
fn rename_destination(rest: &str) -> &str {
    let search_from = if rest.starts_with('"') {
        closing_quote(rest).map(|end| end + 1).unwrap_or(0)
    } else {
        0
    };
    match rest[search_from..].find(" -> ") {
        Some(pos) => &rest[search_from + pos + 4..],
        None => rest,
    }
}

/// Byte index of the quote closing a string that starts with `"`.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Undo git's C-style quoting, including octal byte escapes.
fn unquote(raw: &str) -> String {
    let inner = match raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        Some(inner) => inner,
        None => return raw.to_string(),
    };

    let mut out: Vec<u8> = Vec::with_capacity(inner.len());
    let bytes = inner.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        match next {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'0'..=b'7' => {
                let digits = &bytes[i + 1..bytes.len().min(i + 4)];
                let len = digits.iter().take_while(|b| (b'0'..=b'7').contains(*b)).count();
                let value = digits[..len]
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                out.push(value as u8);
                i += 1 + len;
                continue;
            }
            other => out.push(other),
        }
        i += 2;
    }
    String::from_utf8_lossy(&out).into_owned()
}
