//! File ordering
//!
//! Comic strips are usually numbered without zero padding (`page2.png`,
//! `page10.png`), so plain byte order puts them in the wrong sequence.
//! [`natural_cmp`] compares embedded digit runs by their integer value instead.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Strategy used to order the files of a strip before rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Digit runs compare as integers: `img2` before `img10`
    #[default]
    Natural,
    /// Plain byte order of the file names: `img10` before `img2`
    Lexical,
}

impl SortOrder {
    /// Compare two file names under this strategy
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            SortOrder::Natural => natural_cmp(a, b),
            SortOrder::Lexical => a.cmp(b),
        }
    }

    /// Sort paths in place by their file names
    ///
    /// The sort is stable, so names that compare equal keep their input order.
    pub fn sort_paths(&self, paths: &mut [PathBuf]) {
        paths.sort_by(|a, b| self.compare(&file_name(a), &file_name(b)));
    }
}

fn file_name(path: &Path) -> std::borrow::Cow<'_, str> {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
}

/// Compare two strings in natural order
///
/// Walks both strings one digit run at a time:
/// - the text before the run must match, otherwise the strings compare as
///   plain text from there on
/// - runs with the same digits move on to the next run
/// - runs with different values compare numerically (`9 < 10`)
/// - runs with the same value but different zero padding (`007` vs `7`)
///   compare as plain text from the start of the run
///
/// Once either side has no digit run left, the remainders compare as plain
/// text. Strings without digits therefore compare exactly like `str::cmp`.
///
/// # Example
///
/// ```
/// use comic_strip_pdf::order::natural_cmp;
/// use std::cmp::Ordering;
///
/// assert_eq!(natural_cmp("img2.png", "img10.png"), Ordering::Less);
/// assert_eq!(natural_cmp("b.png", "a.png"), Ordering::Greater);
/// ```
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);

    loop {
        let (Some((a_start, a_end)), Some((b_start, b_end))) = (digit_run(a), digit_run(b)) else {
            return a.cmp(b);
        };

        // A prefix that is a proper prefix of the other side must be decided
        // against the digit that follows it, or the order stops being
        // transitive alongside digit-free names.
        if a[..a_start] != b[..b_start] {
            return a.cmp(b);
        }

        let (a_run, b_run) = (&a[a_start..a_end], &b[b_start..b_end]);
        if a_run != b_run {
            return match cmp_digit_runs(a_run, b_run) {
                Ordering::Equal => a[a_start..].cmp(&b[b_start..]),
                unequal => unequal,
            };
        }

        a = &a[a_end..];
        b = &b[b_end..];
    }
}

/// Byte range of the first run of ASCII digits
fn digit_run(s: &str) -> Option<(usize, usize)> {
    let start = s.bytes().position(|b| b.is_ascii_digit())?;
    let len = s.as_bytes()[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    Some((start, start + len))
}

/// Compare two digit runs by value without parsing them into an integer type
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
