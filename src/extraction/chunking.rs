//! Text windowing and scanning for extraction
//!
//! The generative model has a bounded input size, so long documents are
//! split into fixed-size windows before extraction. Windows never split a
//! UTF-8 character. This module also provides the case-insensitive
//! occurrence scan shared by context capture and proximity inference.

/// Find the nearest valid char boundary at or before the given byte index
#[inline]
pub(crate) fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find the nearest valid char boundary at or after the given byte index
#[inline]
pub(crate) fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Split text into non-overlapping windows of at most `max_chars` bytes
///
/// Split points are pulled back to char boundaries, so a window may be a
/// few bytes short of `max_chars` but never invalid UTF-8.
pub fn split_windows(text: &str, max_chars: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= max_chars {
        return vec![text];
    }

    let mut windows = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let end = floor_char_boundary(text, (start + max_chars).min(text.len()));
        // A multi-byte char wider than the remaining budget could stall
        // the loop; push past it instead.
        let end = if end <= start {
            ceil_char_boundary(text, start + 1)
        } else {
            end
        };
        windows.push(&text[start..end]);
        start = end;
    }
    windows
}

/// Byte ranges of every case-insensitive occurrence of `needle` in `haystack`
///
/// Matching is performed over the lowercased text. Lowercasing can change a
/// character's UTF-8 length (e.g. 'İ'), so matches are mapped back to the
/// original through per-byte offset tables built alongside the lowered copy.
/// Reported ranges are always char boundaries of the original.
pub fn occurrences(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    let needle_lower = needle.to_lowercase();
    if needle_lower.is_empty() {
        return Vec::new();
    }

    // starts[i] / ends[i]: original byte span of the char that produced
    // byte i of the lowered text
    let mut lowered = String::with_capacity(haystack.len());
    let mut starts = Vec::with_capacity(haystack.len());
    let mut ends = Vec::with_capacity(haystack.len());
    for (offset, ch) in haystack.char_indices() {
        let char_end = offset + ch.len_utf8();
        for low in ch.to_lowercase() {
            for _ in 0..low.len_utf8() {
                starts.push(offset);
                ends.push(char_end);
            }
            lowered.push(low);
        }
    }

    let mut found = Vec::new();
    let mut from = 0;
    while let Some(pos) = lowered[from..].find(&needle_lower) {
        let start = from + pos;
        let end = start + needle_lower.len();
        found.push((starts[start], ends[end - 1]));
        from = end;
        if from >= lowered.len() {
            break;
        }
    }
    found
}
