/// Returns the byte offset of the start of the line containing `offset`.
#[must_use]
pub fn find_line_start(content: &str, offset: usize) -> usize {
    content[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Returns the 1-indexed line containing the byte at `offset`.
///
/// `line_offsets[i]` must hold the byte offset where 1-indexed line `i + 1`
/// begins, strictly increasing, with `line_offsets[0] == 0`. An offset at or
/// past the last line start maps to the last line.
#[must_use]
pub fn line_of_offset(line_offsets: &[usize], offset: usize) -> usize {
    debug_assert!(!line_offsets.is_empty());
    line_offsets.partition_point(|&start| start <= offset).max(1)
}

/// Returns the largest byte index `<= index` that lies on a char boundary.
///
/// Mirrors the unstable `str::floor_char_boundary`. Indices past the end of
/// the string clamp to `s.len()`.
#[must_use]
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Returns the smallest byte index `>= index` that lies on a char boundary.
///
/// Mirrors the unstable `str::ceil_char_boundary`. Indices past the end of
/// the string clamp to `s.len()`.
#[must_use]
pub fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
