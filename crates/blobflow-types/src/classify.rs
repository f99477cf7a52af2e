//! Binary detection and line counting for blob content.

/// Number of leading bytes inspected for a NUL when deciding binary-ness.
pub const BINARY_CHECK_LEN: usize = 8000;

/// What the classifier learned about a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_binary: bool,
    /// Logical line count; always 0 for binary content.
    pub line_count: usize,
}

/// Returns `true` if a zero byte appears in the first [`BINARY_CHECK_LEN`] bytes.
pub fn is_binary(data: &[u8]) -> bool {
    let probe = &data[..data.len().min(BINARY_CHECK_LEN)];
    probe.contains(&0)
}

/// Count lines the way splitting on `'\n'` and dropping a trailing empty
/// segment would: `"a\nb\n"` and `"a\nb"` are both 2, `""` is 0.
pub fn count_lines(data: &[u8]) -> usize {
    let Some(&last) = data.last() else {
        return 0;
    };
    let newlines = data.iter().filter(|&&b| b == b'\n').count();
    if last == b'\n' {
        newlines
    } else {
        newlines + 1
    }
}

/// Classify a buffer. Lines are only counted for text.
pub fn classify(data: &[u8]) -> Classification {
    if is_binary(data) {
        return Classification {
            is_binary: true,
            line_count: 0,
        };
    }
    Classification {
        is_binary: false,
        line_count: count_lines(data),
    }
}
