use crate::FlagError;

/// Where the cursor should go after jumping to a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorTarget {
    pub line: usize,
    /// Cursor lands after the last character of the line
    pub column: usize,
}

/// Next flagged line after `current_line`, wrapping to the first flag once
/// the cursor is at or past the last one.
pub fn next_marker(lines: &[usize], current_line: usize) -> Result<usize, FlagError> {
    let (first, last) = match (lines.first(), lines.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(FlagError::EmptyMarkerSet),
    };
    if current_line >= last {
        return Ok(first);
    }
    Ok(lines
        .iter()
        .copied()
        .find(|line| *line > current_line)
        .unwrap_or(first))
}

/// [`next_marker`] resolved to a cursor position at the end of the line.
pub fn next_marker_target(
    lines: &[usize],
    current_line: usize,
    line_len: impl Fn(usize) -> usize,
) -> Result<CursorTarget, FlagError> {
    let line = next_marker(lines, current_line)?;
    Ok(CursorTarget {
        line,
        column: line_len(line),
    })
}
