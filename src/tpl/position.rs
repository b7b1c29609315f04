/// A location in template source.
///
/// `line` and `column` always describe the byte at `offset`. Lines start at 1; the
/// first byte of a line is column 1 and a newline byte is column 0 of the line it
/// opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Walks the source one byte at a time, keeping line and column in step.
pub(crate) struct Tracker<'a> {
    src: &'a [u8],
    pos: SourcePosition,
}

impl<'a> Tracker<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        let mut tracker = Self {
            src: src.as_bytes(),
            pos: SourcePosition {
                offset: 0,
                line: 1,
                column: 0,
            },
        };
        // The byte at offset 0 may itself be a newline.
        tracker.update();
        tracker
    }

    pub(crate) fn position(&self) -> SourcePosition {
        self.pos
    }

    pub(crate) fn offset(&self) -> usize {
        self.pos.offset
    }

    /// The byte `rel` positions ahead of the cursor, if any.
    pub(crate) fn peek(&self, rel: usize) -> Option<u8> {
        self.src.get(self.pos.offset + rel).copied()
    }

    /// Moves forward `n` bytes. Returns `false` once the cursor runs past the last
    /// byte; the position then stays at the end of the source.
    pub(crate) fn advance(&mut self, n: usize) -> bool {
        for _ in 0..n {
            if self.pos.offset >= self.src.len() {
                return false;
            }
            self.pos.offset += 1;
            if !self.update() {
                return false;
            }
        }
        true
    }

    /// Accounts for the byte now under the cursor.
    fn update(&mut self) -> bool {
        match self.src.get(self.pos.offset) {
            None => false,
            Some(b'\n') => {
                self.pos.line += 1;
                self.pos.column = 0;
                true
            }
            Some(_) => {
                self.pos.column += 1;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(offset: usize, line: usize, column: usize) -> SourcePosition {
        SourcePosition {
            offset,
            line,
            column,
        }
    }

    #[test]
    fn test_tracks_lines_and_columns() {
        let mut t = Tracker::new("ab\ncd");
        assert_eq!(t.position(), at(0, 1, 1));
        assert!(t.advance(1));
        assert_eq!(t.position(), at(1, 1, 2));
        assert!(t.advance(1));
        assert_eq!(t.position(), at(2, 2, 0));
        assert!(t.advance(1));
        assert_eq!(t.position(), at(3, 2, 1));
        assert_eq!(t.peek(0), Some(b'c'));
        assert_eq!(t.peek(1), Some(b'd'));
        assert_eq!(t.peek(2), None);
    }

    #[test]
    fn test_leading_newline() {
        let t = Tracker::new("\nx");
        assert_eq!(t.position(), at(0, 2, 0));
    }

    #[test]
    fn test_carriage_return_is_an_ordinary_byte() {
        let mut t = Tracker::new("a\r\nb");
        t.advance(1);
        assert_eq!(t.position(), at(1, 1, 2));
        t.advance(2);
        assert_eq!(t.position(), at(3, 2, 1));
    }

    #[test]
    fn test_advance_past_end_reports_failure() {
        let mut t = Tracker::new("ab");
        assert!(!t.advance(5));
        assert_eq!(t.offset(), 2);
        assert_eq!(t.peek(0), None);
        assert!(!t.advance(1));
        assert_eq!(t.offset(), 2);
    }
}
