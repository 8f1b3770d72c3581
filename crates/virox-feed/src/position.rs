//! Index of the visible video.

/// Position in the feed, kept inside `[0, len - 1]` (0 for an empty list).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedPosition(usize);

impl FeedPosition {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// Move down one item. Returns false at the end of the list.
    pub fn next(&mut self, len: usize) -> bool {
        if self.0 + 1 < len {
            self.0 += 1;
            true
        } else {
            false
        }
    }

    /// Move up one item. Returns false at the top.
    pub fn prev(&mut self) -> bool {
        if self.0 > 0 {
            self.0 -= 1;
            true
        } else {
            false
        }
    }

    /// Pull the index back inside a list of `len` items.
    pub fn clamp(&mut self, len: usize) {
        self.0 = self.0.min(len.saturating_sub(1));
    }
}
