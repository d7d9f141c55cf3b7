//! Pointer drag session for column headers.
//!
//! A press on a draggable header starts a session; the drag only becomes
//! active once the pointer has travelled a minimum distance, so plain
//! clicks still read as sort toggles. The drop resolves within a single
//! namespace (fixed or custom) or not at all.

use super::columns::ColumnId;

/// Minimum pointer travel, in terminal cells, before a drag activates.
pub const ACTIVATION_DISTANCE: u16 = 5;

#[derive(Debug, Clone)]
pub struct DragSession {
    pub source: ColumnId,
    origin: (u16, u16),
    position: (u16, u16),
    active: bool,
}

impl DragSession {
    /// Start a session from a press on a header. Pinned columns have no
    /// drag handle at all.
    pub fn start(source: ColumnId, column: u16, row: u16) -> Option<Self> {
        if source.is_pinned() {
            return None;
        }
        Some(Self {
            source,
            origin: (column, row),
            position: (column, row),
            active: false,
        })
    }

    pub fn update(&mut self, column: u16, row: u16) {
        self.position = (column, row);
        if !self.active && self.travel() >= ACTIVATION_DISTANCE {
            self.active = true;
        }
    }

    /// Chebyshev distance from the press origin.
    fn travel(&self) -> u16 {
        let dx = self.position.0.abs_diff(self.origin.0);
        let dy = self.position.1.abs_diff(self.origin.1);
        dx.max(dy)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn position(&self) -> (u16, u16) {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_headers_never_start_a_session() {
        assert!(DragSession::start(ColumnId::Checkbox, 0, 0).is_none());
        assert!(DragSession::start(ColumnId::Title, 4, 0).is_none());
        assert!(DragSession::start(ColumnId::Priority, 20, 0).is_some());
    }

    #[test]
    fn session_activates_only_past_the_travel_threshold() {
        let mut session = DragSession::start(ColumnId::Priority, 20, 3).unwrap();
        assert!(!session.is_active());

        session.update(24, 3);
        assert!(!session.is_active());

        session.update(25, 3);
        assert!(session.is_active());
    }

    #[test]
    fn vertical_travel_counts_toward_activation() {
        let mut session = DragSession::start(ColumnId::Due, 10, 3).unwrap();
        session.update(11, 8);
        assert!(session.is_active());
    }

    #[test]
    fn activation_is_sticky_once_reached() {
        let mut session = DragSession::start(ColumnId::Type, 10, 3).unwrap();
        session.update(16, 3);
        session.update(10, 3);
        assert!(session.is_active());
    }
}
