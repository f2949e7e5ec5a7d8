//! [`TrackerOutcome`] – what a category tracker did with one event.

use dragcare_types::DetectionId;

/// What a category tracker did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerOutcome {
    /// The event does not concern this tracker's state.
    Ignored,
    /// Single-slot: the detection became the winner.
    Adopted { visualized: bool },
    /// Single-slot: the winner's entity was rebuilt.
    Refreshed { visualized: bool },
    /// Single-slot: the winner was removed; the slot is empty.
    Released,
    /// Best-of-many: the pool changed without a recomputation.
    PoolUpdated,
    /// Best-of-many: a recomputation was suppressed by the rate limiter.
    Deferred,
    /// Best-of-many: a recomputation ran and kept the same winner.
    /// `visualized` is `false` when that winner still has no entity of its
    /// own.
    Unchanged { visualized: bool },
    /// Best-of-many: a recomputation selected a different winner.
    WinnerChanged {
        previous: Option<DetectionId>,
        current: Option<DetectionId>,
        visualized: bool,
    },
}

impl TrackerOutcome {
    /// `false` when the detection is tracked but has no entity.
    pub fn is_visualized(&self) -> bool {
        match self {
            TrackerOutcome::Adopted { visualized }
            | TrackerOutcome::Refreshed { visualized }
            | TrackerOutcome::Unchanged { visualized } => *visualized,
            TrackerOutcome::WinnerChanged { current: Some(_), visualized, .. } => *visualized,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visualization_flag() {
        assert!(!TrackerOutcome::Adopted { visualized: false }.is_visualized());
        assert!(TrackerOutcome::Released.is_visualized());
        assert!(!TrackerOutcome::Unchanged { visualized: false }.is_visualized());
        assert!(TrackerOutcome::Unchanged { visualized: true }.is_visualized());
        let emptied = TrackerOutcome::WinnerChanged {
            previous: Some(DetectionId::new()),
            current: None,
            visualized: false,
        };
        assert!(emptied.is_visualized());
    }
}
