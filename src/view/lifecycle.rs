//! Lifecycle state machine.
//!
//! A component moves forward through its phases exactly once, except for
//! `attached ⇄ updated`, which repeats for its whole attached lifetime, and
//! `detached → attached` when a detached (not disposed) component is
//! attached again.
//!
//! ```text
//! start → compiled → inited → created → attached ⇄ updated
//!                                          │
//!                               leaving ←──┤
//!                                  │       ▼
//!                                  └──→ detached → disposed
//! ```
//!
//! The state is a flag set. Each phase maps to the full set that holds once
//! it is entered; `updated` has no flag of its own, so entering it never
//! changes the state and its hook fires on every flush.

use std::fmt;

bitflags::bitflags! {
    /// Lifecycle flags of a component.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lifecycle: u8 {
        const COMPILED = 1 << 0;
        const INITED = 1 << 1;
        const CREATED = 1 << 2;
        const ATTACHED = 1 << 3;
        const LEAVING = 1 << 4;
        const DETACHED = 1 << 5;
        const DISPOSED = 1 << 6;
    }
}

impl Lifecycle {
    pub fn is_disposed(self) -> bool {
        self.contains(Lifecycle::DISPOSED)
    }

    pub fn is_attached(self) -> bool {
        self.contains(Lifecycle::ATTACHED)
    }
}

/// Named lifecycle phase. Class hooks are registered per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Compiled,
    Inited,
    Created,
    Attached,
    Updated,
    Leaving,
    Detached,
    Disposed,
}

impl Phase {
    /// Flag that marks the phase as reached. `None` for phases that can be
    /// entered any number of times.
    pub fn flag(self) -> Option<Lifecycle> {
        match self {
            Phase::Start | Phase::Updated => None,
            Phase::Compiled => Some(Lifecycle::COMPILED),
            Phase::Inited => Some(Lifecycle::INITED),
            Phase::Created => Some(Lifecycle::CREATED),
            Phase::Attached => Some(Lifecycle::ATTACHED),
            Phase::Leaving => Some(Lifecycle::LEAVING),
            Phase::Detached => Some(Lifecycle::DETACHED),
            Phase::Disposed => Some(Lifecycle::DISPOSED),
        }
    }

    /// Flag set that holds once the phase is entered. `None` keeps the
    /// current set.
    pub fn state(self) -> Option<Lifecycle> {
        let base = Lifecycle::COMPILED | Lifecycle::INITED | Lifecycle::CREATED;
        match self {
            Phase::Start => Some(Lifecycle::empty()),
            Phase::Compiled => Some(Lifecycle::COMPILED),
            Phase::Inited => Some(Lifecycle::COMPILED | Lifecycle::INITED),
            Phase::Created => Some(base),
            Phase::Attached => Some(base | Lifecycle::ATTACHED),
            Phase::Updated => None,
            Phase::Leaving => Some(base | Lifecycle::ATTACHED | Lifecycle::LEAVING),
            Phase::Detached => Some(base | Lifecycle::DETACHED),
            Phase::Disposed => Some(Lifecycle::COMPILED | Lifecycle::DISPOSED),
        }
    }

    /// Bit used to remember that a phase's hook has completed.
    pub(crate) fn after_bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Compiled => "compiled",
            Phase::Inited => "inited",
            Phase::Created => "created",
            Phase::Attached => "attached",
            Phase::Updated => "updated",
            Phase::Leaving => "leaving",
            Phase::Detached => "detached",
            Phase::Disposed => "disposed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_cumulative_until_detach() {
        let attached = Phase::Attached.state().unwrap();
        assert!(attached.contains(Lifecycle::CREATED | Lifecycle::INITED));
        assert!(attached.is_attached());

        let detached = Phase::Detached.state().unwrap();
        assert!(!detached.is_attached());
        assert!(detached.contains(Lifecycle::CREATED));

        let disposed = Phase::Disposed.state().unwrap();
        assert!(disposed.is_disposed());
        assert!(!disposed.contains(Lifecycle::CREATED));
    }

    #[test]
    fn test_updated_has_no_flag() {
        assert_eq!(Phase::Updated.flag(), None);
        assert_eq!(Phase::Updated.state(), None);
    }

    #[test]
    fn test_after_bits_are_distinct() {
        let phases = [
            Phase::Start,
            Phase::Compiled,
            Phase::Inited,
            Phase::Created,
            Phase::Attached,
            Phase::Updated,
            Phase::Leaving,
            Phase::Detached,
            Phase::Disposed,
        ];
        let mut seen = 0u16;
        for phase in phases {
            assert_eq!(seen & phase.after_bit(), 0);
            seen |= phase.after_bit();
        }
    }
}
