//! Lifecycle action flags.
//!
//! Every maintenance job advances through up to three lifecycle stages:
//! prepare (drain the node), execute (the maintenance itself), and
//! restore (bring the node back). [`ActionType`] is the set of stages a
//! job is currently permitted to advance through. Policies narrow this
//! set; only an operator override widens it again.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Set of lifecycle actions a job may advance through.
    ///
    /// The empty set means no action is permitted this pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ActionType: u8 {
        /// Drain and prepare impacted nodes for maintenance.
        const PREPARE = 0b001;
        /// Perform the maintenance work on the prepared nodes.
        const EXECUTE = 0b010;
        /// Return completed nodes to service.
        const RESTORE = 0b100;
    }
}

impl ActionType {
    /// Human-readable name of a single-flag action, used in
    /// configuration keys and log fields.
    ///
    /// Multi-flag sets fall back to the `Debug` rendering via
    /// [`fmt::Display`].
    pub fn label(self) -> &'static str {
        match self {
            ActionType::PREPARE => "Prepare",
            ActionType::EXECUTE => "Execute",
            ActionType::RESTORE => "Restore",
            _ => "Mixed",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        let mut first = true;
        for flag in [ActionType::PREPARE, ActionType::EXECUTE, ActionType::RESTORE] {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", flag.label())?;
                first = false;
            }
        }
        Ok(())
    }
}
