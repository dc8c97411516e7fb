//! Boundaries and the actions applied when data crosses them.

use std::fmt;

/// A crossing point for data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// Ingress from external sources (API requests, events).
    Receive,
    /// Ingress from storage (database, cache).
    Load,
    /// Egress to storage.
    Store,
    /// Egress to external destinations (API responses, events).
    Send,
}

impl Boundary {
    /// All boundaries, inbound first.
    pub const ALL: [Self; 4] = [Self::Receive, Self::Load, Self::Store, Self::Send];

    /// Actions applied at this boundary, in application order.
    ///
    /// `Send` masks before it redacts, so a field carrying both directives
    /// always ends up with the redaction literal.
    #[must_use]
    pub const fn actions(self) -> &'static [Action] {
        match self {
            Self::Receive => &[Action::Hash],
            Self::Load => &[Action::Decrypt],
            Self::Store => &[Action::Encrypt],
            Self::Send => &[Action::Mask, Action::Redact],
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receive => "receive",
            Self::Load => "load",
            Self::Store => "store",
            Self::Send => "send",
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field transform bound to exactly one boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// `receive.hash`
    Hash,
    /// `load.decrypt`
    Decrypt,
    /// `store.encrypt`
    Encrypt,
    /// `send.mask`
    Mask,
    /// `send.redact`
    Redact,
}

impl Action {
    pub const ALL: [Self; 5] = [
        Self::Hash,
        Self::Decrypt,
        Self::Encrypt,
        Self::Mask,
        Self::Redact,
    ];

    #[must_use]
    pub const fn boundary(self) -> Boundary {
        match self {
            Self::Hash => Boundary::Receive,
            Self::Decrypt => Boundary::Load,
            Self::Encrypt => Boundary::Store,
            Self::Mask | Self::Redact => Boundary::Send,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Decrypt => "decrypt",
            Self::Encrypt => "encrypt",
            Self::Mask => "mask",
            Self::Redact => "redact",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, Boundary};

    #[test]
    fn every_action_belongs_to_the_boundary_that_lists_it() {
        for boundary in Boundary::ALL {
            for action in boundary.actions() {
                assert_eq!(action.boundary(), boundary);
            }
        }
        let listed: usize = Boundary::ALL.iter().map(|b| b.actions().len()).sum();
        assert_eq!(listed, Action::ALL.len());
    }

    #[test]
    fn send_redacts_after_masking() {
        assert_eq!(Boundary::Send.actions(), &[Action::Mask, Action::Redact]);
    }
}
