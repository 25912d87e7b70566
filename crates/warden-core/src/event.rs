// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Host-level notification log.
use crate::ident::{Hash, InstanceId, PrincipalId};

/// A notification emitted by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// An instance was allocated and its initializer is about to run.
    InstanceInitialized {
        /// New instance.
        instance: InstanceId,
        /// Initializer logic address.
        initializer: PrincipalId,
        /// Principal holding execution rights.
        caller: PrincipalId,
        /// Principal holding administrative rights.
        updater: PrincipalId,
    },
    /// Initialization completed; the instance is executable.
    InstanceFinalized {
        /// Finalized instance.
        instance: InstanceId,
        /// Initializer logic address.
        initializer: PrincipalId,
    },
    /// Tail event of a successful `exec`.
    Execution {
        /// Instance executed against.
        instance: InstanceId,
        /// Application invoked.
        target: PrincipalId,
    },
    /// One payout.
    Payment {
        /// Instance that requested the payout.
        instance: InstanceId,
        /// Recipient.
        destination: PrincipalId,
        /// Amount paid.
        amount: u128,
    },
    /// An application reported a named exception; nothing was applied.
    Exception {
        /// Application invoked.
        target: PrincipalId,
        /// Instance executed against.
        instance: InstanceId,
        /// Raw message bytes.
        message: Vec<u8>,
    },
    /// Pass-through of an application's own event.
    Application {
        /// Instance the event is attributed to.
        instance: InstanceId,
        /// Application's topics, unchanged.
        topics: Vec<Hash>,
        /// Application's data, unchanged.
        data: Vec<u8>,
    },
}

impl Notification {
    /// Instance the notification is attributed to.
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        match self {
            Self::InstanceInitialized { instance, .. }
            | Self::InstanceFinalized { instance, .. }
            | Self::Execution { instance, .. }
            | Self::Payment { instance, .. }
            | Self::Exception { instance, .. }
            | Self::Application { instance, .. } => *instance,
        }
    }
}

/// A notification with its position in the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedNotification {
    /// Monotonic sequence number, starting at zero.
    pub seq: u64,
    /// The notification.
    pub notification: Notification,
}

/// Append-only notification log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    entries: Vec<LoggedNotification>,
    next_seq: u64,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries not yet drained, in emission order.
    #[must_use]
    pub fn entries(&self) -> &[LoggedNotification] {
        &self.entries
    }

    /// Removes and returns every entry. Sequence numbers keep counting.
    pub fn drain(&mut self) -> Vec<LoggedNotification> {
        core::mem::take(&mut self.entries)
    }

    /// Appends a batch in order.
    pub(crate) fn extend(&mut self, batch: Vec<Notification>) {
        for notification in batch {
            self.entries.push(LoggedNotification {
                seq: self.next_seq,
                notification,
            });
            self.next_seq = self.next_seq.wrapping_add(1);
        }
    }
}
