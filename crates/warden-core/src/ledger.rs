// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Native value ledger.
//!
//! Stands in for the host's value-transfer primitive: principals hold
//! balances, the executor holds an escrow, and payouts are explicit
//! debit/credit pairs. Destinations can be flagged as refusing payments to
//! model recipients that reject incoming value.
use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::ident::PrincipalId;

/// Ledger failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Balance is lower than the requested debit.
    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds {
        /// Current balance.
        available: u128,
        /// Requested amount.
        required: u128,
    },
    /// A credit would overflow `u128`.
    #[error("balance overflow")]
    Overflow,
}

/// Balances, escrow, and payment acceptance flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: BTreeMap<PrincipalId, u128>,
    escrow: u128,
    rejecting: BTreeSet<PrincipalId>,
}

impl Ledger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `principal` (zero if unknown).
    #[must_use]
    pub fn balance(&self, principal: &PrincipalId) -> u128 {
        self.balances.get(principal).copied().unwrap_or(0)
    }

    /// Value held by the executor on behalf of no one in particular.
    #[must_use]
    pub fn escrow(&self) -> u128 {
        self.escrow
    }

    /// Credits `amount` to `principal` from outside the system.
    ///
    /// # Errors
    /// [`LedgerError::Overflow`] if the balance would exceed `u128::MAX`.
    pub fn deposit(&mut self, principal: PrincipalId, amount: u128) -> Result<(), LedgerError> {
        self.credit(principal, amount)
    }

    /// Marks `principal` as refusing (or accepting again) incoming payouts.
    pub fn set_rejects_payments(&mut self, principal: PrincipalId, rejects: bool) {
        if rejects {
            self.rejecting.insert(principal);
        } else {
            self.rejecting.remove(&principal);
        }
    }

    /// Returns `true` unless `principal` refuses payouts.
    #[must_use]
    pub fn accepts_payments(&self, principal: &PrincipalId) -> bool {
        !self.rejecting.contains(principal)
    }

    /// Iterate balances in ascending principal order.
    pub fn iter_balances(&self) -> impl Iterator<Item = (&PrincipalId, &u128)> {
        self.balances.iter()
    }

    /// Iterate principals that refuse payouts, in ascending order.
    pub fn iter_rejecting(&self) -> impl Iterator<Item = &PrincipalId> {
        self.rejecting.iter()
    }

    pub(crate) fn check_debit(&self, principal: &PrincipalId, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance(principal);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                available,
                required: amount,
            });
        }
        Ok(())
    }

    /// Debits `value` from `payer`, pays each `(destination, amount)` out of
    /// it, and parks the remainder in escrow. Returns the remainder.
    ///
    /// Every resulting balance is computed before any is written, so an
    /// error leaves the ledger untouched.
    pub(crate) fn settle(
        &mut self,
        payer: &PrincipalId,
        value: u128,
        payouts: &[(PrincipalId, u128)],
    ) -> Result<u128, LedgerError> {
        let available = self.balance(payer);
        let after_debit = available
            .checked_sub(value)
            .ok_or(LedgerError::InsufficientFunds {
                available,
                required: value,
            })?;
        let mut staged: BTreeMap<PrincipalId, u128> = BTreeMap::new();
        staged.insert(*payer, after_debit);
        let mut paid = 0u128;
        for (destination, amount) in payouts {
            let current = staged
                .get(destination)
                .copied()
                .unwrap_or_else(|| self.balance(destination));
            let next = current.checked_add(*amount).ok_or(LedgerError::Overflow)?;
            staged.insert(*destination, next);
            paid = paid.checked_add(*amount).ok_or(LedgerError::Overflow)?;
        }
        let remainder = value
            .checked_sub(paid)
            .ok_or(LedgerError::InsufficientFunds {
                available: value,
                required: paid,
            })?;
        let escrow = self
            .escrow
            .checked_add(remainder)
            .ok_or(LedgerError::Overflow)?;

        for (principal, balance) in staged {
            self.set_balance(principal, balance);
        }
        self.escrow = escrow;
        Ok(remainder)
    }

    /// Moves the whole escrow to `to`. Returns the amount moved.
    pub(crate) fn sweep_escrow(&mut self, to: PrincipalId) -> Result<u128, LedgerError> {
        let amount = self.escrow;
        self.credit(to, amount)?;
        self.escrow = 0;
        Ok(amount)
    }

    fn credit(&mut self, principal: PrincipalId, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let next = self
            .balance(&principal)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.balances.insert(principal, next);
        Ok(())
    }

    fn set_balance(&mut self, principal: PrincipalId, balance: u128) {
        if balance == 0 {
            self.balances.remove(&principal);
        } else {
            self.balances.insert(principal, balance);
        }
    }

    pub(crate) fn restore_parts(
        balances: BTreeMap<PrincipalId, u128>,
        escrow: u128,
        rejecting: BTreeSet<PrincipalId>,
    ) -> Self {
        Self {
            balances,
            escrow,
            rejecting,
        }
    }
}
