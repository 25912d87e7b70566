// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Gated execution engine implementation.
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::action::{ActionError, ActionList, ActionPlan, Effects};
use crate::application::{AppDirectory, ApplicationLogic, ExecContext};
use crate::config::EngineConfig;
use crate::constants::ACTION_HEADER_LEN;
use crate::event::{EventLog, LoggedNotification, Notification};
use crate::ident::{make_instance_id, Hash, InstanceId, PrincipalId, Selector, StorageLocation};
use crate::instance::{InstanceRecord, InstanceRegistry, InstanceSpec};
use crate::ledger::{Ledger, LedgerError};
use crate::receipt::{ExecReceipt, ExecSummary};
use crate::slot::Slot;
use crate::snapshot::{compute_state_root, SnapshotError, StateSnapshot};
use crate::store::KeyedStore;

/// Errors emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// `exec` named the zero id or an id that was never allocated.
    #[error("invalid instance: {0}")]
    InvalidInstance(InstanceId),
    /// An administrative call named an id that was never allocated.
    #[error("unknown instance: {0}")]
    UnknownInstance(InstanceId),
    /// The instance has not completed initialization.
    #[error("instance not finalized: {0}")]
    NotFinalized(InstanceId),
    /// The instance is paused and rejects execution.
    #[error("instance paused: {0}")]
    InstancePaused(InstanceId),
    /// `pause` on an instance that is already paused.
    #[error("instance is already paused")]
    IsPaused,
    /// The operation requires a paused instance.
    #[error("instance is not paused")]
    NotPaused,
    /// The sender lacks the required role.
    #[error("unauthorized")]
    Unauthorized,
    /// Value attached to a call on a non-payable instance.
    #[error("instance does not accept value")]
    NotPayable,
    /// The target is not in the instance's allowed-callee set.
    #[error("target not allowed: {0}")]
    TargetNotAllowed(PrincipalId),
    /// Payload shorter than one selector.
    #[error("payload of {len} bytes is shorter than a selector")]
    MalformedPayload {
        /// Payload length.
        len: usize,
    },
    /// The application's return data is not a valid action list.
    #[error("invalid action list: {0}")]
    InvalidActionList(#[from] ActionError),
    /// The initializer returned less than one action header.
    #[error("initializer returned {len} bytes, not an action list")]
    InvalidInitializer {
        /// Return data length.
        len: usize,
    },
    /// The application aborted the call.
    #[error("application {target} reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    ApplicationReverted {
        /// Application invoked.
        target: PrincipalId,
        /// Reason supplied by the application, if any.
        reason: Option<String>,
    },
    /// Requested payouts exceed the value attached to the call.
    #[error("payouts of {requested} exceed attached value {available}")]
    InsufficientValue {
        /// Sum of requested payouts (saturating).
        requested: u128,
        /// Value attached to the call.
        available: u128,
    },
    /// The sender cannot cover the attached value.
    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds {
        /// Sender balance.
        available: u128,
        /// Attached value.
        required: u128,
    },
    /// A payout destination refuses incoming value.
    #[error("payment rejected by {0}")]
    PaymentRejected(PrincipalId),
    /// The target is allowed but nothing is deployed there.
    #[error("no application deployed at {0}")]
    NoApplication(PrincipalId),
    /// `deploy` to an address that is already taken.
    #[error("application already deployed at {0}")]
    DuplicateApplication(PrincipalId),
    /// A credit would overflow a balance or the escrow.
    #[error("balance overflow")]
    BalanceOverflow,
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                available,
                required,
            } => Self::InsufficientFunds {
                available,
                required,
            },
            LedgerError::Overflow => Self::BalanceOverflow,
        }
    }
}

/// Permissioned key-value engine with a gated application executor.
///
/// The engine owns every piece of mutable state: the keyed store, instance
/// metadata, the value ledger, and the notification log. Applications only
/// describe effects; the engine decides whether to apply them.
///
/// Each mutating call validates everything it can (authorization, action
/// decoding, limits, funds, payout destinations, overflow) before the first
/// write. A call that returns `Err` has changed nothing.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: KeyedStore,
    instances: InstanceRegistry,
    apps: AppDirectory,
    ledger: Ledger,
    events: EventLog,
    admin: PrincipalId,
    nonce: u64,
}

impl Engine {
    /// Constructs an empty engine with default configuration.
    ///
    /// `admin` receives swept escrow from [`Engine::withdraw`].
    pub fn new(admin: PrincipalId) -> Self {
        Self::with_config(admin, EngineConfig::default())
    }

    /// Constructs an empty engine with explicit configuration.
    pub fn with_config(admin: PrincipalId, config: EngineConfig) -> Self {
        Self {
            config,
            store: KeyedStore::new(),
            instances: InstanceRegistry::new(),
            apps: AppDirectory::new(),
            ledger: Ledger::new(),
            events: EventLog::new(),
            admin,
            nonce: 0,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Principal receiving swept escrow.
    pub fn admin(&self) -> PrincipalId {
        self.admin
    }

    /// Deploys application logic at `address`.
    ///
    /// # Errors
    /// [`EngineError::DuplicateApplication`] if the address is taken.
    pub fn deploy(
        &mut self,
        address: PrincipalId,
        logic: impl ApplicationLogic + 'static,
    ) -> Result<(), EngineError> {
        if !self.apps.insert(address, Box::new(logic)) {
            return Err(EngineError::DuplicateApplication(address));
        }
        debug!(address = %address, "application deployed");
        Ok(())
    }

    /// Returns `true` when logic is deployed at `address`.
    pub fn is_deployed(&self, address: &PrincipalId) -> bool {
        self.apps.contains(address)
    }

    /// Value ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Mutable value ledger, for deposits and payment-acceptance flags.
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// Creates an instance and runs its initializer.
    ///
    /// # Errors
    /// See [`Engine::create_instance_with_receipt`].
    pub fn create_instance(
        &mut self,
        sender: PrincipalId,
        spec: InstanceSpec,
    ) -> Result<InstanceId, EngineError> {
        let (id, _receipt) = self.create_instance_with_receipt(sender, spec)?;
        Ok(id)
    }

    /// Creates an instance, runs its initializer inside the new namespace,
    /// applies the returned actions, and finalizes the instance.
    ///
    /// `sender` becomes the instance's caller and creator. Creation carries
    /// no value, so any non-zero payout fails the whole call.
    ///
    /// # Errors
    /// - [`EngineError::NoApplication`] if nothing is deployed at the initializer.
    /// - [`EngineError::ApplicationReverted`] if the initializer reverts or
    ///   throws.
    /// - [`EngineError::InvalidInitializer`] if the return data is shorter
    ///   than one action header.
    /// - [`EngineError::InvalidActionList`] for any other malformed list,
    ///   including an empty one.
    /// - [`EngineError::InsufficientValue`], [`EngineError::PaymentRejected`]
    ///   for payouts that cannot be made.
    pub fn create_instance_with_receipt(
        &mut self,
        sender: PrincipalId,
        spec: InstanceSpec,
    ) -> Result<(InstanceId, ExecReceipt), EngineError> {
        let InstanceSpec {
            updater,
            is_payable,
            initializer,
            init_calldata,
            allowed,
        } = spec;
        let (id, nonce) = self.next_instance_id(&sender, &initializer);

        let logic = self
            .apps
            .get(&initializer)
            .ok_or(EngineError::NoApplication(initializer))?;
        let ctx = ExecContext::new(
            &self.store,
            id,
            sender,
            initializer,
            0,
            self.config.values,
        );
        debug!(instance = %id, initializer = %initializer, "dispatching initializer");
        let ret = logic.handle(&ctx, &init_calldata).map_err(|revert| {
            warn!(instance = %id, initializer = %initializer, "initializer reverted");
            EngineError::ApplicationReverted {
                target: initializer,
                reason: revert.reason,
            }
        })?;
        if ret.len() < ACTION_HEADER_LEN {
            warn!(instance = %id, len = ret.len(), "initializer returned no action list");
            return Err(EngineError::InvalidInitializer { len: ret.len() });
        }
        let effects = match self.decode(&ret, &initializer)? {
            ActionPlan::Effects(effects) => effects,
            ActionPlan::Exception(message) => {
                warn!(instance = %id, initializer = %initializer, "initializer threw");
                return Err(EngineError::ApplicationReverted {
                    target: initializer,
                    reason: Some(message),
                });
            }
        };
        self.check_payouts(&effects, 0)?;

        // Commit.
        self.ledger.settle(&sender, 0, &effects.pays)?;
        let mut allowed_unique: Vec<PrincipalId> = Vec::with_capacity(allowed.len());
        for addr in allowed {
            if !allowed_unique.contains(&addr) {
                allowed_unique.push(addr);
            }
        }
        self.nonce = nonce.wrapping_add(1);
        let mut record = InstanceRecord {
            id,
            creator: sender,
            is_paused: false,
            is_finalized: false,
            is_payable,
            updater,
            caller: sender,
            initializer,
            allowed: allowed_unique,
        };
        let mut batch = vec![Notification::InstanceInitialized {
            instance: id,
            initializer,
            caller: sender,
            updater,
        }];
        self.apply_effects(&id, &effects, &mut batch);
        record.is_finalized = true;
        batch.push(Notification::InstanceFinalized {
            instance: id,
            initializer,
        });
        self.instances.insert(record);
        self.events.extend(batch);
        info!(
            instance = %id,
            creator = %sender,
            slots = effects.stores.len(),
            "instance created"
        );
        Ok((id, ExecReceipt::applied(id, initializer, &effects)))
    }

    /// Executes `payload` against `target` in the namespace of `instance`.
    ///
    /// # Errors
    /// See [`Engine::exec_with_receipt`].
    pub fn exec(
        &mut self,
        sender: PrincipalId,
        instance: InstanceId,
        target: PrincipalId,
        payload: &[u8],
        value: u128,
    ) -> Result<ExecSummary, EngineError> {
        let receipt = self.exec_with_receipt(sender, instance, target, payload, value)?;
        Ok(receipt.summary())
    }

    /// Executes `payload` against `target` in the namespace of `instance`
    /// and returns a receipt describing what was committed.
    ///
    /// Preconditions are checked in this order, each a distinct error:
    /// instance exists, is finalized, is not paused, `sender` is its caller,
    /// value is zero unless payable, `target` is allowed, payload holds a
    /// selector. Then the sender must cover `value` and logic must be
    /// deployed at `target`.
    ///
    /// On success the log receives every application event, then one
    /// payment notification per payout, then one execution notification.
    /// An application exception applies nothing, keeps `value` with the
    /// sender, and logs a single exception notification instead.
    ///
    /// # Errors
    /// Any [`EngineError`] precondition or action failure. State is
    /// unchanged on error.
    pub fn exec_with_receipt(
        &mut self,
        sender: PrincipalId,
        instance: InstanceId,
        target: PrincipalId,
        payload: &[u8],
        value: u128,
    ) -> Result<ExecReceipt, EngineError> {
        self.authorize_exec(&sender, &instance, &target, payload, value)
            .inspect_err(|err| warn!(instance = %instance, target = %target, %err, "exec rejected"))?;
        self.ledger.check_debit(&sender, value)?;
        let logic = self
            .apps
            .get(&target)
            .ok_or(EngineError::NoApplication(target))?;

        let ctx = ExecContext::new(
            &self.store,
            instance,
            sender,
            target,
            value,
            self.config.values,
        );
        debug!(
            instance = %instance,
            target = %target,
            selector = ?Selector::of_payload(payload),
            "dispatching"
        );
        let ret = logic.handle(&ctx, payload).map_err(|revert| {
            warn!(instance = %instance, target = %target, "application reverted");
            EngineError::ApplicationReverted {
                target,
                reason: revert.reason,
            }
        })?;

        let effects = match self.decode(&ret, &target)? {
            ActionPlan::Effects(effects) => effects,
            ActionPlan::Exception(message) => {
                debug!(instance = %instance, target = %target, "application exception");
                self.events.extend(vec![Notification::Exception {
                    target,
                    instance,
                    message: message.as_bytes().to_vec(),
                }]);
                return Ok(ExecReceipt::exception(instance, target, message));
            }
        };
        self.check_payouts(&effects, value)?;

        // Commit. The ledger settles atomically; nothing below can fail.
        let escrowed = self.ledger.settle(&sender, value, &effects.pays)?;
        let mut batch = Vec::with_capacity(effects.emits.len() + effects.pays.len() + 1);
        self.apply_effects(&instance, &effects, &mut batch);
        batch.push(Notification::Execution { instance, target });
        self.events.extend(batch);
        debug!(
            instance = %instance,
            target = %target,
            events = effects.emits.len(),
            payouts = effects.pays.len(),
            slots = effects.stores.len(),
            escrowed,
            "exec committed"
        );
        Ok(ExecReceipt::applied(instance, target, &effects))
    }

    /// Reads a logical location in `instance`'s namespace. Unset locations
    /// and unknown instances read as zero.
    pub fn read(&self, instance: &InstanceId, location: &StorageLocation) -> Slot {
        self.store.read(instance, location)
    }

    /// Reads several logical locations in order.
    pub fn read_multi(&self, instance: &InstanceId, locations: &[StorageLocation]) -> Vec<Slot> {
        self.store.read_multi(instance, locations)
    }

    /// Pauses an instance. Only its updater.
    ///
    /// # Errors
    /// [`EngineError::UnknownInstance`], [`EngineError::Unauthorized`],
    /// [`EngineError::IsPaused`].
    pub fn pause(&mut self, sender: PrincipalId, instance: InstanceId) -> Result<(), EngineError> {
        self.instances.pause(&sender, &instance)
    }

    /// Unpauses an instance. Only its updater.
    ///
    /// # Errors
    /// [`EngineError::UnknownInstance`], [`EngineError::Unauthorized`],
    /// [`EngineError::NotPaused`].
    pub fn unpause(&mut self, sender: PrincipalId, instance: InstanceId) -> Result<(), EngineError> {
        self.instances.unpause(&sender, &instance)
    }

    /// Swaps the initializer. Only the updater, only while paused.
    ///
    /// # Errors
    /// [`EngineError::UnknownInstance`], [`EngineError::Unauthorized`],
    /// [`EngineError::NotPaused`].
    pub fn change_initializer(
        &mut self,
        sender: PrincipalId,
        instance: InstanceId,
        initializer: PrincipalId,
    ) -> Result<(), EngineError> {
        self.instances
            .change_initializer(&sender, &instance, initializer)
    }

    /// Transfers execution rights. Only the current caller.
    ///
    /// # Errors
    /// [`EngineError::UnknownInstance`], [`EngineError::Unauthorized`].
    pub fn change_caller(
        &mut self,
        sender: PrincipalId,
        instance: InstanceId,
        caller: PrincipalId,
    ) -> Result<(), EngineError> {
        self.instances.change_caller(&sender, &instance, caller)
    }

    /// Adds allowed callees. Only the updater, only while paused.
    ///
    /// # Errors
    /// [`EngineError::UnknownInstance`], [`EngineError::Unauthorized`],
    /// [`EngineError::NotPaused`].
    pub fn add_allowed(
        &mut self,
        sender: PrincipalId,
        instance: InstanceId,
        addrs: &[PrincipalId],
    ) -> Result<(), EngineError> {
        self.instances.add_allowed(&sender, &instance, addrs)
    }

    /// Removes allowed callees. Only the updater, only while paused.
    ///
    /// # Errors
    /// [`EngineError::UnknownInstance`], [`EngineError::Unauthorized`],
    /// [`EngineError::NotPaused`].
    pub fn remove_allowed(
        &mut self,
        sender: PrincipalId,
        instance: InstanceId,
        addrs: &[PrincipalId],
    ) -> Result<(), EngineError> {
        self.instances.remove_allowed(&sender, &instance, addrs)
    }

    /// Sweeps the executor escrow to the admin and returns the amount.
    ///
    /// # Errors
    /// [`EngineError::Unauthorized`] unless `sender` is the admin;
    /// [`EngineError::BalanceOverflow`] if the admin balance would overflow.
    pub fn withdraw(&mut self, sender: PrincipalId) -> Result<u128, EngineError> {
        if sender != self.admin {
            warn!(sender = %sender, "withdraw rejected");
            return Err(EngineError::Unauthorized);
        }
        let amount = self.ledger.sweep_escrow(self.admin)?;
        info!(admin = %self.admin, amount, "escrow withdrawn");
        Ok(amount)
    }

    /// Metadata of one instance.
    pub fn instance(&self, id: &InstanceId) -> Option<&InstanceRecord> {
        self.instances.get(id)
    }

    /// Ids of every instance created by `creator`, in ascending id order.
    pub fn instances_created_by(&self, creator: &PrincipalId) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|r| r.creator == *creator)
            .map(|r| r.id)
            .collect()
    }

    /// Notifications not yet drained, in emission order.
    pub fn events(&self) -> &[LoggedNotification] {
        self.events.entries()
    }

    /// Removes and returns every pending notification.
    pub fn drain_events(&mut self) -> Vec<LoggedNotification> {
        self.events.drain()
    }

    /// Canonical digest over the store, instances, and ledger.
    ///
    /// Deployed logic, configuration, and the notification log are not
    /// covered.
    pub fn state_root(&self) -> Hash {
        compute_state_root(&self.store, &self.instances, &self.ledger, self.nonce)
    }

    /// Captures the persistent state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::capture(&self.store, &self.instances, &self.ledger, self.nonce)
    }

    /// Rebuilds an engine from a snapshot. Applications must be deployed
    /// again; the notification log starts empty.
    ///
    /// # Errors
    /// [`SnapshotError::UnsupportedVersion`] for snapshots of another format.
    pub fn restore(
        admin: PrincipalId,
        config: EngineConfig,
        snapshot: StateSnapshot,
    ) -> Result<Self, SnapshotError> {
        let (store, instances, ledger, nonce) = snapshot.into_parts()?;
        info!(instances = instances.len(), slots = store.len(), "engine restored");
        Ok(Self {
            config,
            store,
            instances,
            apps: AppDirectory::new(),
            ledger,
            events: EventLog::new(),
            admin,
            nonce,
        })
    }

    fn next_instance_id(
        &self,
        creator: &PrincipalId,
        initializer: &PrincipalId,
    ) -> (InstanceId, u64) {
        let mut nonce = self.nonce;
        loop {
            let id = make_instance_id(creator, nonce, initializer);
            if !id.is_zero() && !self.instances.contains(&id) {
                return (id, nonce);
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    fn authorize_exec(
        &self,
        sender: &PrincipalId,
        instance: &InstanceId,
        target: &PrincipalId,
        payload: &[u8],
        value: u128,
    ) -> Result<(), EngineError> {
        if instance.is_zero() {
            return Err(EngineError::InvalidInstance(*instance));
        }
        let record = self
            .instances
            .get(instance)
            .ok_or(EngineError::InvalidInstance(*instance))?;
        if !record.is_finalized {
            return Err(EngineError::NotFinalized(*instance));
        }
        if record.is_paused {
            return Err(EngineError::InstancePaused(*instance));
        }
        if record.caller != *sender {
            return Err(EngineError::Unauthorized);
        }
        if value != 0 && !record.is_payable {
            return Err(EngineError::NotPayable);
        }
        if !record.allows(target) {
            return Err(EngineError::TargetNotAllowed(*target));
        }
        if payload.len() < Selector::WIDTH {
            return Err(EngineError::MalformedPayload { len: payload.len() });
        }
        Ok(())
    }

    fn decode(&self, ret: &[u8], target: &PrincipalId) -> Result<ActionPlan, EngineError> {
        ActionList::decode(ret, &self.config.limits).map_err(|err| {
            warn!(target = %target, %err, "malformed action list");
            EngineError::InvalidActionList(err)
        })
    }

    fn check_payouts(&self, effects: &Effects, value: u128) -> Result<(), EngineError> {
        let requested = effects.total_payout().unwrap_or(u128::MAX);
        if requested > value {
            return Err(EngineError::InsufficientValue {
                requested,
                available: value,
            });
        }
        for (destination, _) in &effects.pays {
            if !self.ledger.accepts_payments(destination) {
                return Err(EngineError::PaymentRejected(*destination));
            }
        }
        Ok(())
    }

    /// Writes stores and queues notifications. Balances are settled by the
    /// caller before this runs.
    fn apply_effects(
        &mut self,
        instance: &InstanceId,
        effects: &Effects,
        batch: &mut Vec<Notification>,
    ) {
        self.store.write_multi(instance, &effects.stores);
        for event in &effects.emits {
            batch.push(Notification::Application {
                instance: *instance,
                topics: event.topics.clone(),
                data: event.data.clone(),
            });
        }
        for (destination, amount) in &effects.pays {
            info!(instance = %instance, destination = %destination, amount, "payout");
            batch.push(Notification::Payment {
                instance: *instance,
                destination: *destination,
                amount: *amount,
            });
        }
    }
}
