// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine builder utilities and a ready-made single-instance fixture.

use warden_core::{
    ActionList, ApplicationLogic, Engine, EngineConfig, EngineError, InstanceId, InstanceSpec,
    PrincipalId, Slot,
};

use crate::apps::ScriptedApp;
use crate::hashes::{make_location, presets};

type Step = Box<dyn FnOnce(&mut Engine) -> Result<(), EngineError>>;

/// Builder for test engines with deployed apps and funded principals.
///
/// # Example
///
/// ```
/// use warden_dry_tests::{make_principal, EmptyApp, EngineTestBuilder};
///
/// let engine = EngineTestBuilder::new()
///     .with_app(make_principal("noop"), EmptyApp)
///     .with_balance(make_principal("alice"), 100)
///     .build()
///     .unwrap();
/// assert_eq!(engine.ledger().balance(&make_principal("alice")), 100);
/// ```
pub struct EngineTestBuilder {
    admin: PrincipalId,
    config: EngineConfig,
    steps: Vec<Step>,
}

impl Default for EngineTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineTestBuilder {
    /// Create a builder with the preset admin and default configuration.
    pub fn new() -> Self {
        Self {
            admin: presets::admin(),
            config: EngineConfig::default(),
            steps: Vec::new(),
        }
    }

    /// Override the engine admin.
    pub fn with_admin(mut self, admin: PrincipalId) -> Self {
        self.admin = admin;
        self
    }

    /// Override the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Deploy `logic` at `address` after construction.
    pub fn with_app(mut self, address: PrincipalId, logic: impl ApplicationLogic + 'static) -> Self {
        self.steps
            .push(Box::new(move |engine: &mut Engine| engine.deploy(address, logic)));
        self
    }

    /// Deposit `amount` to `principal` after construction.
    pub fn with_balance(mut self, principal: PrincipalId, amount: u128) -> Self {
        self.steps.push(Box::new(move |engine: &mut Engine| {
            engine.ledger_mut().deposit(principal, amount)?;
            Ok(())
        }));
        self
    }

    /// Mark `principal` as refusing payouts.
    pub fn with_rejecting(mut self, principal: PrincipalId) -> Self {
        self.steps.push(Box::new(move |engine: &mut Engine| {
            engine.ledger_mut().set_rejects_payments(principal, true);
            Ok(())
        }));
        self
    }

    /// Build the engine, applying every step in order.
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut engine = Engine::with_config(self.admin, self.config);
        for step in self.steps {
            step(&mut engine)?;
        }
        Ok(engine)
    }
}

/// An engine holding one finalized instance that allows one application.
///
/// Roles come from [`presets`]: `caller` created the instance and may
/// execute, `updater` administers it, and the initializer wrote
/// `make_location("initialized") = 1`.
pub struct InstanceFixture {
    /// The engine.
    pub engine: Engine,
    /// The instance.
    pub instance: InstanceId,
    /// Execution principal (also the creator).
    pub caller: PrincipalId,
    /// Administrative principal.
    pub updater: PrincipalId,
    /// Allowed application address.
    pub app: PrincipalId,
}

impl InstanceFixture {
    /// Fixture with `logic` deployed at [`presets::app`].
    pub fn new(logic: impl ApplicationLogic + 'static) -> Result<Self, EngineError> {
        Self::with_builder(EngineTestBuilder::new(), logic, false)
    }

    /// Payable fixture; the caller starts with `balance`.
    pub fn payable(
        logic: impl ApplicationLogic + 'static,
        balance: u128,
    ) -> Result<Self, EngineError> {
        let builder = EngineTestBuilder::new().with_balance(presets::caller(), balance);
        Self::with_builder(builder, logic, true)
    }

    /// Fixture built on top of `builder`.
    pub fn with_builder(
        builder: EngineTestBuilder,
        logic: impl ApplicationLogic + 'static,
        is_payable: bool,
    ) -> Result<Self, EngineError> {
        let caller = presets::caller();
        let updater = presets::updater();
        let app = presets::app();
        let mut engine = builder
            .with_app(presets::initializer(), initializer_app())
            .with_app(app, logic)
            .build()?;
        let instance = engine.create_instance(
            caller,
            InstanceSpec {
                updater,
                is_payable,
                initializer: presets::initializer(),
                init_calldata: Vec::new(),
                allowed: vec![app],
            },
        )?;
        Ok(Self {
            engine,
            instance,
            caller,
            updater,
            app,
        })
    }

    /// `exec` as the caller against the allowed app with a zero selector.
    pub fn exec(&mut self, value: u128) -> Result<warden_core::ExecSummary, EngineError> {
        self.engine
            .exec(self.caller, self.instance, self.app, &[0u8; 4], value)
    }
}

/// Initializer that marks the instance initialized.
pub fn initializer_app() -> ScriptedApp {
    let mut list = ActionList::new();
    list.store(make_location("initialized"), Slot::from_bool(true));
    ScriptedApp::new(list)
}
