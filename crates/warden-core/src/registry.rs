// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Version console: named applications, their versions, and per-version
//! function tables.
//!
//! Records live in flat arenas and refer to each other by index, so names
//! stay queryable while the tables grow. Every record also carries the
//! storage location the naming scheme assigns it:
//! - application: `location_with_seed(name, provider)`, description at `+1`;
//! - version: `location_with_seed(name, application location)`;
//! - function: `location_with_seed(selector, version location)`.
//!
//! Two providers registering the same application name get disjoint
//! locations.
use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::ident::{location_with_seed, PrincipalId, Selector, StorageLocation};
use crate::instance::InstanceSpec;

/// Version console failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is already registered in this scope.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// No application of this name for the provider.
    #[error("unknown application: {0}")]
    UnknownApp(String),
    /// No version of this name for the application.
    #[error("unknown version: {0}")]
    UnknownVersion(String),
    /// `add_version_functions` with no selectors.
    #[error("function list is empty")]
    EmptyFunctionList,
    /// The version is finalized and immutable.
    #[error("version is finalized: {0}")]
    VersionFinalized(String),
    /// Selector, description, and implementation lists differ in length.
    #[error("list lengths differ: {selectors} selectors, {descriptions} descriptions, {implementations} implementations")]
    LengthMismatch {
        /// Selector count.
        selectors: usize,
        /// Description count.
        descriptions: usize,
        /// Implementation count.
        implementations: usize,
    },
    /// Finalizing a version with no functions.
    #[error("version has no functions: {0}")]
    NoFunctions(String),
    /// The version must be finalized first.
    #[error("version is not finalized: {0}")]
    VersionNotFinalized(String),
    /// Empty application or version name.
    #[error("name must not be empty")]
    EmptyName,
}

/// A function selector as submitted: a human-readable signature or a raw
/// 4-byte selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctionSelector {
    /// Signature such as `"transfer(address,uint256)"`; hashed to a selector.
    Signature(String),
    /// Raw selector bytes.
    Raw(Selector),
}

impl FunctionSelector {
    /// The 4-byte selector this resolves to.
    #[must_use]
    pub fn selector(&self) -> Selector {
        match self {
            Self::Signature(sig) => Selector::from_signature(sig),
            Self::Raw(sel) => *sel,
        }
    }

    fn signature(&self) -> Option<String> {
        match self {
            Self::Signature(sig) => Some(sig.clone()),
            Self::Raw(_) => None,
        }
    }
}

/// Application summary, in field order: storage location, description
/// location, name, description, version count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppInfo {
    /// Application storage location.
    pub storage: StorageLocation,
    /// Description storage location (`storage + 1`).
    pub description_storage: StorageLocation,
    /// Application name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Number of registered versions.
    pub version_count: usize,
}

/// Version summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionInfo {
    /// Version storage location.
    pub storage: StorageLocation,
    /// Version name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Whether the version is immutable.
    pub is_finalized: bool,
    /// Number of functions.
    pub function_count: usize,
    /// Module address supplied at registration.
    pub module: PrincipalId,
}

/// One function-table entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionInfo {
    /// Function storage location.
    pub storage: StorageLocation,
    /// 4-byte selector.
    pub selector: Selector,
    /// Signature, when registered by signature.
    pub signature: Option<String>,
    /// Description.
    pub description: String,
    /// Implementation address.
    pub implementation: PrincipalId,
}

/// Initializer and function table of a version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionImplementation {
    /// Initializer address, once finalized.
    pub initializer: Option<PrincipalId>,
    /// Initializer selector, once finalized.
    pub init_selector: Option<Selector>,
    /// Selectors in registration order.
    pub selectors: Vec<Selector>,
    /// Implementation addresses, parallel to `selectors`.
    pub implementations: Vec<PrincipalId>,
}

#[derive(Clone, Debug)]
struct AppRecord {
    name: String,
    description: String,
    storage: StorageLocation,
    versions: Vec<usize>,
}

#[derive(Clone, Debug)]
struct VersionRecord {
    name: String,
    description: String,
    storage: StorageLocation,
    module: PrincipalId,
    functions: Vec<usize>,
    finalized: Option<Finalization>,
}

#[derive(Clone, Debug)]
struct Finalization {
    initializer: PrincipalId,
    init_selector: Selector,
    description: String,
}

#[derive(Clone, Debug)]
struct FunctionRecord {
    storage: StorageLocation,
    selector: Selector,
    signature: Option<String>,
    description: String,
    implementation: PrincipalId,
}

/// Registry of applications, versions, and function tables, scoped per
/// provider.
#[derive(Clone, Debug, Default)]
pub struct VersionConsole {
    apps: Vec<AppRecord>,
    versions: Vec<VersionRecord>,
    functions: Vec<FunctionRecord>,
    by_provider: BTreeMap<PrincipalId, Vec<usize>>,
}

impl VersionConsole {
    /// Creates an empty console.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an application under `provider`.
    ///
    /// Returns the application's storage location and its description
    /// location.
    ///
    /// # Errors
    /// [`RegistryError::EmptyName`], [`RegistryError::AlreadyExists`].
    pub fn register_app(
        &mut self,
        provider: PrincipalId,
        name: &str,
        description: &str,
    ) -> Result<(StorageLocation, StorageLocation), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.find_app(&provider, name).is_some() {
            return Err(RegistryError::AlreadyExists(name.to_owned()));
        }
        let storage = location_with_seed(name.as_bytes(), provider.as_bytes());
        let index = self.apps.len();
        self.apps.push(AppRecord {
            name: name.to_owned(),
            description: description.to_owned(),
            storage,
            versions: Vec::new(),
        });
        self.by_provider.entry(provider).or_default().push(index);
        info!(provider = %provider, app = name, "application registered");
        Ok((storage, storage.offset(1)))
    }

    /// Registers a version of an existing application.
    ///
    /// # Errors
    /// [`RegistryError::EmptyName`], [`RegistryError::UnknownApp`],
    /// [`RegistryError::AlreadyExists`].
    pub fn register_version(
        &mut self,
        provider: PrincipalId,
        app: &str,
        version: &str,
        module: PrincipalId,
        description: &str,
    ) -> Result<StorageLocation, RegistryError> {
        if version.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let app_index = self
            .find_app(&provider, app)
            .ok_or_else(|| RegistryError::UnknownApp(app.to_owned()))?;
        if self.find_version(app_index, version).is_some() {
            return Err(RegistryError::AlreadyExists(version.to_owned()));
        }
        let app_storage = self.apps[app_index].storage;
        let storage = location_with_seed(version.as_bytes(), app_storage.as_bytes());
        let index = self.versions.len();
        self.versions.push(VersionRecord {
            name: version.to_owned(),
            description: description.to_owned(),
            storage,
            module,
            functions: Vec::new(),
            finalized: None,
        });
        self.apps[app_index].versions.push(index);
        info!(provider = %provider, app, version, "version registered");
        Ok(storage)
    }

    /// Appends functions to an unfinalized version's table.
    ///
    /// The three lists are parallel. Returns the new table length.
    ///
    /// # Errors
    /// [`RegistryError::UnknownApp`], [`RegistryError::UnknownVersion`],
    /// [`RegistryError::VersionFinalized`], [`RegistryError::EmptyFunctionList`],
    /// [`RegistryError::LengthMismatch`].
    pub fn add_version_functions(
        &mut self,
        provider: PrincipalId,
        app: &str,
        version: &str,
        selectors: &[FunctionSelector],
        descriptions: &[String],
        implementations: &[PrincipalId],
    ) -> Result<usize, RegistryError> {
        let index = self.resolve(&provider, app, version)?;
        if self.versions[index].finalized.is_some() {
            return Err(RegistryError::VersionFinalized(version.to_owned()));
        }
        if selectors.is_empty() {
            return Err(RegistryError::EmptyFunctionList);
        }
        if selectors.len() != descriptions.len() || selectors.len() != implementations.len() {
            return Err(RegistryError::LengthMismatch {
                selectors: selectors.len(),
                descriptions: descriptions.len(),
                implementations: implementations.len(),
            });
        }
        let version_storage = self.versions[index].storage;
        for ((sel, description), implementation) in
            selectors.iter().zip(descriptions).zip(implementations)
        {
            let selector = sel.selector();
            let function_index = self.functions.len();
            self.functions.push(FunctionRecord {
                storage: location_with_seed(&selector.0, version_storage.as_bytes()),
                selector,
                signature: sel.signature(),
                description: description.clone(),
                implementation: *implementation,
            });
            self.versions[index].functions.push(function_index);
        }
        let count = self.versions[index].functions.len();
        debug!(app, version, added = selectors.len(), total = count, "functions added");
        Ok(count)
    }

    /// Finalizes a version, recording its initializer. Irreversible.
    ///
    /// # Errors
    /// [`RegistryError::UnknownApp`], [`RegistryError::UnknownVersion`],
    /// [`RegistryError::VersionFinalized`], [`RegistryError::NoFunctions`].
    pub fn finalize_version(
        &mut self,
        provider: PrincipalId,
        app: &str,
        version: &str,
        initializer: PrincipalId,
        init_selector: &FunctionSelector,
        description: &str,
    ) -> Result<(), RegistryError> {
        let index = self.resolve(&provider, app, version)?;
        let record = &mut self.versions[index];
        if record.finalized.is_some() {
            return Err(RegistryError::VersionFinalized(version.to_owned()));
        }
        if record.functions.is_empty() {
            return Err(RegistryError::NoFunctions(version.to_owned()));
        }
        record.finalized = Some(Finalization {
            initializer,
            init_selector: init_selector.selector(),
            description: description.to_owned(),
        });
        info!(provider = %provider, app, version, initializer = %initializer, "version finalized");
        Ok(())
    }

    /// Application summary.
    #[must_use]
    pub fn app_info(&self, provider: &PrincipalId, app: &str) -> Option<AppInfo> {
        let record = &self.apps[self.find_app(provider, app)?];
        Some(AppInfo {
            storage: record.storage,
            description_storage: record.storage.offset(1),
            name: record.name.clone(),
            description: record.description.clone(),
            version_count: record.versions.len(),
        })
    }

    /// Version summary.
    #[must_use]
    pub fn version_info(
        &self,
        provider: &PrincipalId,
        app: &str,
        version: &str,
    ) -> Option<VersionInfo> {
        let record = &self.versions[self.resolve(provider, app, version).ok()?];
        Some(VersionInfo {
            storage: record.storage,
            name: record.name.clone(),
            description: record.description.clone(),
            is_finalized: record.finalized.is_some(),
            function_count: record.functions.len(),
            module: record.module,
        })
    }

    /// Function-table entry at `position`.
    #[must_use]
    pub fn function_info(
        &self,
        provider: &PrincipalId,
        app: &str,
        version: &str,
        position: usize,
    ) -> Option<FunctionInfo> {
        let version = &self.versions[self.resolve(provider, app, version).ok()?];
        let record = &self.functions[*version.functions.get(position)?];
        Some(FunctionInfo {
            storage: record.storage,
            selector: record.selector,
            signature: record.signature.clone(),
            description: record.description.clone(),
            implementation: record.implementation,
        })
    }

    /// Names of `provider`'s applications, in registration order.
    #[must_use]
    pub fn applications(&self, provider: &PrincipalId) -> Vec<&str> {
        self.by_provider
            .get(provider)
            .map(|indices| indices.iter().map(|&i| self.apps[i].name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Version names of an application, in registration order.
    #[must_use]
    pub fn versions(&self, provider: &PrincipalId, app: &str) -> Vec<&str> {
        self.find_app(provider, app)
            .map(|a| {
                self.apps[a]
                    .versions
                    .iter()
                    .map(|&v| self.versions[v].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recently registered finalized version.
    #[must_use]
    pub fn latest_version(&self, provider: &PrincipalId, app: &str) -> Option<&str> {
        let a = self.find_app(provider, app)?;
        self.apps[a]
            .versions
            .iter()
            .rev()
            .map(|&v| &self.versions[v])
            .find(|v| v.finalized.is_some())
            .map(|v| v.name.as_str())
    }

    /// Initializer and function table of a version.
    #[must_use]
    pub fn version_implementation(
        &self,
        provider: &PrincipalId,
        app: &str,
        version: &str,
    ) -> Option<VersionImplementation> {
        let record = &self.versions[self.resolve(provider, app, version).ok()?];
        let functions = record.functions.iter().map(|&f| &self.functions[f]);
        Some(VersionImplementation {
            initializer: record.finalized.as_ref().map(|f| f.initializer),
            init_selector: record.finalized.as_ref().map(|f| f.init_selector),
            selectors: functions.clone().map(|f| f.selector).collect(),
            implementations: functions.map(|f| f.implementation).collect(),
        })
    }

    /// Description recorded when the version was finalized.
    #[must_use]
    pub fn init_description(
        &self,
        provider: &PrincipalId,
        app: &str,
        version: &str,
    ) -> Option<&str> {
        let record = &self.versions[self.resolve(provider, app, version).ok()?];
        record.finalized.as_ref().map(|f| f.description.as_str())
    }

    /// Builds creation parameters from a finalized version: its initializer,
    /// and its distinct implementation addresses as the allowed callees.
    ///
    /// `version = None` selects [`VersionConsole::latest_version`].
    ///
    /// # Errors
    /// [`RegistryError::UnknownApp`], [`RegistryError::UnknownVersion`] (also
    /// when no version is finalized), [`RegistryError::VersionNotFinalized`].
    pub fn instance_spec(
        &self,
        provider: &PrincipalId,
        app: &str,
        version: Option<&str>,
        updater: PrincipalId,
        is_payable: bool,
        init_calldata: Vec<u8>,
    ) -> Result<InstanceSpec, RegistryError> {
        let version = match version {
            Some(v) => v,
            None => self
                .latest_version(provider, app)
                .ok_or_else(|| RegistryError::UnknownVersion(app.to_owned()))?,
        };
        let record = &self.versions[self.resolve(provider, app, version)?];
        let finalization = record
            .finalized
            .as_ref()
            .ok_or_else(|| RegistryError::VersionNotFinalized(version.to_owned()))?;
        let mut allowed: Vec<PrincipalId> = Vec::with_capacity(record.functions.len());
        for &f in &record.functions {
            let implementation = self.functions[f].implementation;
            if !allowed.contains(&implementation) {
                allowed.push(implementation);
            }
        }
        Ok(InstanceSpec {
            updater,
            is_payable,
            initializer: finalization.initializer,
            init_calldata,
            allowed,
        })
    }

    fn find_app(&self, provider: &PrincipalId, name: &str) -> Option<usize> {
        self.by_provider
            .get(provider)?
            .iter()
            .copied()
            .find(|&i| self.apps[i].name == name)
    }

    fn find_version(&self, app: usize, name: &str) -> Option<usize> {
        self.apps[app]
            .versions
            .iter()
            .copied()
            .find(|&v| self.versions[v].name == name)
    }

    fn resolve(
        &self,
        provider: &PrincipalId,
        app: &str,
        version: &str,
    ) -> Result<usize, RegistryError> {
        let a = self
            .find_app(provider, app)
            .ok_or_else(|| RegistryError::UnknownApp(app.to_owned()))?;
        self.find_version(a, version)
            .ok_or_else(|| RegistryError::UnknownVersion(version.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::make_principal_id;

    fn console_with_version() -> (VersionConsole, PrincipalId) {
        let provider = make_principal_id("provider");
        let mut console = VersionConsole::new();
        assert!(console.register_app(provider, "token", "a token").is_ok());
        assert!(console
            .register_version(provider, "token", "v1", make_principal_id("module"), "first")
            .is_ok());
        (console, provider)
    }

    #[test]
    fn duplicate_app_name_is_rejected_per_provider() {
        let (mut console, provider) = console_with_version();
        assert_eq!(
            console.register_app(provider, "token", ""),
            Err(RegistryError::AlreadyExists("token".to_owned()))
        );
        assert!(console
            .register_app(make_principal_id("other"), "token", "")
            .is_ok());
    }

    #[test]
    fn same_name_under_two_providers_gets_distinct_locations() {
        let mut console = VersionConsole::new();
        let a = console.register_app(make_principal_id("a"), "app", "");
        let b = console.register_app(make_principal_id("b"), "app", "");
        assert!(matches!((a, b), (Ok(x), Ok(y)) if x.0 != y.0));
    }

    #[test]
    fn description_location_follows_app_location() {
        let mut console = VersionConsole::new();
        let Ok((storage, desc)) = console.register_app(make_principal_id("p"), "app", "") else {
            unreachable!("registration failed");
        };
        assert_eq!(desc, storage.offset(1));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let (mut console, provider) = console_with_version();
        let res = console.add_version_functions(
            provider,
            "token",
            "v1",
            &[FunctionSelector::Signature("a()".into())],
            &[],
            &[make_principal_id("impl")],
        );
        assert!(matches!(res, Err(RegistryError::LengthMismatch { .. })));
    }

    #[test]
    fn finalize_requires_functions() {
        let (mut console, provider) = console_with_version();
        let res = console.finalize_version(
            provider,
            "token",
            "v1",
            make_principal_id("init"),
            &FunctionSelector::Signature("init()".into()),
            "",
        );
        assert_eq!(res, Err(RegistryError::NoFunctions("v1".to_owned())));
    }

    #[test]
    fn latest_version_skips_unfinalized() {
        let (mut console, provider) = console_with_version();
        assert!(console
            .add_version_functions(
                provider,
                "token",
                "v1",
                &[FunctionSelector::Raw(Selector([1, 2, 3, 4]))],
                &[String::new()],
                &[make_principal_id("impl")],
            )
            .is_ok());
        assert_eq!(console.latest_version(&provider, "token"), None);
        assert!(console
            .finalize_version(
                provider,
                "token",
                "v1",
                make_principal_id("init"),
                &FunctionSelector::Raw(Selector([0; 4])),
                "",
            )
            .is_ok());
        assert!(console
            .register_version(provider, "token", "v2", make_principal_id("m2"), "")
            .is_ok());
        assert_eq!(console.latest_version(&provider, "token"), Some("v1"));
    }
}
