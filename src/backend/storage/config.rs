// src/backend/storage/config.rs
use crate::error::SwitchError;
use crate::models::config::SwitchConfig;
use crate::models::init::InitArgs;
use crate::storage::memory::{
    get_memory, Memory, ADMIN_PRINCIPAL_MEM_ID, CRON_PRINCIPAL_MEM_ID, RELAY_PRINCIPAL_MEM_ID,
    SWITCH_CONFIG_MEM_ID,
};
use crate::storage::storable::Cbor;
use candid::Principal;
use ic_stable_structures::StableCell;
use std::cell::RefCell;

// Default values (used until init runs)
const DEFAULT_ADMIN_PRINCIPAL: Principal = Principal::management_canister();
const DEFAULT_CRON_PRINCIPAL: Principal = Principal::management_canister();
const DEFAULT_RELAY_PRINCIPAL: Principal = Principal::management_canister();

thread_local! {
    /// Stable cell for the Admin Principal
    static ADMIN_PRINCIPAL: RefCell<StableCell<Cbor<Principal>, Memory>> = RefCell::new(
        StableCell::init(get_memory(ADMIN_PRINCIPAL_MEM_ID), Cbor(DEFAULT_ADMIN_PRINCIPAL))
            .expect("Failed to initialize admin principal stable cell")
    );

    /// Stable cell for the Cron Principal
    static CRON_PRINCIPAL: RefCell<StableCell<Cbor<Principal>, Memory>> = RefCell::new(
        StableCell::init(get_memory(CRON_PRINCIPAL_MEM_ID), Cbor(DEFAULT_CRON_PRINCIPAL))
            .expect("Failed to initialize cron principal stable cell")
    );

    /// Stable cell for the outbound relay principal
    static RELAY_PRINCIPAL: RefCell<StableCell<Cbor<Principal>, Memory>> = RefCell::new(
        StableCell::init(get_memory(RELAY_PRINCIPAL_MEM_ID), Cbor(DEFAULT_RELAY_PRINCIPAL))
            .expect("Failed to initialize relay principal stable cell")
    );

    static SWITCH_CONFIG: RefCell<StableCell<Cbor<SwitchConfig>, Memory>> = RefCell::new(
        StableCell::init(get_memory(SWITCH_CONFIG_MEM_ID), Cbor(SwitchConfig::default()))
            .expect("Failed to initialize switch config stable cell")
    );
}

fn set_principal(
    cell: &'static std::thread::LocalKey<RefCell<StableCell<Cbor<Principal>, Memory>>>,
    principal: Principal,
) -> Result<(), SwitchError> {
    cell.with(|cell| {
        cell.borrow_mut()
            .set(Cbor(principal))
            .map(|_| ())
            .map_err(|e| SwitchError::StorageError(format!("Failed to store principal: {:?}", e)))
    })
}

/// Initialize the configuration values from InitArgs.
/// Called during canister initialization; upgrades keep the stored values.
pub fn init_config(args: &InitArgs) -> Result<(), SwitchError> {
    set_principal(&ADMIN_PRINCIPAL, args.admin_principal)?;
    set_principal(&CRON_PRINCIPAL, args.cron_principal)?;
    set_principal(&RELAY_PRINCIPAL, args.relay_principal)?;
    if let Some(config) = &args.config {
        set_switch_config(config.clone())?;
    }
    tracing::info!(
        admin = %args.admin_principal,
        cron = %args.cron_principal,
        relay = %args.relay_principal,
        "configuration initialized"
    );
    Ok(())
}

/// Get the configured Admin Principal.
pub fn get_admin_principal() -> Principal {
    ADMIN_PRINCIPAL.with(|cell| cell.borrow().get().0)
}

/// Get the configured Cron Principal.
pub fn get_cron_principal() -> Principal {
    CRON_PRINCIPAL.with(|cell| cell.borrow().get().0)
}

pub fn get_relay_principal() -> Principal {
    RELAY_PRINCIPAL.with(|cell| cell.borrow().get().0)
}

pub fn get_switch_config() -> SwitchConfig {
    SWITCH_CONFIG.with(|cell| cell.borrow().get().0.clone())
}

/// Replaces the tunables after validating them.
pub fn set_switch_config(config: SwitchConfig) -> Result<(), SwitchError> {
    config.validate()?;
    SWITCH_CONFIG.with(|cell| {
        cell.borrow_mut()
            .set(Cbor(config))
            .map(|_| ())
            .map_err(|e| SwitchError::StorageError(format!("Failed to store switch config: {:?}", e)))
    })
}
