// src/backend/utils/guards.rs
use crate::error::SwitchError;
use crate::models::common::AuthContext;
use crate::storage::config;
use candid::Principal;

/// Identity of the caller for owner operations. Anonymous callers are rejected.
///
/// # Errors
///
/// Returns `SwitchError::NotAuthorized` for the anonymous principal.
pub fn authenticated_caller() -> Result<AuthContext, SwitchError> {
    let auth = AuthContext::new(ic_cdk::caller());
    if auth.is_anonymous() {
        return Err(SwitchError::NotAuthorized(
            "Anonymous callers cannot manage secrets".to_string(),
        ));
    }
    Ok(auth)
}

/// Identity of the caller without the anonymous check (share submission).
pub fn any_caller() -> AuthContext {
    AuthContext::new(ic_cdk::caller())
}

fn caller_is_one_of(allowed: &[Principal]) -> bool {
    let caller = ic_cdk::caller();
    caller != Principal::anonymous() && allowed.contains(&caller)
}

/// Canister guard: caller must be the configured admin.
pub fn admin_guard() -> Result<(), String> {
    if caller_is_one_of(&[config::get_admin_principal()]) {
        Ok(())
    } else {
        Err(SwitchError::NotAuthorized("Caller is not the admin.".to_string()).to_string())
    }
}

/// Canister guard: caller must be the cron trigger or the admin.
pub fn cron_or_admin_guard() -> Result<(), String> {
    if caller_is_one_of(&[config::get_cron_principal(), config::get_admin_principal()]) {
        Ok(())
    } else {
        Err(SwitchError::NotAuthorized(
            "Caller is not the authorized cron trigger or an admin.".to_string(),
        )
        .to_string())
    }
}

/// Canister guard: caller must be the delivery relay or the admin.
pub fn relay_or_admin_guard() -> Result<(), String> {
    if caller_is_one_of(&[config::get_relay_principal(), config::get_admin_principal()]) {
        Ok(())
    } else {
        Err(SwitchError::NotAuthorized("Caller is not the delivery relay or an admin.".to_string()).to_string())
    }
}
