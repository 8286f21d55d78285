use crate::models::config::SwitchConfig;
use candid::{CandidType, Principal};
use serde::Deserialize;

#[derive(CandidType, Deserialize, Debug)]
pub struct InitArgs {
    pub admin_principal: Principal,
    pub cron_principal: Principal,
    /// Off-chain relay allowed to drain the outbound message queue.
    pub relay_principal: Principal,
    pub config: Option<SwitchConfig>,
}
