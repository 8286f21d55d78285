use crate::models::common::{PrincipalId, SecretId, TimestampNs};
use crate::utils::shamir::KeyShare;
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// A key share handed back by a recipient after the secret was triggered.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct ShareSubmission {
    pub secret_id: SecretId,
    pub share: KeyShare,
    pub submitted_by: PrincipalId,
    pub submitted_at: TimestampNs,
}
