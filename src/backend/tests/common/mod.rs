#![allow(dead_code)]

use candid::Principal;
use deadswitch_backend::error::SwitchError;
use deadswitch_backend::models::{
    AuthContext, ContactChannel, Recipient, Reminder, Secret, SwitchConfig, NANOS_PER_DAY,
};
use deadswitch_backend::services::notifier::Notifier;
use deadswitch_backend::services::{CreatedSecret, NewSecret, RecipientInput, SwitchService};
use deadswitch_backend::storage::MemorySecretStore;
use deadswitch_backend::utils::time::ManualClock;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use zeroize::Zeroizing;

pub const START: u64 = 1_000 * NANOS_PER_DAY;
pub const PLAINTEXT: &[u8] = b"safe combination: 12-34-56";

pub type Harness = SwitchService<MemorySecretStore, ManualClock, RecordingNotifier, ChaCha20Rng>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub secret_id: String,
    pub recipient_id: String,
    pub plaintext: Vec<u8>,
}

/// Notifier that records everything and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    reminders: Mutex<Vec<Reminder>>,
    share_requests: Mutex<Vec<(String, String)>>,
    disclosures: Mutex<Vec<Delivery>>,
    fail_reminders: AtomicBool,
    failing_addresses: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn reminders(&self) -> Vec<Reminder> {
        self.reminders.lock().unwrap().clone()
    }

    pub fn share_requests(&self) -> Vec<(String, String)> {
        self.share_requests.lock().unwrap().clone()
    }

    pub fn disclosures(&self) -> Vec<Delivery> {
        self.disclosures.lock().unwrap().clone()
    }

    pub fn fail_reminders(&self, fail: bool) {
        self.fail_reminders.store(fail, Ordering::SeqCst);
    }

    pub fn fail_disclosures_to(&self, address: &str) {
        self.failing_addresses.lock().unwrap().push(address.to_string());
    }

    pub fn stop_failing(&self) {
        self.fail_reminders(false);
        self.failing_addresses.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn send_reminder(&self, reminder: &Reminder) -> Result<(), SwitchError> {
        if self.fail_reminders.load(Ordering::SeqCst) {
            return Err(SwitchError::InternalError("mail relay down".to_string()));
        }
        self.reminders.lock().unwrap().push(reminder.clone());
        Ok(())
    }

    fn request_share(&self, secret: &Secret, recipient: &Recipient) -> Result<(), SwitchError> {
        self.share_requests
            .lock()
            .unwrap()
            .push((secret.secret_id.clone(), recipient.recipient_id.clone()));
        Ok(())
    }

    fn send_disclosure(
        &self,
        secret: &Secret,
        recipient: &Recipient,
        plaintext: &[u8],
    ) -> Result<(), SwitchError> {
        if self.failing_addresses.lock().unwrap().contains(&recipient.address) {
            return Err(SwitchError::InternalError("mailbox unavailable".to_string()));
        }
        self.disclosures.lock().unwrap().push(Delivery {
            secret_id: secret.secret_id.clone(),
            recipient_id: recipient.recipient_id.clone(),
            plaintext: plaintext.to_vec(),
        });
        Ok(())
    }
}

pub fn harness() -> Harness {
    SwitchService::new(
        MemorySecretStore::new(),
        ManualClock::new(START),
        RecordingNotifier::default(),
        ChaCha20Rng::seed_from_u64(42),
        SwitchConfig::default(),
    )
}

pub fn owner() -> AuthContext {
    AuthContext::new(Principal::from_slice(&[9; 29]))
}

pub fn recipient_address(position: usize) -> String {
    format!("heir{position}@example.com")
}

pub fn new_secret(shares_total: u8, threshold: u8, recipients: usize) -> NewSecret {
    NewSecret {
        title: "Safe".to_string(),
        plaintext: Zeroizing::new(PLAINTEXT.to_vec()),
        recipients: (0..recipients)
            .map(|position| RecipientInput {
                name: format!("Heir {position}"),
                channel: ContactChannel::Email,
                address: recipient_address(position),
                primary: position == 0,
            })
            .collect(),
        shares_total,
        threshold,
        interval_days: 30,
    }
}

/// 5 shares, threshold 3, three recipients, 30 day interval, created at `START`.
pub fn create_default(harness: &Harness) -> CreatedSecret {
    harness.create_secret(&owner(), new_secret(5, 3, 3)).unwrap()
}

pub fn load(harness: &Harness, secret_id: &str) -> Secret {
    use deadswitch_backend::storage::SecretStore;
    harness.store().load_secret(secret_id).unwrap().unwrap()
}
