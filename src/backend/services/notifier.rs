// src/backend/services/notifier.rs
use crate::error::SwitchError;
use crate::models::{OutboundBody, Recipient, Reminder, Secret};
use crate::storage::outbox;
use crate::utils::time::{Clock, IcClock};

/// Outbound delivery collaborator (email/SMS transport lives elsewhere).
///
/// Calls are fire-and-forget from the engine's point of view: an error is
/// logged and the step is attempted again on the next sweep.
pub trait Notifier: Send + Sync {
    fn send_reminder(&self, reminder: &Reminder) -> Result<(), SwitchError>;

    /// Asks a recipient to hand back their key share after a trigger.
    fn request_share(&self, secret: &Secret, recipient: &Recipient) -> Result<(), SwitchError>;

    fn send_disclosure(
        &self,
        secret: &Secret,
        recipient: &Recipient,
        plaintext: &[u8],
    ) -> Result<(), SwitchError>;
}

/// Queues every message into the stable outbox for the relay to drain.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutboxNotifier<C = IcClock> {
    clock: C,
}

impl<C: Clock> OutboxNotifier<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> Notifier for OutboxNotifier<C> {
    fn send_reminder(&self, reminder: &Reminder) -> Result<(), SwitchError> {
        let id = outbox::enqueue(
            &reminder.secret_id,
            &reminder.title,
            OutboundBody::Reminder(reminder.clone()),
            self.clock.now(),
        )?;
        tracing::debug!(secret_id = %reminder.secret_id, message_id = id, tier = reminder.tier.label(), "reminder queued");
        Ok(())
    }

    fn request_share(&self, secret: &Secret, recipient: &Recipient) -> Result<(), SwitchError> {
        let id = outbox::enqueue(
            &secret.secret_id,
            &secret.title,
            OutboundBody::ShareRequest {
                recipient: recipient.clone(),
                owner: secret.owner,
                threshold: secret.threshold,
            },
            self.clock.now(),
        )?;
        tracing::debug!(secret_id = %secret.secret_id, recipient_id = %recipient.recipient_id, message_id = id, "share request queued");
        Ok(())
    }

    fn send_disclosure(
        &self,
        secret: &Secret,
        recipient: &Recipient,
        plaintext: &[u8],
    ) -> Result<(), SwitchError> {
        let id = outbox::enqueue(
            &secret.secret_id,
            &secret.title,
            OutboundBody::Disclosure {
                recipient: recipient.clone(),
                plaintext: plaintext.to_vec(),
            },
            self.clock.now(),
        )?;
        tracing::debug!(secret_id = %secret.secret_id, recipient_id = %recipient.recipient_id, message_id = id, "disclosure queued");
        Ok(())
    }
}
