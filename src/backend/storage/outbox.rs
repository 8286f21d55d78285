// src/backend/storage/outbox.rs
// Queue of reminders, share requests and disclosures waiting for the relay.

use crate::error::SwitchError;
use crate::models::{OutboundBody, OutboundMessage, SecretId, TimestampNs};
use crate::storage::memory::{get_outbox_memory, get_outbox_seq_memory, Memory};
use crate::storage::storable::Cbor;
use ic_stable_structures::{StableBTreeMap, StableCell};
use std::cell::RefCell;

thread_local! {
    /// Outbound messages: Key = message_id (monotonic), Value = OutboundMessage
    static OUTBOX: RefCell<StableBTreeMap<u64, Cbor<OutboundMessage>, Memory>> = RefCell::new(
        StableBTreeMap::init(get_outbox_memory())
    );

    static OUTBOX_SEQ: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(get_outbox_seq_memory(), 0)
            .expect("Failed to initialize outbox sequence stable cell")
    );
}

fn next_message_id() -> Result<u64, SwitchError> {
    OUTBOX_SEQ.with(|cell| {
        let mut cell = cell.borrow_mut();
        let next = cell.get().saturating_add(1);
        cell.set(next)
            .map_err(|e| SwitchError::StorageError(format!("Failed to advance outbox sequence: {:?}", e)))?;
        Ok(next)
    })
}

/// Appends a message and returns its id.
pub fn enqueue(
    secret_id: &SecretId,
    title: &str,
    body: OutboundBody,
    now: TimestampNs,
) -> Result<u64, SwitchError> {
    let message_id = next_message_id()?;
    let message = OutboundMessage {
        message_id,
        secret_id: secret_id.clone(),
        title: title.to_string(),
        created_at: now,
        body,
    };
    OUTBOX.with(|map_ref| {
        map_ref.borrow_mut().insert(message_id, Cbor(message));
    });
    Ok(message_id)
}

/// Removes and returns up to `limit` of the oldest messages.
pub fn drain(limit: usize) -> Vec<OutboundMessage> {
    OUTBOX.with(|map_ref| {
        let mut map = map_ref.borrow_mut();
        let ids: Vec<u64> = map.iter().take(limit).map(|(id, _)| id).collect();
        ids.into_iter()
            .filter_map(|id| map.remove(&id).map(|c| c.0))
            .collect()
    })
}

pub fn pending_count() -> u64 {
    OUTBOX.with(|map_ref| map_ref.borrow().len())
}
