use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::DefaultMemoryImpl;
use std::cell::RefCell;

// Define Memory IDs for stable structures
// Choose non-overlapping IDs
const SECRETS_MEM_ID: MemoryId = MemoryId::new(0);
const TOKENS_MEM_ID: MemoryId = MemoryId::new(1);
const SHARE_SUBMISSIONS_MEM_ID: MemoryId = MemoryId::new(2);
const OUTBOX_MEM_ID: MemoryId = MemoryId::new(3);
const OUTBOX_SEQ_MEM_ID: MemoryId = MemoryId::new(4);
const METRICS_MEM_ID: MemoryId = MemoryId::new(5);
// Reserve IDs 6-19 for future use
pub(crate) const ADMIN_PRINCIPAL_MEM_ID: MemoryId = MemoryId::new(20);
pub(crate) const CRON_PRINCIPAL_MEM_ID: MemoryId = MemoryId::new(21);
pub(crate) const RELAY_PRINCIPAL_MEM_ID: MemoryId = MemoryId::new(22);
pub(crate) const SWITCH_CONFIG_MEM_ID: MemoryId = MemoryId::new(23);

// Define memory type alias
pub type Memory = VirtualMemory<DefaultMemoryImpl>;

thread_local! {
    static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> = RefCell::new(
        MemoryManager::init(DefaultMemoryImpl::default())
    );
}

/// Get memory instance for a specific MemoryId.
pub fn get_memory(id: MemoryId) -> Memory {
    MEMORY_MANAGER.with(|m| m.borrow().get(id))
}

pub fn get_secrets_memory() -> Memory {
    get_memory(SECRETS_MEM_ID)
}

pub fn get_tokens_memory() -> Memory {
    get_memory(TOKENS_MEM_ID)
}

pub fn get_share_submissions_memory() -> Memory {
    get_memory(SHARE_SUBMISSIONS_MEM_ID)
}

pub fn get_outbox_memory() -> Memory {
    get_memory(OUTBOX_MEM_ID)
}

pub fn get_outbox_seq_memory() -> Memory {
    get_memory(OUTBOX_SEQ_MEM_ID)
}

pub fn get_metrics_memory() -> Memory {
    get_memory(METRICS_MEM_ID)
}
