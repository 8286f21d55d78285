// src/backend/utils/logging.rs
// Routes `tracing` events to the canister debug log.

use std::io::{self, Write};
use tracing::Level;

/// Buffers one formatted event and hands it to `ic_cdk::print` when dropped.
#[derive(Default)]
pub struct CanisterLogWriter {
    buffer: Vec<u8>,
}

impl Write for CanisterLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for CanisterLogWriter {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            ic_cdk::print(String::from_utf8_lossy(&self.buffer).trim_end());
        }
    }
}

/// Installs the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_logging(max_level: Level) {
    let installed = tracing_subscriber::fmt()
        .with_writer(CanisterLogWriter::default)
        .with_max_level(max_level)
        .with_target(false)
        .without_time()
        .try_init();
    if installed.is_err() {
        ic_cdk::println!("tracing subscriber already installed");
    }
}
