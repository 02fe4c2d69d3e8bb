#![allow(dead_code, unused_imports)]

pub use relaybot_test_utils::builders;
pub use relaybot_test_utils::fake_gateway::{FakeGateway, SentMessage};
pub use relaybot_test_utils::fake_worker::{FakeWorker, LaunchRecord};
pub use relaybot_test_utils::{init_tracing, with_timeout};

use std::sync::Arc;

use relaybot::config::ConfigFile;
use relaybot::fs::FileSystem;
use relaybot::relay::{Relay, RelaySettings};
use relaybot::scratch::ScratchWriter;

/// Relay wired to the given fakes.
pub fn relay_with(
    cfg: &ConfigFile,
    gateway: Arc<FakeGateway>,
    worker: FakeWorker,
    fs: Arc<dyn FileSystem>,
) -> Relay {
    Relay::new(
        gateway,
        Arc::new(worker),
        ScratchWriter::new(fs, cfg.scratch.clone()),
        RelaySettings::from_config(cfg),
    )
}
