pub mod builders;
pub mod fake_gateway;
pub mod fake_worker;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Generous upper bound for anything a test awaits.
pub const TEST_DEADLINE: Duration = Duration::from_secs(10);

/// Install a test-writer subscriber once per test binary.
///
/// Output only shows for failing tests unless run with `--nocapture`.
/// `RELAYBOT_LOG` overrides the default `relaybot=debug` filter.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("RELAYBOT_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn,relaybot=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test after [`TEST_DEADLINE`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_DEADLINE, f)
        .await
        .unwrap_or_else(|_| panic!("test did not finish within {TEST_DEADLINE:?}"))
}
