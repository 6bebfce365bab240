pub mod normalize;
pub mod reconciler;
pub mod runtime;
pub mod source;

pub use normalize::block::{BlockVariant, NormalizeError, NormalizedBlock, SourceKind};
pub use normalize::flash::normalize_flash;
pub use normalize::full::{normalize_full, FullBlockPayload};
pub use reconciler::identity::{Classification, IdentityTracker};
pub use reconciler::slot::StreamSlot;
pub use reconciler::Reconciler;
pub use runtime::config::{ReconcilerConfig, ReconcilerConfigBuilder};
pub use runtime::runner::Runner;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use source::poller::{EthRpcClient, FullBlockPoller, LatestBlockClient};
pub use source::socket::FlashSocket;
