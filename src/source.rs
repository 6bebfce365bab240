//! Stream adapters feeding the reconciler: a websocket reader for the flash
//! stream and a fixed-interval JSON-RPC poller for full block snapshots.

pub mod poller;
pub mod socket;

pub use poller::{EthRpcClient, FullBlockPoller, LatestBlockClient};
pub use socket::FlashSocket;
