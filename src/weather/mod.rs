pub mod cache;
pub mod client;
pub mod error;
pub mod fingerprint;
pub mod frame;
pub mod retry;
pub mod transport;
