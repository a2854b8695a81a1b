pub mod block;
pub mod blockchain;
pub mod error;
pub mod handler;
pub mod mempool;
pub mod state;
