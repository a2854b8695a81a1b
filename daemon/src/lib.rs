//! Vela validator node.
//!
//! A node owns a [`core::blockchain::Blockchain`], serves it over JSON-RPC and
//! produces blocks in turn with the other validators sharing the same
//! [`consensus::LocalConsensus`].

pub mod config;
pub mod consensus;
pub mod core;
pub mod node;
pub mod rpc;

pub use node::{Node, NodeError};
