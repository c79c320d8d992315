//! Contracts at the boundary of the core.
//!
//! The core never knows how bundles are stored, routed over the network or carried by
//! a transport. It talks to those parts of the node only through the traits below,
//! which the node (or a test) implements and injects into [`crate::DtnCore`].

pub mod channel;
pub mod delivery;
pub mod pipeline;
pub mod storage;
