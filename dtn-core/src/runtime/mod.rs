//! Runtime layer.
//!
//! Hosts the loops the core keeps alive between calls: the delivery listener draining
//! activations and the link-local table draining channel events.

pub(crate) mod task_runtime;
