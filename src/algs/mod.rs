//! Communication plumbing used by ghost exchange.

pub mod communicator;
pub mod wire;
