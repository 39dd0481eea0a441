// Thin re-export module: implementation lives in `blockchain/core.rs`, split
// into block authentication, the header list, validation and the chain engine.

pub mod core;
pub use self::core::*;
