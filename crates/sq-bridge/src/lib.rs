//! Hosts self-contained replay modules on their own thread.
//!
//! A [`ModuleBridge`] talks to the module over a small message protocol
//! and gets its audio back through a lock-free ring read by
//! [`BridgeOutput`] on the render side.

mod bridge;
mod config;
mod engine_module;
mod error;
mod host;
mod module;
mod native;
mod output;
pub mod protocol;

pub use bridge::{BridgeEvent, BridgeState, ModuleBridge};
pub use config::BridgeConfig;
pub use engine_module::{EngineModule, SongDecoder};
pub use error::{BridgeError, ModuleError, Result};
pub use module::ReplayModule;
pub use native::{NativeApi, NativeModule};
pub use output::BridgeOutput;
pub use protocol::{ControlMessage, ModuleMessage, ModulePosition};
