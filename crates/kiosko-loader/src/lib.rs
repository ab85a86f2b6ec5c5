//! Module loading for Kiosko.
//!
//! The [`ModuleManager`] brings a module from "registered" to "rendered and
//! initialized" exactly once per session: dependencies first, then stylesheet
//! and markup concurrently, then the script, then the module's entry point.
//! Every load is bounded by a timeout and can be cancelled.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod instance;
pub mod lifecycle;
pub mod manager;
pub mod registry;

pub use config::{LoaderConfig, LoaderConfigError};
pub use descriptor::{EntryPoint, ModuleConfig, ModuleDescriptor, init_function_name};
pub use error::LoadError;
pub use events::{EventBus, ModuleEvent, SubscriptionId};
pub use instance::{ModuleHooks, ModuleInstance, Teardown};
pub use lifecycle::{ModuleLifecycle, ModuleState};
pub use manager::{LoadOptions, LoadOutcome, LoadStats, ModuleManager};
pub use registry::EntryPointRegistry;
