//! Application-level orchestration.
//!
//! Status polling, lifecycle actions, submissions and uploads, plus the controller that
//! runs them on behalf of the UI thread. UI and CLI layers call into this module so that
//! network work stays off the render loop.

pub mod actions;
mod controller;
pub mod poller;
pub mod submit;
pub mod upload;

pub use actions::LifecycleAction;
pub(crate) use controller::{run_controller, UiCommand};
pub use poller::{PollerHandle, Refresher};
