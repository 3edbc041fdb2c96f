//! Dynamic-schema forms: field interpretation, stored values and per-gadget panels.

pub mod field;
pub mod panel;
pub mod store;

pub use field::{ControlInput, FieldControl, FieldError, FieldKind};
pub use panel::{GadgetPanel, PanelError, UploadState};
pub use store::{ParameterStore, SelectionSet};
