//! State for one gadget's form: selection, values, submissions and uploads.

use super::field::{effective_value, interpret, validate, FieldControl, FieldError};
use super::store::{ParameterStore, SelectionSet};
use crate::model::{Gadget, Mode, ParamValue, ParameterSet, SubmissionRecord};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    InProgress { percent: u8 },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("gadget {gadget} has no mode {mode}")]
    UnknownMode { gadget: String, mode: String },
    #[error("mode {mode} has no field {field}")]
    UnknownField { mode: String, field: String },
    #[error("an upload for {field} is already running")]
    UploadInFlight { field: String },
}

/// Everything the operator has typed into one gadget's form. Owned by exactly one view.
#[derive(Debug, Clone)]
pub struct GadgetPanel {
    pub gadget: Gadget,
    pub selection: SelectionSet,
    pub params: ParameterStore,
    /// Newest first.
    pub records: Vec<SubmissionRecord>,
    pub uploads: BTreeMap<(String, String), UploadState>,
    pub submitting: bool,
}

impl GadgetPanel {
    pub fn new(gadget: Gadget) -> Self {
        Self {
            gadget,
            selection: SelectionSet::default(),
            params: ParameterStore::default(),
            records: Vec::new(),
            uploads: BTreeMap::new(),
            submitting: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.gadget.id
    }

    fn mode(&self, mode_id: &str) -> Result<&Mode, PanelError> {
        self.gadget.mode(mode_id).ok_or_else(|| PanelError::UnknownMode {
            gadget: self.gadget.id.clone(),
            mode: mode_id.to_string(),
        })
    }

    fn check_field(&self, mode_id: &str, field: &str) -> Result<(), PanelError> {
        match self.mode(mode_id)?.field(field) {
            Some(_) => Ok(()),
            None => Err(PanelError::UnknownField {
                mode: mode_id.to_string(),
                field: field.to_string(),
            }),
        }
    }

    pub fn toggle_mode(&mut self, mode_id: &str) -> Result<(), PanelError> {
        self.mode(mode_id)?;
        self.selection.toggle(mode_id);
        Ok(())
    }

    pub fn set_param(&mut self, mode_id: &str, field: &str, value: ParamValue) -> Result<(), PanelError> {
        self.check_field(mode_id, field)?;
        self.params.set(mode_id, field, value);
        Ok(())
    }

    /// Multiselect toggle, seeded from the declared default when nothing is stored.
    pub fn toggle_option(&mut self, mode_id: &str, field: &str, value: &str) -> Result<(), PanelError> {
        self.check_field(mode_id, field)?;
        let current = match self.effective(mode_id, field) {
            Some(ParamValue::Multi(set)) => set,
            _ => BTreeSet::new(),
        };
        self.params.toggle_option(mode_id, field, value, &current);
        Ok(())
    }

    /// Value the field shows, defaults included.
    pub fn effective(&self, mode_id: &str, field: &str) -> Option<ParamValue> {
        let spec = self.gadget.mode(mode_id)?.field(field)?;
        Some(effective_value(spec, self.params.get(mode_id, field)))
    }

    /// Selected modes in the gadget's declaration order.
    pub fn selected_modes(&self) -> Vec<String> {
        self.gadget
            .modes
            .iter()
            .filter(|m| self.selection.contains(&m.id))
            .map(|m| m.id.clone())
            .collect()
    }

    pub fn field_controls(&self, mode_id: &str) -> Vec<FieldControl> {
        let Some(mode) = self.gadget.mode(mode_id) else {
            return Vec::new();
        };
        mode.form_schema
            .iter()
            .map(|f| interpret(&f.name, &f.spec, self.params.get(mode_id, &f.name)))
            .collect()
    }

    /// Validation failures across the selected modes, prefixed with the mode name.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for mode in self.gadget.modes.iter().filter(|m| self.selection.contains(&m.id)) {
            for f in &mode.form_schema {
                if let Err(e) = validate(&f.name, &f.spec, self.params.get(&mode.id, &f.name)) {
                    errors.push(format!("{}: {e}", mode.name));
                }
            }
        }
        errors
    }

    pub fn field_error(&self, mode_id: &str, field: &str) -> Option<FieldError> {
        let spec = self.gadget.mode(mode_id)?.field(field)?;
        validate(field, spec, self.params.get(mode_id, field)).err()
    }

    /// Parameter sub-tree for the selected modes with defaults filled in and empty values
    /// left out, which is what the server receives.
    pub fn effective_params(&self) -> ParameterSet {
        let selected = self.selected_modes();
        let stored = self.params.subset(selected.iter().map(String::as_str));
        let mut out = ParameterSet::new();
        for mode in self.gadget.modes.iter().filter(|m| selected.contains(&m.id)) {
            let mode_values = stored.get(&mode.id);
            let values: BTreeMap<String, ParamValue> = mode
                .form_schema
                .iter()
                .map(|f| {
                    let value = effective_value(&f.spec, mode_values.and_then(|v| v.get(&f.name)));
                    (f.name.clone(), value)
                })
                .filter(|(_, v)| !v.is_empty())
                .collect();
            if !values.is_empty() {
                out.insert(mode.id.clone(), values);
            }
        }
        out
    }

    /// Mark a file field as uploading. The stored reference, if any, stays until the new
    /// upload finishes.
    pub fn begin_upload(&mut self, mode_id: &str, field: &str) -> Result<(), PanelError> {
        self.check_field(mode_id, field)?;
        let key = (mode_id.to_string(), field.to_string());
        if let Some(UploadState::InProgress { .. }) = self.uploads.get(&key) {
            return Err(PanelError::UploadInFlight {
                field: field.to_string(),
            });
        }
        self.uploads.insert(key, UploadState::InProgress { percent: 0 });
        Ok(())
    }

    /// Progress never goes backwards.
    pub fn upload_progress(&mut self, mode_id: &str, field: &str, percent: u8) {
        let key = (mode_id.to_string(), field.to_string());
        if let Some(UploadState::InProgress { percent: current }) = self.uploads.get_mut(&key) {
            *current = (*current).max(percent.min(100));
        }
    }

    pub fn finish_upload(&mut self, mode_id: &str, field: &str, reference: crate::model::FileRef) {
        self.uploads.remove(&(mode_id.to_string(), field.to_string()));
        if self.check_field(mode_id, field).is_ok() {
            self.params.set(mode_id, field, ParamValue::File(reference));
        }
    }

    pub fn fail_upload(&mut self, mode_id: &str, field: &str, message: String) {
        self.uploads
            .insert((mode_id.to_string(), field.to_string()), UploadState::Failed(message));
    }

    pub fn upload_state(&self, mode_id: &str, field: &str) -> Option<&UploadState> {
        self.uploads.get(&(mode_id.to_string(), field.to_string()))
    }

    pub fn uploads_in_flight(&self) -> usize {
        self.uploads
            .values()
            .filter(|s| matches!(s, UploadState::InProgress { .. }))
            .count()
    }
}
