//! Field schema interpretation.
//!
//! Maps a server-declared [`FieldSpec`] plus the stored value to a control description
//! and a validation verdict. Pure: all mutation goes through the parameter store.

use crate::model::{DefaultValue, FieldOption, FieldSpec, FileRef, ParamValue};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Select,
    MultiSelect,
    File,
}

impl FieldKind {
    /// Unrecognized kinds (the server also says `"string"`) behave like `Text`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "textarea" => FieldKind::TextArea,
            "select" => FieldKind::Select,
            "multiselect" => FieldKind::MultiSelect,
            "file" => FieldKind::File,
            _ => FieldKind::Text,
        }
    }

    pub fn of(spec: &FieldSpec) -> Self {
        Self::from_wire(&spec.field_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{label} is required")]
    Required { label: String },
    #[error("{label}: '{value}' is not one of the offered options")]
    NotAnOption { label: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

/// What to draw for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlInput {
    Line(String),
    Block(String),
    Choice {
        selected: Option<String>,
        options: Vec<FieldOption>,
    },
    Checklist(Vec<ChecklistItem>),
    Upload {
        reference: Option<FileRef>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldControl {
    pub name: String,
    pub kind: FieldKind,
    pub label: String,
    pub placeholder: String,
    pub description: Option<String>,
    pub required: bool,
    pub input: ControlInput,
}

fn options(spec: &FieldSpec) -> &[FieldOption] {
    spec.options.as_deref().unwrap_or(&[])
}

fn label(name: &str, spec: &FieldSpec) -> String {
    if spec.label.trim().is_empty() {
        name.to_string()
    } else {
        spec.label.clone()
    }
}

fn stored_text(stored: Option<&ParamValue>) -> &str {
    match stored {
        Some(ParamValue::Text(s)) => s,
        _ => "",
    }
}

/// The value a field currently shows: the stored value, or the declared default for
/// select/multiselect when nothing has been stored yet.
pub fn effective_value(spec: &FieldSpec, stored: Option<&ParamValue>) -> ParamValue {
    match FieldKind::of(spec) {
        FieldKind::Text | FieldKind::TextArea => ParamValue::Text(stored_text(stored).to_string()),
        FieldKind::Select => {
            let current = stored_text(stored);
            if !current.is_empty() {
                return ParamValue::Text(current.to_string());
            }
            match &spec.default {
                Some(DefaultValue::One(d)) => ParamValue::Text(d.clone()),
                Some(DefaultValue::Many(d)) => {
                    ParamValue::Text(d.first().cloned().unwrap_or_default())
                }
                None => ParamValue::Text(String::new()),
            }
        }
        FieldKind::MultiSelect => match (stored, &spec.default) {
            (Some(ParamValue::Multi(set)), _) => ParamValue::Multi(set.clone()),
            (_, Some(DefaultValue::Many(d))) => ParamValue::Multi(d.iter().cloned().collect()),
            (_, Some(DefaultValue::One(d))) if !d.is_empty() => {
                ParamValue::Multi(BTreeSet::from([d.clone()]))
            }
            _ => ParamValue::Multi(BTreeSet::new()),
        },
        FieldKind::File => match stored {
            Some(ParamValue::File(r)) if !r.0.is_empty() => ParamValue::File(r.clone()),
            // No completed upload yet.
            _ => ParamValue::Text(String::new()),
        },
    }
}

/// Symmetric-difference toggle of one option value within a multiselect value.
pub fn toggle_in(current: &BTreeSet<String>, value: &str) -> BTreeSet<String> {
    let mut next = current.clone();
    if !next.remove(value) {
        next.insert(value.to_string());
    }
    next
}

pub fn interpret(name: &str, spec: &FieldSpec, stored: Option<&ParamValue>) -> FieldControl {
    let kind = FieldKind::of(spec);
    let value = effective_value(spec, stored);
    let input = match (kind, value) {
        (FieldKind::TextArea, ParamValue::Text(s)) => ControlInput::Block(s),
        (FieldKind::Select, ParamValue::Text(s)) => ControlInput::Choice {
            selected: (!s.is_empty()).then_some(s),
            options: options(spec).to_vec(),
        },
        (FieldKind::MultiSelect, ParamValue::Multi(set)) => ControlInput::Checklist(
            options(spec)
                .iter()
                .map(|o| ChecklistItem {
                    value: o.value.clone(),
                    label: o.label.clone(),
                    checked: set.contains(&o.value),
                })
                .collect(),
        ),
        (FieldKind::File, ParamValue::File(r)) => ControlInput::Upload { reference: Some(r) },
        (FieldKind::File, _) => ControlInput::Upload { reference: None },
        (_, ParamValue::Text(s)) => ControlInput::Line(s),
        (_, _) => ControlInput::Line(String::new()),
    };

    FieldControl {
        name: name.to_string(),
        kind,
        label: label(name, spec),
        placeholder: spec.placeholder.clone().unwrap_or_default(),
        description: spec.description.clone(),
        required: spec.required,
        input,
    }
}

pub fn validate(name: &str, spec: &FieldSpec, stored: Option<&ParamValue>) -> Result<(), FieldError> {
    let label = label(name, spec);
    let value = effective_value(spec, stored);
    if spec.required && value.is_empty() {
        return Err(FieldError::Required { label });
    }

    let offered = options(spec);
    if offered.is_empty() {
        return Ok(());
    }
    let is_offered = |v: &str| offered.iter().any(|o| o.value == v);
    match (FieldKind::of(spec), &value) {
        (FieldKind::Select, ParamValue::Text(v)) if !v.is_empty() && !is_offered(v) => {
            Err(FieldError::NotAnOption {
                label,
                value: v.clone(),
            })
        }
        (FieldKind::MultiSelect, ParamValue::Multi(set)) => {
            match set.iter().find(|v| !is_offered(v)) {
                Some(v) => Err(FieldError::NotAnOption {
                    label,
                    value: v.clone(),
                }),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}
