//! Batch submission of the selected modes of one gadget panel.

use crate::api::ForgeApi;
use crate::error::SubmitError;
use crate::form::GadgetPanel;
use crate::model::{RecordStatus, SubmissionRecord, SubmitRequest, SubmitResponse};
use rand::RngCore;

/// Build the request for the panel's current selection without touching the network.
pub fn prepare(panel: &GadgetPanel) -> Result<SubmitRequest, SubmitError> {
    let modes = panel.selected_modes();
    if modes.is_empty() {
        return Err(SubmitError::NoModesSelected);
    }
    let errors = panel.validation_errors();
    if !errors.is_empty() {
        return Err(SubmitError::Invalid(errors));
    }
    Ok(SubmitRequest {
        gadget_id: panel.gadget.id.clone(),
        modes,
        parameters: panel.effective_params(),
    })
}

fn gen_record_id() -> String {
    let mut b = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut b);
    format!("{:016x}", u64::from_le_bytes(b))
}

/// Record an accepted submission: prepend the record, then forget the submitted modes'
/// selection, values and upload state.
pub fn apply_success(
    panel: &mut GadgetPanel,
    modes: &[String],
    response: SubmitResponse,
) -> Result<SubmissionRecord, SubmitError> {
    if response.task_ids.len() != modes.len() || response.result_dirs.len() != modes.len() {
        return Err(SubmitError::MismatchedResponse {
            modes: modes.len(),
            task_ids: response.task_ids.len(),
            result_dirs: response.result_dirs.len(),
        });
    }
    let record = SubmissionRecord {
        id: gen_record_id(),
        timestamp: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        gadget_id: panel.gadget.id.clone(),
        modes: modes.to_vec(),
        task_ids: response.task_ids,
        result_dirs: response.result_dirs,
        status: RecordStatus::Submitted,
    };
    panel.records.insert(0, record.clone());

    let ids = modes.iter().map(String::as_str);
    panel.selection.clear(ids.clone());
    panel.params.clear(ids);
    panel.uploads.retain(|(mode, _), _| !modes.contains(mode));
    tracing::info!(
        gadget = %record.gadget_id,
        tasks = record.task_ids.len(),
        "submission accepted"
    );
    Ok(record)
}

/// Validate, send, and record. On any error the panel is left as it was.
pub async fn submit(api: &dyn ForgeApi, panel: &mut GadgetPanel) -> Result<SubmissionRecord, SubmitError> {
    let request = prepare(panel)?;
    panel.submitting = true;
    let result = api.submit_task(&request).await;
    panel.submitting = false;
    apply_success(panel, &request.modes, result?)
}
