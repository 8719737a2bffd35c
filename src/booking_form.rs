// Booking form: collects customer details for the selected slot

use crate::error::ValidationError;
use crate::model::{BookingDraft, DraftField};
use crate::session::{Event, EventSink, Phase, SessionState};
use crate::slot_picker::slot_label;
use tracing::debug;

pub const SUBMIT_LABEL: &str = "Confirm Booking";
pub const SUBMITTING_LABEL: &str = "Booking...";

/// Presence gate applied before anything leaves the widget.
///
/// The backend stays authoritative for email format and slot conflicts;
/// this only rejects drafts that cannot possibly be booked.
pub fn validate(draft: &BookingDraft) -> Result<(), ValidationError> {
    if draft.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    let email = draft.email.trim();
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if !email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub slot_label: String,
    pub draft: BookingDraft,
    pub submitting: bool,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
    // Backend or validation message shown above the form
    pub error: Option<String>,
}

pub struct BookingForm;

impl BookingForm {
    // Only rendered while a slot is selected or its booking is in flight
    pub fn view(state: &SessionState) -> Option<FormView> {
        let submitting = match state.phase {
            Phase::SlotSelected => false,
            Phase::Submitting => true,
            _ => return None,
        };
        let slot = state.selected_slot.as_ref()?;
        let draft = state.draft.clone()?;

        let error = state
            .validation_error
            .map(|e| e.to_string())
            .or_else(|| state.submit_error().map(str::to_string));

        Some(FormView {
            slot_label: slot_label(slot),
            draft,
            submitting,
            submit_enabled: !submitting,
            submit_label: if submitting { SUBMITTING_LABEL } else { SUBMIT_LABEL },
            error,
        })
    }

    pub fn edit(field: DraftField, value: impl Into<String>, sink: &impl EventSink) {
        sink.emit(Event::DraftEdited {
            field,
            value: value.into(),
        });
    }

    /// Emits a submission unless the trigger is disabled or the draft fails
    /// the local gate. Returns whether anything was emitted.
    pub fn submit(view: &FormView, sink: &impl EventSink) -> Result<bool, ValidationError> {
        if !view.submit_enabled {
            debug!("submit trigger disabled while a booking is in flight");
            return Ok(false);
        }
        validate(&view.draft)?;
        sink.emit(Event::SubmitRequested);
        Ok(true)
    }

    pub fn cancel(sink: &impl EventSink) {
        sink.emit(Event::Cancelled);
    }
}
