// Booking session: the state machine behind one mounted widget
// Events go in, network effects come out; nothing here performs I/O

use crate::booking_form;
use crate::error::{ApiError, BookingError, ValidationError};
use crate::model::{
    Availability, AvailabilityQuery, BookingConfirmation, BookingDraft, BookingPayload,
    BookingResult, DraftField, ServiceSummary, Slot,
};
use serde_json::Value;
use tracing::{debug, info, warn};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load availability. Please try again.";
pub const BOOKING_FAILED_MESSAGE: &str = "Booking failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    LoadError,
    SlotSelected,
    Submitting,
    Confirmed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        self == Phase::Confirmed
    }
}

/// Everything the widget renders from.
///
/// Invariants: no draft without a selected slot, and `Confirmed` always
/// carries a successful `booking_result`. A failed submission is not a
/// separate resting phase: it returns to `SlotSelected` with a failed
/// `booking_result` and the draft untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub slots: Vec<Slot>,
    pub service: Option<ServiceSummary>,
    pub selected_slot: Option<Slot>,
    pub draft: Option<BookingDraft>,
    pub booking_result: Option<BookingResult>,
    // Availability load failure shown to the user
    pub error: Option<String>,
    pub validation_error: Option<ValidationError>,
}

impl SessionState {
    pub fn loading() -> Self {
        Self {
            phase: Phase::Loading,
            slots: Vec::new(),
            service: None,
            selected_slot: None,
            draft: None,
            booking_result: None,
            error: None,
            validation_error: None,
        }
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.booking_result
            .as_ref()
            .and_then(BookingResult::error_message)
    }

    pub fn reference(&self) -> Option<&str> {
        self.booking_result.as_ref().and_then(BookingResult::reference)
    }

    fn clear_selection(&mut self) {
        self.selected_slot = None;
        self.draft = None;
        self.booking_result = None;
        self.validation_error = None;
    }
}

#[derive(Debug)]
pub enum Event {
    AvailabilityLoaded(Result<Value, ApiError>),
    SlotChosen(usize),
    DraftEdited { field: DraftField, value: String },
    SubmitRequested,
    Cancelled,
    RefreshRequested,
    BookingCompleted(Result<Value, ApiError>),
}

// Network work the session asks its driver to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchAvailability(AvailabilityQuery),
    SubmitBooking(BookingPayload),
}

// Anything that can feed UI events into a session
pub trait EventSink {
    fn emit(&self, event: Event);
}

pub struct BookingSession {
    query: AvailabilityQuery,
    state: SessionState,
}

impl BookingSession {
    // A session starts out loading; the returned effect is its first request
    pub fn new(query: AvailabilityQuery) -> (Self, Effect) {
        let session = Self {
            query,
            state: SessionState::loading(),
        };
        let effect = Effect::FetchAvailability(session.query.clone());
        (session, effect)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn query(&self) -> &AvailabilityQuery {
        &self.query
    }

    pub fn handle(&mut self, event: Event) -> Option<Effect> {
        let before = self.state.phase;
        let effect = match event {
            Event::AvailabilityLoaded(result) => {
                self.on_availability(result);
                None
            }
            Event::SlotChosen(index) => {
                self.on_slot_chosen(index);
                None
            }
            Event::DraftEdited { field, value } => {
                self.on_draft_edited(field, value);
                None
            }
            Event::SubmitRequested => self.on_submit(),
            Event::Cancelled => {
                self.on_cancel();
                None
            }
            Event::RefreshRequested => self.on_refresh(),
            Event::BookingCompleted(result) => {
                self.on_booking_completed(result);
                None
            }
        };

        if before != self.state.phase {
            debug!(from = ?before, to = ?self.state.phase, "session transition");
        }
        effect
    }

    fn on_availability(&mut self, result: Result<Value, ApiError>) {
        if self.state.phase != Phase::Loading {
            debug!(phase = ?self.state.phase, "ignoring stale availability response");
            return;
        }

        let decoded = result
            .map_err(BookingError::from)
            .and_then(Availability::from_response);

        match decoded {
            Ok(availability) => {
                info!(
                    service_id = %self.query.service_id,
                    slots = availability.slots.len(),
                    "availability loaded"
                );
                self.state.slots = availability.slots;
                self.state.service = availability.service;
                self.state.error = None;
                self.state.phase = Phase::Ready;
            }
            Err(err) => {
                warn!(service_id = %self.query.service_id, error = %err, "availability load failed");
                self.state.slots.clear();
                self.state.error = Some(err.user_message(LOAD_FAILED_MESSAGE));
                self.state.phase = Phase::LoadError;
            }
        }
    }

    fn on_slot_chosen(&mut self, index: usize) {
        if !matches!(self.state.phase, Phase::Ready | Phase::SlotSelected) {
            debug!(phase = ?self.state.phase, "slot choice not accepted now");
            return;
        }
        let Some(slot) = self.state.slots.get(index).cloned() else {
            warn!(index, "chosen slot is not in the list");
            return;
        };

        self.state.clear_selection();
        self.state.selected_slot = Some(slot);
        self.state.draft = Some(BookingDraft::default());
        self.state.phase = Phase::SlotSelected;
    }

    fn on_draft_edited(&mut self, field: DraftField, value: String) {
        if self.state.phase != Phase::SlotSelected {
            return;
        }
        if let Some(draft) = self.state.draft.as_mut() {
            draft.set(field, value);
            self.state.validation_error = None;
        }
    }

    fn on_submit(&mut self) -> Option<Effect> {
        match self.state.phase {
            Phase::SlotSelected => {}
            Phase::Submitting => {
                debug!("ignoring re-entrant submit while a booking is in flight");
                return None;
            }
            other => {
                debug!(phase = ?other, "submit not accepted now");
                return None;
            }
        }

        let (slot, draft) = match (&self.state.selected_slot, &self.state.draft) {
            (Some(slot), Some(draft)) => (slot, draft),
            _ => return None,
        };

        if let Err(err) = booking_form::validate(draft) {
            debug!(error = %err, "draft rejected locally");
            self.state.validation_error = Some(err);
            return None;
        }

        let payload = BookingPayload::new(&self.query.service_id, slot, draft);
        self.state.validation_error = None;
        self.state.booking_result = None;
        self.state.phase = Phase::Submitting;
        Some(Effect::SubmitBooking(payload))
    }

    fn on_cancel(&mut self) {
        if self.state.phase != Phase::SlotSelected {
            debug!(phase = ?self.state.phase, "cancel not accepted now");
            return;
        }
        self.state.clear_selection();
        self.state.phase = Phase::Ready;
    }

    fn on_refresh(&mut self) -> Option<Effect> {
        // Loading and Submitting already have a call outstanding
        if !matches!(
            self.state.phase,
            Phase::Ready | Phase::LoadError | Phase::SlotSelected
        ) {
            debug!(phase = ?self.state.phase, "refresh not accepted now");
            return None;
        }
        self.state.clear_selection();
        self.state.error = None;
        self.state.phase = Phase::Loading;
        Some(Effect::FetchAvailability(self.query.clone()))
    }

    fn on_booking_completed(&mut self, result: Result<Value, ApiError>) {
        if self.state.phase != Phase::Submitting {
            debug!(phase = ?self.state.phase, "ignoring stale booking response");
            return;
        }

        let decoded = result
            .map_err(BookingError::from)
            .and_then(|value| BookingConfirmation::from_response(&value));

        match decoded {
            Ok(confirmation) => {
                info!(reference = ?confirmation.reference, "booking confirmed");
                self.state.draft = None;
                self.state.booking_result = Some(BookingResult::Confirmed(confirmation));
                self.state.phase = Phase::Confirmed;
            }
            Err(err) => {
                warn!(error = %err, "booking submission failed");
                self.state.booking_result = Some(BookingResult::Failed {
                    message: err.user_message(BOOKING_FAILED_MESSAGE),
                });
                self.state.phase = Phase::SlotSelected;
            }
        }
    }
}
