// Runs a booking session against an injected API client
//
// UI events and network completions share one queue and are handled by a
// single loop, so at most one transition happens at a time. Network calls run
// on spawned tasks and report back through the same queue.

use crate::api_client::ApiClient;
use crate::model::AvailabilityQuery;
use crate::session::{BookingSession, Effect, Event, EventSink, SessionState};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::debug;

// Cloneable handle the UI uses to talk to a mounted session
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<Event>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    // False once the session has finished
    pub fn send(&self, event: Event) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Wait until the published state satisfies `predicate`.
    ///
    /// Returns `None` if the session ended without ever reaching it.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&SessionState) -> bool,
    ) -> Option<SessionState> {
        self.state
            .wait_for(|state| predicate(state))
            .await
            .ok()
            .map(|state| state.clone())
    }
}

impl EventSink for SessionHandle {
    fn emit(&self, event: Event) {
        if !self.send(event) {
            debug!("event dropped, session has finished");
        }
    }
}

pub struct SessionDriver<C: ApiClient> {
    client: Arc<C>,
    session: BookingSession,
    pending: Option<Effect>,
    events: mpsc::UnboundedReceiver<Event>,
    // Weak so the loop ends once every handle is gone and nothing is in flight
    completions: mpsc::WeakUnboundedSender<Event>,
    state: watch::Sender<SessionState>,
}

/// Mount a session: the returned driver must be run (usually spawned) for
/// anything to happen. Availability is requested as soon as it starts.
pub fn mount<C: ApiClient>(
    client: Arc<C>,
    query: AvailabilityQuery,
) -> (SessionDriver<C>, SessionHandle) {
    let (session, first) = BookingSession::new(query);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(session.state().clone());

    let driver = SessionDriver {
        client,
        session,
        pending: Some(first),
        events: events_rx,
        completions: events_tx.downgrade(),
        state: state_tx,
    };
    let handle = SessionHandle {
        events: events_tx,
        state: state_rx,
    };
    (driver, handle)
}

impl<C: ApiClient> SessionDriver<C> {
    // Process events until the booking is confirmed or the widget is dropped
    pub async fn run(mut self) -> SessionState {
        debug!(service_id = %self.session.query().service_id, "session mounted");
        if let Some(effect) = self.pending.take() {
            self.execute(effect);
        }

        while let Some(event) = self.events.recv().await {
            if let Some(effect) = self.session.handle(event) {
                self.execute(effect);
            }
            self.state.send_replace(self.session.state().clone());

            if self.session.state().phase.is_terminal() {
                break;
            }
        }

        debug!(phase = ?self.session.state().phase, "session finished");
        self.session.state().clone()
    }

    fn execute(&self, effect: Effect) {
        let Some(reply) = self.completions.upgrade() else {
            debug!("widget unmounted, skipping request");
            return;
        };
        let client = Arc::clone(&self.client);

        tokio::spawn(async move {
            let event = match effect {
                Effect::FetchAvailability(query) => {
                    Event::AvailabilityLoaded(client.fetch_availability(&query).await)
                }
                Effect::SubmitBooking(payload) => {
                    Event::BookingCompleted(client.submit_booking(&payload).await)
                }
            };
            // Receiver is gone only if the session already finished
            let _ = reply.send(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::mock_client::ScriptedClient;
    use crate::booking_form::BookingForm;
    use crate::error::ApiError;
    use crate::model::{DraftField, ServiceId, SlotId};
    use crate::session::{Phase, BOOKING_FAILED_MESSAGE, LOAD_FAILED_MESSAGE};
    use crate::slot_picker::SlotPicker;
    use serde_json::json;

    fn query() -> AvailabilityQuery {
        AvailabilityQuery::new(ServiceId::new("9").unwrap())
    }

    fn two_slots() -> serde_json::Value {
        json!({"slots": [
            {"id": 1, "start": "2025-06-02T09:00:00", "end": "2025-06-02T09:30:00"},
            {"start": "2025-06-02T10:00:00", "end": "2025-06-02T10:30:00"}
        ]})
    }

    fn fill_draft(handle: &SessionHandle) {
        BookingForm::edit(DraftField::Name, "Ada", handle);
        BookingForm::edit(DraftField::Email, "ada@example.com", handle);
    }

    #[tokio::test]
    async fn test_mount_loads_availability() {
        let client = Arc::new(ScriptedClient::new());
        client.push_availability(Ok(two_slots()));

        let (driver, mut handle) = mount(client.clone(), query());
        assert_eq!(handle.state().phase, Phase::Loading);
        tokio::spawn(driver.run());

        let state = handle.wait_for(|s| s.phase == Phase::Ready).await.unwrap();
        assert_eq!(state.slots.len(), 2);
        assert_eq!(state.slots[0].id, Some(SlotId::from(1)));
        assert_eq!(state.slots[1].id, None);
        assert_eq!(client.availability_calls(), 1);
    }

    #[tokio::test]
    async fn test_double_submit_books_once() {
        let client = Arc::new(ScriptedClient::gated());
        client
            .push_availability(Ok(two_slots()))
            .push_booking(Ok(json!({"success": true, "reference": "R1"})));

        let (driver, mut handle) = mount(client.clone(), query());
        let task = tokio::spawn(driver.run());

        let state = handle.wait_for(|s| s.phase == Phase::Ready).await.unwrap();
        let mut picker = SlotPicker::new();
        assert!(picker.choose(&state.slots, 1, &handle));
        fill_draft(&handle);
        handle.emit(Event::SubmitRequested);

        handle
            .wait_for(|s| s.phase == Phase::Submitting)
            .await
            .unwrap();
        // Double click lands while the first request is still outstanding
        handle.emit(Event::SubmitRequested);
        client.release_booking();

        let final_state = task.await.unwrap();
        assert_eq!(final_state.phase, Phase::Confirmed);
        assert_eq!(final_state.reference(), Some("R1"));
        assert_eq!(client.booking_calls(), 1);

        let payloads = client.payloads.lock();
        assert_eq!(payloads[0].slot_id, None);
        assert_eq!(payloads[0].start, "2025-06-02T10:00:00");
        assert_eq!(payloads[0].end, "2025-06-02T10:30:00");
    }

    #[tokio::test]
    async fn test_failed_submit_can_be_retried() {
        let client = Arc::new(ScriptedClient::new());
        client
            .push_availability(Ok(two_slots()))
            .push_booking(Ok(json!({"success": false, "error": "slot taken"})))
            .push_booking(Err(ApiError::NetworkError("timed out".to_string())))
            .push_booking(Ok(json!({"success": true, "id": 42})));

        let (driver, mut handle) = mount(client.clone(), query());
        let task = tokio::spawn(driver.run());
        handle.wait_for(|s| s.phase == Phase::Ready).await.unwrap();

        handle.emit(Event::SlotChosen(0));
        fill_draft(&handle);
        handle.emit(Event::SubmitRequested);

        let state = handle
            .wait_for(|s| s.submit_error().is_some())
            .await
            .unwrap();
        assert_eq!(state.phase, Phase::SlotSelected);
        assert_eq!(state.submit_error(), Some("slot taken"));
        assert_eq!(state.draft.as_ref().unwrap().name, "Ada");

        handle.emit(Event::SubmitRequested);
        let state = handle
            .wait_for(|s| s.submit_error() == Some(BOOKING_FAILED_MESSAGE))
            .await
            .unwrap();
        assert_eq!(state.draft.as_ref().unwrap().email, "ada@example.com");

        handle.emit(Event::SubmitRequested);
        let final_state = task.await.unwrap();
        assert_eq!(final_state.phase, Phase::Confirmed);
        assert_eq!(final_state.reference(), Some("42"));
        assert_eq!(client.booking_calls(), 3);
    }

    #[tokio::test]
    async fn test_load_failure_then_refresh() {
        let client = Arc::new(ScriptedClient::new());
        client
            .push_availability(Err(ApiError::NetworkError("connection refused".to_string())))
            .push_availability(Ok(json!({"slots": []})));

        let (driver, mut handle) = mount(client.clone(), query());
        tokio::spawn(driver.run());

        let state = handle
            .wait_for(|s| s.phase == Phase::LoadError)
            .await
            .unwrap();
        assert_eq!(state.error.as_deref(), Some(LOAD_FAILED_MESSAGE));

        handle.emit(Event::RefreshRequested);
        let state = handle.wait_for(|s| s.phase == Phase::Ready).await.unwrap();
        assert!(state.slots.is_empty());
        assert!(state.error.is_none());
        assert_eq!(client.availability_calls(), 2);
    }

    #[tokio::test]
    async fn test_dropping_handles_ends_session() {
        let client = Arc::new(ScriptedClient::new());
        client.push_availability(Ok(two_slots()));

        let (driver, mut handle) = mount(client.clone(), query());
        let task = tokio::spawn(driver.run());
        handle.wait_for(|s| s.phase == Phase::Ready).await.unwrap();
        drop(handle);

        let final_state = task.await.unwrap();
        assert_eq!(final_state.phase, Phase::Ready);
        assert_eq!(client.booking_calls(), 0);
    }
}
