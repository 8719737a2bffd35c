// Appointment booking widget: availability, slot choice, customer details, booking

pub mod api_client;
pub mod booking_form;
pub mod driver;
pub mod error;
pub mod model;
pub mod session;
pub mod slot_picker;
pub mod view;

// Re-export key types for convenience
pub use api_client::{ApiClient, ClientConfig, ClientStats, HttpApiClient};
pub use booking_form::{BookingForm, FormView};
pub use driver::{mount, SessionDriver, SessionHandle};
pub use error::{ApiError, BookingError, ClientError, ValidationError};
pub use model::{
    AvailabilityQuery, BookingDraft, BookingPayload, BookingResult, DraftField, ServiceId,
    ServiceSummary, Slot, SlotId,
};
pub use session::{BookingSession, Effect, Event, EventSink, Phase, SessionState};
pub use slot_picker::{SlotPicker, SlotPickerView};
pub use view::{render, WidgetView};
