// Data model shared by the API client, the picker, the form and the session

use crate::error::{BookingError, ClientError};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;
use tracing::warn;

/// Identifier of the service whose availability is shown. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Result<Self, ClientError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(ClientError::ConfigError(
                "service id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// The booking endpoint parses an integer, so numeric ids travel as numbers
impl Serialize for ServiceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Only ids that read back identically, so "007" stays a string
        match self.0.parse::<i64>() {
            Ok(numeric) if numeric.to_string() == self.0 => serializer.serialize_i64(numeric),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

// Opaque slot identifier, backends send either numbers or strings
// Numbers are kept as sent, floats and ids beyond i64 included
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SlotId {
    Number(Number),
    Text(String),
}

impl From<i64> for SlotId {
    fn from(id: i64) -> Self {
        SlotId::Number(Number::from(id))
    }
}

impl SlotId {
    fn is_blank(&self) -> bool {
        matches!(self, SlotId::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Number(n) => write!(f, "{}", n),
            SlotId::Text(s) => f.write_str(s),
        }
    }
}

/// An offered appointment window, immutable once received.
///
/// `start`/`end` are kept exactly as the backend sent them so they can be
/// forwarded verbatim when booking a slot that has no `id`. A missing
/// `capacity` means unlimited; it is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Slot {
    #[serde(default)]
    pub id: Option<SlotId>,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub start_display: Option<String>,
    #[serde(default)]
    pub end_display: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

// Service details the availability endpoint sends alongside the slots
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSummary {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub duration: Option<f64>,
    pub price: Option<f64>,
    pub currency: Option<String>,
}

// Parameters of one availability request
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityQuery {
    pub service_id: ServiceId,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub timezone: Option<String>,
}

impl AvailabilityQuery {
    pub fn new(service_id: ServiceId) -> Self {
        Self {
            service_id,
            date_from: None,
            date_to: None,
            timezone: None,
        }
    }

    pub fn with_window(mut self, date_from: impl Into<String>, date_to: impl Into<String>) -> Self {
        self.date_from = Some(date_from.into());
        self.date_to = Some(date_to.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("service_id", self.service_id.to_string())];
        if let Some(from) = &self.date_from {
            pairs.push(("date_from", from.clone()));
        }
        if let Some(to) = &self.date_to {
            pairs.push(("date_to", to.clone()));
        }
        if let Some(tz) = &self.timezone {
            pairs.push(("timezone", tz.clone()));
        }
        pairs
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityBody {
    #[serde(default)]
    slots: Option<Vec<Slot>>,
    #[serde(default)]
    service: Option<Value>,
}

// Decoded, successful availability response
#[derive(Debug, Clone, PartialEq)]
pub struct Availability {
    pub slots: Vec<Slot>,
    pub service: Option<ServiceSummary>,
}

impl Availability {
    /// Interpret a raw availability body.
    ///
    /// An `error` field wins over everything else, whatever the HTTP status
    /// was. A body without `error` and without slots is a valid, empty
    /// availability. Slots keep the order the backend sent them in.
    pub fn from_response(value: Value) -> Result<Self, BookingError> {
        if !is_truthy(&value) || !value.is_object() {
            warn!(body = %value, "availability response is not an object");
            return Err(BookingError::Backend(None));
        }

        if let Some(error) = value.get("error").filter(|e| is_truthy(e)) {
            return Err(BookingError::Backend(Some(message_text(error))));
        }

        let body: AvailabilityBody = serde_json::from_value(value).map_err(|e| {
            warn!(error = %e, "availability response is malformed");
            BookingError::Backend(None)
        })?;

        let service = body
            .service
            .and_then(|raw| serde_json::from_value::<ServiceSummary>(raw).ok());

        Ok(Self {
            slots: body.slots.unwrap_or_default(),
            service,
        })
    }
}

// Which form field an edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Name,
    Email,
    Phone,
    Notes,
}

/// Customer input bound to the selected slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookingDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

impl BookingDraft {
    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        match field {
            DraftField::Name => self.name = value,
            DraftField::Email => self.email = value,
            DraftField::Phone => self.phone = value,
            DraftField::Notes => self.notes = value,
        }
    }

    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::Name => &self.name,
            DraftField::Email => &self.email,
            DraftField::Phone => &self.phone,
            DraftField::Notes => &self.notes,
        }
    }
}

/// Body of `POST /api/appointments/book`.
///
/// `slot_id` is always present on the wire (as `null` for ad hoc windows);
/// blank optional fields are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingPayload {
    pub service_id: ServiceId,
    pub slot_id: Option<SlotId>,
    pub start: String,
    pub end: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookingPayload {
    pub fn new(service_id: &ServiceId, slot: &Slot, draft: &BookingDraft) -> Self {
        Self {
            service_id: service_id.clone(),
            slot_id: slot.id.clone().filter(|id| !id.is_blank()),
            start: slot.start.clone(),
            end: slot.end.clone(),
            customer_name: draft.name.trim().to_string(),
            customer_email: draft.email.trim().to_string(),
            customer_phone: non_blank(&draft.phone),
            notes: non_blank(&draft.notes),
        }
    }
}

// What a successful booking response carried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfirmation {
    pub reference: Option<String>,
    pub message: Option<String>,
}

impl BookingConfirmation {
    /// Interpret a raw booking body. Only a truthy `success` confirms; any
    /// other shape is a failure, carrying the backend's `error` if it sent one.
    pub fn from_response(value: &Value) -> Result<Self, BookingError> {
        let success = value.get("success").map_or(false, is_truthy);
        if !success {
            let message = value
                .get("error")
                .filter(|e| is_truthy(e))
                .map(message_text);
            return Err(BookingError::Backend(message));
        }

        // Prefer the human reference, fall back to the raw identifier
        let reference = ["reference", "id"]
            .iter()
            .filter_map(|key| value.get(*key))
            .find(|v| is_truthy(v))
            .map(message_text);

        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self { reference, message })
    }
}

/// Outcome of one submission attempt. Exactly one branch is ever populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingResult {
    Confirmed(BookingConfirmation),
    Failed { message: String },
}

impl BookingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BookingResult::Confirmed(_))
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            BookingResult::Confirmed(confirmation) => confirmation.reference.as_deref(),
            BookingResult::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            BookingResult::Failed { message } => Some(message),
            BookingResult::Confirmed(_) => None,
        }
    }
}

// JSON truthiness as the backend contract uses it
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
