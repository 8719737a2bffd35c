// Rendering is a pure function of the session state

use crate::booking_form::{BookingForm, FormView};
use crate::model::BookingResult;
use crate::session::{Phase, SessionState};
use crate::slot_picker::{SlotPicker, SlotPickerView};

pub const LOADING_MESSAGE: &str = "Loading availability...";
pub const CONFIRMED_MESSAGE: &str = "Booking confirmed!";

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetView {
    Loading {
        message: String,
    },
    LoadError {
        message: String,
    },
    Slots {
        service_name: Option<String>,
        picker: SlotPickerView,
    },
    Form(FormView),
    Confirmed {
        message: String,
        reference: Option<String>,
    },
}

pub fn render(state: &SessionState, picker: &SlotPicker) -> WidgetView {
    match state.phase {
        Phase::Loading => WidgetView::Loading {
            message: LOADING_MESSAGE.to_string(),
        },
        Phase::LoadError => WidgetView::LoadError {
            message: state.error.clone().unwrap_or_default(),
        },
        Phase::Ready => slot_list(state, picker),
        Phase::SlotSelected | Phase::Submitting => match BookingForm::view(state) {
            Some(form) => WidgetView::Form(form),
            None => slot_list(state, picker),
        },
        Phase::Confirmed => {
            let confirmation = match &state.booking_result {
                Some(BookingResult::Confirmed(confirmation)) => Some(confirmation),
                _ => None,
            };
            WidgetView::Confirmed {
                message: confirmation
                    .and_then(|c| c.message.clone())
                    .unwrap_or_else(|| CONFIRMED_MESSAGE.to_string()),
                reference: confirmation.and_then(|c| c.reference.clone()),
            }
        }
    }
}

fn slot_list(state: &SessionState, picker: &SlotPicker) -> WidgetView {
    WidgetView::Slots {
        service_name: state.service.as_ref().and_then(|s| s.name.clone()),
        picker: picker.view(&state.slots),
    }
}
