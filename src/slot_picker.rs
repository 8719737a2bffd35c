// Slot picker: a pure projection of the session's slot list
// The only state it owns is which slot is highlighted, kept by value so a
// reloaded list never inherits a highlight by position

use crate::model::Slot;
use crate::session::{Event, EventSink};
use chrono::{DateTime, NaiveDateTime};
use tracing::warn;

pub const NO_SLOTS_NOTICE: &str =
    "No available slots found. Please check back later or contact us.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOption {
    pub index: usize,
    pub label: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPickerView {
    // Neutral notice, an empty list is not an error
    NoSlots { notice: String },
    Slots(Vec<SlotOption>),
}

#[derive(Debug, Default, Clone)]
pub struct SlotPicker {
    highlighted: Option<Slot>,
}

impl SlotPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlight(&mut self, slots: &[Slot], index: Option<usize>) {
        self.highlighted = index.and_then(|i| slots.get(i)).cloned();
    }

    pub fn highlighted(&self) -> Option<&Slot> {
        self.highlighted.as_ref()
    }

    pub fn view(&self, slots: &[Slot]) -> SlotPickerView {
        if slots.is_empty() {
            return SlotPickerView::NoSlots {
                notice: NO_SLOTS_NOTICE.to_string(),
            };
        }

        SlotPickerView::Slots(
            slots
                .iter()
                .enumerate()
                .map(|(index, slot)| SlotOption {
                    index,
                    label: slot_label(slot),
                    highlighted: self.highlighted.as_ref() == Some(slot),
                })
                .collect(),
        )
    }

    // Emits "slot chosen" for an entry of the list currently shown
    pub fn choose(&mut self, slots: &[Slot], index: usize, sink: &impl EventSink) -> bool {
        if index >= slots.len() {
            warn!(index, available = slots.len(), "ignoring choice outside slot list");
            return false;
        }
        self.highlighted = Some(slots[index].clone());
        sink.emit(Event::SlotChosen(index));
        true
    }
}

/// Human-readable label for a slot.
///
/// Backend display strings are used when present; otherwise the raw
/// timestamps are formatted as sent, without any timezone conversion.
pub fn slot_label(slot: &Slot) -> String {
    let start = slot
        .start_display
        .clone()
        .unwrap_or_else(|| format_timestamp(&slot.start, "%a, %b %-d, %-I:%M %p"));
    let end = slot
        .end_display
        .clone()
        .unwrap_or_else(|| format_timestamp(&slot.end, "%-I:%M %p"));

    let mut label = format!("{} — {}", start, end);
    match slot.capacity {
        Some(1) => label.push_str(" (1 spot)"),
        Some(n) if n > 1 => label.push_str(&format!(" ({} spots)", n)),
        _ => {}
    }
    label
}

fn format_timestamp(raw: &str, pattern: &str) -> String {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return with_offset.naive_local().format(pattern).to_string();
    }
    match raw.parse::<NaiveDateTime>() {
        Ok(naive) => naive.format(pattern).to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SlotId;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Event>>);

    impl EventSink for Recorder {
        fn emit(&self, event: Event) {
            self.0.borrow_mut().push(event);
        }
    }

    fn slot(start: &str, end: &str) -> Slot {
        Slot {
            id: Some(SlotId::from(1)),
            start: start.to_string(),
            end: end.to_string(),
            start_display: None,
            end_display: None,
            capacity: None,
        }
    }

    #[test]
    fn test_empty_list_shows_notice() {
        let picker = SlotPicker::new();
        assert_eq!(
            picker.view(&[]),
            SlotPickerView::NoSlots {
                notice: NO_SLOTS_NOTICE.to_string()
            }
        );
    }

    #[test]
    fn test_label_prefers_display_strings() {
        let mut s = slot("2025-06-02T09:00:00", "2025-06-02T09:30:00");
        s.start_display = Some("June 02, 2025 at 09:00 AM".to_string());
        s.end_display = Some("09:30 AM".to_string());
        s.capacity = Some(4);
        assert_eq!(slot_label(&s), "June 02, 2025 at 09:00 AM — 09:30 AM (4 spots)");
    }

    #[test]
    fn test_label_formats_raw_timestamps() {
        let s = slot("2025-06-02T09:00:00", "2025-06-02T09:30:00+02:00");
        assert_eq!(slot_label(&s), "Mon, Jun 2, 9:00 AM — 9:30 AM");
    }

    #[test]
    fn test_label_keeps_unparseable_values() {
        let mut s = slot("tomorrow morning", "noon");
        s.capacity = Some(0);
        assert_eq!(slot_label(&s), "tomorrow morning — noon");
    }

    #[test]
    fn test_choose_emits_and_highlights() {
        let slots = vec![
            slot("2025-06-02T09:00:00", "2025-06-02T09:30:00"),
            slot("2025-06-02T10:00:00", "2025-06-02T10:30:00"),
        ];
        let recorder = Recorder::default();
        let mut picker = SlotPicker::new();

        assert!(picker.choose(&slots, 1, &recorder));
        assert!(!picker.choose(&slots, 5, &recorder));

        let events = recorder.0.borrow();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::SlotChosen(1)));

        match picker.view(&slots) {
            SlotPickerView::Slots(options) => {
                assert!(!options[0].highlighted);
                assert!(options[1].highlighted);
            }
            other => panic!("expected slot list, got {:?}", other),
        }
    }

    #[test]
    fn test_highlight_does_not_survive_reload() {
        let before = vec![
            slot("2025-06-02T09:00:00", "2025-06-02T09:30:00"),
            slot("2025-06-02T10:00:00", "2025-06-02T10:30:00"),
        ];
        let after = vec![
            slot("2025-06-03T09:00:00", "2025-06-03T09:30:00"),
            slot("2025-06-03T10:00:00", "2025-06-03T10:30:00"),
        ];
        let mut picker = SlotPicker::new();
        picker.highlight(&before, Some(1));
        assert_eq!(picker.highlighted(), Some(&before[1]));

        match picker.view(&after) {
            SlotPickerView::Slots(options) => {
                assert!(options.iter().all(|option| !option.highlighted));
            }
            other => panic!("expected slot list, got {:?}", other),
        }

        // Same slot still offered after the reload keeps its highlight
        let reordered = vec![after[0].clone(), before[1].clone()];
        match picker.view(&reordered) {
            SlotPickerView::Slots(options) => {
                assert!(!options[0].highlighted);
                assert!(options[1].highlighted);
            }
            other => panic!("expected slot list, got {:?}", other),
        }

        picker.highlight(&after, None);
        assert!(picker.highlighted().is_none());
    }
}
