//! Per-institution summaries of a discovery run

use carehero_domain::{AppointmentSummary, BookingMethod, InstitutionAppointmentResult};

/// Note attached to summaries without a real slot
pub fn visit_website_note(url: &str) -> String {
    format!(
        "Please visit {} directly to check availability and book appointments. Online booking may be restricted.",
        url
    )
}

/// Summarize one result
pub fn summarize_result(result: &InstitutionAppointmentResult) -> AppointmentSummary {
    let available_slots: Vec<String> = result.slots.iter().map(|s| s.time.clone()).collect();
    let has_real_slot = result.slots.iter().any(|s| !s.is_synthetic());

    let (booking_method, booking_note) = if has_real_slot {
        (BookingMethod::Online, None)
    } else {
        (
            BookingMethod::VisitWebsite,
            Some(visit_website_note(&result.institution.url)),
        )
    };

    AppointmentSummary {
        institution_name: result.institution.name.clone(),
        url: result.institution.url.clone(),
        next_available: available_slots.first().cloned(),
        total_slots_found: available_slots.len(),
        available_slots,
        booking_method,
        booking_note,
        processing_error: result.error_message.clone(),
    }
}

/// Summarize every result, preserving order
pub fn summarize(results: &[InstitutionAppointmentResult]) -> Vec<AppointmentSummary> {
    results.iter().map(summarize_result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::synthetic_slots;
    use carehero_domain::{
        AppointmentSlot, Institution, InstitutionType, InsuranceAcceptance, SlotConfidence,
        SlotSource,
    };

    fn institution() -> Institution {
        Institution::new(
            "Mission Clinic",
            "https://missionclinic.org",
            InstitutionType::Clinic,
            InsuranceAcceptance::Accepted,
        )
        .unwrap()
    }

    #[test]
    fn test_real_slots_are_online() {
        let slots = vec![
            AppointmentSlot::new("10:00 AM", SlotSource::StructuralScan, SlotConfidence::High, ""),
            AppointmentSlot::new("2:00 PM", SlotSource::StructuralScan, SlotConfidence::High, ""),
        ];
        let result = InstitutionAppointmentResult::from_slots(institution(), slots);
        let summary = summarize_result(&result);
        assert_eq!(summary.booking_method, BookingMethod::Online);
        assert_eq!(summary.next_available.as_deref(), Some("10:00 AM"));
        assert_eq!(summary.total_slots_found, 2);
        assert!(summary.booking_note.is_none());
    }

    #[test]
    fn test_synthetic_slots_mean_visit_website() {
        let result = InstitutionAppointmentResult::from_slots(
            institution(),
            synthetic_slots("https://missionclinic.org", 6),
        );
        let summary = summarize_result(&result);
        assert_eq!(summary.booking_method, BookingMethod::VisitWebsite);
        assert_eq!(summary.total_slots_found, 6);
        assert!(summary.booking_note.unwrap().contains("https://missionclinic.org"));
    }

    #[test]
    fn test_error_carries_message() {
        let result = InstitutionAppointmentResult::error(institution(), "navigation timed out");
        let summaries = summarize(&[result]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].processing_error.as_deref(), Some("navigation timed out"));
        assert_eq!(summaries[0].booking_method, BookingMethod::VisitWebsite);
        assert!(summaries[0].next_available.is_none());
    }
}
