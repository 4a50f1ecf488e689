//! Intake validation rules, shared by the form controller and the booking
//! service.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use super::ValidationErrors;
use crate::models::{dedupe_symptoms, BookingRequest, CareDetails, LeaveType, ValidatedBooking};

/// Days after today a call may be booked for (inclusive).
pub const BOOKING_WINDOW_DAYS: i64 = 7;

/// First and last half-hour call slots of the business day.
pub const FIRST_CALL_SLOT: (u32, u32) = (8, 0);
pub const LAST_CALL_SLOT: (u32, u32) = (19, 30);

const MAX_NAME_LEN: usize = 100;
const MAX_DETAILS_LEN: usize = 2000;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

// Australian mobile (04xx) or landline (02/03/07/08), national form.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^0[23478]\d{8}$").unwrap());

/// Every bookable call slot, in order.
pub fn call_slots() -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    let (h, m) = FIRST_CALL_SLOT;
    let (last_h, last_m) = LAST_CALL_SLOT;
    let mut minutes = h * 60 + m;
    let last = last_h * 60 + last_m;
    while minutes <= last {
        if let Some(slot) = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0) {
            slots.push(slot);
        }
        minutes += 30;
    }
    slots
}

/// Check an email address against the standard address pattern.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Strip spaces, dashes, dots and parentheses from a phone number and
/// rewrite a `+61`/`61` prefix to the national `0`.
pub fn normalize_phone(phone: &str) -> String {
    let stripped: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if let Some(rest) = stripped.strip_prefix("+61") {
        format!("0{rest}")
    } else if stripped.len() == 11 && stripped.starts_with("61") {
        format!("0{}", &stripped[2..])
    } else {
        stripped
    }
}

/// Check a phone number against Australian mobile/landline patterns.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(&normalize_phone(phone))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_slot(raw: &str) -> Option<NaiveTime> {
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()?;
    call_slots().contains(&time).then_some(time)
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_name(errors: &mut ValidationErrors, field: &str, label: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if value.chars().count() > MAX_NAME_LEN {
        errors.add(field, format!("{label} is too long"));
    }
}

/// Step 1: who the customer is (and who they care for, on carer leave).
pub fn validate_identity(request: &BookingRequest, today: NaiveDate) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    check_name(&mut errors, "firstName", "First name", &request.first_name);
    check_name(&mut errors, "lastName", "Last name", &request.last_name);

    if request.email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(&request.email) {
        errors.add("email", "Enter a valid email address");
    }

    if request.phone.trim().is_empty() {
        errors.add("phone", "Phone number is required");
    } else if !is_valid_phone(&request.phone) {
        errors.add("phone", "Enter a valid Australian phone number");
    }

    if request.date_of_birth.trim().is_empty() {
        errors.add("dateOfBirth", "Date of birth is required");
    } else {
        match parse_date(&request.date_of_birth) {
            None => errors.add("dateOfBirth", "Use the format YYYY-MM-DD"),
            Some(dob) if dob > today => {
                errors.add("dateOfBirth", "Date of birth cannot be in the future")
            }
            Some(_) => {}
        }
    }

    if request.leave_type == LeaveType::Carer {
        if non_blank(request.care_recipient_name.as_ref()).is_none() {
            errors.add("careRecipientName", "Name of the person you are caring for is required");
        }
        if non_blank(request.care_relationship.as_ref()).is_none() {
            errors.add("careRelationship", "Relationship is required");
        }
    }

    errors
}

/// Step 2: symptoms, onset date and days requested.
pub fn validate_symptoms(request: &BookingRequest, today: NaiveDate) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let symptoms = dedupe_symptoms(&request.symptoms);
    if symptoms.is_empty() {
        errors.add("symptoms", "Select at least one symptom");
    } else if symptoms.iter().any(|s| s.is_other() && s.label().is_empty()) {
        errors.add("symptoms", "Describe your other symptom");
    }

    if request
        .symptom_details
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DETAILS_LEN)
    {
        errors.add("symptomDetails", "Symptom details are too long");
    }

    if request.symptom_start_date.trim().is_empty() {
        errors.add("symptomStartDate", "Symptom start date is required");
    } else {
        match parse_date(&request.symptom_start_date) {
            None => errors.add("symptomStartDate", "Use the format YYYY-MM-DD"),
            Some(start) if start > today => {
                errors.add("symptomStartDate", "Symptom start date cannot be in the future")
            }
            Some(_) => {}
        }
    }

    if !matches!(request.days_requested, 1 | 2) {
        errors.add("daysRequested", "Certificates cover 1 or 2 days");
    }

    errors
}

/// Step 3: preferred call date/slot and terms acceptance.
pub fn validate_scheduling(request: &BookingRequest, today: NaiveDate) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if request.preferred_date.trim().is_empty() {
        errors.add("preferredDate", "Choose a call date");
    } else {
        match parse_date(&request.preferred_date) {
            None => errors.add("preferredDate", "Use the format YYYY-MM-DD"),
            Some(date) if date < today => {
                errors.add("preferredDate", "Call date cannot be in the past")
            }
            Some(date) if date > today + Duration::days(BOOKING_WINDOW_DAYS) => errors.add(
                "preferredDate",
                format!("Calls can be booked up to {BOOKING_WINDOW_DAYS} days ahead"),
            ),
            Some(_) => {}
        }
    }

    if request.preferred_time.trim().is_empty() {
        errors.add("preferredTime", "Choose a call time");
    } else if parse_slot(&request.preferred_time).is_none() {
        errors.add("preferredTime", "Choose one of the available call times");
    }

    if !request.terms_accepted {
        errors.add("termsAccepted", "You must accept the terms to continue");
    }

    errors
}

/// Run every intake rule and produce a typed booking.
///
/// Care details are dropped for personal leave so that they are present
/// iff the leave type is carer.
pub fn validate_booking(
    request: &BookingRequest,
    today: NaiveDate,
) -> Result<ValidatedBooking, ValidationErrors> {
    let mut errors = validate_identity(request, today);
    errors.merge(validate_symptoms(request, today));
    errors.merge(validate_scheduling(request, today));
    if !errors.is_empty() {
        return Err(errors);
    }

    // All parses below succeeded during validation.
    let (Some(date_of_birth), Some(symptom_start_date), Some(date), Some(time)) = (
        parse_date(&request.date_of_birth),
        parse_date(&request.symptom_start_date),
        parse_date(&request.preferred_date),
        parse_slot(&request.preferred_time),
    ) else {
        return Err(ValidationErrors::single("request", "Malformed booking"));
    };

    let care = match request.leave_type {
        LeaveType::Carer => Some(CareDetails {
            recipient_name: non_blank(request.care_recipient_name.as_ref()).unwrap_or_default(),
            relationship: non_blank(request.care_relationship.as_ref()).unwrap_or_default(),
        }),
        LeaveType::Personal => None,
    };

    Ok(ValidatedBooking {
        leave_type: request.leave_type,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        email: request.email.trim().to_lowercase(),
        phone: normalize_phone(&request.phone),
        date_of_birth,
        care,
        symptoms: dedupe_symptoms(&request.symptoms),
        symptom_details: non_blank(request.symptom_details.as_ref()),
        symptom_start_date,
        days_requested: request.days_requested,
        preferred_call_time: NaiveDateTime::new(date, time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Symptom;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 12).unwrap()
    }

    fn complete_request() -> BookingRequest {
        let mut request = BookingRequest::new(LeaveType::Personal);
        request.first_name = "Mia".into();
        request.last_name = "Nguyen".into();
        request.email = "mia@example.com".into();
        request.phone = "0412 345 678".into();
        request.date_of_birth = "1990-04-01".into();
        request.symptoms = vec![Symptom::Fever];
        request.symptom_start_date = "2026-05-11".into();
        request.preferred_date = "2026-05-13".into();
        request.preferred_time = "09:30".into();
        request.terms_accepted = true;
        request
    }

    #[test]
    fn test_call_slots_grid() {
        let slots = call_slots();
        assert_eq!(slots.len(), 24);
        assert_eq!(slots[0], NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(slots[1], NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(slots[23], NaiveTime::from_hms_opt(19, 30, 0).unwrap());
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@clinic.com.au"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn test_phone_pattern() {
        assert!(is_valid_phone("0412 345 678"));
        assert!(is_valid_phone("+61 412 345 678"));
        assert!(is_valid_phone("(02) 9876-5432"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("0512 345 678"));
        assert!(!is_valid_phone("555-0100"));
    }

    #[test]
    fn test_phone_normalizes_to_national_form() {
        assert_eq!(normalize_phone("0412 345 678"), "0412345678");
        assert_eq!(normalize_phone("+61 412 345 678"), "0412345678");
        assert_eq!(normalize_phone("61412345678"), "0412345678");
        assert_eq!(normalize_phone("(02) 9876-5432"), "0298765432");
        assert_eq!(normalize_phone("412 345"), "412345");
    }

    #[test]
    fn test_complete_request_validates() {
        let booking = validate_booking(&complete_request(), today()).unwrap();
        assert_eq!(booking.phone, "0412345678");
        assert_eq!(booking.days_requested, 1);
        assert!(booking.care.is_none());
        assert_eq!(
            booking.preferred_call_time.format("%Y-%m-%d %H:%M").to_string(),
            "2026-05-13 09:30"
        );
    }

    #[test]
    fn test_identity_requires_every_field() {
        let request = BookingRequest::new(LeaveType::Personal);
        let errors = validate_identity(&request, today());
        for field in ["firstName", "lastName", "email", "phone", "dateOfBirth"] {
            assert!(errors.contains(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_carer_requires_recipient() {
        let mut request = complete_request();
        request.leave_type = LeaveType::Carer;
        request.care_relationship = Some("Mother".into());
        let errors = validate_identity(&request, today());
        assert!(errors.contains("careRecipientName"));
        assert!(!errors.contains("careRelationship"));
    }

    #[test]
    fn test_personal_drops_care_fields() {
        let mut request = complete_request();
        request.care_recipient_name = Some("Leo".into());
        request.care_relationship = Some("Son".into());
        let booking = validate_booking(&request, today()).unwrap();
        assert!(booking.care.is_none());
    }

    #[test]
    fn test_symptom_start_cannot_be_future() {
        let mut request = complete_request();
        request.symptom_start_date = "2026-05-13".into();
        let errors = validate_symptoms(&request, today());
        assert!(errors.contains("symptomStartDate"));

        // Backdated onset is accepted.
        request.symptom_start_date = "2026-04-01".into();
        assert!(validate_symptoms(&request, today()).is_empty());
    }

    #[test]
    fn test_days_requested_limited() {
        let mut request = complete_request();
        for days in [0u8, 3, 7] {
            request.days_requested = days;
            assert!(validate_symptoms(&request, today()).contains("daysRequested"));
        }
        request.days_requested = 2;
        assert!(validate_symptoms(&request, today()).is_empty());
    }

    #[test]
    fn test_symptom_details_are_not_a_selection() {
        let mut request = complete_request();
        request.symptoms.clear();
        request.symptom_details = Some("Feeling rough".into());
        assert!(validate_symptoms(&request, today()).contains("symptoms"));

        request.symptoms = vec![Symptom::Other("rash".into())];
        assert!(validate_symptoms(&request, today()).is_empty());

        request.symptoms = vec![Symptom::Other("   ".into())];
        assert!(validate_symptoms(&request, today()).contains("symptoms"));
    }

    #[test]
    fn test_booking_window() {
        let mut request = complete_request();
        request.preferred_date = "2026-05-12".into();
        assert!(validate_scheduling(&request, today()).is_empty());

        request.preferred_date = "2026-05-19".into();
        assert!(validate_scheduling(&request, today()).is_empty());

        request.preferred_date = "2026-05-20".into();
        assert!(validate_scheduling(&request, today()).contains("preferredDate"));

        request.preferred_date = "2026-05-11".into();
        assert!(validate_scheduling(&request, today()).contains("preferredDate"));
    }

    #[test]
    fn test_time_must_be_on_grid() {
        let mut request = complete_request();
        for bad in ["09:15", "07:30", "20:00", "noon"] {
            request.preferred_time = bad.into();
            assert!(
                validate_scheduling(&request, today()).contains("preferredTime"),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn test_terms_required() {
        let mut request = complete_request();
        request.terms_accepted = false;
        assert!(validate_scheduling(&request, today()).contains("termsAccepted"));
    }
}
