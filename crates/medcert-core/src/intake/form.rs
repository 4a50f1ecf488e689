//! Step-by-step intake form controller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::validation::{validate_booking, validate_identity, validate_symptoms};
use super::ValidationErrors;
use crate::models::{BookingRequest, LeaveType, Symptom};
use crate::workflow::{BookingCreated, ConsultationService, WorkflowError, WorkflowResult};

/// Intake form steps, in order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStep {
    Identity,
    Symptoms,
    Scheduling,
    Payment,
}

impl IntakeStep {
    /// 1-based step number shown to the customer.
    pub fn number(&self) -> u8 {
        match self {
            IntakeStep::Identity => 1,
            IntakeStep::Symptoms => 2,
            IntakeStep::Scheduling => 3,
            IntakeStep::Payment => 4,
        }
    }

    fn next(&self) -> Option<IntakeStep> {
        match self {
            IntakeStep::Identity => Some(IntakeStep::Symptoms),
            IntakeStep::Symptoms => Some(IntakeStep::Scheduling),
            IntakeStep::Scheduling => Some(IntakeStep::Payment),
            IntakeStep::Payment => None,
        }
    }

    fn previous(&self) -> Option<IntakeStep> {
        match self {
            IntakeStep::Identity => None,
            IntakeStep::Symptoms => Some(IntakeStep::Identity),
            IntakeStep::Scheduling => Some(IntakeStep::Symptoms),
            IntakeStep::Payment => Some(IntakeStep::Scheduling),
        }
    }
}

/// In-memory booking form. Holds no persisted state until [`submit`].
///
/// [`submit`]: IntakeForm::submit
#[derive(Debug, Clone)]
pub struct IntakeForm {
    request: BookingRequest,
    step: IntakeStep,
    errors: ValidationErrors,
    submission: Option<BookingCreated>,
}

impl IntakeForm {
    pub fn new(leave_type: LeaveType) -> Self {
        Self {
            request: BookingRequest::new(leave_type),
            step: IntakeStep::Identity,
            errors: ValidationErrors::new(),
            submission: None,
        }
    }

    pub fn current_step(&self) -> IntakeStep {
        self.step
    }

    /// Errors from the last failed `advance`, cleared on success.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn request(&self) -> &BookingRequest {
        &self.request
    }

    /// Copy of the accumulated payload, as it would be submitted.
    pub fn to_booking_request(&self) -> BookingRequest {
        self.request.clone()
    }

    /// Mutable access to the accumulated payload. Locked once submitted.
    pub fn request_mut(&mut self) -> Option<&mut BookingRequest> {
        if self.submission.is_some() {
            None
        } else {
            Some(&mut self.request)
        }
    }

    /// Switch leave type. Carer fields are cleared when switching to personal.
    pub fn set_leave_type(&mut self, leave_type: LeaveType) {
        if self.submission.is_some() {
            return;
        }
        self.request.leave_type = leave_type;
        if leave_type == LeaveType::Personal {
            self.request.care_recipient_name = None;
            self.request.care_relationship = None;
        }
    }

    /// Select a symptom, or deselect it if already selected.
    pub fn toggle_symptom(&mut self, symptom: Symptom) {
        if self.submission.is_some() {
            return;
        }
        if let Some(pos) = self.request.symptoms.iter().position(|s| *s == symptom) {
            self.request.symptoms.remove(pos);
        } else {
            self.request.symptoms.push(symptom);
        }
    }

    /// Only 1 or 2 days can be chosen; anything else is refused and the
    /// current value kept.
    pub fn set_days_requested(&mut self, days: u8) -> Result<(), ValidationErrors> {
        if !matches!(days, 1 | 2) {
            return Err(ValidationErrors::single(
                "daysRequested",
                "Certificates cover 1 or 2 days",
            ));
        }
        if self.submission.is_none() {
            self.request.days_requested = days;
        }
        Ok(())
    }

    /// Validate the current step and move to the next one.
    ///
    /// The payment step is only reachable once the whole payload validates.
    pub fn advance(&mut self, today: NaiveDate) -> Result<IntakeStep, ValidationErrors> {
        let errors = match self.step {
            IntakeStep::Identity => validate_identity(&self.request, today),
            IntakeStep::Symptoms => validate_symptoms(&self.request, today),
            IntakeStep::Scheduling => match validate_booking(&self.request, today) {
                Ok(_) => ValidationErrors::new(),
                Err(errors) => errors,
            },
            IntakeStep::Payment => {
                ValidationErrors::single("step", "Already at the payment step")
            }
        };

        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(errors);
        }

        self.errors = ValidationErrors::new();
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Go back one step. Not possible once the booking has been submitted.
    pub fn back(&mut self) -> IntakeStep {
        if self.submission.is_none() {
            if let Some(previous) = self.step.previous() {
                self.step = previous;
                self.errors = ValidationErrors::new();
            }
        }
        self.step
    }

    /// Send the payload to create the payment hold and consultation.
    ///
    /// Only allowed on the payment step. The payload is sent once: after a
    /// successful submission the stored result is returned without another
    /// request. A failed submission leaves the form on the payment step so
    /// the customer can retry.
    pub fn submit(&mut self, service: &ConsultationService) -> WorkflowResult<&BookingCreated> {
        if self.step != IntakeStep::Payment {
            return Err(WorkflowError::Validation(ValidationErrors::single(
                "step",
                "Complete the previous steps first",
            )));
        }

        if self.submission.is_none() {
            let created = service.create_booking(&self.request)?;
            self.submission = Some(created);
        }

        match self.submission.as_ref() {
            Some(created) => Ok(created),
            None => Err(WorkflowError::NotFound),
        }
    }

    pub fn submission(&self) -> Option<&BookingCreated> {
        self.submission.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 3).unwrap()
    }

    fn fill_identity(form: &mut IntakeForm) {
        let request = form.request_mut().unwrap();
        request.first_name = "Sam".into();
        request.last_name = "Reid".into();
        request.email = "sam@example.com".into();
        request.phone = "0298765432".into();
        request.date_of_birth = "1985-11-20".into();
    }

    #[test]
    fn test_starts_on_identity() {
        let form = IntakeForm::new(LeaveType::Personal);
        assert_eq!(form.current_step(), IntakeStep::Identity);
        assert_eq!(form.current_step().number(), 1);
        assert!(form.submission().is_none());
    }

    #[test]
    fn test_invalid_email_blocks_then_corrected() {
        let mut form = IntakeForm::new(LeaveType::Personal);
        fill_identity(&mut form);
        form.request_mut().unwrap().email = "not-an-email".into();

        let errors = form.advance(today()).unwrap_err();
        assert!(errors.contains("email"));
        assert_eq!(form.current_step(), IntakeStep::Identity);
        assert!(form.errors().contains("email"));

        form.request_mut().unwrap().email = "a@b.com".into();
        assert_eq!(form.advance(today()).unwrap(), IntakeStep::Symptoms);
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_days_outside_set_refused() {
        let mut form = IntakeForm::new(LeaveType::Personal);
        assert!(form.set_days_requested(3).is_err());
        assert_eq!(form.request().days_requested, 1);
        form.set_days_requested(2).unwrap();
        assert_eq!(form.request().days_requested, 2);
    }

    #[test]
    fn test_toggle_symptom() {
        let mut form = IntakeForm::new(LeaveType::Personal);
        form.toggle_symptom(Symptom::Fever);
        form.toggle_symptom(Symptom::Gastro);
        form.toggle_symptom(Symptom::Fever);
        assert_eq!(form.request().symptoms, vec![Symptom::Gastro]);
    }

    #[test]
    fn test_switching_to_personal_clears_care() {
        let mut form = IntakeForm::new(LeaveType::Carer);
        {
            let request = form.request_mut().unwrap();
            request.care_recipient_name = Some("Leo".into());
            request.care_relationship = Some("Son".into());
        }
        form.set_leave_type(LeaveType::Personal);
        assert!(form.request().care_recipient_name.is_none());
        assert!(form.request().care_relationship.is_none());
    }

    #[test]
    fn test_walks_all_steps() {
        let mut form = IntakeForm::new(LeaveType::Personal);
        fill_identity(&mut form);
        assert_eq!(form.advance(today()).unwrap(), IntakeStep::Symptoms);

        assert!(form.advance(today()).is_err());
        form.toggle_symptom(Symptom::ColdFlu);
        form.request_mut().unwrap().symptom_start_date = "2026-08-02".into();
        assert_eq!(form.advance(today()).unwrap(), IntakeStep::Scheduling);

        {
            let request = form.request_mut().unwrap();
            request.preferred_date = "2026-08-04".into();
            request.preferred_time = "14:00".into();
        }
        let errors = form.advance(today()).unwrap_err();
        assert!(errors.contains("termsAccepted"));

        form.request_mut().unwrap().terms_accepted = true;
        assert_eq!(form.advance(today()).unwrap(), IntakeStep::Payment);
        assert!(form.advance(today()).is_err());

        assert_eq!(form.back(), IntakeStep::Scheduling);
    }
}
