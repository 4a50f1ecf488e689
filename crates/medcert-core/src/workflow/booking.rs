//! Customer-facing operations: create a booking and confirm it.

use tracing::{info, warn};

use super::{BookingCreated, ConsultationService, WorkflowError, WorkflowResult};
use crate::audit::EventKind;
use crate::intake::validate_booking;
use crate::models::{BookingRequest, Consultation, ConsultationStatus};
use crate::payment::{HoldRequest, PaymentError, CURRENCY};

impl ConsultationService {
    /// Validate the intake payload, authorize the fee and store a `pending`
    /// consultation. Either both the hold and the record exist afterwards,
    /// or neither does.
    pub fn create_booking(&self, request: &BookingRequest) -> WorkflowResult<BookingCreated> {
        let booking = validate_booking(request, self.settings.today())?;
        let amount_cents = self.settings.fees.fee_for(booking.leave_type);

        let hold = HoldRequest {
            amount_cents,
            currency: CURRENCY.to_string(),
            description: format!("Medical certificate consultation ({} leave)", booking.leave_type.as_str()),
            receipt_email: booking.email.clone(),
        };
        let authorization = self.payments.authorize(&hold).map_err(|e| match e {
            PaymentError::Declined(reason) => WorkflowError::PaymentDeclined(reason),
            other => {
                warn!(error = %other, "Authorization failed");
                WorkflowError::Upstream {
                    step: "authorize".to_string(),
                    message: other.to_string(),
                }
            }
        })?;

        let consultation = Consultation::new(&booking, authorization.intent_id.clone(), amount_cents);
        let stored = self.db().and_then(|db| Ok(db.create_consultation(&consultation)?));
        if let Err(e) = stored {
            // No record, so the hold must not outlive this request.
            if let Err(void_err) = self.payments.void(&authorization.intent_id) {
                warn!(
                    payment_intent_id = %authorization.intent_id,
                    error = %void_err,
                    "Could not void hold after failed insert"
                );
            }
            return Err(e);
        }

        info!(
            consultation_id = %consultation.id,
            leave_type = consultation.leave_type.as_str(),
            amount_cents,
            "Booking created with payment hold"
        );
        Ok(BookingCreated {
            consultation_id: consultation.id,
            client_secret: authorization.client_secret,
            amount_cents,
        })
    }

    /// Mark a booking as confirmed once the customer completed the hold.
    /// Confirming twice is not an error.
    pub fn confirm_booking(&self, id: &str) -> WorkflowResult<Consultation> {
        let db = self.db()?;
        let current = db.get_consultation_status(id)?.ok_or(WorkflowError::NotFound)?;
        if current == ConsultationStatus::Pending
            && db.transition_status(
                id,
                &[ConsultationStatus::Pending],
                ConsultationStatus::Scheduled,
                EventKind::Confirmed,
            )?
        {
            info!(consultation_id = id, "Booking confirmed");
        }

        let consultation = db.get_consultation(id)?.ok_or(WorkflowError::NotFound)?;
        if consultation.status != ConsultationStatus::Scheduled {
            drop(db);
            return Err(self.conflict(id, &[ConsultationStatus::Pending]));
        }
        Ok(consultation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::Database;
    use crate::models::{LeaveType, PaymentStatus, Symptom};
    use crate::payment::{HoldState, MockPaymentProvider};
    use crate::settlement::{LoggingMailer, TextCertificateGenerator};
    use crate::workflow::ServiceSettings;

    fn service(payments: Arc<MockPaymentProvider>) -> ConsultationService {
        ConsultationService::new(
            Database::open_in_memory().unwrap(),
            payments,
            Arc::new(TextCertificateGenerator::new()),
            Arc::new(LoggingMailer),
            ServiceSettings::default(),
        )
    }

    fn request(service: &ConsultationService) -> BookingRequest {
        let today = service.settings().today();
        let mut request = BookingRequest::new(LeaveType::Personal);
        request.first_name = "Sam".into();
        request.last_name = "Reid".into();
        request.email = "Sam.Reid@Example.com".into();
        request.phone = "0412 345 678".into();
        request.date_of_birth = "1985-11-20".into();
        request.symptoms = vec![Symptom::ColdFlu];
        request.symptom_start_date = today.format("%Y-%m-%d").to_string();
        request.preferred_date = (today + chrono::Duration::days(1))
            .format("%Y-%m-%d")
            .to_string();
        request.preferred_time = "10:30".into();
        request.terms_accepted = true;
        request
    }

    #[test]
    fn test_create_booking_holds_fee() {
        let payments = Arc::new(MockPaymentProvider::new());
        let service = service(payments.clone());

        let created = service.create_booking(&request(&service)).unwrap();
        assert_eq!(created.amount_cents, 2495);
        assert!(!created.client_secret.is_empty());

        let consultation = service.get_consultation(&created.consultation_id).unwrap();
        assert_eq!(consultation.status, ConsultationStatus::Pending);
        assert_eq!(consultation.payment_status, PaymentStatus::Authorized);
        assert_eq!(consultation.email, "sam.reid@example.com");
        assert_eq!(consultation.phone, "0412345678");
        assert_eq!(
            payments.hold(&consultation.payment_intent_id),
            Some(HoldState::Authorized)
        );
    }

    #[test]
    fn test_declined_card_creates_nothing() {
        let payments = Arc::new(MockPaymentProvider::new());
        let service = service(payments.clone());
        payments.decline_next_authorization("card declined");

        let err = service.create_booking(&request(&service)).unwrap_err();
        assert!(matches!(err, WorkflowError::PaymentDeclined(_)));
        assert!(service.list(Default::default()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_payload_has_no_side_effects() {
        let payments = Arc::new(MockPaymentProvider::new());
        let service = service(payments.clone());
        let mut bad = request(&service);
        bad.email = "not-an-email".into();

        let err = service.create_booking(&bad).unwrap_err();
        match err {
            WorkflowError::Validation(errors) => assert!(errors.contains("email")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(payments.hold_count(), 0);
    }

    #[test]
    fn test_confirm_is_idempotent() {
        let service = service(Arc::new(MockPaymentProvider::new()));
        let created = service.create_booking(&request(&service)).unwrap();

        let first = service.confirm_booking(&created.consultation_id).unwrap();
        assert_eq!(first.status, ConsultationStatus::Scheduled);
        let second = service.confirm_booking(&created.consultation_id).unwrap();
        assert_eq!(second.status, ConsultationStatus::Scheduled);
    }

    #[test]
    fn test_confirm_after_call_started_conflicts() {
        let service = service(Arc::new(MockPaymentProvider::new()));
        let created = service.create_booking(&request(&service)).unwrap();
        service.start_call(&created.consultation_id).unwrap();

        let err = service.confirm_booking(&created.consultation_id).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { .. }));
    }

    #[test]
    fn test_confirm_unknown_is_not_found() {
        let service = service(Arc::new(MockPaymentProvider::new()));
        assert!(matches!(
            service.confirm_booking("missing"),
            Err(WorkflowError::NotFound)
        ));
    }
}
