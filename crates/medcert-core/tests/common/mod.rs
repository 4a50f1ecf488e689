//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use medcert_core::db::Database;
use medcert_core::payment::MockPaymentProvider;
use medcert_core::settlement::OutboxMailer;
use medcert_core::{
    BookingRequest, ConsultationService, LeaveType, ServiceSettings, Symptom,
    TextCertificateGenerator,
};

pub struct TestService {
    pub service: ConsultationService,
    pub payments: Arc<MockPaymentProvider>,
    pub mailer: Arc<OutboxMailer>,
}

pub fn test_service() -> TestService {
    test_service_with(MockPaymentProvider::new())
}

pub fn test_service_with(payments: MockPaymentProvider) -> TestService {
    service_over(Database::open_in_memory().unwrap(), payments)
}

/// A service over an existing database file with a fresh provider that
/// knows none of the holds recorded there.
pub fn test_service_at(path: &Path) -> TestService {
    service_over(Database::open(path).unwrap(), MockPaymentProvider::new())
}

fn service_over(db: Database, payments: MockPaymentProvider) -> TestService {
    let payments = Arc::new(payments);
    let mailer = Arc::new(OutboxMailer::new());
    let service = ConsultationService::new(
        db,
        payments.clone(),
        Arc::new(TextCertificateGenerator::new()),
        mailer.clone(),
        ServiceSettings::default(),
    );
    TestService {
        service,
        payments,
        mailer,
    }
}

/// A complete, valid booking dated relative to the service's today.
pub fn booking_request(service: &ConsultationService, leave_type: LeaveType) -> BookingRequest {
    let today = service.settings().today();
    let mut request = BookingRequest::new(leave_type);
    request.first_name = "Priya".into();
    request.last_name = "Shah".into();
    request.email = "priya.shah@example.com".into();
    request.phone = "+61 412 345 678".into();
    request.date_of_birth = "1992-07-14".into();
    if leave_type == LeaveType::Carer {
        request.care_recipient_name = Some("Arjun Shah".into());
        request.care_relationship = Some("Son".into());
    }
    request.symptoms = vec![Symptom::Gastro];
    request.symptom_start_date = today.format("%Y-%m-%d").to_string();
    request.days_requested = 1;
    request.preferred_date = (today + chrono::Duration::days(2))
        .format("%Y-%m-%d")
        .to_string();
    request.preferred_time = "09:00".into();
    request.terms_accepted = true;
    request
}
