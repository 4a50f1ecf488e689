//! HTTP handlers. Each one validates its input shape, then hands the
//! call to the consultation service on a blocking worker.

pub mod admin;
pub mod bookings;
pub mod certificates;
pub mod consultations;
