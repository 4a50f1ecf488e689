//! Domain models for the medcert booking system.

mod booking;
mod certificate;
mod consultation;
mod symptom;

pub use booking::*;
pub use certificate::*;
pub use consultation::*;
pub use symptom::*;
