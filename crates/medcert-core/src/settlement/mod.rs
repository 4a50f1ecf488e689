//! Settlement: what happens to the payment hold once staff decide.

mod certificate;
mod engine;
mod mailer;

pub use certificate::*;
pub use engine::*;
pub use mailer::*;
