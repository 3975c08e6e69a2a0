//! Decision core: pure classification and policy over detection results

pub mod candidates;
pub mod decision;
pub mod plate;
pub mod record;
pub mod similarity;

pub use decision::{decide, RejectReason, Verdict};
