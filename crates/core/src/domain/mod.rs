pub mod pollen;
pub mod severity;
