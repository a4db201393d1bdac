pub mod controller;
pub mod visits;

pub use controller::{Direction, StepProgress, StepState, WizardController, WizardStep};
pub use visits::{MemoryVisitStore, VisitStore};
