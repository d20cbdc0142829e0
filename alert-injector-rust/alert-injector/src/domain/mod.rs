pub mod alert;
pub mod error;
pub mod policy;

pub use alert::Alert;
pub use error::{AlertTestError, Result};
pub use policy::FailurePolicy;
