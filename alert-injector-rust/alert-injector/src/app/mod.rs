pub mod fake_pipeline;
pub mod injector;
pub mod payloads;
pub mod verifier;

pub use injector::{AlertInjector, InjectionReport};
pub use verifier::AlertVerifier;
