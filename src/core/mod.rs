//! Core business logic abstractions

pub mod clock;
pub mod config;
pub mod conversion;
pub mod currency;
pub mod log;
pub mod rate;
pub mod store;
pub mod validation;

// Re-export main types for cleaner imports
pub use clock::{Clock, ManualClock, SystemClock};
pub use currency::{ExchangeProvider, ExchangeRates};
pub use rate::{NewRate, Rate, RateId};
pub use store::RateStore;
pub use validation::RateValidator;
