pub mod freecurrencyapi;

pub use freecurrencyapi::FreeCurrencyApiProvider;
