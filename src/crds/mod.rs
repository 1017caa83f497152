pub mod statusalert;

pub use statusalert::*;
