#[cfg(any(test, feature = "testing"))]
pub mod simulated;
pub mod transport;
