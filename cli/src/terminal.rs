pub mod input;
pub mod logging;
pub mod print;
pub mod spinner;
