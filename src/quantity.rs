#[macro_use]
pub mod macros;

pub mod charge;
pub mod voltage;
