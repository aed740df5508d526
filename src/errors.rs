pub mod abe_error;
pub mod parse_error;

pub use abe_error::AbeError;
pub use parse_error::ParseError;
