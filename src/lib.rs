pub mod error;
pub mod probe;
pub mod scratch;
pub mod source;
pub mod toolchain;
