pub mod stub;

pub use stub::StubFormatter;
