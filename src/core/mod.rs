pub mod generator;
pub mod loader;
pub mod member;
pub mod scanner;

pub use generator::{GeneratedStub, GenerationReport, StubGenerator};
pub use loader::{locate_package, ModuleLoader, ModuleSource};
pub use member::{LoadedModule, MemberKind, ModuleInfo, Package};
pub use scanner::ModuleScanner;
