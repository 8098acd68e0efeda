// Adapters layer: concrete implementations for external systems (shell, http, dns, process table).

pub mod probe;
pub mod process;
pub mod resolver;
pub mod shell;

pub use probe::HttpLivenessProbe;
pub use process::SysinfoInspector;
pub use resolver::SystemResolver;
pub use shell::ShellRunner;
