pub mod file_handlers;
pub mod probe_handlers;
