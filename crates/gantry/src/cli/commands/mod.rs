//! CLI commands

mod completions;
mod init;
mod run;
mod validate;
mod variants;

pub use completions::CompletionsCommand;
pub use init::InitCommand;
pub use run::RunCommand;
pub use validate::ValidateCommand;
pub use variants::VariantsCommand;
