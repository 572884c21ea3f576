pub mod install_checker;
pub mod news_service;
pub mod session_state;
pub mod update_gate;
pub mod version_resolver;

#[cfg(test)]
pub mod test_support;

pub use install_checker::InstallChecker;
pub use news_service::NewsService;
pub use session_state::{reduce, SessionState, Transition, DEFAULT_NICK};
pub use update_gate::UpdateGate;
pub use version_resolver::VersionResolver;
