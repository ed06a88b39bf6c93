// Notifier plugin implementations
pub mod email;
pub mod log;
#[cfg(feature = "desktop")]
pub mod desktop;

pub use email::EmailNotifier;
pub use log::LogNotifier;
#[cfg(feature = "desktop")]
pub use desktop::DesktopNotifier;
