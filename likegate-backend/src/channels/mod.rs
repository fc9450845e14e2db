pub mod notifier;
pub mod telegram;

pub use notifier::{LogNotifier, Notifier};
