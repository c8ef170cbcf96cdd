pub mod webhook;

pub use webhook::{NoteKind, Notification, Notifier, WebhookNotifier};
