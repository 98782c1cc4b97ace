// Service modules
pub mod google_play;

pub use google_play::{AndroidPublisher, GooglePlayService, DEVELOPER_PAYLOAD, PACKAGE_NAME};
