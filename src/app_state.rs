use crate::{
    config::Config,
    services::{AndroidPublisher, GooglePlayService},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn AndroidPublisher>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let publisher = Arc::new(GooglePlayService::new(&config.google));

        Self {
            publisher,
            config: Arc::new(config),
        }
    }

    /// State with a substitute publisher client, used by tests.
    pub fn with_publisher(config: Config, publisher: Arc<dyn AndroidPublisher>) -> Self {
        Self {
            publisher,
            config: Arc::new(config),
        }
    }
}
