use std::sync::Arc;

use blog_shared::clients::email::EmailSender;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::mailer::Mailer;
use crate::services::{DigestDispatcher, NotificationEngine, NotificationService, PreferenceService};
use crate::store::NotificationStore;

/// Everything the worker and in-process callers need, wired over one store,
/// one email sender and one clock.
pub struct AppState {
    pub config: AppConfig,
    pub preferences: PreferenceService,
    pub engine: NotificationEngine,
    pub dispatcher: DigestDispatcher,
    pub notifications: NotificationService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn NotificationStore>,
        sender: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mailer = Mailer::new(sender, config.email_send_timeout());

        Self {
            preferences: PreferenceService::new(store.clone(), clock.clone()),
            engine: NotificationEngine::new(store.clone(), mailer.clone(), clock.clone(), &config.site_url),
            dispatcher: DigestDispatcher::new(store.clone(), mailer, clock.clone(), &config.site_url),
            notifications: NotificationService::new(store, clock),
            config,
        }
    }
}
