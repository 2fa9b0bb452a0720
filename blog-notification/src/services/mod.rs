pub mod digest_dispatcher;
pub mod notification_engine;
pub mod notification_service;
pub mod preference_service;

pub use digest_dispatcher::{DigestDispatcher, SweepReport};
pub use notification_engine::{DeliveryEvent, DeliveryOptions, NotificationEngine};
pub use notification_service::NotificationService;
pub use preference_service::PreferenceService;
