pub mod config;
pub mod domain;
pub mod errors;
pub mod locale;
pub mod notice;

pub use domain::conversation::{Role, Turn};
pub use domain::run::RunType;
pub use errors::{FailureKind, ServiceError, SessionRejection};
pub use locale::Locale;
pub use notice::{
    InMemoryNotificationSink, Notice, NoticeSeverity, NotificationSink, TracingNotificationSink,
};
