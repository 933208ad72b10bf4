pub mod backend;
pub mod database;
pub mod counters;
pub mod auth;
pub mod user;
pub mod notification;
pub mod interaction;
pub mod work;
pub mod library;
pub mod media;
pub mod inspector;

// 重新导出常用类型
pub use database::{Database, PaginatedResult};
pub use counters::Counters;
pub use auth::AuthService;
pub use user::UserService;
pub use notification::NotificationService;
pub use interaction::InteractionService;
pub use work::WorkService;
pub use library::LibraryService;
pub use media::MediaService;
pub use inspector::InspectorService;
