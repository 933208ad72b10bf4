pub mod admin;
pub mod comment;
pub mod follow;
pub mod interaction;
pub mod library;
pub mod media;
pub mod notification;
pub mod profile;
pub mod response;
pub mod session;
pub mod work;

pub use response::{ApiResponse, PaginationQuery};
pub use session::SessionContext;
