pub mod auth;
pub mod permissions;
pub mod response;

pub use auth::{authentication, CurrentUser};
pub use permissions::enforce;
pub use response::{ApiResponse, ApiResult};
