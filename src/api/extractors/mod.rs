mod auth;
mod session;

pub use auth::{AuthCtx, AuthCtxExtractor};
pub use session::CurrentSession;
