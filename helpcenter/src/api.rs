pub mod help_center;
pub mod stream;

pub use help_center::{HelpCenterApi, HelpCenterClient, DEFAULT_BASE_URL, WORKSPACE_HEADER};
pub use stream::parse_user_response;
