pub mod article;
pub mod category;
pub mod chat;
pub mod envelope;
pub mod ticket;
pub mod user;
pub mod workspace;

pub use article::*;
pub use category::*;
pub use chat::*;
pub use envelope::*;
pub use ticket::*;
pub use user::*;
pub use workspace::*;
