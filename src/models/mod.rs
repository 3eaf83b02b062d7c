//! Data structures shared across the site.
//!
//! One struct per database entity (User, Session, Album, Photo, NewsPost,
//! ContactMessage), plus the role and validation pair that every
//! authorization check is derived from.

mod album;
mod contact;
mod news;
mod photo;
mod session;
mod user;

pub use album::Album;
pub use contact::ContactMessage;
pub use news::NewsPost;
pub use photo::Photo;
pub use session::{Session, SESSION_TTL_DAYS};
pub use user::{Role, User};
