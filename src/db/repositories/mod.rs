//! Repository traits and their SQLx implementations.
//!
//! One repository per entity. Each trait hides the driver split, so the
//! services never see raw SQL or know which backend they run on.

pub mod album;
pub mod contact;
pub mod news;
pub mod photo;
pub mod session;
pub mod user;

pub use album::{AlbumRepository, SqlxAlbumRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use news::{NewsRepository, SqlxNewsRepository};
pub use photo::{PhotoRepository, SqlxPhotoRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
