//! Business logic for the association site.
//!
//! Each service owns one feature area (accounts, gallery, news, contact,
//! donations) and sits between the HTTP handlers and the repositories:
//! handlers stay thin, validation and rules live here, and outbound
//! integrations (payment gateway, SMTP, media host) are wrapped so the
//! rest of the code never talks to them directly.

pub mod contact;
pub mod donation;
pub mod email;
pub mod gallery;
pub mod media;
pub mod news;
pub mod password;
pub mod user;

pub use contact::{ContactInput, ContactService, ContactServiceError};
pub use donation::{DonationService, DonationServiceError};
pub use email::EmailService;
pub use gallery::{
    GalleryService, GalleryServiceError, NewAlbumInput, NewPhotoInput,
};
pub use media::{is_allowed_image, MediaService, MediaServiceError, PlacedImage};
pub use news::{NewPostInput, NewsService, NewsServiceError};
pub use password::{hash_password, verify_password};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
