//! User accounts and authentication for the StockLab service.
//!
//! Passwords are stored as argon2 hashes. A successful login yields an
//! HS256 bearer token carrying the user id, valid for 48 hours.

pub mod error;
pub mod memory;
pub mod password;
pub mod postgres;
pub mod service;
pub mod store;
pub mod token;
pub mod user;

pub use common::UserId;
pub use error::{AuthError, Result};
pub use memory::InMemoryCredentialStore;
pub use password::{hash_password, verify_password};
pub use postgres::PostgresCredentialStore;
pub use service::{AuthService, Registration};
pub use store::CredentialStore;
pub use token::{Claims, TokenIssuer, extract_bearer_token};
pub use user::{NewUser, ProfileUpdate, User, UserPatch, normalize_email};
