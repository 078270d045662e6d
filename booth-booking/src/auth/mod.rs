//! Authentication for the booth booking API.
//!
//! Accounts sign in with email and password and receive an HS256 bearer
//! token. Handlers require a signed-in user or an administrator through the
//! extractors in [`middleware`].

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{AuthUser, BearerToken, RequireAdmin};
pub use password::{
    MIN_PASSWORD_LEN, PasswordError, hash_in_pool, hash_password, verify_in_pool, verify_password,
};
pub use token::{Claims, TokenError, TokenKeys};
