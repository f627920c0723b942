pub mod client;
pub mod session;

pub use client::{decode_autofill, decode_upload_url, ApiClient, DEFAULT_BASE_URL};
pub use session::TokenStore;
