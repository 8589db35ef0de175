pub mod admin;
pub mod migrate;

use secrecy::SecretString;

/// Read the storefront database URL, preferring `STOREFRONT_DATABASE_URL`.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
