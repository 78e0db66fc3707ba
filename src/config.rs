use actix_web::cookie::Key;
use std::env;

use crate::uploads::UploadConfig;

/// Environment-provided configuration, read once at startup.
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_key: Key,
    pub upload: UploadConfig,
}

impl Config {
    pub fn from_env() -> Config {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let bind_addr =
            env::var("BIND_ADDR").unwrap_or_else(|_| String::from("127.0.0.1:8080"));

        let session_key = match env::var("SESSION_KEY") {
            Ok(raw) => session_key_from_hex(&raw),
            Err(_) => {
                warn!("SESSION_KEY not set, generating an ephemeral key; sessions will not survive a restart");
                Key::generate()
            }
        };

        let upload = UploadConfig {
            bucket: env::var("S3_BUCKET").expect("S3_BUCKET must be set"),
            public_url: env::var("S3_PUBLIC_URL")
                .unwrap_or_else(|_| String::from("https://s3.us-east-2.amazonaws.com")),
        };

        Config {
            database_url,
            bind_addr,
            session_key,
            upload,
        }
    }
}

// Cookie signing keys must be at least 64 bytes.
fn session_key_from_hex(raw: &str) -> Key {
    let bytes = hex::decode(raw).expect("SESSION_KEY must be hex-encoded");
    Key::try_from(bytes.as_slice()).expect("SESSION_KEY must decode to at least 64 bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_64_byte_hex_key() {
        let raw = "ab".repeat(64);
        // Just checking this does not panic.
        let _ = session_key_from_hex(&raw);
    }

    #[test]
    #[should_panic(expected = "at least 64 bytes")]
    fn rejects_a_short_key() {
        let raw = "ab".repeat(16);
        let _ = session_key_from_hex(&raw);
    }

    #[test]
    #[should_panic(expected = "hex-encoded")]
    fn rejects_a_non_hex_key() {
        let _ = session_key_from_hex("not hex at all");
    }
}
