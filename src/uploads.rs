//! Photo upload adapter: multipart file in, object-storage URL out.
//!
//! Failure handling is deliberately quiet. A submission without a file is a
//! plain redirect, and a storage error is logged and swallowed so the user
//! never lands on an error page for a photo.

use actix_web::{web, HttpResponse};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use rand::Rng;
use validator::Validate;

use crate::errors::UserError;
use crate::handlers::{blocking, get_conn, see_other, CatPath};
use crate::model::NewPhoto;
use crate::session::CurrentUser;
use crate::{store, DbPool};

const UPLOAD_TEMP_DIR: &str = "./tmp";

/// Bucket and endpoint for constructing public photo URLs. Consumed only by
/// this adapter.
#[derive(Clone)]
pub struct UploadConfig {
    pub bucket: String,
    pub public_url: String,
}

/// Collision-resistant object key: 64 bits of random hex plus the original
/// file extension. A name without a dot gets no extension rather than an
/// error.
pub(crate) fn object_key(file_name: &str) -> String {
    let token: [u8; 8] = rand::thread_rng().gen();
    let ext = match file_name.rfind('.') {
        Some(idx) => &file_name[idx..],
        None => "",
    };
    format!("{}{}", hex::encode(token), ext)
}

pub async fn add_photo(
    pool: web::Data<DbPool>,
    s3: web::Data<S3Client>,
    config: web::Data<UploadConfig>,
    user: CurrentUser,
    path: web::Path<CatPath>,
    mut parts: awmp::Parts,
) -> Result<HttpResponse, UserError> {
    path.validate().map_err(|_| UserError::ValidationError)?;
    let cat_id = path.id;

    let mut conn = get_conn(&pool)?;
    let user_id = user.id;
    if blocking(move || store::cat_for_user(&mut conn, cat_id, user_id))
        .await?
        .is_none()
    {
        return Err(UserError::NotFoundError);
    }

    let detail_url = format!("/cats/{}", cat_id);

    // No file attached means nothing to do, not an error.
    let file = match parts.files.take("photo-file").pop() {
        Some(file) => file,
        None => return Ok(see_other(&detail_url)),
    };

    let saved = match file.persist_in(UPLOAD_TEMP_DIR) {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to persist uploaded file: {}", e);
            return Ok(see_other(&detail_url));
        }
    };

    let file_name = saved
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_owned();
    let key = object_key(&file_name);

    let bytes = std::fs::read(&saved);
    let _ = std::fs::remove_file(&saved);
    let bytes = match bytes {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read uploaded file: {}", e);
            return Ok(see_other(&detail_url));
        }
    };

    match s3
        .put_object()
        .bucket(&config.bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .send()
        .await
    {
        Ok(_) => {
            let url = format!("{}/{}/{}", config.public_url, config.bucket, key);
            let mut conn = get_conn(&pool)?;
            let new_photo = NewPhoto { cat_id, url };
            match web::block(move || store::create_photo(&mut conn, &new_photo)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Failed to record uploaded photo: {}", e),
                Err(_) => error!("Blocking thread pool error"),
            }
        }
        Err(e) => {
            error!("Photo upload error: {}", e);
        }
    }

    Ok(see_other(&detail_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_keeps_the_extension() {
        let key = object_key("whiskers.png");
        assert!(key.ends_with(".png"), "key was {key}");
        assert_eq!(key.len(), 16 + ".png".len());
        assert!(key[..16].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn object_key_without_a_dot_has_no_extension() {
        let key = object_key("whiskers");
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn object_key_uses_the_last_extension() {
        let key = object_key("archive.tar.gz");
        assert!(key.ends_with(".gz"));
        assert!(!key.contains(".tar."));
    }

    #[test]
    fn object_keys_do_not_collide_casually() {
        let a = object_key("a.jpg");
        let b = object_key("a.jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn object_key_handles_an_empty_name() {
        let key = object_key("");
        assert_eq!(key.len(), 16);
    }
}
