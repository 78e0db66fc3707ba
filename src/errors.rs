use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;

#[derive(Debug, Display)]
pub enum UserError {
    #[display(fmt = "Validation error on user input")]
    ValidationError,
    #[display(fmt = "Record not found")]
    NotFoundError,
    #[display(fmt = "Login required")]
    AuthRequired,
    #[display(fmt = "Could not get a DB connection from the pool")]
    DBPoolGetError,
    #[display(fmt = "An unexpected error occurred")]
    UnexpectedError,
}

impl ResponseError for UserError {
    fn error_response(&self) -> HttpResponse {
        match self {
            // Unauthenticated users get sent to the login page, never an
            // error status.
            UserError::AuthRequired => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/login"))
                .finish(),
            _ => HttpResponse::build(self.status_code()).body(self.to_string()),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            UserError::ValidationError => StatusCode::BAD_REQUEST,
            UserError::NotFoundError => StatusCode::NOT_FOUND,
            UserError::AuthRequired => StatusCode::SEE_OTHER,
            UserError::DBPoolGetError | UserError::UnexpectedError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            UserError::ValidationError.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UserError::NotFoundError.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            UserError::DBPoolGetError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn auth_required_redirects_to_login() {
        let response = UserError::AuthRequired.error_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .expect("Location header");
        assert_eq!(location, "/login");
    }
}
