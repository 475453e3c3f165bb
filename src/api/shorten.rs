//! HTTP surface of the shortener.
//!
//! `POST /` shortens, `GET /{token}` redirects, `OPTIONS` answers CORS
//! preflights with 204. Internal error detail goes to the log, never into a
//! response body.

use actix_web::http::{Method, StatusCode};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::errors::SnaplinkError;
use crate::services::ShortenerService;

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub value: String,
}

pub struct ShortenerApi {}

impl ShortenerApi {
    pub async fn handle_create(
        body: web::Bytes,
        service: web::Data<ShortenerService>,
    ) -> HttpResponse {
        let request: ShortenRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to decode request body: {}", e);
                return Self::bad_request("Failed to decode request body");
            }
        };

        match service.create(&request.url).await {
            Ok(token) => HttpResponse::Ok().json(TokenResponse { value: token }),
            Err(e @ SnaplinkError::Validation(_)) => {
                warn!("Rejected shorten request: {}", e);
                Self::bad_request("Missing url field")
            }
            Err(e) => {
                error!("Failed to shorten url: {}", e);
                Self::internal_error("Failed shortening url")
            }
        }
    }

    pub async fn handle_resolve(
        path: web::Path<String>,
        service: web::Data<ShortenerService>,
    ) -> HttpResponse {
        let token = path.into_inner();

        match service.resolve(&token).await {
            Ok(resolution) => HttpResponse::Found()
                .insert_header(("Location", resolution.url))
                .finish(),
            Err(e @ SnaplinkError::NotFound(_)) => {
                debug!("Short URL not found: {}", e);
                Self::not_found_response()
            }
            Err(e) => {
                error!("Failed to resolve '{}': {}", token, e);
                Self::internal_error("Failed resolving url")
            }
        }
    }

    /// CORS preflight. The shared allow-* headers come from the
    /// `DefaultHeaders` middleware; only the preflight-specific pieces are
    /// set here.
    pub async fn handle_preflight() -> HttpResponse {
        HttpResponse::NoContent()
            .insert_header(("Access-Control-Max-Age", "3600"))
            .finish()
    }

    pub async fn handle_unsupported(req: HttpRequest) -> HttpResponse {
        Self::bad_request(&format!("Unsupported method: {}", req.method()))
    }

    #[inline]
    fn bad_request(msg: &str) -> HttpResponse {
        HttpResponse::build(StatusCode::BAD_REQUEST)
            .insert_header(("Content-Type", "text/plain; charset=utf-8"))
            .body(msg.to_string())
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/plain; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Short URL not found")
    }

    #[inline]
    fn internal_error(msg: &str) -> HttpResponse {
        HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header(("Content-Type", "text/plain; charset=utf-8"))
            .body(msg.to_string())
    }
}

pub fn shortener_routes() -> actix_web::Scope {
    web::scope("")
        .route("/", web::post().to(ShortenerApi::handle_create))
        .route("/{token:.*}", web::get().to(ShortenerApi::handle_resolve))
        .route(
            "/{token:.*}",
            web::method(Method::OPTIONS).to(ShortenerApi::handle_preflight),
        )
        .default_service(web::route().to(ShortenerApi::handle_unsupported))
}
