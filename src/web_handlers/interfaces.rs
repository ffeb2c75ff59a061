//! HTTP surface: conversion, timed-link minting, and subscription
//! redemption.
//!
//! Error mapping is fixed: 400 for malformed input or an empty batch, 404
//! for a missing template, 403 for expired or tampered links, 502 for
//! upstream fetch failures. Bodies are always `{ errorKind, detail }`.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ConvertError, DecodeError, RenderError, SignError};
use crate::generator::ss_sub::timed_ss_subscription;
use crate::interfaces::{convert, ConvertRequest};
use crate::models::AppState;
use crate::settings::Settings;
use crate::timed_link;

/// Registers all handlers.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/convert", web::post().to(convert_handler))
        .route("/timed-link", web::post().to(timed_link_handler))
        .route("/sub", web::get().to(sub_handler));
}

fn error_response(status: StatusCode, kind: &str, detail: String) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "errorKind": kind,
        "detail": detail,
    }))
}

fn convert_error_response(err: &ConvertError) -> HttpResponse {
    let status = match err {
        ConvertError::Decode(DecodeError::EmptyBatch) => StatusCode::BAD_REQUEST,
        ConvertError::Decode(DecodeError::FetchFailed(_)) => StatusCode::BAD_GATEWAY,
        ConvertError::Render(RenderError::TemplateMissing(_)) => StatusCode::NOT_FOUND,
        ConvertError::Render(RenderError::UnsupportedInFormat { .. }) => StatusCode::BAD_REQUEST,
    };
    error_response(status, err.error_kind(), err.to_string())
}

/// Handler for `POST /convert`.
pub async fn convert_handler(
    body: web::Json<ConvertRequest>,
    app_state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    debug!("convert request: source={:?}", body.source);
    let settings = Settings::current();

    match convert(&body, &app_state.templates, &settings).await {
        Ok(outcome) => match outcome.document.to_output_string() {
            Ok(document) => HttpResponse::Ok().json(json!({
                "document": document,
                "filename": outcome.filename,
                "diagnostics": outcome.diagnostics,
            })),
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialize_failed",
                e.to_string(),
            ),
        },
        Err(e) => {
            warn!("conversion failed: {}", e);
            convert_error_response(&e)
        }
    }
}

/// Body of `POST /timed-link`.
#[derive(Debug, Deserialize)]
pub struct TimedLinkRequest {
    pub uris: Vec<String>,
    #[serde(rename = "ttlHours")]
    pub ttl_hours: u32,
}

/// Handler for `POST /timed-link`: wraps each `ss://` URI into a signed
/// expiring link. URIs that cannot be signed are skipped; the request only
/// fails when nothing could be signed.
pub async fn timed_link_handler(body: web::Json<TimedLinkRequest>) -> HttpResponse {
    let settings = Settings::current();
    let now = Utc::now().timestamp();

    let mut links = Vec::with_capacity(body.uris.len());
    for uri in &body.uris {
        match timed_link::generate_timed_link(
            uri,
            body.ttl_hours,
            settings.secret_key.as_bytes(),
            now,
        ) {
            Ok(link) => links.push(link),
            Err(e) => warn!("skipping uri: {}", e),
        }
    }

    if links.is_empty() && !body.uris.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "malformed_link",
            "none of the supplied uris could be signed".to_string(),
        );
    }

    HttpResponse::Ok().json(json!({ "links": links }))
}

/// Query of `GET /sub`.
#[derive(Debug, Deserialize)]
pub struct SubQuery {
    pub expire: Option<u32>,
    pub token: Option<String>,
}

/// Handler for `GET /sub`: verifies the redemption token, then streams a
/// fresh base64 subscription of timed links for the loaded nodes.
pub async fn sub_handler(
    query: web::Query<SubQuery>,
    app_state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let settings = Settings::current();
    let now = Utc::now().timestamp();

    let Some(token) = query.token.as_deref() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_token",
            "token query parameter is required".to_string(),
        );
    };

    let link = match timed_link::unseal(token, settings.secret_key.as_bytes(), now) {
        Ok(link) => link,
        Err(e @ SignError::Malformed(_)) => {
            warn!("redemption rejected: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.error_kind(), e.to_string());
        }
        Err(e) => {
            warn!("redemption rejected: {}", e);
            return error_response(StatusCode::FORBIDDEN, e.error_kind(), e.to_string());
        }
    };
    info!(
        "redemption accepted, token valid until {}",
        timed_link::format_expiry(link.expires_at)
    );

    let ttl_hours = query.expire.unwrap_or(settings.default_expire_hours);
    let body = timed_ss_subscription(
        &app_state.sub_nodes,
        ttl_hours,
        settings.secret_key.as_bytes(),
        now,
    );

    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(body)
}
