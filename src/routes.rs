use std::collections::HashMap;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::models::*;
use crate::notify::Notifier;
use crate::repo::{Repo, RepoError};
use crate::storage::MediaStore;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/report-glitch").route(web::post().to(submit_report)))
        .service(web::resource("/reports").route(web::get().to(list_reports)))
        .service(web::resource("/reports/delete").route(web::delete().to(delete_report)))
        .service(web::resource("/reports/resolve").route(web::post().to(resolve_report)))
        .service(web::resource("/contactus/new").route(web::post().to(submit_inquiry)))
        .service(web::resource("/contactus").route(web::get().to(list_inquiries)))
        .service(web::resource("/contactus/delete").route(web::delete().to(delete_inquiry)));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub media_store: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn Notifier>,
}

const ATTACHMENT_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[utoipa::path(
    post,
    path = "/report-glitch",
    responses(
        (status = 200, description = "Report stored", body = Report),
        (status = 400, description = "Missing or empty required field"),
        (status = 413, description = "Attachment too large"),
        (status = 500, description = "Upload or storage failure")
    )
)]
pub async fn submit_report(
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut attachment: Vec<u8> = Vec::new();

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::Validation("malformed multipart payload".into())
    })? {
        let Some(name) = field.content_disposition().get_name().map(str::to_owned) else {
            continue;
        };
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::error!("stream read error: {e}");
            ApiError::Validation("malformed multipart payload".into())
        })? {
            if buf.len() + chunk.len() > ATTACHMENT_SIZE_LIMIT {
                return Ok(HttpResponse::PayloadTooLarge().finish());
            }
            buf.extend_from_slice(&chunk);
        }
        if name == "attachment" {
            attachment = buf;
        } else {
            fields.insert(name, String::from_utf8_lossy(&buf).into_owned());
        }
    }

    let mut new = NewReport::from_fields(&fields).map_err(ApiError::Validation)?;

    // Upload before persisting; an upload failure aborts the request with
    // nothing written.
    let mut uploaded_url: Option<String> = None;
    if !attachment.is_empty() {
        let hash = format!("{:x}", Sha256::digest(&attachment));
        let url = data
            .media_store
            .upload(&hash, &attachment)
            .await
            .map_err(|e| {
                log::error!("attachment upload failed: {e}");
                ApiError::Upload("Failed to upload attachment".into())
            })?;
        new.attachment_url = url.clone();
        uploaded_url = Some(url);
    }

    let report = match data.repo.insert_report(new).await {
        Ok(r) => r,
        Err(e) => {
            log::error!("failed to save report: {e}");
            if let Some(url) = uploaded_url {
                // the row never landed, so the object must not outlive it
                let _ = data.media_store.delete(&url).await;
            }
            return Err(ApiError::Storage("Failed to save report".into()));
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Report submitted successfully",
        "report": report,
    })))
}

#[utoipa::path(
    get,
    path = "/reports",
    responses(
        (status = 200, description = "Pending reports with count message", body = [Report]),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list_reports(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let reports = data.repo.list_reports().await.map_err(|e| {
        log::error!("failed to fetch reports: {e}");
        ApiError::Storage("Failed to fetch reports".into())
    })?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("{} reports found.", reports.len()),
        "reports": reports,
    })))
}

#[utoipa::path(
    delete,
    path = "/reports/delete",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Report soft-deleted"),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Unknown uid or storage failure")
    )
)]
pub async fn delete_report(
    data: web::Data<AppState>,
    payload: web::Json<DeleteRequest>,
) -> Result<HttpResponse, ApiError> {
    match data.repo.soft_delete_report(&payload.uid).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Report deleted successfully.",
        }))),
        Err(RepoError::NotFound) => {
            Err(ApiError::NotFound("No reports found by the given UID".into()))
        }
        Err(e) => {
            log::error!("failed to delete report: {e}");
            Err(ApiError::Storage("Failed to delete report".into()))
        }
    }
}

#[utoipa::path(
    post,
    path = "/reports/resolve",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Report resolved and soft-deleted"),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Unknown uid or storage failure")
    )
)]
pub async fn resolve_report(
    data: web::Data<AppState>,
    payload: web::Json<DeleteRequest>,
) -> Result<HttpResponse, ApiError> {
    let report = match data.repo.get_report_by_uid(&payload.uid).await {
        Ok(r) => r,
        Err(RepoError::NotFound) => {
            return Err(ApiError::NotFound("No reports found by the given UID".into()))
        }
        Err(e) => {
            log::error!("failed to load report for resolve: {e}");
            return Err(ApiError::Storage("Failed to resolve report".into()));
        }
    };

    // Notification is best-effort: a failed notice never blocks resolution.
    if let Err(e) = data.notifier.resolution_notice(&report).await {
        log::warn!("resolution notice for {} failed: {e}", report.uid);
    }

    match data.repo.soft_delete_report(&payload.uid).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Report resolved successfully.",
        }))),
        Err(RepoError::NotFound) => {
            Err(ApiError::NotFound("No reports found by the given UID".into()))
        }
        Err(e) => {
            log::error!("failed to delete resolved report: {e}");
            Err(ApiError::Storage("Failed to resolve report".into()))
        }
    }
}

#[utoipa::path(
    post,
    path = "/contactus/new",
    request_body = NewInquiry,
    responses(
        (status = 200, description = "Inquiry stored"),
        (status = 400, description = "Malformed body or empty field"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn submit_inquiry(
    data: web::Data<AppState>,
    payload: web::Json<NewInquiry>,
) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    new.validate().map_err(ApiError::Validation)?;
    if let Err(e) = data.repo.insert_inquiry(new).await {
        log::error!("failed to save inquiry: {e}");
        return Err(ApiError::Storage("Failed to save inquiry".into()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Inquiry saved successfully",
    })))
}

#[utoipa::path(
    get,
    path = "/contactus",
    responses(
        (status = 200, description = "Pending inquiries with count message", body = [ContactInquiry]),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list_inquiries(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let inquiries = data.repo.list_inquiries().await.map_err(|e| {
        log::error!("failed to fetch inquiries: {e}");
        ApiError::Storage("Failed to fetch inquiries".into())
    })?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("{} inquiries found.", inquiries.len()),
        "inquiries": inquiries,
    })))
}

#[utoipa::path(
    delete,
    path = "/contactus/delete",
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Inquiry soft-deleted"),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Unknown uid or storage failure")
    )
)]
pub async fn delete_inquiry(
    data: web::Data<AppState>,
    payload: web::Json<DeleteRequest>,
) -> Result<HttpResponse, ApiError> {
    match data.repo.soft_delete_inquiry(&payload.uid).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Inquiry deleted successfully.",
        }))),
        Err(RepoError::NotFound) => Err(ApiError::NotFound(
            "No inquiries found by the given UID".into(),
        )),
        Err(e) => {
            log::error!("failed to delete inquiry: {e}");
            Err(ApiError::Storage("Failed to delete inquiry".into()))
        }
    }
}
