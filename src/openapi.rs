use crate::models::{ContactInquiry, DeleteRequest, NewInquiry, Report};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::submit_report,
        crate::routes::list_reports,
        crate::routes::delete_report,
        crate::routes::resolve_report,
        crate::routes::submit_inquiry,
        crate::routes::list_inquiries,
        crate::routes::delete_inquiry,
    ),
    components(schemas(Report, ContactInquiry, NewInquiry, DeleteRequest)),
    tags(
        (name = "reports", description = "Glitch report intake and dashboard operations"),
        (name = "contactus", description = "Contact inquiry intake and dashboard operations"),
    )
)]
pub struct ApiDoc;
