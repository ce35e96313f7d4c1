//! Outermost application middleware: stamp the request path into error bodies.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ErrorReport;

pub async fn error_envelope(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let res = next.run(req).await;

    match res.extensions().get::<ErrorReport>().cloned() {
        Some(report) => report.render(Some(&path)),
        None => res,
    }
}
