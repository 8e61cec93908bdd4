use crate::error::CsrError;
use crate::routes::BadRequestRejection;
use log::{error, warn};
use serde::Serialize;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

/// An API error serializable to JSON.
#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

// This function receives a `Rejection` and tries to return a custom
// value, otherwise simply passes the rejection along.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message: String;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "NOT FOUND".into();
    } else if let Some(e) = err.find::<CsrError>() {
        message = e.to_string();
        if e.is_caller_error() {
            code = StatusCode::BAD_REQUEST;
            warn!("rejected request: {}", message);
        } else {
            code = StatusCode::INTERNAL_SERVER_ERROR;
            error!("request failed: {:?}", e);
        }
    } else if err.find::<BadRequestRejection>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "BAD REQUEST".into();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "METHOD NOT ALLOWED".into();
    } else {
        // We should have expected this... Just log and say its a 500
        error!("unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "INTERNAL SERVER ERROR".into();
    }

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message,
    });

    Ok(warp::reply::with_status(json, code))
}
