//! Response wrapper types that set the content-types the ActivityPub and
//! WebFinger specs require instead of axum's default `application/json`.

use axum::{
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `application/activity+json`, for actor/activity/collection documents.
pub struct Activity<T>(pub T);

impl<T: Serialize> IntoResponse for Activity<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.0).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/activity+json".parse().unwrap());
        response
    }
}

/// `application/jrd+json`, for WebFinger and NodeInfo discovery documents.
pub struct Jrd<T>(pub T);

impl<T: Serialize> IntoResponse for Jrd<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.0).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, "application/jrd+json".parse().unwrap());
        response
    }
}
