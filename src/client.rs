//! Outbound HTTP for federation: fetching a remote actor document, which
//! both signature verification (to get a `publicKeyPem`) and delivery (to
//! resolve an inbox) need.

use reqwest::{Client, StatusCode};
use tracing::{error, info};

use crate::{model::Actor, Error, Result};

#[tracing::instrument(level = "debug", skip(http), err)]
pub async fn fetch_actor(http: &Client, uri: &str) -> Result<Actor> {
    let response = http
        .get(uri)
        .header("accept", "application/activity+json")
        .send()
        .await
        .map_err(|e| {
            error!(%uri, error = %e, "failed to fetch actor");
            Error::Federation(format!("failed to fetch actor at {uri}: {e}"))
        })?;

    if response.status() == StatusCode::NOT_FOUND {
        info!(%uri, "actor not found");
        return Err(Error::NotFound(format!("actor {uri}")));
    }
    if !response.status().is_success() {
        return Err(Error::Federation(format!(
            "actor fetch for {uri} returned {}",
            response.status()
        )));
    }

    response
        .json::<Actor>()
        .await
        .map_err(|e| Error::Federation(format!("actor document at {uri} was not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found_error() {
        let err = Error::NotFound("actor https://example.com/@missing".into());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
