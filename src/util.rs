//! Small shared helpers that don't belong to any one module.

use chrono::{DateTime, Utc};

use crate::{Error, Result};

pub fn host_from_uri(uri: &str) -> Result<String> {
    let parsed = url::Url::parse(uri).map_err(|_| Error::InvalidUri { uri: uri.to_owned() })?;
    parsed
        .host_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| Error::InvalidUri { uri: uri.to_owned() })
}

/// RFC 7231 `Date` header format, as used in HTTP signing strings.
pub fn http_date(when: DateTime<Utc>) -> String {
    when.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
