use crate::strategy::Reason;
use http::{header::USER_AGENT, HeaderValue};
use reqwest::{Client, Response, Url};
use std::time::Duration;

/// Send a HEAD request to a particular endpoint, failing on anything other
/// than a 2xx.
pub async fn head(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<Response, Reason> {
    log::debug!("Sending HEAD to \"{}\"", url);

    let response = client.head(url.clone()).timeout(timeout).send().await?;

    ensure_ok(response)
}

/// Fetch the body of a web page as text.
pub async fn get_page(
    client: &Client,
    url: &Url,
    timeout: Duration,
    user_agent: &str,
) -> Result<String, Reason> {
    log::debug!("Fetching the page at \"{}\"", url);

    let mut request = client.get(url.clone()).timeout(timeout);

    if let Ok(value) = HeaderValue::from_str(user_agent) {
        request = request.header(USER_AGENT, value);
    }

    let response = ensure_ok(request.send().await?)?;
    let body = response.text().await?;

    Ok(body)
}

fn ensure_ok(response: Response) -> Result<Response, Reason> {
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else {
        Err(Reason::Status(status))
    }
}

/// Does the response say it contains an image?
pub(crate) fn is_image(response: &Response) -> Result<(), Reason> {
    let content_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    match content_type {
        Some(ct) if ct.contains("image") => Ok(()),
        other => Err(Reason::NotAnImage(other.map(String::from))),
    }
}
