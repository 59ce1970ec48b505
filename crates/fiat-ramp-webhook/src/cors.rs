use actix_cors::Cors;

use fiat_ramp::SIGNATURE_HEADER;

/// Build the CORS middleware. With no configured origins only localhost
/// (any port) is allowed; providers call the webhook server-to-server, so
/// this mostly matters for operators poking at `/health` from a browser.
/// A `*` entry allows any origin.
pub fn build_cors(origins: &[String]) -> Cors {
    let base = if origins.iter().any(|o| o == "*") {
        Cors::default().allow_any_origin()
    } else if origins.is_empty() {
        Cors::default().allowed_origin_fn(|origin, _| {
            origin
                .to_str()
                .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                .unwrap_or(false)
        })
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    base.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![
            "content-type".to_string(),
            "authorization".to_string(),
            SIGNATURE_HEADER.to_ascii_lowercase(),
        ])
        .max_age(3600)
}
