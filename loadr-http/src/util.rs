pub(crate) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

pub(crate) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    let default_port = match parsed.scheme() {
        "https" => 443,
        _ => 80,
    };

    match parsed.port() {
        Some(port) if port != default_port => Some(format!("{host}:{port}")),
        _ => Some(host.to_string()),
    }
}
