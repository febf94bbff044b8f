/// Minimal multipart/form-data parsing: just enough to pull the uploaded
/// image out of a browser POST. Anything malformed yields `None` and the
/// handler reports a client error.

/// Extracts the boundary token from a Content-Type header value like
/// `multipart/form-data; boundary=----WebKitFormBoundaryXXX`.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').to_owned())
}

/// Returns the body bytes of the first part carrying a `filename`
/// attribute, with the trailing CRLF stripped.
pub fn extract_file_part(body: &[u8], boundary: &str) -> Option<Vec<u8>> {
    let delimiter = format!("--{boundary}");
    let delim = delimiter.as_bytes();

    let mut cursor = find_from(body, delim, 0)?;
    loop {
        let part_start = cursor + delim.len();
        if part_start >= body.len() {
            return None;
        }
        let part_end = find_from(body, delim, part_start).unwrap_or(body.len());
        let part = &body[part_start..part_end];

        if let Some(header_end) = find_from(part, b"\r\n\r\n", 0) {
            let headers = String::from_utf8_lossy(&part[..header_end]).to_ascii_lowercase();
            if headers.contains("filename=") {
                let data = &part[header_end + 4..];
                return Some(data.strip_suffix(b"\r\n").unwrap_or(data).to_vec());
            }
        }

        if part_end == body.len() {
            return None;
        }
        cursor = part_end;
    }
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}
