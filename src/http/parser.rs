use crate::http::request::Request;

const METHOD_GET: &[u8] = b"GET";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The first token of the request line is not exactly `GET`.
    UnsupportedMethod(String),
}

/// Parses the request line out of a single best-effort read.
///
/// Requests split across reads are not reassembled. An empty buffer
/// (the peer closed before sending anything) parses as a GET with an
/// empty target, which the responder will fail to open.
pub fn parse_request(buf: &[u8]) -> Result<Request, ParseError> {
    if buf.is_empty() {
        return Ok(Request::get(""));
    }

    let method_end = buf.iter().position(|&b| b == b' ').unwrap_or(buf.len());
    let method = &buf[..method_end];
    if method != METHOD_GET {
        return Err(ParseError::UnsupportedMethod(
            String::from_utf8_lossy(method).into_owned(),
        ));
    }

    let rest = buf.get(method_end + 1..).unwrap_or_default();
    let target_end = rest.iter().position(|&b| b == b' ').unwrap_or(rest.len());
    let target = String::from_utf8_lossy(&rest[..target_end]);

    Ok(Request::get(target))
}
