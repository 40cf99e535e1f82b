//! Minimal HTTP/1.1 request framing

use core::fmt::Write;

use heapless::String;

use crate::error::UplinkError;

/// Request head buffer size
pub const HEAD_CAPACITY: usize = 256;

/// Longest response status line that is inspected
pub const STATUS_LINE_CAPACITY: usize = 64;

/// Format the head of a `POST` carrying a JSON body of `content_length` bytes
pub fn write_post_head(
    host: &str,
    path: &str,
    user_agent: &str,
    content_length: usize,
) -> Result<String<HEAD_CAPACITY>, UplinkError> {
    let mut head = String::<HEAD_CAPACITY>::new();
    write!(
        head,
        "POST {} HTTP/1.1\r\n\
         Host: {}\r\n\
         User-Agent: {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        path, host, user_agent, content_length
    )
    .map_err(|_| UplinkError::PayloadTooLarge)?;
    Ok(head)
}

/// Status code of an `HTTP/1.x NNN reason` line
pub fn parse_status_line(line: &[u8]) -> Option<u16> {
    let line = core::str::from_utf8(line).ok()?;
    let mut parts = line.split_ascii_whitespace();
    if !parts.next()?.starts_with("HTTP/1.") {
        return None;
    }
    let code = parts.next()?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    code.parse().ok()
}
