use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};

use crate::version;

pub const BOUNDARY: &str = "frame";

const HEADER_CAPACITY: usize = 512;
type HeaderBuf = heapless::String<HEADER_CAPACITY>;

const NOT_FOUND_BODY: &str = "<html><body><h1>404</h1><a href='/'>Home</a></body></html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    NotFound,
    InternalServerError,
}

impl StatusCode {
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

fn overflow(_: std::fmt::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "response header too large")
}

/// Status line plus headers for a complete (non-streamed) response
pub fn write_head<W: Write>(
    w: &mut W,
    status: StatusCode,
    content_type: &str,
    content_length: usize,
    extra: &[(&str, &str)],
) -> io::Result<()> {
    let mut head = HeaderBuf::new();
    write!(
        head,
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
        status.code(),
        status.reason(),
        content_type,
        content_length
    )
    .map_err(overflow)?;
    for (name, value) in extra {
        write!(head, "{}: {}\r\n", name, value).map_err(overflow)?;
    }
    write!(
        head,
        "Server: {}\r\nConnection: close\r\n\r\n",
        version::server_header()
    )
    .map_err(overflow)?;
    w.write_all(head.as_bytes())
}

pub fn send_bytes<W: Write>(
    w: &mut W,
    content_type: &str,
    body: &[u8],
    extra: &[(&str, &str)],
) -> io::Result<()> {
    write_head(w, StatusCode::Ok, content_type, body.len(), extra)?;
    w.write_all(body)?;
    w.flush()
}

pub fn send_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let body = serde_json::to_vec(value).map_err(io::Error::from)?;
    send_bytes(
        w,
        "application/json",
        &body,
        &[("Access-Control-Allow-Origin", "*")],
    )
}

pub fn send_not_found<W: Write>(w: &mut W) -> io::Result<()> {
    write_head(
        w,
        StatusCode::NotFound,
        "text/html; charset=UTF-8",
        NOT_FOUND_BODY.len(),
        &[],
    )?;
    w.write_all(NOT_FOUND_BODY.as_bytes())?;
    w.flush()
}

pub fn send_server_error<W: Write>(w: &mut W, message: &str) -> io::Result<()> {
    let body = format!("<html><body><h1>500</h1><p>{}</p></body></html>", message);
    write_head(
        w,
        StatusCode::InternalServerError,
        "text/html; charset=UTF-8",
        body.len(),
        &[],
    )?;
    w.write_all(body.as_bytes())?;
    w.flush()
}

/// Multipart header, sent once when a stream starts
pub fn write_stream_head<W: Write>(w: &mut W) -> io::Result<()> {
    let mut head = HeaderBuf::new();
    write!(
        head,
        "HTTP/1.1 200 OK\r\n\
         Content-Type: multipart/x-mixed-replace; boundary={}\r\n\
         Connection: keep-alive\r\n\
         Cache-Control: no-cache, no-store, max-age=0, must-revalidate\r\n\
         Pragma: no-cache\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Server: {}\r\n\r\n",
        BOUNDARY,
        version::server_header()
    )
    .map_err(overflow)?;
    w.write_all(head.as_bytes())?;
    w.flush()
}

/// One multipart part carrying a JPEG frame
pub fn write_part<W: Write>(w: &mut W, frame: &[u8]) -> io::Result<()> {
    let mut head: heapless::String<96> = heapless::String::new();
    write!(
        head,
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        frame.len()
    )
    .map_err(overflow)?;
    w.write_all(head.as_bytes())?;
    w.write_all(frame)?;
    w.write_all(b"\r\n")?;
    w.flush()
}
