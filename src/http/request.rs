use std::collections::BTreeMap;
use std::io::Read;
use thiserror::Error;

/// Upper bound of the single request read
pub const REQUEST_BUFFER_SIZE: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("empty request")]
    Empty,

    #[error("malformed request line")]
    MalformedLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Raw query pairs; a repeated key keeps its last value
    pub query: BTreeMap<String, String>,
    /// `Accept-Encoding` named gzip, if that header fit in the first read
    pub accepts_gzip: bool,
}

impl Request {
    /// Parse the request line (and peek at `Accept-Encoding`) from raw bytes
    pub fn parse(raw: &[u8]) -> Result<Self, RequestError> {
        if raw.is_empty() {
            return Err(RequestError::Empty);
        }

        let text = String::from_utf8_lossy(raw);
        let mut lines = text.split("\r\n");
        let request_line = lines.next().unwrap_or_default();

        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Err(RequestError::MalformedLine);
        };
        if !target.starts_with('/') {
            return Err(RequestError::MalformedLine);
        }

        let (path, query) = match target.split_once('?') {
            Some((path, qs)) => (path, parse_query(qs)),
            None => (target, BTreeMap::new()),
        };

        let accepts_gzip = lines
            .take_while(|l| !l.is_empty())
            .filter_map(|l| l.split_once(':'))
            .any(|(name, value)| {
                name.trim().eq_ignore_ascii_case("accept-encoding")
                    && value.to_ascii_lowercase().contains("gzip")
            });

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            query,
            accepts_gzip,
        })
    }

    /// One bounded read from the socket. Whatever arrives in it is the request.
    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<heapless::Vec<u8, REQUEST_BUFFER_SIZE>> {
        let mut buf = [0u8; REQUEST_BUFFER_SIZE];
        let n = reader.read(&mut buf)?;
        let mut out = heapless::Vec::new();
        // n never exceeds the capacity
        let _ = out.extend_from_slice(&buf[..n]);
        Ok(out)
    }
}

/// Split `a=1&b=2`; pairs without `=` are dropped, values are kept verbatim
pub fn parse_query(qs: &str) -> BTreeMap<String, String> {
    qs.split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
