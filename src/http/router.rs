use super::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Stream,
    Capture,
    Status,
    Control,
    NotFound,
}

impl Route {
    /// Dispatch on the path alone; headers and body never influence routing
    pub fn for_request(req: &Request) -> Self {
        if req.method != "GET" {
            return Route::NotFound;
        }
        match req.path.as_str() {
            "/" | "/index.html" => Route::Index,
            "/stream" | "/live" | "/video" => Route::Stream,
            "/capture" | "/photo.jpg" | "/image" => Route::Capture,
            "/status" | "/info" => Route::Status,
            "/control" => Route::Control,
            _ => Route::NotFound,
        }
    }
}
