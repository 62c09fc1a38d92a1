pub mod page;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod status;
pub mod stream;

pub use request::{Request, RequestError};
pub use router::Route;
pub use server::{serve_connection, HttpServer};
pub use status::StatusDocument;
pub use stream::{run_stream, StreamEnd, StreamSummary};
