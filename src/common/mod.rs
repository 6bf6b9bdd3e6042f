pub mod response;

pub use response::{BufferedResponse, CONTENT_TYPE_JSON, RenderedResponse, Resolution, ResponseSink};
