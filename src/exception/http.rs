use crate::exception::{BoxError, Exception, ExceptionFilter};
use crate::handler::{DEFAULT_AMBIENT_STATUS, ExceptionHandler};
use axum::response::{IntoResponse, Response};

/// The handler doubles as an exception filter for callers that already hold
/// a boxed error.
impl ExceptionFilter for ExceptionHandler {
    fn catch(&self, error: BoxError) -> Response {
        let exception = Exception::from_boxed(error);
        self.resolve(&exception, DEFAULT_AMBIENT_STATUS)
            .into_response()
    }
}
