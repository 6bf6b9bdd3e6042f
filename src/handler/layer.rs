use crate::exception::{BoxError, Exception};
use crate::handler::{DEFAULT_AMBIENT_STATUS, ExceptionHandler};
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower Layer that turns inner service errors into exception responses
///
/// # Example
/// ```
/// use meshestra_exception::prelude::*;
/// use meshestra_exception::handler::ExceptionLayer;
///
/// let handler = ExceptionHandler::new(HandlerConfiguration::default());
/// let layer = ExceptionLayer::new(handler);
/// # let _ = layer;
/// ```
#[derive(Clone)]
pub struct ExceptionLayer {
    handler: ExceptionHandler,
}

impl ExceptionLayer {
    pub fn new(handler: ExceptionHandler) -> Self {
        Self { handler }
    }
}

impl<S> Layer<S> for ExceptionLayer {
    type Service = ExceptionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionMiddleware {
            inner,
            handler: self.handler.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ExceptionMiddleware<S> {
    inner: S,
    handler: ExceptionHandler,
}

impl<S> Service<Request<Body>> for ExceptionMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match self.inner.poll_ready(cx) {
            Poll::Ready(Err(e)) => {
                // The error surfaces again on the next call.
                let e: BoxError = e.into();
                tracing::warn!("Inner service not ready: {}", e);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Ok(())) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.handler.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match inner.call(req).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    let exception = Exception::from_boxed(e.into());
                    Ok(handler
                        .resolve(&exception, DEFAULT_AMBIENT_STATUS)
                        .into_response())
                }
            }
        })
    }
}
