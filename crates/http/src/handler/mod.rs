//! Request handler abstraction.
//!
//! A [`Handler`] receives the fully parsed [`Request`] together with a
//! [`ResponseWriter`] bound to the connection, and is solely responsible for
//! driving the writer through its states. Plain async functions become handlers
//! through [`make_handler`].

use std::error::Error;

use async_trait::async_trait;

use crate::connection::ResponseWriter;
use crate::protocol::Request;

#[async_trait]
pub trait Handler<W>: Send + Sync
where
    W: Send + 'static,
{
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, request: Request, writer: ResponseWriter<W>) -> Result<(), Self::Error>;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<W, Err, F, Fut> Handler<W> for HandlerFn<F>
where
    W: Send + 'static,
    F: Fn(Request, ResponseWriter<W>) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>> + 'static,
    Fut: Future<Output = Result<(), Err>> + Send + 'static,
{
    type Error = Err;

    async fn call(&self, request: Request, writer: ResponseWriter<W>) -> Result<(), Self::Error> {
        (self.f)(request, writer).await
    }
}

pub fn make_handler<F, W, Err, Ret>(f: F) -> HandlerFn<F>
where
    Err: Into<Box<dyn Error + Send + Sync>>,
    Ret: Future<Output = Result<(), Err>>,
    F: Fn(Request, ResponseWriter<W>) -> Ret,
{
    HandlerFn { f }
}
