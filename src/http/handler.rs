//! Request handlers.
//!
//! A handler turns one request into one response. In pipelined sessions each
//! call runs on its own task, so calls for the same connection may finish in
//! any order; the session takes care of writing them back in request order.

use std::future::Future;

use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};

pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: Request) -> impl Future<Output = anyhow::Result<Response>> + Send;
}

/// Body served at `/`.
pub const HELLO_BODY: &str = "Hello World\n";

/// Fragments streamed from `/chunked`, one chunk per line.
pub const STORY: [&str; 6] = [
    "Long ago, at the edge of a village, there stood a small mill.\n",
    "The miller kept a ledger of every sack that passed his door,\n",
    "and every evening he read it back aloud, one line at a time,\n",
    "so the villagers could hear their names in the order they came.\n",
    "Nobody was ever read out before a neighbour who arrived earlier,\n",
    "and that, the miller said, was the whole secret of the trade.\n",
];

/// Built-in handler used by the binary.
///
/// - `GET /` answers [`HELLO_BODY`]
/// - `GET /chunked` streams [`STORY`] with chunked framing
/// - `HEAD` is answered like `GET`; the session drops the body
/// - any other path is 404, any other method is 405
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoHandler;

impl Handler for DemoHandler {
    async fn handle(&self, request: Request) -> anyhow::Result<Response> {
        if !matches!(request.method, Method::GET | Method::HEAD) {
            return Ok(Response::method_not_allowed());
        }

        let path = request.path.split('?').next().unwrap_or("/");
        let response = match path {
            "/" => Response::text(HELLO_BODY),
            "/chunked" => ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", "text/plain; charset=utf-8")
                .chunked(STORY)
                .build(),
            _ => Response::not_found(),
        };

        Ok(response)
    }
}
