//! Writing interceptor replies back through `tiny_http`.

use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::debug;
use crate::intercept::Reply;

pub fn send_reply(request: Request, reply: Reply) -> Result<()> {
    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
    for (name, value) in &reply.headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => debug!("serve"; "dropping invalid header {}", name),
        }
    }
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_reply(request, Reply::text(503, "503 Service Unavailable"))
}
