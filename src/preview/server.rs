//! HTTP server for the preview shell page.
//!
//! Serves the same shell at the prototype path and the privileged path; the
//! bridge decides what the page shows. Everything else is a 404.

use std::net::{IpAddr, SocketAddr};

use anyhow::Result;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::embed::preview::{SHELL_HTML, ShellVars};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

const HTML: &str = "text/html; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

/// Paths answered by [`handle_request`].
#[derive(Debug, Clone)]
pub struct ShellRoutes {
    pub path: String,
    pub privileged_path: String,
    pub ws_port: u16,
}

impl ShellRoutes {
    fn matches(&self, url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let path = path.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(path);
        path == self.path || path == self.privileged_path
    }
}

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = String::new();
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    crate::log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let addr = server
                    .server_addr()
                    .to_ip()
                    .unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(anyhow::anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error
    ))
}

/// Serve requests until the server is unblocked.
pub fn run_request_loop(server: &Server, routes: &ShellRoutes) {
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, routes) {
            crate::log!("serve"; "request error: {e}");
        }
    }
}

fn handle_request(request: Request, routes: &ShellRoutes) -> Result<()> {
    crate::debug!("serve"; "{} {}", request.method(), request.url());
    if !matches!(request.method(), Method::Get | Method::Head) {
        return respond(request, 405, PLAIN, "method not allowed".to_string());
    }
    if routes.matches(request.url()) {
        let body = SHELL_HTML.render(&ShellVars {
            ws_port: routes.ws_port,
        });
        return respond(request, 200, HTML, body);
    }
    respond(request, 404, PLAIN, "not found".to_string())
}

fn respond(request: Request, status: u16, content_type: &str, body: String) -> Result<()> {
    let mut response = Response::from_string(body).with_status_code(StatusCode(status));
    if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
        response = response.with_header(header);
    }
    if let Ok(header) = Header::from_bytes("Cache-Control", "no-store") {
        response = response.with_header(header);
    }
    request.respond(response)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, TcpStream};
    use std::sync::Arc;

    fn routes() -> ShellRoutes {
        ShellRoutes {
            path: "/prototype".to_string(),
            privileged_path: "/prototype/privileged".to_string(),
            ws_port: 35730,
        }
    }

    #[test]
    fn test_route_matching() {
        let routes = routes();
        assert!(routes.matches("/prototype"));
        assert!(routes.matches("/prototype?surface=2"));
        assert!(routes.matches("/prototype/"));
        assert!(routes.matches("/prototype/privileged?surface=1"));
        assert!(!routes.matches("/"));
        assert!(!routes.matches("/prototype/other"));
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serves_shell_with_bridge_port() {
        let (server, addr) = bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).unwrap();
        let server = Arc::new(server);
        let worker = {
            let server = Arc::clone(&server);
            std::thread::spawn(move || run_request_loop(&server, &routes()))
        };

        let shell = get(addr, "/prototype?surface=1");
        assert!(shell.starts_with("HTTP/1.1 200"));
        assert!(shell.contains(":35730/"));

        let missing = get(addr, "/favicon.ico");
        assert!(missing.starts_with("HTTP/1.1 404"));

        server.unblock();
        worker.join().unwrap();
    }
}
