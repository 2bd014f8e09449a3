// Loopback HTTP responder for tests.
// Serves canned responses by path and records every request head it receives.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use reqwest::{Client, StatusCode, header::HeaderMap};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::Fetcher;

/// A canned response for one request path.
#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub path: &'static str,
    pub status: u16,
    pub body: Vec<u8>,
    pub location: Option<String>,
}

impl Route {
    pub fn ok(path: &'static str, body: Vec<u8>) -> Self {
        Self {
            path,
            status: 200,
            body,
            location: None,
        }
    }

    pub fn status(path: &'static str, status: u16) -> Self {
        Self {
            path,
            status,
            body: Vec::new(),
            location: None,
        }
    }

    pub fn redirect(path: &'static str, location: &str) -> Self {
        Self {
            path,
            status: 302,
            body: Vec::new(),
            location: Some(location.to_string()),
        }
    }
}

pub(crate) struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Bind to an ephemeral loopback port and serve `routes` until the runtime stops.
    /// Unknown paths get a 404.
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let routes = Arc::new(routes);
        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(respond(socket, routes.clone(), seen.clone()));
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Raw request heads received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// A fetcher that ignores proxy environment variables.
pub(crate) fn test_fetcher(headers: HeaderMap) -> Fetcher {
    Fetcher::from_builder(Client::builder().no_proxy(), headers).unwrap()
}

async fn respond(mut socket: TcpStream, routes: Arc<Vec<Route>>, seen: Arc<Mutex<Vec<String>>>) {
    let head = read_head(&mut socket).await;
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    seen.lock().unwrap().push(head);

    let route = routes
        .iter()
        .find(|r| r.path == path)
        .cloned()
        .unwrap_or_else(|| Route::status("", 404));

    let reason = StatusCode::from_u16(route.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");

    let mut response = format!("HTTP/1.1 {} {}\r\n", route.status, reason);
    if let Some(location) = &route.location {
        response.push_str(&format!("Location: {}\r\n", location));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        route.body.len()
    ));

    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.write_all(&route.body).await;
    let _ = socket.shutdown().await;
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
