//! Minimal loopback HTTP server for exercising the reqwest-backed clients.
//!
//! Each [`StubServer`] answers a fixed list of responses, one per accepted
//! connection, and hands back what it received once the test is done.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use reqwest::Url;

/// One request as seen on the wire.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    /// Decoded query string pairs.
    pub fn query(&self) -> HashMap<String, String> {
        let query = self.target.split_once('?').map(|(_, q)| q).unwrap_or("");
        decode_pairs(query)
    }

    /// Decoded `application/x-www-form-urlencoded` body.
    pub fn form(&self) -> HashMap<String, String> {
        decode_pairs(&self.body)
    }
}

fn decode_pairs(encoded: &str) -> HashMap<String, String> {
    let url = Url::parse(&format!("http://stub.invalid/?{encoded}")).expect("valid query");
    url.query_pairs().into_owned().collect()
}

pub struct StubServer {
    base_url: String,
    handle: JoinHandle<Vec<CapturedRequest>>,
}

impl StubServer {
    /// Bind an ephemeral loopback port and serve `responses` in order.
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            let mut captured = Vec::with_capacity(responses.len());
            for (status, body) in responses {
                let (stream, _) = listener.accept().expect("accept connection");
                captured.push(serve_one(stream, status, &body));
            }
            captured
        });
        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Serve a single JSON response.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self::start(vec![(status, body.into())])
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Wait for every scripted response to be served.
    pub fn requests(self) -> Vec<CapturedRequest> {
        self.handle.join().expect("stub server thread")
    }
}

fn serve_one(stream: TcpStream, status: u16, body: &str) -> CapturedRequest {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

    let mut request_line = String::new();
    reader.read_line(&mut request_line).expect("request line");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("header line");
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut raw_body = vec![0; length];
    reader.read_exact(&mut raw_body).expect("request body");

    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut stream = stream;
    stream.write_all(response.as_bytes()).expect("write response");
    stream.flush().expect("flush response");

    CapturedRequest {
        method,
        target,
        headers,
        body: String::from_utf8(raw_body).expect("utf-8 body"),
    }
}
