//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes by path:
//! - `/status/<code>` answers with that status and a short body.
//! - `/hang` reads the request and never answers.
//! - `/bytes/<n>` serves `n` deterministic bytes.
//! - anything else answers 200 with the body `payload:<path>`.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// Starts a server in a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345"). Runs until the process exits.
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || handle(stream));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

/// Body served for a plain path.
pub fn payload_for(path: &str) -> Vec<u8> {
    format!("payload:{path}").into_bytes()
}

/// Body served for `/bytes/<n>`.
pub fn bytes_body(n: usize) -> Vec<u8> {
    (0u8..=250).cycle().take(n).collect()
}

fn handle(mut stream: TcpStream) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    if path == "/hang" {
        // Hold the connection open without responding.
        thread::sleep(Duration::from_secs(60));
        return;
    }

    let (status, body) = if let Some(code) = path.strip_prefix("/status/") {
        let code: u16 = code.parse().unwrap_or(500);
        (format!("{code} Status"), format!("status {code}").into_bytes())
    } else if let Some(n) = path.strip_prefix("/bytes/") {
        ("200 OK".to_string(), bytes_body(n.parse().unwrap_or(0)))
    } else {
        ("200 OK".to_string(), payload_for(path))
    };

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}
