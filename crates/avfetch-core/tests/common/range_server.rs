//! Minimal HTTP/1.1 server that supports Range GET for integration tests.
//!
//! Serves a few static bodies by path. Responds to GET with Range with 206
//! Partial Content (416 past the end) and to unknown paths with 404. Can
//! ignore ranges, can leave out Content-Length, and can stall or drop the
//! connection part-way through the first N GETs to exercise retry-and-resume.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// The first this-many GETs send only `drop_after` body bytes, then close.
    pub drop_first_gets: usize,
    pub drop_after: usize,
    /// How long a dropped GET stalls after its last byte before closing.
    pub stall_for: Duration,
    /// Omit Content-Length; the body ends when the connection closes.
    pub omit_length: bool,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            drop_first_gets: 0,
            drop_after: 0,
            stall_for: Duration::ZERO,
            omit_length: false,
        }
    }
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Debug, Clone)]
pub struct RangeServer {
    base: String,
    gets: Arc<AtomicUsize>,
    /// Range start of every GET, in arrival order (`None` = no Range header).
    range_starts: Arc<Mutex<Vec<Option<u64>>>>,
}

impl RangeServer {
    /// e.g. "http://127.0.0.1:12345/video.mp4".
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn range_starts(&self) -> Vec<Option<u64>> {
        self.range_starts.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread serving each `(path, body)`.
pub fn start(files: Vec<(&str, Vec<u8>)>) -> RangeServer {
    start_with_options(files, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior (ranges ignored, dropped connections).
pub fn start_with_options(files: Vec<(&str, Vec<u8>)>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files: Arc<HashMap<String, Vec<u8>>> = Arc::new(
        files
            .into_iter()
            .map(|(p, b)| (format!("/{}", p.trim_start_matches('/')), b))
            .collect(),
    );
    let server = RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        gets: Arc::new(AtomicUsize::new(0)),
        range_starts: Arc::new(Mutex::new(Vec::new())),
    };
    let shared = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let shared = shared.clone();
            thread::spawn(move || handle(stream, &files, &shared, opts));
        }
    });
    server
}

fn handle(
    mut stream: std::net::TcpStream,
    files: &HashMap<String, Vec<u8>>,
    server: &RangeServer,
    opts: RangeServerOptions,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, range) = parse_request(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    let seq = server.gets.fetch_add(1, Ordering::SeqCst);
    server
        .range_starts
        .lock()
        .unwrap()
        .push(range.map(|(start, _)| start));

    let Some(body) = files.get(path) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return;
    };
    let total = body.len() as u64;
    let (status, range_header, slice) = match range.filter(|_| opts.support_ranges) {
        Some((start, end_incl)) => {
            let start = start.min(total);
            let end_incl = end_incl.min(total.saturating_sub(1));
            if total == 0 || start > end_incl {
                ("416 Range Not Satisfiable", format!("bytes */{}", total), &body[0..0])
            } else {
                let start = start as usize;
                let end_excl = (end_incl + 1).min(total) as usize;
                let slice = body.get(start..end_excl).unwrap_or(&body[0..0]);
                (
                    "206 Partial Content",
                    format!("bytes {}-{}/{}", start, end_excl.saturating_sub(1), total),
                    slice,
                )
            }
        }
        None => (
            "200 OK",
            format!("bytes 0-{}/{}", total.saturating_sub(1), total),
            &body[..],
        ),
    };
    let accept_ranges = if opts.support_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };
    let length = if opts.omit_length {
        "Connection: close\r\n".to_string()
    } else {
        format!("Content-Length: {}\r\n", slice.len())
    };
    let response = format!(
        "HTTP/1.1 {}\r\n{}Content-Range: {}\r\n{}\
\r\n",
        status, length, range_header, accept_ranges
    );
    let _ = stream.write_all(response.as_bytes());
    if seq < opts.drop_first_gets {
        let cut = opts.drop_after.min(slice.len());
        let _ = stream.write_all(&slice[..cut]);
        let _ = stream.flush();
        if !opts.stall_for.is_zero() {
            thread::sleep(opts.stall_for);
        }
        let _ = stream.shutdown(Shutdown::Write);
        return;
    }
    let _ = stream.write_all(slice);
}

/// Returns (method, path, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut method = "";
    let mut path = "/";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("");
            path = parts.next().unwrap_or("/");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let part = value[6..].trim();
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, path, range)
}
