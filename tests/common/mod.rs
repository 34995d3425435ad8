use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

/// Serve one request with `status` and a body cut off before its declared length.
///
/// Returns the server's base URL.
pub fn truncated_body_server(status: u16) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        drain_request(&mut stream);
        let head = format!(
            "HTTP/1.1 {status} Upstream Error\r\ncontent-type: text/plain\r\ncontent-length: 4096\r\nconnection: close\r\n\r\npartial"
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.flush();
    });

    format!("http://{addr}")
}

fn drain_request(stream: &mut impl Read) {
    let mut received = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(read) = stream.read(&mut chunk) else {
            return;
        };
        if read == 0 {
            return;
        }
        received.extend_from_slice(&chunk[..read]);
        let Some(end) = find(&received, b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&received[..end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= end + 4 + body_len {
            return;
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
