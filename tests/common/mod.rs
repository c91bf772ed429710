#![allow(dead_code)]

pub mod test_server {
    use std::sync::Once;

    static MAY_INIT: Once = Once::new();

    /// Configure the may runtime once per test binary.
    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Reserve an ephemeral port by binding, reading the address and
    /// dropping the listener.
    pub fn ephemeral_addr() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }
}

pub mod http {
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    pub struct RawResponse {
        pub status: u16,
        pub headers: HashMap<String, String>,
        pub body: String,
    }

    /// Send one HTTP/1.1 request over a fresh connection and parse the
    /// response. `Connection: close` is always sent; the body is read to
    /// Content-Length when present, otherwise to EOF.
    pub fn send_request(
        addr: SocketAddr,
        method: &str,
        target: &str,
        extra_headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> RawResponse {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let body = body.unwrap_or("");
        let mut req = format!(
            "{method} {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: {}\r\n",
            body.len()
        );
        for (name, value) in extra_headers {
            req.push_str(&format!("{name}: {value}\r\n"));
        }
        req.push_str("\r\n");
        req.push_str(body);
        stream.write_all(req.as_bytes()).unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(done) = complete(&buf) {
                        if done {
                            break;
                        }
                    }
                }
                Err(_) => break,
            }
        }
        parse_response(&buf)
    }

    /// Whether the buffered response is complete per its Content-Length.
    fn complete(buf: &[u8]) -> Option<bool> {
        let text = String::from_utf8_lossy(buf);
        let header_end = text.find("\r\n\r\n")?;
        let headers = &text[..header_end];
        let body_len = text.len() - (header_end + 4);
        for line in headers.lines() {
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    let expected: usize = value.trim().parse().ok()?;
                    return Some(body_len >= expected);
                }
            }
        }
        None
    }

    fn parse_response(buf: &[u8]) -> RawResponse {
        let text = String::from_utf8_lossy(buf).to_string();
        let (head, body) = text
            .split_once("\r\n\r\n")
            .unwrap_or((text.as_str(), ""));
        let mut lines = head.lines();
        let status_line = lines.next().unwrap_or("");
        let status: u16 = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }
        RawResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }
}
