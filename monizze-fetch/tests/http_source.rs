//! Drives `HttpPageSource` against an in-process HTTP server with scripted answers.

use monizze_core::{BearerToken, Error};
use monizze_fetch::{FetchConfig, HistoryPages, HttpPageSource, PageSource, RetryPolicy};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

struct Reply {
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    body: String,
}

fn reply(status: u16, body: &str) -> Reply {
    Reply {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    }
}

/// Request line and Authorization header of every request received.
type Seen = Arc<Mutex<Vec<(String, Option<String>)>>>;

async fn serve(replies: Vec<Reply>) -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let replies = Arc::new(Mutex::new(VecDeque::from(replies)));
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));

    let seen_srv = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match sock.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let head = String::from_utf8_lossy(&buf).to_string();
            let request_line = head.lines().next().unwrap_or_default().to_string();
            let auth = head
                .lines()
                .find(|l| l.to_ascii_lowercase().starts_with("authorization:"))
                .map(|l| l["authorization:".len()..].trim().to_string());
            seen_srv.lock().unwrap().push((request_line, auth));

            let next = replies.lock().unwrap().pop_front();
            let r = next.unwrap_or_else(|| reply(500, "script exhausted"));
            let mut out = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                r.status,
                r.body.len()
            );
            for (k, v) in &r.headers {
                out.push_str(&format!("{k}: {v}\r\n"));
            }
            out.push_str("\r\n");
            out.push_str(&r.body);
            let _ = sock.write_all(out.as_bytes()).await;
            let _ = sock.shutdown().await;
        }
    });

    (format!("http://{addr}"), seen)
}

fn config(base_url: String) -> FetchConfig {
    FetchConfig {
        base_url,
        page_size: 2,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
        ..FetchConfig::default()
    }
}

fn token() -> BearerToken {
    BearerToken::new("tok-123")
}

#[tokio::test]
async fn test_walks_cursor_pages_with_bearer_header() {
    let (base, seen) = serve(vec![
        reply(
            200,
            r#"{"data":{"meal":[{"id":"T1","date":"2024-01-02","amount":"-3.10","detail":"Bakery"}]},"next_cursor":"p2"}"#,
        ),
        reply(200, r#"{"data":{"eco":[{"id":"T2","date":"2024-01-05","amount":"-9.99","detail":"Bio"}]},"next_cursor":null}"#),
    ])
    .await;

    let source = HttpPageSource::new(&token(), &config(base)).unwrap();
    let mut pages = HistoryPages::new(source);
    let mut ids = Vec::new();
    while let Some(page) = pages.next_page().await.unwrap() {
        for e in page.entries {
            ids.push(e.fields["id"].as_str().unwrap().to_string());
        }
    }
    assert_eq!(ids, vec!["T1", "T2"]);
    assert_eq!(pages.into_source().requests(), 2);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].0.starts_with("GET /voucher/history?per_page=2 "), "{}", seen[0].0);
    assert!(seen[1].0.starts_with("GET /voucher/history?cursor=p2&per_page=2 "), "{}", seen[1].0);
    assert!(seen.iter().all(|(_, auth)| auth.as_deref() == Some("Bearer tok-123")));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let (base, seen) = serve(vec![reply(401, r#"{"message":"Unauthenticated."}"#)]).await;

    let mut source = HttpPageSource::new(&token(), &config(base)).unwrap();
    let err = source.fetch_page(None).await.unwrap_err();
    assert!(matches!(err, Error::Authentication { status: 401 }));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let (base, _seen) = serve(vec![
        reply(503, "busy"),
        Reply {
            status: 429,
            headers: vec![("Retry-After", "0")],
            body: String::new(),
        },
        reply(200, r#"{"data":[],"next_cursor":null}"#),
    ])
    .await;

    let mut source = HttpPageSource::new(&token(), &config(base)).unwrap();
    let page = source.fetch_page(None).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(source.requests(), 3);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let (base, seen) = serve(vec![reply(502, ""), reply(502, ""), reply(502, ""), reply(200, "{}")]).await;

    let mut source = HttpPageSource::new(&token(), &config(base)).unwrap();
    let err = source.fetch_page(None).await.unwrap_err();
    assert!(matches!(err, Error::TransientFetch { attempts: 3, .. }), "{err:?}");
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unexpected_shapes_are_protocol_errors() {
    let (base, _seen) = serve(vec![reply(200, "<html>Please log in</html>"), reply(404, "nope")]).await;

    let mut source = HttpPageSource::new(&token(), &config(base)).unwrap();
    let err = source.fetch_page(None).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));

    let err = source.fetch_page(None).await.unwrap_err();
    assert!(matches!(err, Error::Protocol(ref m) if m.contains("404")), "{err:?}");
}

#[tokio::test]
async fn test_connection_refused_exhausts_as_transient() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut source = HttpPageSource::new(&token(), &config(format!("http://{addr}"))).unwrap();
    let err = source.fetch_page(None).await.unwrap_err();
    assert!(matches!(err, Error::TransientFetch { attempts: 3, .. }), "{err:?}");
}
