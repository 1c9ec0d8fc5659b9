use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use assert_matches::assert_matches;

use cnpj_enrich::domain::Cnpj;
use cnpj_enrich::error::EnrichError;
use cnpj_enrich::registry::{ReceitaHttpClient, RegistryClient, RetryPolicy};

/// Serves the same canned response to every request and counts the hits.
fn serve(status: u16, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(read) => request.extend_from_slice(&buf[..read]),
                }
            }
            counter.fetch_add(1, Ordering::SeqCst);
            let response = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    (format!("http://{addr}/v1/cnpj"), hits)
}

fn client(base_url: &str) -> ReceitaHttpClient {
    ReceitaHttpClient::new(
        base_url,
        Duration::from_secs(5),
        RetryPolicy {
            max_attempts: 5,
            backoff_base: Duration::from_millis(1),
        },
    )
    .unwrap()
}

fn cnpj() -> Cnpj {
    Cnpj::from_raw("12.345.678/0001-99")
}

#[test]
fn unavailable_is_retried_up_to_max_attempts() {
    let (base_url, hits) = serve(503, r#"{"message":"busy"}"#);

    let err = client(&base_url).lookup(&cnpj()).unwrap_err();

    assert_matches!(err, EnrichError::RegistryStatus { status: 503, .. });
    assert_eq!(hits.load(Ordering::SeqCst), 5);
}

#[test]
fn rate_limited_is_retried() {
    let (base_url, hits) = serve(429, "{}");

    let err = client(&base_url).lookup(&cnpj()).unwrap_err();

    assert_matches!(err, EnrichError::RegistryStatus { status: 429, .. });
    assert_eq!(hits.load(Ordering::SeqCst), 5);
}

#[test]
fn not_found_is_not_retried() {
    let (base_url, hits) = serve(404, r#"{"message":"not found"}"#);

    let err = client(&base_url).lookup(&cnpj()).unwrap_err();

    assert_matches!(err, EnrichError::RegistryStatus { status: 404, .. });
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn in_band_error_is_rejected_without_retry() {
    let (base_url, hits) = serve(200, r#"{"status":"ERROR","message":"CNPJ inválido"}"#);

    let err = client(&base_url).lookup(&cnpj()).unwrap_err();

    assert_matches!(
        err,
        EnrichError::RegistryRejected { cnpj, message }
            if cnpj == "12345678000199" && message == "CNPJ inválido"
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn ok_payload_is_returned() {
    let (base_url, hits) = serve(200, r#"{"status":"OK","nome":"ACME LTDA"}"#);

    let payload = client(&base_url).lookup(&cnpj()).unwrap();

    assert_eq!(payload["nome"], "ACME LTDA");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
