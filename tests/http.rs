//! HTTP executor tests against a single-shot stub SPARQL server.
//!
//! Each stub binds an ephemeral port, serves exactly one canned response,
//! and hands back the raw request it received.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;
use std::time::Duration;

use daki_kg::config::ConnectorConfig;
use daki_kg::connector::GraphDbConnector;
use daki_kg::error::ConnectorError;
use daki_kg::executor::{HttpExecutor, SparqlTransport};
use daki_kg::extract::SearchOutcome;

struct Request {
    head: String,
    body: String,
}

/// Serve one response; `None` for `status` accepts and then never answers.
fn stub(status: Option<(u16, &'static str)>, body: impl Into<String>) -> (String, JoinHandle<Request>) {
    let body = body.into();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!(
        "http://{}/repositories/dakikg",
        listener.local_addr().unwrap()
    );

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            head.push_str(&line);
        }
        let mut body_bytes = vec![0u8; content_length];
        reader.read_exact(&mut body_bytes).unwrap();

        match status {
            Some((code, reason)) => {
                let preamble = format!(
                    "HTTP/1.1 {code} {reason}\r\n\
                     Content-Type: application/sparql-results+json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\r\n",
                    body.len()
                );
                stream.write_all(preamble.as_bytes()).unwrap();
                stream.write_all(body.as_bytes()).unwrap();
            }
            None => std::thread::sleep(Duration::from_secs(3)),
        }

        Request {
            head,
            body: String::from_utf8(body_bytes).unwrap(),
        }
    });

    (url, handle)
}

fn connector(endpoint: &str, timeout_secs: u64) -> GraphDbConnector {
    GraphDbConnector::new(ConnectorConfig {
        endpoint: endpoint.to_string(),
        timeout_secs,
        ..ConnectorConfig::default()
    })
}

const ONE_HIT: &str = r#"{
  "head": { "vars": ["e", "shortLabel"] },
  "results": { "bindings": [
    { "e": { "type": "uri", "value": "http://dakikg.org/drug/DB01050" },
      "shortLabel": { "type": "literal", "value": "Ibuprofen" } }
  ] }
}"#;

#[test]
fn posts_query_with_sparql_protocol_headers() {
    let (url, server) = stub(Some((200, "OK")), ONE_HIT);
    let connector = connector(&url, 5);

    let outcome = connector.search_entities("Ibuprofen", "en").unwrap();
    let labels = outcome.labels().unwrap();
    assert_eq!(labels.get("DB01050"), Some("Ibuprofen"));

    let request = server.join().unwrap();
    let head = request.head.to_ascii_lowercase();
    assert!(head.starts_with("post /repositories/dakikg "));
    assert!(head.contains("content-type: application/sparql-query"));
    assert!(head.contains("accept: application/sparql-results+json"));
    assert!(request.body.contains("rdfs:label"));
    assert!(request.body.contains("LCASE(\"Ibuprofen\")"));
}

#[test]
fn bad_request_is_malformed_query() {
    let (url, server) = stub(
        Some((400, "Bad Request")),
        "MALFORMED QUERY: Lexical error at line 7",
    );
    let executor = HttpExecutor::new(url, Some(Duration::from_secs(5)));

    let err = executor.execute("SELECT ?e WHERE { ?e ?p \"x }").unwrap_err();
    match err {
        ConnectorError::MalformedQuery { query, diagnostic } => {
            assert_eq!(query, "SELECT ?e WHERE { ?e ?p \"x }");
            assert!(diagnostic.contains("Lexical error"));
        }
        other => panic!("expected MalformedQuery, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn unknown_repository_propagates_from_liveness_probe() {
    let (url, server) = stub(Some((404, "Not Found")), "Unknown repository: dakikg");
    let connector = connector(&url, 5);

    match connector.is_alive() {
        Err(ConnectorError::EndpointError { status, message, .. }) => {
            assert_eq!(status, 404);
            assert!(message.contains("Unknown repository"));
        }
        other => panic!("expected EndpointError, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn alive_endpoint_answers_probe() {
    let (url, server) = stub(Some((200, "OK")), r#"{ "head": {}, "boolean": true }"#);
    assert!(connector(&url, 5).is_alive().unwrap());
    assert!(server.join().unwrap().body.contains("ASK"));
}

#[test]
fn refused_connection_is_connection_failed() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/repositories/dakikg", listener.local_addr().unwrap());
    drop(listener);

    let connector = connector(&url, 5);
    match connector.search_entities("Ibuprofen", "en") {
        Err(ConnectorError::ConnectionFailed { endpoint, .. }) => assert_eq!(endpoint, url),
        other => panic!("expected ConnectionFailed, got {other:?}"),
    }
    assert!(!connector.is_alive().unwrap());
}

#[test]
fn hung_endpoint_times_out_as_connection_failure() {
    let (url, server) = stub(None, "");
    let connector = connector(&url, 1);

    let err = connector.search_entities("Ibuprofen", "en").unwrap_err();
    assert!(err.is_connection_failure(), "got {err:?}");
    server.join().unwrap();
}

#[test]
fn non_json_body_is_invalid_response() {
    let (url, server) = stub(Some((200, "OK")), "<html>login required</html>");
    let err = connector(&url, 5)
        .search_adverse_events("Nausea", "en")
        .unwrap_err();
    assert!(matches!(err, ConnectorError::InvalidResponse { .. }), "got {err:?}");
    server.join().unwrap();
}

#[test]
fn empty_bindings_are_the_sentinel() {
    let (url, server) = stub(
        Some((200, "OK")),
        r#"{ "head": { "vars": ["e", "shortLabel"] }, "results": { "bindings": [] } }"#,
    );
    let outcome = connector(&url, 5)
        .search_entities("zzz_no_match", "en")
        .unwrap();
    assert_eq!(outcome, SearchOutcome::NoMatches);
    server.join().unwrap();
}

#[test]
fn large_answer_from_reachable_endpoint_is_alive() {
    // Well past ureq's 10 MB `into_string` cap.
    let padding = " ".repeat(11 * 1024 * 1024);
    let body = format!(r#"{{ "head": {{}},{padding}"boolean": true }}"#);
    let (url, server) = stub(Some((200, "OK")), body);

    assert!(connector(&url, 30).is_alive().unwrap());
    server.join().unwrap();
}
