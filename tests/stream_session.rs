use std::cell::{Cell, RefCell};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chatstream::chat::StreamingAnswerDecoder;
use chatstream::chat::http::HttpTransport;
use serde_json::json;

/// Serve one HTTP request, answering with `status` and writing `chunks` with
/// a pause between each. Returns the URL and the raw request head.
fn serve_once(
    status: &'static str,
    chunks: Vec<&'static str>,
) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let url = format!("http://{addr}/v1/conversation/completion");
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));

        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read head");
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = v.trim().parse().unwrap_or(0);
            }
            head.push_str(&line);
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).expect("read body");
        head.push_str(&String::from_utf8_lossy(&body));
        tx.send(head).expect("send head");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n"
        )
        .expect("write status");
        for chunk in chunks {
            stream.write_all(chunk.as_bytes()).expect("write chunk");
            stream.flush().expect("flush");
            thread::sleep(Duration::from_millis(20));
        }
    });

    (url, rx)
}

#[test]
fn streams_answers_then_completes() {
    let (url, head) = serve_once(
        "200 OK",
        vec![
            "data: {\"data\":{\"answer\":\"Hi\"}}\n\n",
            "data: {\"data\":{\"answer\":\"Hi there\",\"reference\":[{\"doc\":1}]}}\n\n",
            "event: message\ndata: garbage\n",
            "data: {\"data\":true}\n\n",
        ],
    );

    let answers = RefCell::new(Vec::new());
    let completions = Cell::new(0);
    let transport = HttpTransport::new(Some(Duration::from_secs(10)), Some("secret".into()))
        .expect("client builds");

    let mut decoder = StreamingAnswerDecoder::new(url);
    decoder.set_answer_callback(|u| {
        answers
            .borrow_mut()
            .push((u.answer.clone(), u.reference.len()))
    });
    decoder.set_complete_callback(|| completions.set(completions.get() + 1));

    let resp = decoder
        .start_session(&transport, json!({"conversation_id": "c1", "messages": []}))
        .expect("stream succeeds");
    assert_eq!(resp.status, 200);
    assert!(resp.body.ends_with("data: {\"data\":true}\n\n"));
    assert_eq!(decoder.current_answer(), "Hi there");

    decoder.cleanup();
    drop(decoder);

    let answers = answers.into_inner();
    assert_eq!(answers.first(), Some(&("Hi".to_string(), 0)));
    assert_eq!(answers.last(), Some(&("Hi there".to_string(), 1)));
    assert_eq!(completions.get(), 1);

    let head = head
        .recv_timeout(Duration::from_secs(5))
        .expect("request seen")
        .to_ascii_lowercase();
    assert!(head.starts_with("post /v1/conversation/completion"));
    assert!(head.contains("accept: text/event-stream"));
    assert!(head.contains("content-type: application/json"));
    assert!(head.contains("authorization: bearer secret"));
    assert!(head.contains("\"conversation_id\":\"c1\""));
}

#[test]
fn non_success_status_is_a_transport_error() {
    let (url, _head) = serve_once("503 Service Unavailable", vec!["busy"]);
    let answers = Cell::new(0);
    let transport = HttpTransport::new(Some(Duration::from_secs(10)), None).expect("client builds");

    let mut decoder = StreamingAnswerDecoder::new(url);
    decoder.set_answer_callback(|_| answers.set(answers.get() + 1));

    let err = decoder
        .start_session(&transport, json!({}))
        .expect_err("503 must fail");
    assert!(err.to_string().contains("HTTP 503"));

    decoder.cleanup();
    drop(decoder);
    assert_eq!(answers.get(), 0);
}
