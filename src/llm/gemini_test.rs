use super::*;

fn make_response(parts: serde_json::Value) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 34, "totalTokenCount": 46 },
        "modelVersion": "gemini-2.0-flash-exp"
    })
    .to_string()
}

// =============================================================================
// parse_response
// =============================================================================

#[test]
fn parse_text_response() {
    let json = make_response(serde_json::json!([{ "text": "Sui Move adalah bahasa smart contract." }]));
    let resp = parse_response(&json, "gemini-2.0-flash-exp").unwrap();
    assert_eq!(resp.text.as_deref(), Some("Sui Move adalah bahasa smart contract."));
    assert_eq!(resp.model, "gemini-2.0-flash-exp");
    assert_eq!(resp.finish_reason.as_deref(), Some("STOP"));
    assert_eq!(resp.input_tokens, 12);
    assert_eq!(resp.output_tokens, 34);
}

#[test]
fn parse_concatenates_text_parts() {
    let json = make_response(serde_json::json!([{ "text": "Hello " }, { "text": "world" }]));
    let resp = parse_response(&json, "m").unwrap();
    assert_eq!(resp.text.as_deref(), Some("Hello world"));
}

#[test]
fn parse_skips_thought_parts() {
    let json = make_response(serde_json::json!([
        { "text": "thinking about objects...", "thought": true },
        { "text": "Use `object::new(ctx)`." }
    ]));
    let resp = parse_response(&json, "m").unwrap();
    assert_eq!(resp.text.as_deref(), Some("Use `object::new(ctx)`."));
}

#[test]
fn parse_empty_text_is_none() {
    let json = make_response(serde_json::json!([{ "text": "" }]));
    let resp = parse_response(&json, "m").unwrap();
    assert_eq!(resp.text, None);
}

#[test]
fn parse_no_candidates_is_none() {
    let resp = parse_response("{}", "gemini-2.0-flash-exp").unwrap();
    assert_eq!(resp.text, None);
    assert_eq!(resp.model, "gemini-2.0-flash-exp");
    assert_eq!(resp.input_tokens, 0);
}

#[test]
fn parse_blocked_prompt() {
    let json = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
    let resp = parse_response(&json, "m").unwrap();
    assert_eq!(resp.text, None);
    assert_eq!(resp.block_reason.as_deref(), Some("SAFETY"));
}

#[test]
fn parse_candidate_without_content() {
    let json = serde_json::json!({ "candidates": [{ "finishReason": "SAFETY" }] }).to_string();
    let resp = parse_response(&json, "m").unwrap();
    assert_eq!(resp.text, None);
    assert_eq!(resp.finish_reason.as_deref(), Some("SAFETY"));
}

#[test]
fn parse_invalid_json() {
    let err = parse_response("not json", "m").unwrap_err();
    assert!(matches!(err, LlmError::ApiParse(_)));
}

// =============================================================================
// build_request
// =============================================================================

#[test]
fn request_carries_system_instruction_and_user_turn() {
    let messages = vec![Message::user("Apa itu Sui Move?")];
    let body = serde_json::to_value(build_request("be concise", &messages, None)).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": "be concise" }] },
            "contents": [{ "role": "user", "parts": [{ "text": "Apa itu Sui Move?" }] }]
        })
    );
}

#[test]
fn request_includes_generation_config_when_set() {
    let messages = vec![Message::user("hi")];
    let body = serde_json::to_value(build_request("", &messages, Some(1024))).unwrap();
    assert!(body.get("systemInstruction").is_none());
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
}

#[test]
fn endpoint_formats_model_path() {
    assert_eq!(
        endpoint("https://generativelanguage.googleapis.com/v1beta", "gemini-2.0-flash-exp"),
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent"
    );
}

// =============================================================================
// generate
// =============================================================================

#[tokio::test]
async fn generate_without_key_fails_before_network() {
    let client = GeminiClient::new(
        None,
        "DOCUSAURUS_GEMINI_API_KEY".into(),
        "http://127.0.0.1:9".into(),
        LlmTimeouts::default(),
    )
    .unwrap();
    let err = client
        .generate("m", None, "sys", &[Message::user("hi")])
        .await
        .unwrap_err();
    assert_eq!(err, LlmError::MissingApiKey { var: "DOCUSAURUS_GEMINI_API_KEY".into() });
}

#[tokio::test]
async fn generate_unreachable_host_is_request_error() {
    let client = GeminiClient::new(
        Some("key".into()),
        "DOCUSAURUS_GEMINI_API_KEY".into(),
        "http://127.0.0.1:9".into(),
        LlmTimeouts { request_secs: 5, connect_secs: 2 },
    )
    .unwrap();
    let err = client
        .generate("m", None, "sys", &[Message::user("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::ApiRequest(_)));
}

/// Serve one canned HTTP response on a loopback port. The handle yields the
/// raw request that was received.
async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .map_or(0, |v| v.trim().parse::<usize>().unwrap());
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    });
    (base_url, handle)
}

fn local_client(base_url: String) -> GeminiClient {
    GeminiClient::new(
        Some("test-key".into()),
        "DOCUSAURUS_GEMINI_API_KEY".into(),
        base_url,
        LlmTimeouts { request_secs: 5, connect_secs: 2 },
    )
    .unwrap()
}

#[tokio::test]
async fn generate_non_success_status_is_api_response_error() {
    let (base_url, server) = serve_once("401 Unauthorized", r#"{"error":{"message":"API key not valid"}}"#).await;

    let err = local_client(base_url)
        .generate("gemini-2.0-flash-exp", None, "sys", &[Message::user("hi")])
        .await
        .unwrap_err();

    match err {
        LlmError::ApiResponse { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("API key not valid"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1beta/models/gemini-2.0-flash-exp:generateContent "));
    assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));
}

#[tokio::test]
async fn generate_success_parses_reply_text() {
    let body = r#"{"candidates":[{"content":{"parts":[{"text":"Sui Move adalah..."}]},"finishReason":"STOP"}]}"#;
    let (base_url, server) = serve_once("200 OK", body).await;

    let resp = local_client(base_url)
        .generate("m", Some(256), "sys", &[Message::user("Apa itu Sui Move?")])
        .await
        .unwrap();

    assert_eq!(resp.text.as_deref(), Some("Sui Move adalah..."));
    assert_eq!(resp.finish_reason.as_deref(), Some("STOP"));
    let request = server.await.unwrap();
    assert!(request.contains(r#""maxOutputTokens":256"#));
}
