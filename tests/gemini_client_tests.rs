use std::sync::{Arc, Mutex};
use std::time::Duration;

use agrigenius_backend::services::agronomist::Agronomist;
use agrigenius_backend::services::diagnosis::CropImage;
use agrigenius_backend::services::gemini::{GeminiClient, GeminiError};
use agrigenius_backend::services::session_manager::ChatMessage;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures_util::StreamExt;
use serde_json::{Value, json};

const API_KEY: &str = "test-key";

type Seen = Arc<Mutex<Vec<Value>>>;

/// Stands in for the Gemini REST API on a local port.
async fn upstream(
    State(seen): State<Seen>,
    Path(action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return (StatusCode::FORBIDDEN, "bad key").into_response();
    }
    seen.lock().unwrap().push(body.clone());

    let Some((model, method)) = action.split_once(':') else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if model == "broken" {
        return (StatusCode::SERVICE_UNAVAILABLE, "model overloaded").into_response();
    }

    match method {
        "generateContent" if body.get("tools").is_some() => Json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Soybean demand is rising."}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://markets.example/soy", "title": "Soy report"}},
                    {"web": {"uri": "https://markets.example/untitled"}}
                ]}
            }]
        }))
        .into_response(),
        "generateContent" => {
            let diagnosis = json!({
                "is_healthy": false,
                "disease": "Powdery Mildew",
                "description": "White powdery spots.",
                "causes": ["High humidity"],
                "organic_treatments": ["Neem oil"],
                "chemical_treatments": ["Sulfur fungicide"]
            });
            Json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": diagnosis.to_string()}]}
                }]
            }))
            .into_response()
        }
        "streamGenerateContent" => {
            let chunk = |text: &str| {
                json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
            };
            if model == "slow" {
                // Each gap is well under the client timeout; the whole reply is not.
                let chunks: Vec<String> = ["Mulch ", "keeps ", "soil ", "moist."]
                    .iter()
                    .map(|text| format!("data: {}\r\n\r\n", chunk(text)))
                    .collect();
                let paced = futures_util::stream::iter(chunks).then(|frame| async move {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Ok::<_, std::convert::Infallible>(frame)
                });
                return (
                    [(header::CONTENT_TYPE, "text/event-stream")],
                    Body::from_stream(paced),
                )
                    .into_response();
            }
            if model == "flaky" {
                let failure = json!({
                    "error": {"code": 500, "message": "Internal error encountered.", "status": "INTERNAL"}
                });
                let body = format!("data: {}\r\n\r\ndata: {}\r\n\r\n", chunk("Water "), failure);
                return ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response();
            }
            let body = format!(
                "data: {}\r\n\r\ndata: {}\r\n\r\ndata: {}\r\n\r\n",
                chunk("Water "),
                chunk(""),
                chunk("early.")
            );
            ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_upstream() -> (String, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/v1beta/models/{action}", post(upstream))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1beta"), seen)
}

fn client(base: &str, model: &str) -> GeminiClient {
    GeminiClient::new(base, model, API_KEY, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_diagnose_parses_structured_json() {
    let (base, seen) = start_upstream().await;
    let gemini = client(&base, "gemini-2.5-flash");

    let image = CropImage { mime_type: "image/jpeg".into(), data: "aGVsbG8=".into() };
    let diagnosis = gemini.diagnose(&image).await.unwrap();
    assert!(!diagnosis.is_healthy);
    assert_eq!(diagnosis.disease, "Powdery Mildew");
    assert_eq!(diagnosis.organic_treatments, vec!["Neem oil".to_string()]);

    let request = seen.lock().unwrap()[0].clone();
    assert_eq!(request["contents"][0]["parts"][0]["inlineData"]["data"], "aGVsbG8=");
    assert_eq!(request["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(request["generationConfig"]["responseSchema"]["type"], "OBJECT");
}

#[tokio::test]
async fn test_market_trend_collects_citations() {
    let (base, seen) = start_upstream().await;
    let gemini = client(&base, "gemini-2.5-flash");

    let trend = gemini.market_trend("Soybeans").await.unwrap();
    assert_eq!(trend.summary, "Soybean demand is rising.");
    assert_eq!(trend.sources.len(), 2);
    assert_eq!(trend.sources[0].title, "Soy report");
    assert_eq!(trend.sources[1].title, "https://markets.example/untitled");

    let request = seen.lock().unwrap()[0].clone();
    assert!(request["tools"][0]["googleSearch"].is_object());
    assert!(
        request["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Soybeans")
    );
}

#[tokio::test]
async fn test_chat_stream_yields_fragments_in_order() {
    let (base, seen) = start_upstream().await;
    let gemini = client(&base, "gemini-2.5-flash");

    let history = vec![ChatMessage::user("Hi"), ChatMessage::model("Hello!")];
    let fragments: Vec<String> = gemini
        .chat_stream(&history, "When to water?")
        .await
        .unwrap()
        .map(|f| f.unwrap())
        .collect()
        .await;
    // Empty chunks are dropped.
    assert_eq!(fragments, vec!["Water ".to_string(), "early.".to_string()]);

    let request = seen.lock().unwrap()[0].clone();
    assert_eq!(request["contents"].as_array().unwrap().len(), 3);
    assert!(
        request["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("You are AgriBot")
    );
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (base, _) = start_upstream().await;
    let gemini = client(&base, "broken");

    let err = gemini.market_trend("Rice").await.unwrap_err();
    match err {
        GeminiError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "model overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }

    let wrong_key = GeminiClient::new(&base, "gemini-2.5-flash", "nope", Duration::from_secs(5))
        .unwrap();
    let err = wrong_key.market_trend("Rice").await.unwrap_err();
    assert!(matches!(err, GeminiError::Status { status: 403, .. }));
}

#[tokio::test]
async fn test_error_inside_stream_is_surfaced() {
    let (base, _) = start_upstream().await;
    let gemini = client(&base, "flaky");

    let items: Vec<_> = gemini
        .chat_stream(&[], "When to water?")
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_deref().unwrap(), "Water ");
    match &items[1] {
        Err(GeminiError::Api { code, message }) => {
            assert_eq!(*code, 500);
            assert!(message.contains("Internal error"));
        }
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_long_stream_outlives_the_request_timeout() {
    let (base, _) = start_upstream().await;
    let gemini = GeminiClient::new(&base, "slow", API_KEY, Duration::from_millis(400)).unwrap();

    let fragments: Vec<String> = gemini
        .chat_stream(&[], "How do I keep soil moist?")
        .await
        .unwrap()
        .map(|f| f.unwrap())
        .collect()
        .await;
    assert_eq!(fragments.concat(), "Mulch keeps soil moist.");
}
