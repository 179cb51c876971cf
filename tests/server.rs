use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use vocab_card_rust::card::{CardResources, CardTheme};
use vocab_card_rust::{CardPipeline, Enricher, OpenAICompatible, SourceClient};

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

async fn spawn_source() -> SocketAddr {
    let router = Router::new()
        .route(
            "/get",
            get(|| async {
                axum::Json(json!({
                    "data": {
                        "term": "resilient",
                        "meaning": "able to recover quickly",
                        "example": "The resilient team recovered fast.",
                        "synonyms": "tough, hardy"
                    }
                }))
            }),
        )
        .route(
            "/down",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
    spawn(router).await
}

async fn spawn_card_server(source_url: String) -> SocketAddr {
    let pipeline = CardPipeline::new(
        SourceClient::new(source_url),
        Enricher::<OpenAICompatible>::new(None),
        CardResources::builtin(CardTheme::default()),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = vocab_card_rust::server::serve(listener, pipeline).await;
    });
    addr
}

#[tokio::test]
async fn card_routes_return_png() {
    let source = spawn_source().await;
    let server = spawn_card_server(format!("http://{}/get", source)).await;

    for path in ["/", "/card.png"] {
        let response = reqwest::get(format!("http://{}{}", server, path))
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("image/png")
        );
        let bytes = response.bytes().await.expect("body");
        let image = image::load_from_memory(&bytes).expect("decode png");
        assert_eq!((image.width(), image.height()), (1200, 1400));
    }
}

#[tokio::test]
async fn upstream_failure_is_plain_text_500() {
    let source = spawn_source().await;
    let server = spawn_card_server(format!("http://{}/down", source)).await;

    let response = reqwest::get(format!("http://{}/card.png", server))
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
    let body = response.text().await.expect("body");
    assert!(body.starts_with("Error: "), "{}", body);
    assert!(body.contains("503"), "{}", body);
}

#[tokio::test]
async fn health_reports_ok() {
    let source = spawn_source().await;
    let server = spawn_card_server(format!("http://{}/get", source)).await;
    let body: serde_json::Value = reqwest::get(format!("http://{}/health", server))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(body, json!({"status": "ok"}));
}
