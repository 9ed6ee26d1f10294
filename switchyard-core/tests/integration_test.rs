//! Integration tests for switchyard-core

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use switchyard_core::*;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Book {
    title: String,
    pages: u32,
}

fn library() -> Engine {
    let mut engine = Engine::with_config(EngineConfig::default().with_max_body_size(64));

    engine
        .post("/books", |ctx| {
            Box::pin(async move {
                let book: Book = ctx.bind()?;
                ctx.json(StatusCode::CREATED, &book)
            })
        })
        .unwrap();

    engine
        .get("/books/:id", |ctx| {
            Box::pin(async move {
                let id: u32 = match ctx.param_as("id") {
                    Some(Ok(id)) => id,
                    _ => return Err(Error::BadRequest("id must be a number".into())),
                };
                let title = ctx.default_query("title", "untitled").to_string();
                ctx.json(StatusCode::OK, &Book { title, pages: id })
            })
        })
        .unwrap();

    engine
        .get("/tags", |ctx| {
            Box::pin(async move {
                let tags: Vec<String> = ctx.query_all("tag").into_iter().map(String::from).collect();
                ctx.json(StatusCode::OK, &tags)
            })
        })
        .unwrap();

    engine
}

#[tokio::test]
async fn test_json_bind_and_respond() {
    let engine = library();
    let book = Book {
        title: "Dune".into(),
        pages: 412,
    };

    let res = engine
        .handle_request(
            HttpRequest::new(HttpMethod::POST, "/books")
                .with_json(&book)
                .unwrap(),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.header("content-type"), Some("application/json"));
    let echoed: Book = serde_json::from_slice(res.body_ref()).unwrap();
    assert_eq!(echoed, book);
}

#[tokio::test]
async fn test_bind_errors_map_to_status() {
    let engine = library();

    let wrong_type = HttpRequest::new(HttpMethod::POST, "/books")
        .with_header("content-type", "text/plain")
        .with_body("title=Dune");
    let res = engine.handle_request(wrong_type).await;
    assert_eq!(res.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let malformed = HttpRequest::new(HttpMethod::POST, "/books")
        .with_header("content-type", "application/json")
        .with_body(r#"{"title": "Dune""#);
    let res = engine.handle_request(malformed).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let empty = HttpRequest::new(HttpMethod::POST, "/books")
        .with_header("content-type", "application/json");
    let res = engine.handle_request(empty).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_params_and_query() {
    let engine = library();

    let res = engine
        .handle_request(HttpRequest::new(
            HttpMethod::GET,
            "/books/7?title=Solaris%20Reissue",
        ))
        .await;
    let book: Book = serde_json::from_slice(res.body_ref()).unwrap();
    assert_eq!(book.title, "Solaris Reissue");
    assert_eq!(book.pages, 7);

    let res = engine
        .handle_request(HttpRequest::new(HttpMethod::GET, "/books/7"))
        .await;
    let book: Book = serde_json::from_slice(res.body_ref()).unwrap();
    assert_eq!(book.title, "untitled");

    let res = engine
        .handle_request(HttpRequest::new(HttpMethod::GET, "/books/seven"))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = engine
        .handle_request(HttpRequest::new(HttpMethod::GET, "/tags?tag=a&tag=b&other=c"))
        .await;
    let tags: Vec<String> = serde_json::from_slice(res.body_ref()).unwrap();
    assert_eq!(tags, vec!["a", "b"]);
}

#[tokio::test]
async fn test_body_limit() {
    let engine = library();
    let oversized = HttpRequest::new(HttpMethod::POST, "/books")
        .with_header("content-type", "application/json")
        .with_body(vec![b' '; 65]);

    let res = engine.handle_request(oversized).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    let body: serde_json::Value = serde_json::from_slice(res.body_ref()).unwrap();
    assert_eq!(body["status"], 413);
}

#[tokio::test]
async fn test_cancellation_is_visible_to_handler() {
    let mut engine = Engine::new();
    engine
        .get("/slow", |ctx| {
            Box::pin(async move {
                let token = ctx.cancellation().clone();
                tokio::select! {
                    _ = token.cancelled() => Err(Error::ServiceUnavailable("client went away".into())),
                    _ = tokio::time::sleep(Duration::from_secs(30)) => {
                        ctx.string(StatusCode::OK, "done");
                        Ok(())
                    }
                }
            })
        })
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let res = engine
        .dispatch(HttpRequest::new(HttpMethod::GET, "/slow"), cancel)
        .await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_store_shared_between_middleware_and_handler() {
    let mut engine = Engine::new();
    engine.use_middleware(middleware_fn(|ctx, next| {
        Box::pin(async move {
            ctx.set("tenant", String::from("acme"));
            ctx.set("quota", 3u32);
            next.run(ctx).await
        })
    }));
    engine
        .get("/whoami", |ctx| {
            Box::pin(async move {
                let tenant = ctx.try_get::<String>("tenant")?.clone();
                let quota = *ctx.must_get::<u32>("quota");
                let wrong = ctx.try_get::<u64>("quota").is_err();
                ctx.json(
                    StatusCode::OK,
                    &serde_json::json!({ "tenant": tenant, "quota": quota, "wrong_type": wrong }),
                )
            })
        })
        .unwrap();

    let res = engine
        .handle_request(HttpRequest::new(HttpMethod::GET, "/whoami"))
        .await;
    let body: serde_json::Value = serde_json::from_slice(res.body_ref()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "tenant": "acme", "quota": 3, "wrong_type": true })
    );
}

#[tokio::test]
async fn test_hyper_adapter_round_trip() {
    let engine = library();

    let req = http::Request::builder()
        .method("POST")
        .uri("/books?draft=1")
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from_static(br#"{"title":"Emma","pages":300}"#)))
        .unwrap();

    let res = engine.handle_hyper(req, CancellationToken::new()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers()["content-type"], "application/json");

    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let book: Book = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(book.title, "Emma");
}

#[tokio::test]
async fn test_hyper_adapter_limits_and_methods() {
    let engine = library();

    let too_big = http::Request::builder()
        .method("POST")
        .uri("/books")
        .body(Full::new(Bytes::from(vec![b'x'; 1024])))
        .unwrap();
    let res = engine.handle_hyper(too_big, CancellationToken::new()).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let trace = http::Request::builder()
        .method("TRACE")
        .uri("/books")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let res = engine.handle_hyper(trace, CancellationToken::new()).await;
    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
}

#[test]
fn test_config_from_toml() {
    let config = EngineConfig::from_toml_str(
        r#"
        addr = "127.0.0.1:4000"
        max_body_size = 512
        request_id_header = "x-correlation-id"
        "#,
    )
    .unwrap();

    let engine = Engine::with_config(config);
    assert_eq!(engine.config().addr, "127.0.0.1:4000");
    assert_eq!(engine.config().max_body_size, 512);
    assert_eq!(engine.config().request_id_header, "x-correlation-id");
}
