//! Integration tests for common Switchyard workflows.
//!
//! A small todo API wired the way an application would be: global
//! middleware, an authenticated group, validated bodies and custom misses.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use switchyard::prelude::*;
use switchyard_testing::*;
use switchyard_validation::{RuleSet, Rules, ValidationPipe};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Todo {
    title: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl Rules for Todo {
    fn rules() -> RuleSet {
        RuleSet::new()
            .tags("title", "required,min=3,max=80")
            .unwrap()
            .tags("tags", "max=5")
            .unwrap()
    }
}

type Todos = Arc<Mutex<Vec<Todo>>>;

/// Rejects requests without the expected bearer token.
struct BearerAuth {
    token: &'static str,
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(&self, ctx: &mut Context, next: Next) -> Result<(), Error> {
        let expected = format!("Bearer {}", self.token);
        if ctx.header("authorization") != Some(expected.as_str()) {
            return ctx.abort_with_json(
                StatusCode::UNAUTHORIZED,
                &serde_json::json!({ "error": "Unauthorized", "status": 401 }),
            );
        }
        ctx.set("user", "admin".to_string());
        next.run(ctx).await
    }
}

fn app() -> (TestClient, Todos) {
    let todos: Todos = Arc::new(Mutex::new(Vec::new()));

    let mut engine = Engine::new();
    engine
        .use_middleware(Recovery)
        .use_middleware(RequestId::new())
        .use_middleware(Logger);

    engine
        .get("/health", |ctx| {
            Box::pin(async move {
                ctx.json(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
            })
        })
        .unwrap();

    let mut api = engine.group("/api/v1");

    let list = todos.clone();
    api.get("/todos", move |ctx| {
        let list = list.clone();
        Box::pin(async move {
            let limit: usize = ctx.default_query("limit", "100").parse().unwrap_or(100);
            let page: Vec<Todo> = list
                .lock()
                .map_err(|e| Error::Internal(e.to_string()))?
                .iter()
                .take(limit)
                .cloned()
                .collect();
            ctx.json(StatusCode::OK, &page)
        })
    })
    .unwrap();

    let show = todos.clone();
    api.get("/todos/:id", move |ctx| {
        let show = show.clone();
        Box::pin(async move {
            let id = match ctx.param_as::<usize>("id") {
                Some(Ok(id)) => id,
                _ => return Err(Error::BadRequest("id must be a number".into())),
            };
            let todo = show
                .lock()
                .map_err(|e| Error::Internal(e.to_string()))?
                .get(id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("todo {}", id)))?;
            ctx.json(StatusCode::OK, &todo)
        })
    })
    .unwrap();

    let mut admin = api.group("/admin");
    admin.use_middleware(BearerAuth { token: "s3cret" });

    let create = todos.clone();
    admin
        .post("/todos", move |ctx| {
            let create = create.clone();
            Box::pin(async move {
                let Some(todo) = ValidationPipe::bind::<Todo>(ctx)? else {
                    return Ok(());
                };
                let id = {
                    let mut todos = create.lock().map_err(|e| Error::Internal(e.to_string()))?;
                    todos.push(todo);
                    todos.len() - 1
                };
                let created_by = ctx.must_get::<String>("user").clone();
                ctx.json(
                    StatusCode::CREATED,
                    &serde_json::json!({ "id": id, "created_by": created_by }),
                )
            })
        })
        .unwrap();

    admin
        .delete("/crash", |ctx| {
            Box::pin(async move {
                ctx.string(StatusCode::OK, "partial");
                if ctx.path().ends_with("/crash") {
                    panic!("admin handler crashed");
                }
                Ok(())
            })
        })
        .unwrap();

    engine.no_route(|ctx| {
        Box::pin(async move {
            let path = ctx.path().to_string();
            ctx.json(
                StatusCode::NOT_FOUND,
                &serde_json::json!({ "error": "no such route", "path": path }),
            )
        })
    });

    (TestClient::new(engine), todos)
}

fn admin_post(body: serde_json::Value) -> TestRequestBuilder {
    TestRequestBuilder::new(HttpMethod::POST, "/api/v1/admin/todos")
        .header("Authorization", "Bearer s3cret")
        .json(&body)
        .unwrap()
}

// =============================================================================
// Routing and global middleware
// =============================================================================

#[tokio::test]
async fn test_health_check_carries_request_id() {
    let (client, _) = app();

    let res = client.get("/health").await;
    assert_status(&res, StatusCode::OK);
    assert_json(&res, &serde_json::json!({ "status": "ok" }));
    assert_header_exists(&res, "x-request-id");
}

#[tokio::test]
async fn test_inbound_request_id_is_echoed() {
    let (client, _) = app();

    let res = client
        .send(TestRequestBuilder::new(HttpMethod::GET, "/health").header("X-Request-Id", "abc-123"))
        .await;
    assert_header(&res, "x-request-id", "abc-123");
}

#[tokio::test]
async fn test_custom_not_found_runs_inside_global_middleware() {
    let (client, _) = app();

    let res = client.get("/api/v2/todos").await;
    assert_status(&res, StatusCode::NOT_FOUND);
    assert_json(
        &res,
        &serde_json::json!({ "error": "no such route", "path": "/api/v2/todos" }),
    );
    assert_header_exists(&res, "x-request-id");
}

#[tokio::test]
async fn test_wrong_method_is_405_with_allow() {
    let (client, _) = app();

    let res = client.put("/api/v1/todos/0", "{}").await;
    assert_status(&res, StatusCode::METHOD_NOT_ALLOWED);
    assert_header(&res, "allow", "GET");
}

// =============================================================================
// Groups, auth and validation
// =============================================================================

#[tokio::test]
async fn test_admin_group_requires_token() {
    let (client, todos) = app();

    let res = client
        .post_json("/api/v1/admin/todos", &serde_json::json!({ "title": "write docs" }))
        .await
        .unwrap();
    assert_status(&res, StatusCode::UNAUTHORIZED);
    assert!(todos.lock().unwrap().is_empty());

    // Public routes in the parent group are not affected
    assert_status(&client.get("/api/v1/todos").await, StatusCode::OK);
}

#[tokio::test]
async fn test_create_then_read_back() {
    let (client, _) = app();

    let res = client
        .send(admin_post(serde_json::json!({ "title": "write docs", "tags": ["work"] })))
        .await;
    assert_status(&res, StatusCode::CREATED);
    assert_json(&res, &serde_json::json!({ "id": 0, "created_by": "admin" }));

    let res = client.get("/api/v1/todos/0").await;
    assert_status(&res, StatusCode::OK);
    let todo: Todo = res.body_json().unwrap();
    assert_eq!(todo.title, "write docs");
    assert_eq!(todo.tags, vec!["work".to_string()]);

    let res = client
        .send(TestRequestBuilder::new(HttpMethod::GET, "/api/v1/todos").query("limit", "1"))
        .await;
    let page: Vec<Todo> = res.body_json().unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn test_invalid_todo_lists_every_violation() {
    let (client, todos) = app();

    let res = client
        .send(admin_post(serde_json::json!({
            "title": "no",
            "tags": ["a", "b", "c", "d", "e", "f"],
        })))
        .await;

    assert_status(&res, StatusCode::UNPROCESSABLE_ENTITY);
    assert_violation(&res, "title", "min");
    assert_violation(&res, "tags", "max");
    assert!(todos.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let (client, _) = app();

    let res = client
        .send(
            TestRequestBuilder::new(HttpMethod::POST, "/api/v1/admin/todos")
                .header("Authorization", "Bearer s3cret")
                .header("Content-Type", "application/json")
                .body("{\"title\":"),
        )
        .await;
    assert_status(&res, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Errors and recovery
// =============================================================================

#[tokio::test]
async fn test_handler_errors_render_as_json() {
    let (client, _) = app();

    let res = client.get("/api/v1/todos/42").await;
    assert_status(&res, StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.body_json().unwrap();
    assert_eq!(body["status"], 404);

    let res = client.get("/api/v1/todos/abc").await;
    assert_status(&res, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_panic_is_recovered_with_clean_500() {
    let (client, _) = app();

    let res = client
        .send(
            TestRequestBuilder::new(HttpMethod::DELETE, "/api/v1/admin/crash")
                .header("Authorization", "Bearer s3cret"),
        )
        .await;

    assert_server_error(&res);
    assert_json(
        &res,
        &serde_json::json!({ "error": "Internal Server Error", "status": 500 }),
    );

    // The engine keeps serving after a recovered panic
    assert_status(&client.get("/health").await, StatusCode::OK);
}
