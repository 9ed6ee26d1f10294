//! Integration tests for Route Groups

use async_trait::async_trait;
use http::StatusCode;
use std::sync::{Arc, Mutex};
use switchyard_core::*;

type Log = Arc<Mutex<Vec<&'static str>>>;

struct Mark {
    name: &'static str,
    log: Log,
}

#[async_trait]
impl Middleware for Mark {
    async fn handle(&self, ctx: &mut Context, next: Next) -> Result<(), Error> {
        self.log.lock().unwrap().push(self.name);
        next.run(ctx).await
    }
}

fn mark(name: &'static str, log: &Log) -> Mark {
    Mark {
        name,
        log: log.clone(),
    }
}

fn ok(ctx: &mut Context) -> BoxFuture<'_, Result<(), Error>> {
    Box::pin(async move {
        let path = ctx.path().to_string();
        ctx.string(StatusCode::OK, path);
        Ok(())
    })
}

async fn get(engine: &Engine, path: &str) -> HttpResponse {
    engine
        .handle_request(HttpRequest::new(HttpMethod::GET, path))
        .await
}

#[tokio::test]
async fn test_nested_group_prefix() {
    let mut engine = Engine::new();
    {
        let mut v1 = engine.group("/v1");
        let mut api = v1.group("/api");
        api.get("/users", ok).unwrap();
    }

    let res = get(&engine, "/v1/api/users").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(get(&engine, "/api/users").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&engine, "/v1/users").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_group_middleware_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new();
    engine.use_middleware(mark("global", &log));
    {
        let mut outer = engine.group("/outer");
        outer.use_middleware(mark("outer-1", &log));
        outer.use_middleware(mark("outer-2", &log));
        let mut inner = outer.group("/inner");
        inner.use_middleware(mark("inner", &log));
        inner.get("/x", ok).unwrap();
    }

    get(&engine, "/outer/inner/x").await;
    assert_eq!(
        *log.lock().unwrap(),
        vec!["global", "outer-1", "outer-2", "inner"]
    );
}

#[tokio::test]
async fn test_child_use_does_not_touch_parent() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new();
    {
        let mut parent = engine.group("/p");
        parent.use_middleware(mark("parent", &log));
        {
            let mut child = parent.group("/c");
            child.use_middleware(mark("child", &log));
            child.get("/leaf", ok).unwrap();
        }
        parent.get("/own", ok).unwrap();
    }

    get(&engine, "/p/own").await;
    assert_eq!(*log.lock().unwrap(), vec!["parent"]);

    log.lock().unwrap().clear();
    get(&engine, "/p/c/leaf").await;
    assert_eq!(*log.lock().unwrap(), vec!["parent", "child"]);
}

#[tokio::test]
async fn test_sibling_groups_are_independent() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new();
    {
        let mut admin = engine.group("/admin");
        admin.use_middleware(mark("admin", &log));
        admin.get("/stats", ok).unwrap();
    }
    engine.group("/public").get("/stats", ok).unwrap();

    get(&engine, "/public/stats").await;
    assert!(log.lock().unwrap().is_empty());

    get(&engine, "/admin/stats").await;
    assert_eq!(*log.lock().unwrap(), vec!["admin"]);
}

#[tokio::test]
async fn test_group_middleware_skipped_for_misses() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new();
    {
        let mut api = engine.group("/api");
        api.use_middleware(mark("api", &log));
        api.get("/users", ok).unwrap();
    }

    assert_eq!(
        get(&engine, "/api/unknown").await.status,
        StatusCode::NOT_FOUND
    );
    let res = engine
        .handle_request(HttpRequest::new(HttpMethod::POST, "/api/users"))
        .await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_group_short_circuit() {
    let mut engine = Engine::new();
    {
        let mut admin = engine.group("/admin");
        admin.use_middleware(middleware_fn(|ctx, next| {
            Box::pin(async move {
                if ctx.header("x-admin").is_none() {
                    ctx.abort_with_status(StatusCode::FORBIDDEN);
                    return Ok(());
                }
                next.run(ctx).await
            })
        }));
        admin.delete("/users/:id", ok).unwrap();
    }

    let res = engine
        .handle_request(HttpRequest::new(HttpMethod::DELETE, "/admin/users/3"))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = engine
        .handle_request(
            HttpRequest::new(HttpMethod::DELETE, "/admin/users/3").with_header("x-admin", "1"),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body_string().unwrap(), "/admin/users/3");
}

#[test]
fn test_group_prefix_normalization() {
    let mut engine = Engine::new();
    let mut group = engine.group("api//v2/");
    assert_eq!(group.prefix(), "/api/v2");
    assert_eq!(group.group("").prefix(), "/api/v2");
    assert_eq!(group.group("/").prefix(), "/api/v2");
}
