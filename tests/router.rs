//! End-to-end dispatch behavior through the public API.

use std::sync::{Arc, Mutex};

use junction::{
    Error, Method, MiddlewareConfig, Next, Request, Response, Router, Status,
};
use serde_json::json;

fn request(method: Method, path: &str) -> Request {
    Request::builder().method(method).path(path).build()
}

#[tokio::test]
async fn each_pair_reaches_its_own_handler() {
    let mut router = Router::new();
    for (method, path, tag) in [
        (Method::Get, "/orders", "list"),
        (Method::Post, "/orders", "create"),
        (Method::Get, "/users", "users"),
    ] {
        router.add_route(method, path, move |_req: Request| async move {
            Response::text(tag)
        });
    }

    for (method, path, tag) in [
        (Method::Get, "/orders", "list"),
        (Method::Post, "/orders", "create"),
        (Method::Get, "/users", "users"),
    ] {
        let resp = router.handle_request(request(method, path)).await.unwrap();
        assert_eq!(resp.body(), &json!(tag), "{method} {path}");
    }
}

#[tokio::test]
async fn unknown_method_string_degrades_gracefully() {
    let mut router = Router::new();
    router.add_route(Method::Get, "/orders", |_req: Request| async {
        Response::text("ok")
    });

    // Non-standard methods never reach a handler, and never crash either.
    let req = Request::builder().method("BREW").path("/orders").build();
    assert_eq!(router.handle_request(req).await.unwrap().status_code(), 405);

    let req = Request::builder().method("BREW").path("/teapot").build();
    assert_eq!(router.handle_request(req).await.unwrap().status_code(), 404);
}

#[tokio::test]
async fn custom_method_not_allowed_handler_replaces_default() {
    let mut router = Router::new();
    router.add_route(Method::Get, "/orders", |_req: Request| async {
        Response::text("ok")
    });
    router.set_method_not_allowed_handler(|req: Request| async move {
        Response::builder()
            .status(Status::MethodNotAllowed)
            .json(json!({"rejected": req.method()}))
    });

    let resp = router
        .handle_request(request(Method::Delete, "/orders"))
        .await
        .unwrap();
    assert_eq!(resp.body(), &json!({"rejected": "DELETE"}));
}

#[tokio::test]
async fn exclusion_precedence_method_beats_header() {
    let ran = Arc::new(Mutex::new(false));
    let mut router = Router::new();
    router.add_route(Method::Options, "/orders", |_req: Request| async {
        Response::status(Status::Ok)
    });

    let flag = Arc::clone(&ran);
    router.use_pre(
        move |req: Request, next: Next| {
            *flag.lock().unwrap() = true;
            next.run(req)
        },
        MiddlewareConfig::new()
            .exclude_method(Method::Options)
            .exclude_header("x-internal", "1"),
    );

    // Method exclusion fires even though the header rule does not match.
    let req = Request::builder()
        .method(Method::Options)
        .path("/orders")
        .header("x-internal", "2")
        .build();
    router.handle_request(req).await.unwrap();
    assert!(!*ran.lock().unwrap());
}

#[tokio::test]
async fn header_exclusion_skips_per_request() {
    let hits = Arc::new(Mutex::new(0u32));
    let mut router = Router::new();
    router.add_route(Method::Get, "/orders", |_req: Request| async {
        Response::text("ok")
    });

    let counter = Arc::clone(&hits);
    router.use_pre(
        move |req: Request, next: Next| {
            *counter.lock().unwrap() += 1;
            next.run(req)
        },
        MiddlewareConfig::new().exclude_header("x-internal", "1"),
    );

    let internal = Request::builder()
        .method(Method::Get)
        .path("/orders")
        .header("X-Internal", "1")
        .build();
    router.handle_request(internal).await.unwrap();
    assert_eq!(*hits.lock().unwrap(), 0);

    router
        .handle_request(request(Method::Get, "/orders"))
        .await
        .unwrap();
    assert_eq!(*hits.lock().unwrap(), 1);
}

#[tokio::test]
async fn pre_and_post_lists_nest_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new();

    let trace = |name: &'static str, log: &Arc<Mutex<Vec<String>>>| {
        let log = Arc::clone(log);
        move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name}:before"));
                let resp = next.run(req).await;
                log.lock().unwrap().push(format!("{name}:after"));
                resp
            }
        }
    };

    router.use_pre(trace("pre0", &log), MiddlewareConfig::new());
    router.use_pre(trace("pre1", &log), MiddlewareConfig::new());
    router.use_post(trace("post0", &log), MiddlewareConfig::new());

    {
        let log = Arc::clone(&log);
        router.add_route(Method::Get, "/orders", move |_req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push("handler".to_owned());
                Response::text("ok")
            }
        });
    }

    router
        .handle_request(request(Method::Get, "/orders"))
        .await
        .unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        [
            "pre0:before",
            "pre1:before",
            "post0:before",
            "handler",
            "post0:after",
            "pre1:after",
            "pre0:after",
        ]
    );
}

#[tokio::test]
async fn terminal_handlers_bypass_middleware() {
    let hits = Arc::new(Mutex::new(0u32));
    let mut router = Router::new();

    let counter = Arc::clone(&hits);
    router.use_pre(
        move |req: Request, next: Next| {
            *counter.lock().unwrap() += 1;
            next.run(req)
        },
        MiddlewareConfig::new(),
    );

    router
        .handle_request(request(Method::Get, "/nowhere"))
        .await
        .unwrap();
    assert_eq!(*hits.lock().unwrap(), 0);
}

#[tokio::test]
async fn middleware_error_passes_through_like_handler_error() {
    let mut router = Router::new();
    router.add_route(Method::Get, "/orders", |_req: Request| async {
        Response::text("never reached")
    });
    router.use_pre(
        |_req: Request, _next: Next| async {
            Err::<Response, _>(Error::handler("auth backend down"))
        },
        MiddlewareConfig::new(),
    );

    let err = router
        .handle_request(request(Method::Get, "/orders"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Handler(_)));
}

#[tokio::test]
async fn concurrent_dispatches_share_one_router() {
    let mut router = Router::new();
    router.add_route(Method::Get, "/orders", |req: Request| async move {
        Response::json(json!({"path": req.path()}))
    });
    let router = Arc::new(router);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let router = Arc::clone(&router);
        handles.push(tokio::spawn(async move {
            router
                .handle_request(request(Method::Get, "/orders"))
                .await
                .unwrap()
                .status_code()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }
}
