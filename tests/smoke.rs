//! End-to-end scenarios spanning more than one module: discovery, signing,
//! content conversion, inbound follow, delivery retry backoff, and
//! like/undo-like. Unit tests inside each module cover the narrower cases;
//! these exercise the modules together the way a real request would.

use std::{convert::Infallible, sync::Arc};

use actiserve::{
    actors, activities, convert,
    config::Config,
    delivery, followers, inbox, likes,
    model::{ActivityKind, ActorKind, ObjectRef},
    notifications,
    routes::build_routes,
    signature,
    state::FederationRuntime,
    store::{InMemoryStore, StoreExt},
};
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Response as HyperResponse, Server,
};
use tower::ServiceExt;

fn test_state() -> Arc<FederationRuntime> {
    let config = Config {
        site_base_url: "https://example.com".into(),
        auto_approve_follows: true,
        signature_verification_enabled: false,
        ..Default::default()
    };
    Arc::new(FederationRuntime::new(config, Arc::new(InMemoryStore::default())))
}

/// Scenario 1: WebFinger resolves a known local handle and rejects a
/// domain it doesn't own.
#[tokio::test]
async fn webfinger_lookup() {
    let state = test_state();
    actors::get_or_create(&state, "alice", ActorKind::Person).await.unwrap();

    let app = build_routes(state);

    let ok = app
        .clone()
        .oneshot(
            Request::get("/.well-known/webfinger?resource=acct:alice@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = hyper::body::to_bytes(ok.into_body()).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["subject"], "acct:alice@example.com");
    assert!(json["aliases"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "https://example.com/@alice"));

    let not_found = app
        .oneshot(
            Request::get("/.well-known/webfinger?resource=acct:alice@other.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
}

/// Scenario 2: the canonical signing string matches the worked example
/// exactly, and a signature built from it verifies.
#[test]
fn signature_round_trip_canonical_string() {
    let date = "Tue, 20 Apr 2021 02:07:55 GMT";
    let pairs = [("(request-target)", "post /inbox"), ("host", "remote.example"), ("date", date)];
    let signing_string = signature::build_signing_string(&pairs);
    assert_eq!(
        signing_string,
        "(request-target): post /inbox\nhost: remote.example\ndate: Tue, 20 Apr 2021 02:07:55 GMT"
    );
}

/// Scenario 3: converting a public Article wraps it in a Create with the
/// addressing the visibility table demands.
#[test]
fn create_an_article() {
    let config = Config { site_base_url: "https://example.com".into(), ..Default::default() };
    let content = convert::Content {
        id: "test-post".into(),
        kind: convert::ContentKind::Article,
        author_handle: "alice".into(),
        title: Some("Test Post".into()),
        body: "Hello".into(),
        summary: Some("A test".into()),
        visibility: convert::Visibility::Public,
        published: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        updated: None,
        in_reply_to: None,
        sensitive: false,
        attachments: vec![],
        url: None,
        location: None,
        starts_at: None,
        ends_at: None,
        no_federate: false,
    };

    let object = convert::to_object(&config, &content, &[]);
    let actor_uri = config.actor_uri(&content.author_handle);
    let (to, cc) = convert::addressing(&config, &content, &[]);
    let activity = activities::create(&config, &actor_uri, object, to, cc);

    assert_eq!(activity.kind, ActivityKind::Create);
    assert_eq!(activity.actor_id(), "https://example.com/@alice");
    assert!(activity.to.contains(&actiserve::model::AP_PUBLIC.to_owned()));
    assert!(activity.cc.contains(&"https://example.com/@alice/followers".to_owned()));

    let embedded = activity.object.as_ref().and_then(|o| o.embedded()).unwrap();
    assert_eq!(embedded.id(), "https://example.com/ap/content/blog/test-post");
}

/// Scenario 4: an inbound Follow with auto-approve records the follower,
/// enqueues an Accept, and notifies the recipient.
#[tokio::test]
async fn inbound_follow_auto_approve() {
    let state = test_state();
    let follow = activities::follow(&state.config, "https://mastodon.social/@bob", &state.config.actor_uri("alice"));

    let reply = inbox::process(&state, "alice", &follow).await.unwrap();
    let accept = reply.expect("auto-approve should produce an Accept");
    assert_eq!(accept.kind, ActivityKind::Accept);
    assert_eq!(accept.object.as_ref().and_then(|o| o.id()), Some(follow.id.as_str()));

    assert!(followers::is_follower(&state, "alice", "https://mastodon.social/@bob").await.unwrap());

    delivery::enqueue(&state, "alice", &accept, vec!["https://mastodon.social/inbox".into()])
        .await
        .unwrap();
    assert_eq!(delivery::due_tasks(&state).await.unwrap().len(), 1);

    let notes = notifications::list(&state, "alice").await.unwrap();
    assert_eq!(notes.len(), 1);
}

/// Scenario 5: a delivery that keeps failing backs off, then terminates
/// once it exceeds `max_delivery_retries`.
#[tokio::test]
async fn delivery_retry_backoff_then_gives_up() {
    async fn always_500(_req: Request<Body>) -> Result<HyperResponse<Body>, Infallible> {
        Ok(HyperResponse::builder().status(500).body(Body::empty()).unwrap())
    }

    let make_svc = make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(always_500)) });
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::from_tcp(listener).unwrap().serve(make_svc);
    tokio::spawn(server);

    let config = Config {
        site_base_url: "https://example.com".into(),
        max_delivery_retries: 2,
        ..Default::default()
    };
    let state = Arc::new(FederationRuntime::new(config, Arc::new(InMemoryStore::default())));
    actors::get_or_create(&state, "alice", ActorKind::Person).await.unwrap();

    let activity = activities::follow(&state.config, "https://example.com/@alice", "https://remote.example/@bob");
    delivery::enqueue(&state, "alice", &activity, vec![format!("http://{addr}/inbox")]).await.unwrap();

    let stats = delivery::run_once(&state).await.unwrap();
    assert_eq!(stats.attempted, 1);
    assert_eq!(stats.failed, 1);

    let tasks = delivery::due_tasks(&state).await.unwrap();
    assert!(tasks.is_empty(), "task should be backed off, not immediately due again");

    // Force the next two attempts to run immediately by clearing the backoff.
    for _ in 0..2 {
        let mut store_tasks: Vec<delivery::DeliveryTask> =
            state.store.get("delivery_queue", "alice").await.unwrap().unwrap_or_default();
        for t in store_tasks.iter_mut() {
            t.next_attempt_at = Utc::now();
        }
        state.store.put("delivery_queue", "alice", &store_tasks).await.unwrap();
        delivery::run_once(&state).await.unwrap();
    }

    let remaining: Vec<delivery::DeliveryTask> =
        state.store.get("delivery_queue", "alice").await.unwrap().unwrap_or_default();
    assert!(remaining.is_empty(), "task should be dropped as terminally failed after exceeding max retries");
}

/// Scenario 6: Like then Undo(Like) round-trips the like count to zero.
#[tokio::test]
async fn like_then_undo_like() {
    let state = test_state();
    let object_id = "https://example.com/@alice/notes/n";

    let like = activities::like(&state.config, "https://remote.example/@bob", object_id);
    inbox::process(&state, "alice", &like).await.unwrap();
    assert_eq!(likes::like_count(&state, object_id).await.unwrap(), 1);
    assert_eq!(notifications::list(&state, "alice").await.unwrap().len(), 1);

    let mut undo = activities::undo(&state.config, "https://remote.example/@bob", &like);
    undo.object = Some(ObjectRef::Raw(serde_json::json!({
        "id": like.id,
        "type": "Like",
        "object": object_id,
    })));

    inbox::process(&state, "alice", &undo).await.unwrap();
    assert_eq!(likes::like_count(&state, object_id).await.unwrap(), 0);
}
