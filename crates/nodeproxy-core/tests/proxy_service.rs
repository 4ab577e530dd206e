mod support;

use std::sync::Arc;

use nodeproxy_core::config::NodeproxyConfig;
use nodeproxy_core::mutation::executor::Cancellation;
use nodeproxy_core::service::params::Params;
use nodeproxy_core::service::{ProxyService, ResponseBody, Route};
use serde_json::{Value, json};

use support::store::{Call, FakeNodeStore};

fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn pole_and_anchor() -> FakeNodeStore {
    FakeNodeStore::new(support::nodes(json!([
        {"id": "n1", "attributes": {"node_type": "pole"}},
        {"id": "n2", "attributes": {"node_type": "anchor"}}
    ])))
}

fn service(store: &Arc<FakeNodeStore>) -> ProxyService<FakeNodeStore> {
    ProxyService::new(Arc::clone(store), NodeproxyConfig::default())
}

async fn call(
    service: &ProxyService<FakeNodeStore>,
    route: Route,
    pairs: &[(&str, &str)],
) -> (u16, Value) {
    call_until(service, route, pairs, &Cancellation::new()).await
}

async fn call_until(
    service: &ProxyService<FakeNodeStore>,
    route: Route,
    pairs: &[(&str, &str)],
    cancellation: &Cancellation,
) -> (u16, Value) {
    let response = service.handle(route, &params(pairs), cancellation).await;
    let body = match response.body {
        ResponseBody::Json(value) => value,
        ResponseBody::Text(text) => Value::String(text),
    };
    (response.status, body)
}

#[tokio::test]
async fn filter_returns_matching_nodes() {
    let store = Arc::new(pole_and_anchor());
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::FilterNodes,
        &[
            ("api_key", "secret"),
            ("job_id", "job-1"),
            ("attribute_filters", r#"{"node_type": "pole"}"#),
        ],
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["data"][0]["id"], json!("n1"));
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["filters_applied"], json!({"node_type": "pole"}));
    assert_eq!(body["job_id"], json!("job-1"));
}

#[tokio::test]
async fn nodes_are_returned_as_received() {
    let pole = json!({
        "id": "n1",
        "latitude": "40.1",
        "photos": null,
        "attributes": {"node_type": {"-a": "pole"}}
    });
    let anchor = json!({"id": "n2", "attributes": {"node_type": "anchor"}, "longitude": -74});
    let store = Arc::new(FakeNodeStore::new(support::nodes(json!([pole.clone(), anchor]))));
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::FilterNodes,
        &[("api_key", "secret"), ("job_id", "job-1"), ("node_type", "pole")],
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["data"], json!([pole]));
}

#[tokio::test]
async fn loose_parameters_act_as_filters() {
    let store = Arc::new(pole_and_anchor());
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::FilterNodes,
        &[("api_key", "secret"), ("job_id", "job-1"), ("node_type", "anchor")],
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["data"][0]["id"], json!("n2"));
}

#[tokio::test]
async fn job_id_falls_back_to_configured_default() {
    let store = Arc::new(pole_and_anchor());
    let config = NodeproxyConfig {
        default_job_id: Some("job-default".to_string()),
        ..NodeproxyConfig::default()
    };
    let service = ProxyService::new(Arc::clone(&store), config);

    let (status, body) = call(&service, Route::FilterNodes, &[("api_key", "secret")]).await;

    assert_eq!(status, 200);
    assert_eq!(body["total"], json!(2));
    assert_eq!(
        store.calls(),
        vec![Call::List { job_id: "job-default".to_string() }]
    );
}

#[tokio::test]
async fn missing_parameters_fail_before_any_upstream_call() {
    let store = Arc::new(pole_and_anchor());
    let service = service(&store);

    let (status, body) = call(&service, Route::FilterNodes, &[("job_id", "job-1")]).await;
    assert_eq!(status, 400);
    assert!(body.as_str().unwrap().contains("api_key"));

    let (status, body) = call(
        &service,
        Route::UpdateNodeAttributes,
        &[("api_key", "secret"), ("job_id", "job-1")],
    )
    .await;
    assert_eq!(status, 400);
    let message = body.as_str().unwrap();
    assert!(message.contains("attribute_filters"));
    assert!(message.contains("new_attributes"));

    let (status, _) = call(
        &service,
        Route::DeleteNodesByAttribute,
        &[("api_key", "secret"), ("attribute_filters", "{}")],
    )
    .await;
    assert_eq!(status, 400);

    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn malformed_filters_are_rejected() {
    let store = Arc::new(pole_and_anchor());
    let service = service(&store);

    let (status, _) = call(
        &service,
        Route::FilterNodes,
        &[
            ("api_key", "secret"),
            ("job_id", "job-1"),
            ("attribute_filters", "{not json"),
        ],
    )
    .await;

    assert_eq!(status, 400);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn upstream_status_and_body_are_forwarded() {
    let store = Arc::new(pole_and_anchor().listing_fails(403, "invalid api key"));
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::FilterNodes,
        &[("api_key", "wrong"), ("job_id", "job-1")],
    )
    .await;

    assert_eq!(status, 403);
    assert_eq!(body, json!("invalid api key"));
}

#[tokio::test]
async fn update_reports_per_node_outcomes() {
    let store = Arc::new(
        FakeNodeStore::new(support::nodes(json!([
            {"id": "n1", "attributes": {"node_type": "pole"}},
            {"id": "n2", "attributes": {"node_type": "pole"}},
            {"id": "n3", "attributes": {"node_type": "anchor"}}
        ])))
        .reject("n2", 500, "boom"),
    );
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::UpdateNodeAttributes,
        &[
            ("api_key", "secret"),
            ("job_id", "job-1"),
            ("attribute_filters", r#"{"node_type": "pole"}"#),
            ("new_attributes", r#"{"owner": "acme"}"#),
        ],
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["operation"], json!("add"));
    assert_eq!(body["total"], json!(2));
    assert_eq!(body["success_count"], json!(1));
    assert_eq!(body["failure_count"], json!(1));
    assert_eq!(body["job_id"], json!("job-1"));
    assert_eq!(body["cancelled"], json!(false));
    assert_eq!(body["outcomes"][0]["node_id"], json!("n1"));
    assert_eq!(body["outcomes"][1]["node_id"], json!("n2"));
    assert_eq!(body["outcomes"][1]["status"], json!("failed"));
    assert_eq!(body["filters_applied"], json!({"node_type": "pole"}));
}

#[tokio::test]
async fn delete_operation_is_not_accepted_by_the_update_route() {
    let store = Arc::new(pole_and_anchor());
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::UpdateNodeAttributes,
        &[
            ("api_key", "secret"),
            ("job_id", "job-1"),
            ("attribute_filters", "{}"),
            ("new_attributes", r#"["node_type"]"#),
            ("operation", "delete"),
        ],
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["total"], json!(0));
    assert!(store.write_calls().is_empty());
}

#[tokio::test]
async fn delete_route_deletes_every_match() {
    let store = Arc::new(pole_and_anchor());
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::DeleteNodesByAttribute,
        &[
            ("api_key", "secret"),
            ("job_id", "job-1"),
            ("attribute_filters", r#"{"node_type": "anchor"}"#),
        ],
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["operation"], json!("delete"));
    assert_eq!(body["success_count"], json!(1));
    assert_eq!(
        store.write_calls(),
        vec![Call::Delete { node_id: "n2".to_string() }]
    );
}

#[tokio::test]
async fn note_lists_matching_nodes() {
    let store = Arc::new(pole_and_anchor());
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::AddFilterNote,
        &[
            ("api_key", "secret"),
            ("job_id", "job-1"),
            ("attribute_filters", r#"{"node_type": "pole"}"#),
            ("title", "Pole audit"),
        ],
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["matched"], json!(1));
    assert_eq!(body["note"]["title"], json!("Pole audit"));

    let Some(Call::Note { body: note }) = store.write_calls().pop() else {
        panic!("expected a note call");
    };
    assert_eq!(note["type"], json!("general"));
    let text = note["text"].as_str().unwrap();
    assert!(text.starts_with("1 node(s) matched node_type=pole at "));
    assert!(text.ends_with("\n- n1"));
}

#[tokio::test]
async fn rejected_note_is_forwarded() {
    let store = Arc::new(pole_and_anchor().note_status(422));
    let service = service(&store);

    let (status, body) = call(
        &service,
        Route::AddFilterNote,
        &[("api_key", "secret"), ("job_id", "job-1")],
    )
    .await;

    assert_eq!(status, 422);
    assert_eq!(body, json!("note rejected"));
}

#[tokio::test]
async fn health_lists_routes() {
    let store = Arc::new(FakeNodeStore::default());
    let service = service(&store);

    let (status, body) = call(&service, Route::Health, &[]).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(
        body["endpoints"],
        json!([
            "/filter_nodes",
            "/update_node_attributes",
            "/delete_nodes_by_attribute",
            "/add_filter_note"
        ])
    );
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn cancelled_request_does_not_wait_for_listing() {
    let store = Arc::new(pole_and_anchor().listing_hangs());
    let service = service(&store);
    let cancellation = Cancellation::new();
    cancellation.cancel();

    let (status, body) = call_until(
        &service,
        Route::DeleteNodesByAttribute,
        &[
            ("api_key", "secret"),
            ("job_id", "job-1"),
            ("attribute_filters", r#"{"node_type": "pole"}"#),
        ],
        &cancellation,
    )
    .await;

    assert_eq!(status, 499);
    assert_eq!(body, json!("Request cancelled"));
    assert!(store.write_calls().is_empty());
}

#[tokio::test]
async fn cancelling_during_listing_ends_filter_request() {
    let cancellation = Cancellation::new();
    let store = Arc::new(pole_and_anchor().listing_trips(cancellation.clone()));
    let service = service(&store);

    let (status, _) = call_until(
        &service,
        Route::FilterNodes,
        &[("api_key", "secret"), ("job_id", "job-1")],
        &cancellation,
    )
    .await;

    assert_eq!(status, 499);
    assert_eq!(store.calls(), vec![Call::List { job_id: "job-1".to_string() }]);
}

#[tokio::test]
async fn cancelled_note_request_posts_nothing() {
    let store = Arc::new(pole_and_anchor().listing_hangs());
    let service = service(&store);
    let cancellation = Cancellation::new();
    cancellation.cancel();

    let (status, _) = call_until(
        &service,
        Route::AddFilterNote,
        &[("api_key", "secret"), ("job_id", "job-1")],
        &cancellation,
    )
    .await;

    assert_eq!(status, 499);
    assert!(store.write_calls().is_empty());
}
