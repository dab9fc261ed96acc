//! The cached, fallback-aware content client against a live server.

use axum::{http::StatusCode, routing::get, Json, Router};
use futures_util::future::join_all;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lib_site::content::{default_records, Lead, Service};
use lib_site::{Collection, ContentClient, ContentClientOptions, Origin};
use project_tests::{closed_port_url, serve_router, spawn_site};

#[tokio::test]
async fn network_then_cache_then_invalidated_by_save() {
    let site = spawn_site().await;
    let admin = site.admin_client();

    admin
        .save(Collection::Team, json!({ "id": "ann", "name": "Ann", "role": "Lead Strategist" }))
        .await
        .unwrap();

    let first = admin.load(Collection::Team).await;
    assert_eq!(first.origin, Origin::Network);
    assert_eq!(first.data.len(), 1);

    let second = admin.load(Collection::Team).await;
    assert_eq!(second.origin, Origin::Cache);

    // Warm another slot, then write to Team only.
    admin.load(Collection::Testimonials).await;
    admin
        .save(Collection::Team, json!({ "id": "ben", "name": "Ben", "role": "Designer" }))
        .await
        .unwrap();
    assert!(!admin.is_cached(Collection::Team).await);
    assert!(admin.is_cached(Collection::Testimonials).await);

    let third = admin.load(Collection::Team).await;
    assert_eq!(third.origin, Origin::Network);
    assert_eq!(third.data.len(), 2);
}

#[tokio::test]
async fn empty_collections_read_as_bundled_defaults() {
    let site = spawn_site().await;
    let client = site.public_client();

    let services = client.load_as::<Service>(Collection::Services).await.unwrap();
    assert_eq!(services.origin, Origin::Fallback);
    assert_eq!(services.data.len(), default_records(Collection::Services).len());
    // The empty answer itself is cached.
    assert!(client.is_cached(Collection::Services).await);

    // Collections without defaults stay empty.
    let popups = client.load(Collection::Popups).await;
    assert!(popups.data.is_empty());
    assert_eq!(popups.origin, Origin::Network);
}

#[tokio::test]
async fn unreachable_api_falls_back_without_caching() {
    let options = ContentClientOptions {
        timeout: Duration::from_millis(500),
        max_retries: 0,
        ..ContentClientOptions::default()
    };
    let client = ContentClient::new(&closed_port_url().await, options).unwrap();

    let loaded = client.load(Collection::Cases).await;
    assert_eq!(loaded.origin, Origin::Fallback);
    assert!(!loaded.data.is_empty());
    assert!(!client.is_cached(Collection::Cases).await);

    let settings = client.settings().await;
    assert_eq!(settings.origin, Origin::Fallback);
    assert_eq!(settings.data.site_name.as_deref(), Some("Brightpath Marketing"));

    assert!(client.save(Collection::Cases, json!({ "title": "x" })).await.is_err());
}

#[tokio::test]
async fn settings_round_trip_through_the_client() {
    let site = spawn_site().await;
    let admin = site.admin_client();

    assert_eq!(admin.settings().await.origin, Origin::Fallback);

    admin
        .save_settings(json!({ "siteName": "Acme Growth", "defaultTitle": "Acme | Growth" }))
        .await
        .unwrap();
    let loaded = admin.settings().await;
    assert_eq!(loaded.origin, Origin::Network);
    assert_eq!(loaded.data.site_name.as_deref(), Some("Acme Growth"));
    assert_eq!(loaded.data.id, "global");
}

#[tokio::test]
async fn writes_without_the_token_fail_and_keep_the_cache() {
    let site = spawn_site().await;
    let public = site.public_client();

    public.load(Collection::Packages).await;
    let err = public
        .save(Collection::Packages, json!({ "name": "Enterprise" }))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(public.is_cached(Collection::Packages).await);
}

#[tokio::test]
async fn leads_fetch_one_and_delete() {
    let site = spawn_site().await;
    let public = site.public_client();
    let admin = site.admin_client();

    let lead = Lead {
        name: "Dana".into(),
        email: "dana@example.com".into(),
        message: Some("We need a new site".into()),
        ..Lead::default()
    };
    let saved = public.submit_lead(&lead).await.unwrap();
    let id = saved["id"].as_str().unwrap().to_string();

    // Reading leads is an admin privilege.
    assert_eq!(public.fetch_one(Collection::Leads, &id).await.unwrap_err().status(), Some(401));
    let fetched = admin.fetch_one(Collection::Leads, &id).await.unwrap().unwrap();
    assert_eq!(fetched["status"], json!("new"));

    admin.delete(Collection::Leads, &id).await.unwrap();
    assert_eq!(admin.fetch_one(Collection::Leads, &id).await.unwrap(), None);
}

#[tokio::test]
async fn concurrent_loads_share_one_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/api/blog",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Json(json!([{ "id": "only", "title": "Only post" }]))
            }
        }),
    );
    let (base_url, _handle) = serve_router(router).await;
    let options = ContentClientOptions {
        max_retries: 0,
        ..ContentClientOptions::default()
    };
    let client = ContentClient::new(&base_url, options).unwrap();

    let results = join_all((0..5).map(|_| client.load(Collection::Blog))).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| r.data.len() == 1));
    assert_eq!(results.iter().filter(|r| r.origin == Origin::Network).count(), 1);
}

#[tokio::test]
async fn unexpected_payloads_fall_back() {
    let router = Router::new().route("/api/team", get(|| async { Json(json!({ "oops": true })) }));
    let (base_url, _handle) = serve_router(router).await;
    let client = ContentClient::new(
        &base_url,
        ContentClientOptions {
            max_retries: 0,
            ..ContentClientOptions::default()
        },
    )
    .unwrap();

    let loaded = client.load(Collection::Team).await;
    assert_eq!(loaded.origin, Origin::Fallback);
    let value: Value = loaded.data[0].clone();
    assert!(value.get("name").is_some());
}

#[tokio::test]
async fn delete_invalidates_only_its_collection() {
    let site = spawn_site().await;
    let admin = site.admin_client();

    admin
        .save(Collection::Team, json!({ "id": "ann", "name": "Ann", "role": "Lead Strategist" }))
        .await
        .unwrap();
    admin
        .save(Collection::Testimonials, json!({ "id": "t1", "author": "Sam", "quote": "Great" }))
        .await
        .unwrap();
    admin.load(Collection::Team).await;
    admin.load(Collection::Testimonials).await;

    admin.delete(Collection::Team, "ann").await.unwrap();
    assert!(!admin.is_cached(Collection::Team).await);
    assert!(admin.is_cached(Collection::Testimonials).await);

    let team = admin.load(Collection::Team).await;
    assert_ne!(team.origin, Origin::Cache);
    assert!(team.data.iter().all(|member| member["id"] != json!("ann")));
    assert_eq!(admin.load(Collection::Testimonials).await.origin, Origin::Cache);
}

#[tokio::test]
async fn server_errors_fall_back_and_are_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/api/cases",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error_type": "StorageError" })))
            }
        }),
    );
    let (base_url, _handle) = serve_router(router).await;
    let client = ContentClient::new(
        &base_url,
        ContentClientOptions {
            max_retries: 0,
            ..ContentClientOptions::default()
        },
    )
    .unwrap();

    let loaded = client.load(Collection::Cases).await;
    assert_eq!(loaded.origin, Origin::Fallback);
    assert_eq!(loaded.data.len(), default_records(Collection::Cases).len());
    assert!(!client.is_cached(Collection::Cases).await);

    // Nothing was cached, so the next load asks the server again.
    assert_eq!(client.load(Collection::Cases).await.origin, Origin::Fallback);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn clear_empties_every_slot() {
    let site = spawn_site().await;
    let admin = site.admin_client();
    admin
        .save(Collection::Blog, json!({ "id": "p1", "title": "First post" }))
        .await
        .unwrap();

    admin.load(Collection::Blog).await;
    admin.load(Collection::Popups).await;
    assert!(admin.is_cached(Collection::Blog).await);
    assert!(admin.is_cached(Collection::Popups).await);

    admin.clear().await;
    assert!(!admin.is_cached(Collection::Blog).await);
    assert!(!admin.is_cached(Collection::Popups).await);
    assert_eq!(admin.load(Collection::Blog).await.origin, Origin::Network);
}
