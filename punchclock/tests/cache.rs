use async_trait::async_trait;
use punchclock_client::cache::{
    CachePolicy, CacheRequest, CachedResponse, Decision, Fetcher, HttpFetcher, ResponseCache,
    ResponseSource,
};
use punchclock_client::database::Database;
use punchclock_client::error::ClientError;
use reqwest::{Method, StatusCode, Url};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Real http fetcher that can be switched off to simulate losing the network.
struct Switchable {
    inner: HttpFetcher,
    offline: AtomicBool,
}

#[async_trait]
impl Fetcher for Switchable {
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, ClientError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout);
        }
        self.inner.fetch(request).await
    }
}

struct Setup {
    cache: ResponseCache,
    fetcher: Arc<Switchable>,
    database: Database,
    origin: String,
    _dir: TempDir,
}

fn policy(origin: &str, generation: &str) -> CachePolicy {
    CachePolicy {
        origin: Url::parse(origin).unwrap(),
        generation: generation.into(),
        cacheable_prefixes: vec!["/employees".into(), "/static/".into()],
        precache: vec!["/".into()],
        fallback_path: "/".into(),
    }
}

async fn setup(origin: &str) -> Setup {
    let dir = TempDir::new().unwrap();
    let database = Database::new(dir.path().join("terminal.db")).await.unwrap();
    let fetcher = Arc::new(Switchable {
        inner: HttpFetcher::new(Duration::from_secs(2)).unwrap(),
        offline: AtomicBool::new(false),
    });
    let cache = ResponseCache::new(&database, policy(origin, "v1"), fetcher.clone());
    cache.activate().await.unwrap();

    Setup {
        cache,
        fetcher,
        database,
        origin: origin.into(),
        _dir: dir,
    }
}

impl Setup {
    fn url(&self, p: &str) -> Url {
        Url::parse(&self.origin).unwrap().join(p).unwrap()
    }

    fn go_offline(&self) {
        self.fetcher.offline.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn serves_second_get_from_cache() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "employeeId": "E1" }])))
        .expect(1)
        .mount(&mock)
        .await;
    let s = setup(&mock.uri()).await;

    let first = s.cache.get("/employees").await.unwrap();
    let second = s.cache.get("/employees").await.unwrap();

    assert_eq!(first.source, ResponseSource::Network);
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn writes_and_foreign_origins_bypass() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock)
        .await;
    let s = setup(&mock.uri()).await;
    let post = CacheRequest::new(Method::POST, s.url("/employees"));
    let foreign = CacheRequest::get(Url::parse("https://elsewhere.example/employees").unwrap());

    assert_eq!(s.cache.decide(&post), Decision::Bypass);
    assert_eq!(s.cache.decide(&foreign), Decision::Bypass);
    assert_eq!(
        s.cache.decide(&CacheRequest::get(s.url("/employees"))),
        Decision::Intercept
    );

    s.cache.fetch(&post).await.unwrap();
    let again = s.cache.fetch(&post).await.unwrap();
    assert_eq!(again.source, ResponseSource::Network);
}

#[tokio::test]
async fn errors_and_unlisted_paths_are_not_stored() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock)
        .await;
    let s = setup(&mock.uri()).await;

    for _ in 0..2 {
        let res = s.cache.get("/employees").await.unwrap();
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        let res = s.cache.get("/entries").await.unwrap();
        assert_eq!(res.source, ResponseSource::Network);
    }
}

#[tokio::test]
async fn offline_navigation_falls_back_to_cached_document() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>punchclock</html>"))
        .expect(1)
        .mount(&mock)
        .await;
    let s = setup(&mock.uri()).await;
    assert_eq!(s.cache.install().await.unwrap(), 1);

    s.go_offline();

    let page = s
        .cache
        .fetch(&CacheRequest::navigate(s.url("/reports/today")))
        .await
        .unwrap();
    assert_eq!(page.source, ResponseSource::Cache);
    assert_eq!(page.body, b"<html>punchclock</html>".to_vec());

    let data = s
        .cache
        .fetch(&CacheRequest::get(s.url("/employees")))
        .await
        .unwrap();
    assert_eq!(data.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(data.source, ResponseSource::Synthesized);
    assert_eq!(data.body, b"Offline".to_vec());
}

#[tokio::test]
async fn offline_navigation_without_fallback_is_unavailable() {
    let s = setup("http://127.0.0.1:9").await;
    s.go_offline();

    let page = s
        .cache
        .fetch(&CacheRequest::navigate(s.url("/")))
        .await
        .unwrap();

    assert_eq!(page.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn activating_new_generation_drops_old_ones() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock)
        .await;
    let s = setup(&mock.uri()).await;
    s.cache.get("/employees").await.unwrap();

    let next = ResponseCache::new(&s.database, policy(&mock.uri(), "v2"), s.fetcher.clone());
    assert_eq!(next.activate().await.unwrap(), 1);
    assert_eq!(next.generations().await.unwrap(), vec!["v2".to_string()]);

    let res = next.get("/employees").await.unwrap();
    assert_eq!(res.source, ResponseSource::Network);

    // Activating again is a no-op.
    assert_eq!(next.activate().await.unwrap(), 0);
}
