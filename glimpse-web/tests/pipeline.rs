mod common;

use async_trait::async_trait;
use glimpse_common::ResourceRef;
use glimpse_http::HttpClient;
use glimpse_web::relay::{DirectClient, RelayClient};
use glimpse_web::youtube::OEmbedClient;
use glimpse_web::youtube::types::OEmbed;
use glimpse_web::{
    EnrichError, EnrichReport, HostPage, ItemState, Mount, Outcome, PostJob, PostSource, VideoJob,
    VideoMetadataSource, enrich_page, run_post_job, run_video_job,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEMO_URL: &str = "https://www.youtube.com/watch?v=MG8POs0jwUQ";
const POST_URL: &str = "https://www.patreon.com/posts/bi-te-bi-li-lun-146765098";
const FALLBACK_BODY: &str = "Click the link below to read the full post on Patreon.";

fn video_job(links: &[&str]) -> VideoJob {
    VideoJob {
        mount: "video-grid".into(),
        links: links.iter().map(|l| ResourceRef::video(*l)).collect(),
        thumbnail_base: "https://img.youtube.com/vi".into(),
        fallback_title: "YouTube Video".into(),
    }
}

fn post_job() -> PostJob {
    PostJob {
        mount: "blog-list".into(),
        link: ResourceRef::post(POST_URL),
        site_name: Some("Patreon".into()),
        category: "Patreon".into(),
        fallback_title: "Patreon Post".into(),
        fallback_body: FALLBACK_BODY.into(),
        read_more_label: "Read More →".into(),
    }
}

fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://{}", listener.local_addr().unwrap())
}

/// Every video gets the same remote title.
struct FixedTitle(&'static str);

#[async_trait]
impl VideoMetadataSource for FixedTitle {
    async fn fetch_oembed(&self, _video_url: &str) -> Result<OEmbed, EnrichError> {
        Ok(OEmbed {
            title: Some(self.0.to_string()),
            ..Default::default()
        })
    }
}

/// Title is the URL's last 11 characters; sleeps per URL and tracks concurrency.
#[derive(Default)]
struct ScriptedVideos {
    delays_ms: Vec<(String, u64)>,
    fail: Vec<String>,
    panic_on: Vec<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl VideoMetadataSource for ScriptedVideos {
    async fn fetch_oembed(&self, video_url: &str) -> Result<OEmbed, EnrichError> {
        self.calls.lock().unwrap().push(video_url.to_string());
        if self.panic_on.iter().any(|u| u == video_url) {
            panic!("scripted panic for {video_url}");
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = self
            .delays_ms
            .iter()
            .find(|(u, _)| u == video_url)
            .map(|(_, d)| *d)
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.iter().any(|u| u == video_url) {
            return Err(EnrichError::Transport("scripted failure".into()));
        }
        Ok(OEmbed {
            title: Some(format!("Title {}", &video_url[video_url.len() - 11..])),
            ..Default::default()
        })
    }
}

struct StaticPost {
    html: Result<String, String>,
    calls: AtomicUsize,
}

impl StaticPost {
    fn ok(html: &str) -> Self {
        Self {
            html: Ok(html.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            html: Err("scripted failure".into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PostSource for StaticPost {
    async fn fetch_html(&self, _post_url: &str) -> Result<String, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.html.clone().map_err(EnrichError::Transport)
    }
}

// ==============================
// Video job
// ==============================

#[tokio::test]
async fn oembed_title_and_id_derived_image() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oembed"))
        .and(query_param("url", DEMO_URL))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "title": "Demo" })))
        .expect(1)
        .mount(&server)
        .await;

    let source = OEmbedClient::new(HttpClient::new(&format!("{}/oembed", server.uri())).unwrap());
    let job = video_job(&[DEMO_URL]);
    let mut mount = Mount::detached("video-grid");
    let report = run_video_job(&source, &job, &mut mount).await;

    assert_eq!(report.rendered(), 1);
    let item = &report.items[0];
    assert_eq!(item.id.as_ref().map(|id| id.as_str()), Some("MG8POs0jwUQ"));
    assert_eq!(
        item.states,
        vec![
            ItemState::Pending,
            ItemState::Resolved,
            ItemState::Fetched,
            ItemState::Rendered
        ]
    );

    let cards = mount.fragments();
    assert_eq!(cards.len(), 1);
    assert!(cards[0].contains("<h3>Demo</h3>"));
    assert!(cards[0].contains(r#"src="https://img.youtube.com/vi/MG8POs0jwUQ/maxresdefault.jpg""#));
}

#[tokio::test]
async fn failed_fetch_renders_degraded_card_from_id() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let source = OEmbedClient::new(HttpClient::new(&format!("{}/oembed", server.uri())).unwrap());
    let job = video_job(&[DEMO_URL]);
    let mut mount = Mount::detached("video-grid");
    let report = run_video_job(&source, &job, &mut mount).await;

    assert_eq!(report.degraded(), 1);
    assert!(matches!(
        report.items[0].outcome,
        Outcome::Degraded(EnrichError::Transport(_))
    ));
    assert_eq!(report.items[0].state(), Some(ItemState::Rendered));
    let cards = mount.fragments();
    assert_eq!(cards.len(), 1);
    assert!(cards[0].contains("<h3>YouTube Video</h3>"));
    assert!(cards[0].contains(r#"src="https://img.youtube.com/vi/MG8POs0jwUQ/maxresdefault.jpg""#));
    assert!(cards[0].contains("https://img.youtube.com/vi/MG8POs0jwUQ/hqdefault.jpg"));
}

#[tokio::test]
async fn malformed_oembed_body_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>consent wall</html>"))
        .mount(&server)
        .await;

    let source = OEmbedClient::new(HttpClient::new(&server.uri()).unwrap());
    let mut mount = Mount::detached("video-grid");
    let report = run_video_job(&source, &video_job(&[DEMO_URL]), &mut mount).await;

    assert!(matches!(
        report.items[0].outcome,
        Outcome::Degraded(EnrichError::Parse(_))
    ));
    assert!(mount.fragments()[0].contains("<h3>YouTube Video</h3>"));
}

#[tokio::test]
async fn grid_order_matches_input_regardless_of_latency() {
    common::init_test_tracing();
    let links = [
        "https://www.youtube.com/watch?v=MG8POs0jwUQ",
        "https://www.youtube.com/watch?v=SkMjSF7C7r8",
        "https://www.youtube.com/watch?v=4ewrGvc6PqM",
        "https://www.youtube.com/watch?v=Ij5hrTmfOgs",
    ];
    let source = ScriptedVideos {
        delays_ms: vec![
            (links[0].into(), 60),
            (links[1].into(), 5),
            (links[2].into(), 30),
            (links[3].into(), 0),
        ],
        fail: vec![links[2].into()],
        ..Default::default()
    };
    let mut mount = Mount::detached("video-grid");
    let report = run_video_job(&source, &video_job(&links), &mut mount).await;

    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(*source.calls.lock().unwrap(), links.to_vec());
    assert_eq!(report.rendered(), 3);
    assert_eq!(report.degraded(), 1);

    let cards = mount.fragments();
    assert_eq!(cards.len(), 4);
    assert!(cards[0].contains("<h3>Title MG8POs0jwUQ</h3>"));
    assert!(cards[1].contains("<h3>Title SkMjSF7C7r8</h3>"));
    assert!(cards[2].contains("<h3>YouTube Video</h3>"));
    assert!(cards[2].contains("/vi/4ewrGvc6PqM/"));
    assert!(cards[3].contains("<h3>Title Ij5hrTmfOgs</h3>"));
}

#[tokio::test]
async fn unresolved_link_is_skipped_and_batch_continues() {
    let links = [
        "https://example.com/not-a-video",
        "https://youtu.be/SkMjSF7C7r8",
    ];
    let source = ScriptedVideos::default();
    let mut mount = Mount::detached("video-grid");
    let report = run_video_job(&source, &video_job(&links), &mut mount).await;

    assert_eq!(report.items.len(), 2);
    assert!(matches!(
        report.items[0].outcome,
        Outcome::Skipped(EnrichError::Resolution(_))
    ));
    assert_eq!(report.items[0].state(), Some(ItemState::Unresolved));
    assert_eq!(report.rendered(), 1);
    assert_eq!(*source.calls.lock().unwrap(), vec![links[1].to_string()]);
    assert_eq!(mount.len(), 1);
}

#[tokio::test]
async fn panicking_item_degrades_without_aborting_batch() {
    let links = ["https://youtu.be/MG8POs0jwUQ", "https://youtu.be/SkMjSF7C7r8"];
    let source = ScriptedVideos {
        panic_on: vec![links[0].into()],
        ..Default::default()
    };
    let mut mount = Mount::detached("video-grid");
    let report = run_video_job(&source, &video_job(&links), &mut mount).await;

    assert_eq!(report.degraded(), 1);
    assert_eq!(report.rendered(), 1);
    let cards = mount.fragments();
    assert_eq!(cards.len(), 2);
    assert!(cards[0].contains("<h3>YouTube Video</h3>"));
    assert!(cards[0].contains("/vi/MG8POs0jwUQ/maxresdefault.jpg"));
    assert!(cards[1].contains("<h3>Title SkMjSF7C7r8</h3>"));
}

// ==============================
// Post job
// ==============================

async fn relay_server(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .and(query_param("url", POST_URL))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn relay_client(server: &MockServer) -> RelayClient {
    RelayClient::new(HttpClient::new(&format!("{}/get", server.uri())).unwrap())
}

#[tokio::test]
async fn relay_post_is_extracted_and_prepended() {
    common::init_test_tracing();
    let words = (1..=150).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
    let html = format!(
        r#"<html><head><title>Ignored | Patreon</title>
        <meta property="og:title" content="Bi Te &amp; Li Lun"></head>
        <body><h1>Heading</h1><div data-tag="post-content"><p>{words}</p></div></body></html>"#
    );
    let server = relay_server(serde_json::json!({
        "contents": html,
        "status": { "url": POST_URL, "content_type": "text/html", "http_code": 200, "response_time": 120 }
    }))
    .await;

    let mut mount = Mount::detached("blog-list");
    mount.append("<article>existing</article>".into());
    let report = run_post_job(&relay_client(&server), &post_job(), &mut mount).await;

    assert_eq!(report.rendered(), 1);
    assert_eq!(
        report.items[0].states,
        vec![
            ItemState::Pending,
            ItemState::Resolved,
            ItemState::Fetched,
            ItemState::Rendered
        ]
    );
    let cards = mount.fragments();
    assert_eq!(cards.len(), 2);
    assert!(cards[0].contains("<h3>Bi Te &amp; Li Lun</h3>"));
    assert!(cards[0].contains("w100...</p>"));
    assert!(!cards[0].contains("w101"));
    assert_eq!(cards[1], "<article>existing</article>");
}

#[tokio::test]
async fn unrecognized_markup_uses_fallback_literals() {
    let server = relay_server(serde_json::json!({
        "contents": "<html><body><div class=\"app\"><span>nothing useful</span></div></body></html>"
    }))
    .await;

    let mut mount = Mount::detached("blog-list");
    let report = run_post_job(&relay_client(&server), &post_job(), &mut mount).await;

    assert_eq!(report.rendered(), 1);
    let card = mount.fragments()[0];
    assert!(card.contains("<h3>Patreon Post</h3>"));
    assert!(card.contains(&format!("<p>{FALLBACK_BODY}</p>")));
}

#[tokio::test]
async fn network_failure_inserts_single_fallback_card_at_front() {
    let source = RelayClient::new(HttpClient::new(&closed_port_uri()).unwrap());
    let mut mount = Mount::detached("blog-list");
    mount.append("<article>older post</article>".into());

    let report = run_post_job(&source, &post_job(), &mut mount).await;

    assert_eq!(report.degraded(), 1);
    assert!(matches!(
        report.items[0].outcome,
        Outcome::Degraded(EnrichError::Transport(_))
    ));
    assert_eq!(
        report.items[0].states,
        vec![
            ItemState::Pending,
            ItemState::Resolved,
            ItemState::FetchFailed,
            ItemState::Rendered
        ]
    );
    let cards = mount.fragments();
    assert_eq!(cards.len(), 2);
    assert!(cards[0].contains("<h3>Patreon Post</h3>"));
    assert!(cards[0].contains(&format!(r#"href="{POST_URL}""#)));
    assert_eq!(cards[1], "<article>older post</article>");
}

#[tokio::test]
async fn relay_reported_upstream_error_is_transport_failure() {
    let server = relay_server(serde_json::json!({
        "contents": "<html><h1>Log in</h1></html>",
        "status": { "http_code": 403 }
    }))
    .await;

    let mut mount = Mount::detached("blog-list");
    let report = run_post_job(&relay_client(&server), &post_job(), &mut mount).await;

    assert!(matches!(
        report.items[0].outcome,
        Outcome::Degraded(EnrichError::Transport(_))
    ));
    assert!(mount.fragments()[0].contains("<h3>Patreon Post</h3>"));
}

#[tokio::test]
async fn empty_relay_envelope_is_parse_failure() {
    let server = relay_server(serde_json::json!({ "contents": null })).await;

    let mut mount = Mount::detached("blog-list");
    let report = run_post_job(&relay_client(&server), &post_job(), &mut mount).await;

    assert!(matches!(
        report.items[0].outcome,
        Outcome::Degraded(EnrichError::Parse(_))
    ));
    assert_eq!(mount.len(), 1);
}

#[tokio::test]
async fn direct_client_fetches_page_itself() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>Direct | Patreon</title></head><body><article>Body text</article></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut job = post_job();
    job.link = ResourceRef::post(format!("{}/posts/42", server.uri()));
    let source = DirectClient::new(HttpClient::new(&server.uri()).unwrap());
    let mut mount = Mount::detached("blog-list");
    let report = run_post_job(&source, &job, &mut mount).await;

    assert_eq!(report.rendered(), 1);
    let card = mount.fragments()[0];
    assert!(card.contains("<h3>Direct</h3>"));
    assert!(card.contains("<p>Body text</p>"));
}

// ==============================
// Page
// ==============================

const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<section id="videos"><div class="video-grid" id="video-grid"></div></section>
<section id="blog">
  <div class="blog-list" id="blog-list">
    <article class="blog-item"><h3>Static post</h3></article>
  </div>
</section>
</body></html>"#;

#[tokio::test]
async fn page_gets_both_jobs_spliced_in() {
    common::init_test_tracing();
    let videos = ScriptedVideos::default();
    let post = StaticPost::failing();
    let vjob = video_job(&["https://youtu.be/MG8POs0jwUQ", "https://youtu.be/SkMjSF7C7r8"]);
    let pjob = post_job();

    let mut page = HostPage::new(PAGE);
    let video_source: &dyn VideoMetadataSource = &videos;
    let post_source: &dyn PostSource = &post;
    let report = enrich_page(&mut page, Some((video_source, &vjob)), Some((post_source, &pjob))).await;

    assert!(report.videos.ran && report.post.ran);
    assert_eq!(report.videos.rendered(), 2);
    assert_eq!(report.post.degraded(), 1);

    let html = page.into_html();
    let grid = html.find(r#"id="video-grid""#).unwrap();
    let first = html.find("<h3>Title MG8POs0jwUQ</h3>").unwrap();
    let second = html.find("<h3>Title SkMjSF7C7r8</h3>").unwrap();
    let list = html.find(r#"id="blog-list""#).unwrap();
    let fallback = html.find("<h3>Patreon Post</h3>").unwrap();
    let static_post = html.find("<h3>Static post</h3>").unwrap();
    assert!(grid < first && first < second && second < list);
    assert!(list < fallback && fallback < static_post);
}

#[tokio::test]
async fn missing_mount_silently_disables_job() {
    let videos = ScriptedVideos::default();
    let post = StaticPost::ok("<h1>never read</h1>");
    let vjob = video_job(&["https://youtu.be/MG8POs0jwUQ"]);
    let mut pjob = post_job();
    pjob.mount = "no-such-list".into();

    let mut page = HostPage::new(PAGE);
    let video_source: &dyn VideoMetadataSource = &videos;
    let post_source: &dyn PostSource = &post;
    let report = enrich_page(&mut page, Some((video_source, &vjob)), Some((post_source, &pjob))).await;

    assert!(report.videos.ran);
    assert!(!report.post.ran);
    assert_eq!(post.calls.load(Ordering::SeqCst), 0);
    let html = page.into_html();
    assert!(html.contains("<h3>Title MG8POs0jwUQ</h3>"));
    assert!(!html.contains("Patreon Post"));
}

#[tokio::test]
async fn disabled_jobs_leave_page_untouched() {
    let mut page = HostPage::new(PAGE);
    let report = enrich_page(&mut page, None, None).await;
    assert!(!report.videos.ran && !report.post.ran);
    assert_eq!(page.as_str(), PAGE);
}

const ADJACENT_PAGE: &str = r#"<div id="video-grid"></div><div id="blog-list"><article class="blog-item">old</article></div>"#;

async fn enrich_adjacent(title: &'static str) -> (String, EnrichReport) {
    let videos = FixedTitle(title);
    let post = StaticPost::failing();
    let vjob = video_job(&["https://youtu.be/MG8POs0jwUQ"]);
    let pjob = post_job();
    let video_source: &dyn VideoMetadataSource = &videos;
    let post_source: &dyn PostSource = &post;

    let mut page = HostPage::new(ADJACENT_PAGE);
    let report = enrich_page(&mut page, Some((video_source, &vjob)), Some((post_source, &pjob))).await;
    (page.into_html(), report)
}

#[tokio::test]
async fn id_like_remote_title_cannot_capture_post_container() {
    common::init_test_tracing();
    let (html, report) = enrich_adjacent("My vlog id=blog-list").await;

    assert_eq!(report.videos.rendered(), 1);
    assert_eq!(report.post.degraded(), 1);
    assert_eq!(html.matches("<h3>Patreon Post</h3>").count(), 1);

    let video = html.find("<h3>My vlog id=blog-list</h3>").unwrap();
    let list = html.find(r#"<div id="blog-list">"#).unwrap();
    let fallback = html.find("<h3>Patreon Post</h3>").unwrap();
    let old = html.find(">old</article>").unwrap();
    assert!(video < list && list < fallback && fallback < old);
}

#[tokio::test]
async fn markup_in_remote_title_stays_text() {
    let (html, report) = enrich_adjacent(r#"x"></div><div id="blog-list">"#).await;

    assert_eq!(report.post.degraded(), 1);
    assert_eq!(html.matches(r#"<div id="blog-list">"#).count(), 1);
    assert!(html.contains(r#"alt="x&quot;&gt;&lt;/div&gt;&lt;div id=&quot;blog-list&quot;&gt;""#));
    let list = html.find(r#"<div id="blog-list">"#).unwrap();
    let fallback = html.find("<h3>Patreon Post</h3>").unwrap();
    assert!(list < fallback);
}

#[tokio::test]
async fn report_matches_page_for_every_item() {
    let (html, report) = enrich_adjacent("Plain title").await;

    let video_cards = html.matches(r#"<div class="video-card">"#).count();
    let post_cards = html.matches(r#"<article class="blog-item">"#).count() - 1;
    assert_eq!(video_cards, report.videos.rendered() + report.videos.degraded());
    assert_eq!(post_cards, report.post.rendered() + report.post.degraded());
    assert!(report.videos.items.iter().all(|item| item.state() == Some(ItemState::Rendered)));
    assert!(report.post.items.iter().all(|item| item.state() == Some(ItemState::Rendered)));
}
