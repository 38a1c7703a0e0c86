//! Test Helper Utilities
//!
//! Local stand-in for the score service, plus scripted console doubles.
//!
//! The fake serves one score (id 12345, "My Song", 3 pages). Its signed API
//! only answers when the `Authorization` header matches the signature for the
//! seed it was started with, and records every request it sees.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use jmuse_dl::console::Prompter;
use jmuse_dl::services::{ClientConfig, JmuseClient};
use jmuse_dl::workflow::{PipelineEvent, ProgressReporter};
use serde_json::json;
use tokio::task::JoinHandle;

pub const SCORE_PATH: &str = "/user/1/scores/12345";
pub const SCORE_ID: &str = "12345";
pub const SCORE_TITLE: &str = "My Song";
pub const PAGE_COUNT: u32 = 3;

/// Seed embedded in the fake's client bundle
pub const BUNDLE_SEED: &str = "8(a(";

/// Bundle containing the signing call
pub const BUNDLE_WITH_SEED: &str = r#"!function(){var n=function(e,t,r){return s()(e+t+r+"8(a(").substr(0,4)};window.sign=n}();"#;

/// Bundle with similar code but no seed literal
pub const BUNDLE_WITHOUT_SEED: &str = r#"!function(){var n=function(e){return e.substr(0,4)};window.sign=n}();"#;

/// Known-good signatures for score 12345, keyed by (type, index)
pub fn expected_signatures(seed: &str) -> HashMap<(String, u32), String> {
    let table: &[(&str, u32, &str)] = match seed {
        "8(a(" => &[
            ("mp3", 0, "03b2"),
            ("midi", 0, "2f26"),
            ("img", 0, "3fc2"),
            ("img", 1, "a22b"),
            ("img", 2, "ad26"),
        ],
        ")82" => &[
            ("mp3", 0, "4204"),
            ("midi", 0, "4ba7"),
            ("img", 0, "acf6"),
            ("img", 1, "53bb"),
            ("img", 2, "37c0"),
        ],
        other => panic!("no signature table for seed {other:?}"),
    };

    table
        .iter()
        .map(|(kind, index, sig)| ((kind.to_string(), *index), sig.to_string()))
        .collect()
}

/// How the fake service behaves
#[derive(Debug, Clone)]
pub struct FakeServiceOptions {
    /// Body of `/static/app.js`; `None` makes it 404
    pub bundle: Option<String>,
    /// Seed the API checks signatures against
    pub accepted_seed: String,
    /// Status returned by `/api/jmuse` (200 = normal behavior)
    pub api_status: StatusCode,
}

impl Default for FakeServiceOptions {
    fn default() -> Self {
        Self {
            bundle: Some(BUNDLE_WITH_SEED.to_string()),
            accepted_seed: BUNDLE_SEED.to_string(),
            api_status: StatusCode::OK,
        }
    }
}

/// One request seen by `/api/jmuse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub id: String,
    pub kind: String,
    pub index: u32,
    pub authorization: String,
}

#[derive(Clone)]
struct ServiceState {
    base_url: String,
    options: Arc<FakeServiceOptions>,
    signatures: Arc<HashMap<(String, u32), String>>,
    api_requests: Arc<Mutex<Vec<ApiRequest>>>,
}

/// Running fake score service; stopped on drop
pub struct FakeService {
    pub base_url: String,
    api_requests: Arc<Mutex<Vec<ApiRequest>>>,
    handle: JoinHandle<()>,
}

impl FakeService {
    pub async fn start(options: FakeServiceOptions) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake service");
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let api_requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServiceState {
            base_url: base_url.clone(),
            signatures: Arc::new(expected_signatures(&options.accepted_seed)),
            options: Arc::new(options),
            api_requests: Arc::clone(&api_requests),
        };

        let app = Router::new()
            .route(SCORE_PATH, get(score_page))
            .route("/static/app.js", get(bundle))
            .route("/api/jmuse", get(jmuse_api))
            .route("/files/:kind/:index", get(asset_file))
            .with_state(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            api_requests,
            handle,
        }
    }

    pub fn score_url(&self) -> String {
        format!("{}{}", self.base_url, SCORE_PATH)
    }

    pub fn api_requests(&self) -> Vec<ApiRequest> {
        self.api_requests.lock().unwrap().clone()
    }

    pub fn client(&self) -> JmuseClient {
        JmuseClient::new(&ClientConfig {
            api_base_url: self.base_url.clone(),
            user_agent: "jmuse-dl-tests".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .expect("client for fake service")
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn score_page() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html><head>
<meta property="og:title" content="{title}">
<link rel="preload" href="/static/missing.js" as="script">
<link rel="preload" href="/static/app.js" as="script">
<link rel="stylesheet" href="/static/site.css">
</head><body>
<div class="js-store" data-content="{{&quot;score&quot;:{{&quot;id&quot;:{id},&quot;pages&quot;:{pages}}}}}"></div>
</body></html>"#,
        title = SCORE_TITLE,
        id = SCORE_ID,
        pages = PAGE_COUNT
    ))
}

async fn bundle(State(state): State<ServiceState>) -> Response {
    match &state.options.bundle {
        Some(body) => (
            [(header::CONTENT_TYPE, "application/javascript")],
            body.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn jmuse_api(
    State(state): State<ServiceState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let request = ApiRequest {
        id: params.get("id").cloned().unwrap_or_default(),
        kind: params.get("type").cloned().unwrap_or_default(),
        index: params
            .get("index")
            .and_then(|i| i.parse().ok())
            .unwrap_or(u32::MAX),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    };
    state.api_requests.lock().unwrap().push(request.clone());

    if state.options.api_status != StatusCode::OK {
        return (state.options.api_status, "quota exceeded").into_response();
    }

    let accepted = request.id == SCORE_ID
        && state
            .signatures
            .get(&(request.kind.clone(), request.index))
            .is_some_and(|sig| *sig == request.authorization);

    if accepted {
        Json(json!({
            "info": {
                "url": format!("{}/files/{}/{}", state.base_url, request.kind, request.index)
            }
        }))
        .into_response()
    } else {
        Json(json!({ "info": {} })).into_response()
    }
}

async fn asset_file(Path((kind, index)): Path<(String, u32)>) -> Response {
    match kind.as_str() {
        "img" => (
            [(header::CONTENT_TYPE, "image/svg+xml")],
            page_svg(100 * (index + 1)),
        )
            .into_response(),
        "mp3" => (
            [(header::CONTENT_TYPE, "audio/mpeg")],
            b"ID3fake-audio".to_vec(),
        )
            .into_response(),
        "midi" => (
            [(header::CONTENT_TYPE, "audio/midi")],
            b"MThdfake-midi".to_vec(),
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Page image whose width identifies the page
pub fn page_svg(width: u32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="120" viewBox="0 0 {w} 120"><rect x="4" y="4" width="{r}" height="112" fill="none" stroke="black"/></svg>"#,
        w = width,
        r = width - 8
    )
}

/// Answers questions from a fixed script; runs out → keep defaults
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Option<String>>,
    pub questions: Vec<(String, Option<String>)>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Option<&str>>) -> Self {
        Self {
            answers: answers
                .into_iter()
                .map(|a| a.map(str::to_string))
                .collect(),
            questions: Vec::new(),
        }
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn ask(
        &mut self,
        question: &str,
        default: Option<&str>,
    ) -> std::io::Result<Option<String>> {
        self.questions
            .push((question.to_string(), default.map(str::to_string)));
        Ok(self.answers.pop_front().flatten())
    }
}

/// Keeps every event for later assertions
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl CollectingReporter {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for CollectingReporter {
    fn report(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Widths of the pages of a PDF, in page order
pub fn pdf_page_widths(path: &std::path::Path) -> Vec<f32> {
    let document = lopdf::Document::load(path).expect("load produced PDF");
    document
        .get_pages()
        .into_values()
        .map(|page_id| {
            let page = document.get_object(page_id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            match &media_box[2] {
                lopdf::Object::Real(width) => *width as f32,
                lopdf::Object::Integer(width) => *width as f32,
                other => panic!("unexpected MediaBox entry {:?}", other),
            }
        })
        .collect()
}
