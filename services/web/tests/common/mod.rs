//! Shared harness: the real router on an ephemeral port, backed by the
//! in-memory store, driven by a cookie-keeping HTTP client.

#![allow(dead_code)]

use std::sync::Arc;

use reqwest::StatusCode;
use snowfinch_web::{
    db::{MemorySensorStore, SensorStore, SiteRecord},
    http, paths,
    state::AppState,
    views::escape_text,
};
use tokio::net::TcpListener;

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: MemorySensorStore,
    pub site: SiteRecord,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info,snowfinch_web=debug".into()),
            )
            .with_test_writer()
            .try_init();

        let store = MemorySensorStore::new();
        let site = store.insert_site("Snowfinch").await.unwrap();

        let state = AppState::new(Arc::new(store.clone()));
        let app = http::create_router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap();

        Self {
            base_url: format!("http://{addr}"),
            client,
            store,
            site,
        }
    }

    pub fn sensors_path(&self) -> String {
        paths::sensors(self.site.id)
    }

    pub async fn get(&self, path: &str) -> Page {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap();
        Page::read(resp).await
    }

    /// Submits a form; redirects are followed like a browser would.
    pub async fn post(&self, path: &str, fields: &[(String, String)]) -> Page {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .form(fields)
            .send()
            .await
            .unwrap();
        Page::read(resp).await
    }
}

/// A response after redirects, as the browser would see it.
#[derive(Debug)]
pub struct Page {
    pub status: StatusCode,
    /// Path of the final URL.
    pub path: String,
    pub body: String,
}

impl Page {
    async fn read(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let path = resp.url().path().to_string();
        let body = resp.text().await.unwrap();
        Self { status, path, body }
    }

    pub fn has_title(&self, title: &str) -> bool {
        let title = escape_text(title);
        self.body.contains(&format!("<title>{title}</title>"))
            && self.body.contains(&format!("<h1>{title}</h1>"))
    }

    pub fn has_notice(&self, notice: &str) -> bool {
        self.body.contains(&format!(
            "<div id=\"notice\" class=\"notice\">{}</div>",
            escape_text(notice)
        ))
    }

    pub fn has_any_notice(&self) -> bool {
        self.body.contains("id=\"notice\"")
    }

    pub fn has_link(&self, text: &str, href: &str) -> bool {
        self.body
            .contains(&format!("<a href=\"{href}\">{}</a>", escape_text(text)))
    }

    pub fn has_active_navigation(&self, section: &str) -> bool {
        self.body.contains(&format!("class=\"active\">{section}</a>"))
    }

    /// Whether the `<form id=...>` is rendered visible.
    pub fn form_visible(&self, form_id: &str) -> bool {
        let marker = format!("<form id=\"{form_id}\"");
        let Some(start) = self.body.find(&marker) else {
            return false;
        };
        let end = start + self.body[start..].find('>').unwrap_or(0);
        !self.body[start..end].contains("display:none")
    }
}

pub fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
