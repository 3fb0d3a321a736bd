//! Client surface for the hosted learning-platform backend: session
//! management and class/chapter records with their saved drawings. The
//! canvas never persists automatically; every save or load here is an
//! explicit user action, and the newest write simply wins.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    /// Soft-delete marker; archived records stay listable and restorable.
    #[serde(default)]
    pub archived_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: String,
    pub class_id: String,
    pub title: String,
    #[serde(default)]
    pub archived_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct NameBody<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct TitleBody<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawingBody {
    image_data: String,
}

pub struct BackendClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("sketch-tutor")
            .build()
            .context("build backend HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(anyhow!("backend error: {status}"))
        }
    }

    pub fn current_session(&self) -> Result<Option<Session>> {
        let resp = self
            .http
            .get(self.url("/auth/session"))
            .bearer_auth(&self.api_key)
            .send()
            .context("fetch session")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND
            || resp.status() == reqwest::StatusCode::NO_CONTENT
            || resp.status() == reqwest::StatusCode::UNAUTHORIZED
        {
            return Ok(None);
        }
        Ok(Some(Self::check(resp)?.json().context("decode session")?))
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let resp = self
            .http
            .post(self.url("/auth/sign-in"))
            .bearer_auth(&self.api_key)
            .json(&SignInBody { email, password })
            .send()
            .context("sign in")?;
        Self::check(resp)?.json().context("decode session")
    }

    pub fn sign_out(&self) -> Result<()> {
        let resp = self
            .http
            .post(self.url("/auth/sign-out"))
            .bearer_auth(&self.api_key)
            .send()
            .context("sign out")?;
        Self::check(resp).map(|_| ())
    }

    pub fn list_classes(&self, include_archived: bool) -> Result<Vec<ClassRecord>> {
        let resp = self
            .http
            .get(self.url("/api/classes"))
            .query(&[("includeArchived", include_archived)])
            .bearer_auth(&self.api_key)
            .send()
            .context("list classes")?;
        Self::check(resp)?.json().context("decode classes")
    }

    pub fn create_class(&self, name: &str) -> Result<ClassRecord> {
        let resp = self
            .http
            .post(self.url("/api/classes"))
            .bearer_auth(&self.api_key)
            .json(&NameBody { name })
            .send()
            .context("create class")?;
        Self::check(resp)?.json().context("decode class")
    }

    pub fn rename_class(&self, id: &str, name: &str) -> Result<ClassRecord> {
        let resp = self
            .http
            .patch(self.url(&format!("/api/classes/{id}")))
            .bearer_auth(&self.api_key)
            .json(&NameBody { name })
            .send()
            .context("rename class")?;
        Self::check(resp)?.json().context("decode class")
    }

    pub fn archive_class(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("/api/classes/{id}/archive"))
    }

    pub fn restore_class(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("/api/classes/{id}/restore"))
    }

    pub fn list_chapters(&self, class_id: &str) -> Result<Vec<ChapterRecord>> {
        let resp = self
            .http
            .get(self.url(&format!("/api/classes/{class_id}/chapters")))
            .bearer_auth(&self.api_key)
            .send()
            .context("list chapters")?;
        Self::check(resp)?.json().context("decode chapters")
    }

    pub fn create_chapter(&self, class_id: &str, title: &str) -> Result<ChapterRecord> {
        let resp = self
            .http
            .post(self.url(&format!("/api/classes/{class_id}/chapters")))
            .bearer_auth(&self.api_key)
            .json(&TitleBody { title })
            .send()
            .context("create chapter")?;
        Self::check(resp)?.json().context("decode chapter")
    }

    pub fn archive_chapter(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("/api/chapters/{id}/archive"))
    }

    pub fn restore_chapter(&self, id: &str) -> Result<()> {
        self.post_empty(&format!("/api/chapters/{id}/restore"))
    }

    /// Save the current canvas snapshot (base64 PNG) under a chapter.
    pub fn save_drawing(&self, chapter_id: &str, image_data: String) -> Result<()> {
        let resp = self
            .http
            .put(self.url(&format!("/api/chapters/{chapter_id}/drawing")))
            .bearer_auth(&self.api_key)
            .json(&DrawingBody { image_data })
            .send()
            .context("save drawing")?;
        Self::check(resp).map(|_| ())
    }

    /// Load the saved snapshot for a chapter, if one exists.
    pub fn load_drawing(&self, chapter_id: &str) -> Result<Option<String>> {
        let resp = self
            .http
            .get(self.url(&format!("/api/chapters/{chapter_id}/drawing")))
            .bearer_auth(&self.api_key)
            .send()
            .context("load drawing")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: DrawingBody = Self::check(resp)?.json().context("decode drawing")?;
        Ok(Some(body.image_data))
    }

    fn post_empty(&self, path: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .send()
            .with_context(|| format!("POST {path}"))?;
        Self::check(resp).map(|_| ())
    }
}
