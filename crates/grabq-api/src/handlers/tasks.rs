//! Task submission and status handlers.

use std::path::{Path, PathBuf};

use axum::extract::{FromRequest, Multipart, Path as UrlPath, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::info;

use grabq_models::options::DEFAULT_AUDIO_FORMAT;
use grabq_models::{
    DownloadMode, FormatChoice, JobOptions, ProgressSnapshot, TaskId, TaskRecord, TaskStatus,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Cookie file extensions accepted on upload.
const COOKIE_EXTENSIONS: [&str; 2] = ["txt", "cookies"];

/// Submission fields, shared by the JSON, urlencoded and multipart encodings.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub choice: Option<String>,
    #[serde(default)]
    pub audio_format: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub force_h264: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
}

/// Public view of a task record.
#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub id: TaskId,
    pub status: TaskStatus,
    pub progress: ProgressSnapshot,
    pub files: Vec<String>,
    pub error: Option<String>,
}

impl From<TaskRecord> for TaskStatusResponse {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            progress: record.progress,
            files: record.files,
            error: record.error,
        }
    }
}

/// Uploaded cookie file, before it is written to disk.
#[derive(Debug)]
struct CookieUpload {
    file_name: String,
    data: Vec<u8>,
}

#[derive(Debug)]
struct Submission {
    url: String,
    mode: DownloadMode,
    options: JobOptions,
}

/// Submit a download job.
///
/// POST /start_download
pub async fn start_download(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<SubmitResponse>> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let (form, cookie) = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        read_multipart(multipart).await?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(form) = Form::<SubmitRequest>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        (form, None)
    } else {
        let Json(form) = Json::<SubmitRequest>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        (form, None)
    };

    let submission = match validate(form, cookie.as_ref()) {
        Ok(submission) => submission,
        Err(e) => {
            metrics::record_submission_rejected();
            return Err(e);
        }
    };

    let task_id = TaskId::new();
    let mut options = submission.options;
    if let Some(cookie) = cookie {
        let path = save_cookie_file(&state.config.download_dir, &task_id, &cookie.data)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store cookie file: {}", e)))?;
        options.cookie_file = Some(path);
    }

    let mode = submission.mode;
    info!(task_id = %task_id, mode = %mode, url = %submission.url, "Task queued");

    state
        .store
        .insert(TaskRecord::new(task_id.clone(), submission.url, mode, options))?;
    state.queue.push(task_id.clone());

    metrics::record_job_submitted(mode.as_str());
    metrics::set_queue_depth(state.queue.depth());

    Ok(Json(SubmitResponse { task_id }))
}

/// Poll a task.
///
/// GET /task_status/:task_id
pub async fn task_status(
    State(state): State<AppState>,
    UrlPath(task_id): UrlPath<String>,
) -> ApiResult<Json<TaskStatusResponse>> {
    state
        .store
        .get(&TaskId::from_string(task_id))
        .map(|record| Json(record.into()))
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

async fn read_multipart(
    mut multipart: Multipart,
) -> ApiResult<(SubmitRequest, Option<CookieUpload>)> {
    let mut form = SubmitRequest::default();
    let mut cookie = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "cookiefile" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            // Browsers send an empty part when no file was picked.
            if !file_name.is_empty() {
                cookie = Some(CookieUpload {
                    file_name,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        match name.as_str() {
            "url" => form.url = Some(value),
            "mode" => form.mode = Some(value),
            "choice" => form.choice = Some(value),
            "audio_format" => form.audio_format = Some(value),
            "force_h264" => form.force_h264 = is_truthy(&value),
            _ => {}
        }
    }

    Ok((form, cookie))
}

fn validate(form: SubmitRequest, cookie: Option<&CookieUpload>) -> ApiResult<Submission> {
    let url = form.url.as_deref().unwrap_or_default().trim().to_string();
    if url.is_empty() {
        return Err(ApiError::bad_request("URL is required"));
    }

    let mode = form
        .mode
        .as_deref()
        .unwrap_or_default()
        .parse::<DownloadMode>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if let Some(cookie) = cookie {
        let name = sanitize_file_name(&cookie.file_name);
        if !has_cookie_extension(&name) {
            return Err(ApiError::bad_request(
                "Cookie file must have a .txt or .cookies extension",
            ));
        }
    }

    let audio_format = form
        .audio_format
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_AUDIO_FORMAT)
        .to_string();

    Ok(Submission {
        url,
        mode,
        options: JobOptions {
            choice: FormatChoice::parse(form.choice.as_deref().unwrap_or_default()),
            audio_format,
            force_h264: form.force_h264,
            cookie_file: None,
        },
    })
}

/// Write the cookie file owner-readable only; it holds session credentials.
async fn save_cookie_file(dir: &Path, task_id: &TaskId, data: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("cookies_{}.txt", task_id));

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(path)
}

/// Reduce an uploaded file name to a safe base name.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_matches(['.', '_']).to_string()
}

fn has_cookie_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| COOKIE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "1" | "yes" | "checked"
    )
}

/// Accept a JSON bool, a number, or a form-style string.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => is_truthy(&s),
        serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}
