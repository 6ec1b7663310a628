//! Scan session endpoints: upload, edit, select, view and export.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use kkscan_core::{
    HouseholdField, MemberField, SessionError, SessionSnapshot, ViewerAction, ViewerSnapshot,
    spawn_scan,
};
use kkscan_logging::{ScanLogger, ScanOutcome};
use kkscan_media::{ImageUpload, decode_data_uri};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use crate::session_registry::SharedSession;

/// Optional header carrying the original file name of a raw upload.
const FILE_NAME_HEADER: &str = "x-file-name";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUriScan {
    pub data_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberEdit {
    pub field: MemberField,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct HouseholdEdit {
    pub field: HouseholdField,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct Selection {
    pub index: usize,
}

async fn snapshot(session: &SharedSession) -> SessionSnapshot {
    session.lock().await.snapshot(Instant::now())
}

/// `POST /api/sessions`
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let (id, session) = state.registry.create().await;
    info!(session = %id, "Session created");
    (StatusCode::CREATED, Json(snapshot(&session).await))
}

/// `GET /api/sessions/:id`
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    Ok(Json(snapshot(&session).await))
}

/// `DELETE /api/sessions/:id`: back to idle.
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    session.lock().await.reset();
    Ok(Json(snapshot(&session).await))
}

/// Media type from `Content-Type`, without parameters.
fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// `POST /api/sessions/:id/scan` with the raw image as body.
#[instrument(skip_all, fields(session = %id, bytes = body.len()))]
pub async fn scan_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;

    let mut upload = ImageUpload::new(content_type(&headers), body).resolve_mime();
    if let Some(name) = headers.get(FILE_NAME_HEADER).and_then(|v| v.to_str().ok()) {
        upload = upload.with_file_name(name);
    }
    let data_uri = state.intake.accept(&upload)?;

    scan(&state, &id, &session, data_uri).await
}

/// `POST /api/sessions/:id/scan/data-uri`
#[instrument(skip_all, fields(session = %id))]
pub async fn scan_data_uri(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DataUriScan>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    let data_uri = state.intake.accept_data_uri(&req.data_uri)?;
    scan(&state, &id, &session, data_uri).await
}

async fn scan(
    state: &AppState,
    id: &Uuid,
    session: &SharedSession,
    data_uri: String,
) -> ApiResult<Json<SessionSnapshot>> {
    let start = Instant::now();
    let session_id = id.to_string();

    let outcome = spawn_scan(session.clone(), state.extractor.clone(), data_uri)
        .await
        .map_err(|e| ApiError::Internal(format!("scan task failed: {e}")))?;

    match outcome {
        Ok(()) => {
            let snap = snapshot(session).await;
            let members = snap.editor.as_ref().map_or(0, |e| e.members.len());
            ScanLogger::log_event(
                &session_id,
                ScanOutcome::Completed {
                    members,
                    latency_ms: start.elapsed().as_millis() as u64,
                },
            );
            Ok(Json(snap))
        }
        Err(SessionError::Extraction(e)) => {
            ScanLogger::log_event(
                &session_id,
                ScanOutcome::Failed {
                    error_msg: e.to_string(),
                },
            );
            Err(SessionError::Extraction(e).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /api/sessions/:id/image`: the uploaded image for preview.
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = state.session(&id).await?;
    let uri = session
        .lock()
        .await
        .image()
        .map(str::to_string)
        .ok_or(SessionError::NoResult)?;
    let image = decode_data_uri(&uri)?;
    Ok((
        [(header::CONTENT_TYPE, image.mime_type.clone())],
        image.data,
    )
        .into_response())
}

/// `PATCH /api/sessions/:id/members/:index`
pub async fn edit_member(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(edit): Json<MemberEdit>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    let mut guard = session.lock().await;
    guard.set_member_field(index, edit.field, edit.value)?;
    Ok(Json(guard.snapshot(Instant::now())))
}

/// `PATCH /api/sessions/:id/household`
pub async fn edit_household(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(edit): Json<HouseholdEdit>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    let mut guard = session.lock().await;
    guard.set_household_field(edit.field, edit.value)?;
    Ok(Json(guard.snapshot(Instant::now())))
}

/// `PUT /api/sessions/:id/selection`
pub async fn select_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(selection): Json<Selection>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    let mut guard = session.lock().await;
    guard.select(selection.index)?;
    Ok(Json(guard.snapshot(Instant::now())))
}

/// `POST /api/sessions/:id/revert`
pub async fn revert_edits(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    let mut guard = session.lock().await;
    guard.revert()?;
    Ok(Json(guard.snapshot(Instant::now())))
}

/// `POST /api/sessions/:id/viewer`
pub async fn apply_viewer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(action): Json<ViewerAction>,
) -> ApiResult<Json<ViewerSnapshot>> {
    let session = state.session(&id).await?;
    let view = session.lock().await.apply_viewer(action)?;
    Ok(Json(view))
}

fn exported(id: &Uuid, format: &str) {
    ScanLogger::log_event(
        &id.to_string(),
        ScanOutcome::Exported {
            format: format.to_string(),
        },
    );
}

fn text_response(content_type: &'static str, body: String) -> Response {
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// `GET /api/sessions/:id/export/row`
pub async fn export_row(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = state.session(&id).await?;
    let row = session.lock().await.copy_row(Instant::now())?;
    exported(&id, "row");
    Ok(text_response("text/plain; charset=utf-8", row))
}

/// `GET /api/sessions/:id/export/table`
pub async fn export_table(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = state.session(&id).await?;
    let table = session.lock().await.copy_table(Instant::now())?;
    exported(&id, "table");
    Ok(text_response("text/plain; charset=utf-8", table))
}

/// `GET /api/sessions/:id/export/json`
pub async fn export_json(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = state.session(&id).await?;
    let json = session.lock().await.copy_json(Instant::now())?;
    exported(&id, "json");
    Ok(text_response("application/json", json))
}

/// `GET /api/sessions/:id/export/csv`: attachment download.
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = state.session(&id).await?;
    let download = session.lock().await.download_csv()?;
    exported(&id, "csv");

    let disposition = HeaderValue::from_str(&content_disposition(&download.filename))
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.content,
    )
        .into_response())
}

/// `attachment` disposition with an ASCII fallback name and the exact
/// UTF-8 name percent-encoded.
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();
    let mut encoded = String::new();
    for b in filename.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{:02X}", b));
        }
    }
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use axum::{Router, body::Body, http::Request};
    use kkscan_core::{EXTRACTION_FAILED_MESSAGE, Extractor};
    use kkscan_media::ImageIntake;
    use async_trait::async_trait;
    use futures::StreamExt;
    use kkscan_core::{ExtractionError, KartuKeluargaData};
    use kkscan_understanding::{MockExtractor, parse_extraction};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
    use tower::ServiceExt;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn household_reply() -> String {
        json!({
            "nomorKK": "3301010101010001",
            "alamat": "JL. MAWAR NO. 5",
            "dusun": "",
            "rt": "001",
            "rw": "002",
            "kodePos": "53271",
            "desaKelurahan": "SIDAREJA",
            "kecamatan": "SIDAREJA",
            "kabupatenKota": "CILACAP",
            "provinsi": "JAWA TENGAH",
            "anggotaKeluarga": [
                { "no": "1", "namaLengkap": "JOKO", "nik": "3301010101800001",
                  "statusHubungan": "KEPALA KELUARGA", "tanggalLahir": "1980-07-17" },
                { "no": "2", "namaLengkap": "SRI", "nik": "3301010101820002",
                  "statusHubungan": "ISTRI" },
                { "no": "3", "namaLengkap": "SITI AMINAH", "nik": "3301010101100003",
                  "statusHubungan": "ANAK", "jenisKelamin": "PEREMPUAN",
                  "namaAyah": "JOKO", "namaIbu": "SRI WAHYUNI" }
            ]
        })
        .to_string()
    }

    /// Holds each extraction until the gate is opened.
    struct GatedExtractor {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Extractor for GatedExtractor {
        fn name(&self) -> &str {
            "gated"
        }
        async fn extract(&self, _uri: &str) -> Result<KartuKeluargaData, ExtractionError> {
            self.gate.notified().await;
            parse_extraction(&household_reply())
        }
    }

    fn app_with(extractor: Arc<dyn Extractor>, max_upload: usize) -> Router {
        let state = Arc::new(AppState::new(
            extractor,
            ImageIntake::new(max_upload),
            Duration::from_secs(2),
        ));
        build_router(state, &[])
    }

    fn app() -> Router {
        app_with(
            Arc::new(MockExtractor::new("mock").with_response(household_reply())),
            kkscan_media::MAX_UPLOAD_BYTES,
        )
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body.to_vec())
    }

    async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = send(app, req).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload(id: &str, mime: &str, bytes: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{id}/scan"))
            .header("content-type", mime)
            .body(Body::from(bytes))
            .unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let req = Request::builder()
            .method("POST")
            .uri("/api/sessions")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "idle");
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send_json(&app(), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["extractor"], "mock");
    }

    #[tokio::test]
    async fn test_scan_edit_and_export() {
        let app = app();
        let id = new_session(&app).await;

        let (status, body) = send_json(&app, upload(&id, "image/png", PNG.to_vec())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "loaded");
        assert_eq!(body["editor"]["student"]["index"], 2);
        assert_eq!(body["editor"]["father"]["status"], "linked");
        assert_eq!(body["editor"]["mother"]["status"], "unlinked");
        assert_eq!(body["editor"]["address"]["dusun"], "JL. MAWAR NO. 5");
        assert_eq!(body["viewer"]["zoomLabel"], "100%");

        let (status, body) = send_json(
            &app,
            json_req("PATCH", &format!("/api/sessions/{id}/household"), json!({ "field": "rt", "value": "009" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["editor"]["address"]["rt"], "009");
        assert_eq!(body["editor"]["modified"], true);

        let (status, _, row) = send(&app, get(&format!("/api/sessions/{id}/export/row"))).await;
        assert_eq!(status, StatusCode::OK);
        let row = String::from_utf8(row).unwrap();
        let cols: Vec<&str> = row.split('\t').collect();
        assert_eq!(cols.len(), 21);
        assert_eq!(cols[0], "3301010101010001");
        assert!(row.contains("\tSITI AMINAH\t"));
        assert!(row.contains("\t009\t"));

        let (status, headers, csv) = send(&app, get(&format!("/api/sessions/{id}/export/csv"))).await;
        assert_eq!(status, StatusCode::OK);
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("filename=\"Data_Siswa_SITI_AMINAH.csv\""));
        assert!(String::from_utf8(csv).unwrap().starts_with("NO KK,"));

        let (_, body) = send_json(&app, get(&format!("/api/sessions/{id}"))).await;
        assert_eq!(body["copied"], json!(["row"]));
    }

    #[tokio::test]
    async fn test_rejected_uploads() {
        let app = app_with(
            Arc::new(MockExtractor::new("mock").with_response(household_reply())),
            32,
        );
        let id = new_session(&app).await;

        let (status, body) = send_json(&app, upload(&id, "application/pdf", b"%PDF-1.4".to_vec())).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"], "Mohon unggah file gambar (JPG, PNG).");

        let (status, _) = send_json(&app, upload(&id, "image/jpeg", vec![0xFF; 64])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (_, body) = send_json(&app, get(&format!("/api/sessions/{id}"))).await;
        assert_eq!(body["status"], "idle");
        assert_eq!(body["hasImage"], false);
    }

    #[tokio::test]
    async fn test_failed_extraction_is_generic_502() {
        let app = app_with(
            Arc::new(MockExtractor::new("mock").failing()),
            kkscan_media::MAX_UPLOAD_BYTES,
        );
        let id = new_session(&app).await;

        let (status, body) = send_json(&app, upload(&id, "image/png", PNG.to_vec())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], EXTRACTION_FAILED_MESSAGE);

        let (_, body) = send_json(&app, get(&format!("/api/sessions/{id}"))).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["error"], EXTRACTION_FAILED_MESSAGE);
        assert!(body["editor"].is_null());

        let (status, _, _) = send(&app, get(&format!("/api/sessions/{id}/export/row"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_data_uri_scan_and_image_preview() {
        let app = app();
        let id = new_session(&app).await;
        let data_uri = kkscan_media::encode_data_uri("image/png", PNG);

        let (status, _) = send_json(
            &app,
            json_req("POST", &format!("/api/sessions/{id}/scan/data-uri"), json!({ "dataUri": data_uri })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, headers, bytes) = send(&app, get(&format!("/api/sessions/{id}/image"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(bytes, PNG);
    }

    #[tokio::test]
    async fn test_selection_viewer_and_reset() {
        let app = app();
        let id = new_session(&app).await;

        let (status, _) = send_json(
            &app,
            json_req("POST", &format!("/api/sessions/{id}/viewer"), json!({ "action": "zoomIn" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send_json(&app, upload(&id, "image/png", PNG.to_vec())).await;

        let (status, view) = send_json(
            &app,
            json_req("POST", &format!("/api/sessions/{id}/viewer"), json!({ "action": "zoomIn" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["zoomLabel"], "150%");

        let (status, body) = send_json(
            &app,
            json_req("PUT", &format!("/api/sessions/{id}/selection"), json!({ "index": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["editor"]["student"]["namaLengkap"], "JOKO");

        let (status, _) = send_json(
            &app,
            json_req("PUT", &format!("/api/sessions/{id}/selection"), json!({ "index": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send_json(
            &app,
            json_req(
                "PATCH",
                &format!("/api/sessions/{id}/members/7"),
                json!({ "field": "namaLengkap", "value": "X" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
        assert!(body["viewer"].is_null());
    }

    #[tokio::test]
    async fn test_abandoned_upload_still_settles() {
        let gate = Arc::new(Notify::new());
        let app = app_with(
            Arc::new(GatedExtractor { gate: gate.clone() }),
            kkscan_media::MAX_UPLOAD_BYTES,
        );
        let id = new_session(&app).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            send(&app, upload(&id, "image/png", PNG.to_vec())),
        )
        .await;
        assert!(abandoned.is_err());
        let (_, body) = send_json(&app, get(&format!("/api/sessions/{id}"))).await;
        assert_eq!(body["status"], "loading");

        gate.notify_one();
        let mut status = Value::Null;
        for _ in 0..200 {
            let (_, body) = send_json(&app, get(&format!("/api/sessions/{id}"))).await;
            status = body["status"].clone();
            if status != "loading" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(status, "loaded");

        gate.notify_one();
        let (status, body) = send_json(&app, upload(&id, "image/png", PNG.to_vec())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "loaded");
    }

    #[tokio::test]
    async fn test_event_stream_reports_scan() {
        let app = app();
        let id = new_session(&app).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = app.clone();
        tokio::spawn(async move {
            axum::serve(listener, server).await.unwrap();
        });

        let (mut ws, _) = connect_async(format!("ws://{addr}/api/sessions/{id}/events"))
            .await
            .unwrap();

        let (status, _) = send_json(&app, upload(&id, "image/png", PNG.to_vec())).await;
        assert_eq!(status, StatusCode::OK);

        let mut kinds = Vec::new();
        while kinds.len() < 2 {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if let WsMessage::Text(text) = msg {
                let event: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(event["session_id"], id.as_str());
                kinds.push(event["kind"].clone());
            }
        }
        assert_eq!(kinds[0], json!({ "type": "scan_started" }));
        assert_eq!(kinds[1], json!({ "type": "scan_completed", "members": 3 }));

        ws.close(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (status, body) = send_json(&app(), get(&format!("/api/sessions/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[test]
    fn test_content_disposition_encodes_non_ascii() {
        let value = content_disposition("Data_Siswa_Zoë.csv");
        assert!(value.starts_with("attachment; filename=\"Data_Siswa_Zo_.csv\""));
        assert!(value.ends_with("filename*=UTF-8''Data_Siswa_Zo%C3%AB.csv"));
    }
}
