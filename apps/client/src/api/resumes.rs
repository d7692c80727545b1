use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::{decode_shape, ServiceClient};
use crate::errors::ApiError;
use crate::gateway::{ApiRequest, FilePart, Gateway, MultipartForm};
use crate::models::resume::{
    CreateResumeRequest, GenerateResumeRequest, GenerateResumeResponse, ListResumesParams,
    Pagination, Resume, ResumeJobStatus, ResumePage, UpdateResumeRequest,
};

const ENDPOINT_UPLOAD: &str = "POST /resumes/upload";
const ENDPOINT_LIST: &str = "GET /resumes";

/// Payload shapes returned by the upload endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum UploadedResume {
    List(Vec<Resume>),
    Wrapped { resumes: Vec<Resume> },
    Single(Resume),
}

/// Payload shapes returned by the list endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResumeList {
    Bare(Vec<Resume>),
    Paged {
        resumes: Vec<Resume>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
    Items {
        items: Vec<Resume>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
}

impl ResumeList {
    /// Missing pagination is synthesized as a single page holding every
    /// returned resume.
    fn into_page(self, params: &ListResumesParams) -> ResumePage {
        let (resumes, pagination) = match self {
            ResumeList::Bare(resumes) => (resumes, None),
            ResumeList::Paged { resumes, pagination }
            | ResumeList::Items {
                items: resumes,
                pagination,
            } => (resumes, pagination),
        };
        let pagination = pagination.unwrap_or_else(|| Pagination {
            page: params.page.unwrap_or(1),
            limit: params.limit.unwrap_or(resumes.len() as u32),
            total: resumes.len() as u64,
            total_pages: 1,
        });
        ResumePage { resumes, pagination }
    }
}

/// Maps a two-letter language code to the full name the generator expects.
/// Anything else is assumed to be a full name already and passes through.
pub fn normalize_language(language: &str) -> String {
    match language.to_lowercase().as_str() {
        "en" => "english".to_string(),
        "pt" => "portuguese".to_string(),
        "es" => "spanish".to_string(),
        "fr" => "french".to_string(),
        "de" => "german".to_string(),
        _ => language.to_string(),
    }
}

/// Client for `{jobs}/resumes`.
#[derive(Clone)]
pub struct ResumesClient {
    service: ServiceClient,
}

impl ResumesClient {
    pub fn new(gateway: Arc<Gateway>, jobs_api_url: &str) -> Self {
        Self {
            service: ServiceClient::new(gateway, format!("{jobs_api_url}/resumes")),
        }
    }

    /// Multipart upload to `/upload`. Optional flags are only sent when set;
    /// each tag is its own `tags` field.
    pub async fn create(&self, request: &CreateResumeRequest) -> Result<Resume, ApiError> {
        let mut form = MultipartForm::default()
            .text("title", &request.title)
            .file(FilePart {
                field: "file".to_string(),
                file_name: request.file.file_name.clone(),
                mime: request.file.mime.clone(),
                content: request.file.content.clone(),
            });
        if let Some(is_main) = request.is_main {
            form = form.text("isMain", is_main.to_string());
        }
        if let Some(is_featured) = request.is_featured {
            form = form.text("isFeatured", is_featured.to_string());
        }
        for tag in &request.tags {
            form = form.text("tags", tag);
        }

        let data: Value = self
            .service
            .send(ApiRequest::post(self.service.url("/upload")).multipart(form))
            .await?;

        let resume = match decode_shape(ENDPOINT_UPLOAD, data)? {
            UploadedResume::Single(resume) => resume,
            UploadedResume::List(resumes) | UploadedResume::Wrapped { resumes } => resumes
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::unexpected_shape(ENDPOINT_UPLOAD, "empty resume list"))?,
        };
        info!("Uploaded resume {} ({} bytes)", resume.id, resume.file_size);
        Ok(resume)
    }

    pub async fn get(&self, id: &str) -> Result<Resume, ApiError> {
        self.service
            .send(ApiRequest::get(self.service.url(&format!("/{id}"))))
            .await
    }

    /// Metadata only; the file itself cannot be replaced.
    pub async fn update(&self, id: &str, request: &UpdateResumeRequest) -> Result<Resume, ApiError> {
        self.service
            .send(ApiRequest::put(self.service.url(&format!("/{id}"))).json(request)?)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.service
            .send_empty(ApiRequest::delete(self.service.url(&format!("/{id}"))))
            .await
    }

    pub async fn list(&self, params: &ListResumesParams) -> Result<ResumePage, ApiError> {
        let request = ApiRequest::get(self.service.url("/"))
            .query_opt("page", params.page.filter(|p| *p > 0))
            .query_opt("limit", params.limit.filter(|l| *l > 0))
            .query_opt("isMain", params.is_main)
            .query_opt("isFeatured", params.is_featured);
        let data: Value = self.service.send(request).await?;
        Ok(decode_shape::<ResumeList>(ENDPOINT_LIST, data)?.into_page(params))
    }

    /// Raw file bytes, no envelope.
    pub async fn download(&self, id: &str) -> Result<Bytes, ApiError> {
        let response = self
            .service
            .send_raw(ApiRequest::get(self.service.url(&format!("/{id}/download"))))
            .await?;
        Ok(response.body)
    }

    pub async fn set_as_main(&self, id: &str) -> Result<Resume, ApiError> {
        self.service
            .send(ApiRequest::patch(self.service.url(&format!("/{id}/set-main"))).json(&json!({}))?)
            .await
    }

    pub async fn set_as_featured(&self, id: &str) -> Result<Resume, ApiError> {
        self.service
            .send(
                ApiRequest::patch(self.service.url(&format!("/{id}/set-featured")))
                    .json(&json!({}))?,
            )
            .await
    }

    /// Queues AI generation and returns the job to track.
    pub async fn generate(
        &self,
        request: &GenerateResumeRequest,
    ) -> Result<GenerateResumeResponse, ApiError> {
        let mut request = request.clone();
        request.language = request.language.as_deref().map(normalize_language);

        let response: GenerateResumeResponse = self
            .service
            .send(ApiRequest::post(self.service.url("/generate")).json(&request)?)
            .await?;
        info!("Resume generation queued as job {}", response.job_id);
        Ok(response)
    }

    pub async fn get_job_status(&self, job_id: &str) -> Result<ResumeJobStatus, ApiError> {
        self.service
            .send(ApiRequest::get(self.service.url(&format!("/jobs/{job_id}"))))
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gateway::testing::*;
    use crate::gateway::{HttpResponse, RequestBody};
    use crate::models::resume::{JobStatus, ResumeFile};
    use reqwest::Method;

    pub(crate) fn resume_json(id: &str) -> Value {
        json!({
            "id": id,
            "userId": "u-1",
            "title": "Backend CV",
            "isMain": false,
            "isFeatured": false,
            "filePath": format!("/uploads/{id}.pdf"),
            "fileName": format!("{id}.pdf"),
            "fileSize": 2048,
            "tags": [],
            "createdAt": "2024-02-01T00:00:00Z",
            "updatedAt": "2024-02-01T00:00:00Z"
        })
    }

    fn client(transport: Arc<FakeTransport>) -> ResumesClient {
        ResumesClient::new(gateway(transport, credentials("a1", "r1")), JOBS_BASE)
    }

    fn upload_request() -> CreateResumeRequest {
        CreateResumeRequest {
            title: "Backend CV".to_string(),
            file: ResumeFile::pdf("cv.pdf", &b"%PDF-1.7"[..]),
            tags: vec!["rust".to_string(), "backend".to_string()],
            is_main: Some(true),
            is_featured: None,
        }
    }

    async fn upload_with(payload: Value) -> Result<Resume, ApiError> {
        let transport = FakeTransport::new(move |_| ok(payload.clone()));
        client(transport).create(&upload_request()).await
    }

    async fn list_with(payload: Value, params: ListResumesParams) -> Result<ResumePage, ApiError> {
        let transport = FakeTransport::new(move |_| ok(payload.clone()));
        client(transport).list(&params).await
    }

    #[tokio::test]
    async fn test_upload_builds_multipart_form() {
        let transport = FakeTransport::new(|_| ok(resume_json("res-1")));
        client(transport.clone())
            .create(&upload_request())
            .await
            .unwrap();

        let call = &transport.calls()[0];
        assert_eq!(call.url, format!("{JOBS_BASE}/resumes/upload"));
        let RequestBody::Multipart(form) = &call.body else {
            panic!("expected multipart body, got {:?}", call.body);
        };
        assert_eq!(
            form.fields,
            vec![
                ("title".to_string(), "Backend CV".to_string()),
                ("isMain".to_string(), "true".to_string()),
                ("tags".to_string(), "rust".to_string()),
                ("tags".to_string(), "backend".to_string()),
            ]
        );
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].field, "file");
        assert_eq!(form.files[0].mime, "application/pdf");
    }

    #[tokio::test]
    async fn test_upload_normalizes_each_known_shape() {
        for payload in [
            resume_json("res-1"),
            json!([resume_json("res-1"), resume_json("res-2")]),
            json!({"resumes": [resume_json("res-1")]}),
        ] {
            let resume = upload_with(payload).await.unwrap();
            assert_eq!(resume.id, "res-1");
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_or_unknown_payload() {
        for payload in [json!([]), json!({"resumes": []}), json!({"ok": true})] {
            let err = upload_with(payload).await.unwrap_err();
            assert!(matches!(err, ApiError::UnexpectedShape { .. }), "{err:?}");
        }
    }

    #[tokio::test]
    async fn test_list_bare_array_synthesizes_pagination() {
        let page = list_with(
            json!([resume_json("res-1"), resume_json("res-2")]),
            ListResumesParams {
                page: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(page.resumes.len(), 2);
        assert_eq!(
            page.pagination,
            Pagination {
                page: 2,
                limit: 2,
                total: 2,
                total_pages: 1
            }
        );
    }

    #[tokio::test]
    async fn test_list_keeps_server_pagination() {
        let page = list_with(
            json!({
                "resumes": [resume_json("res-1")],
                "pagination": {"page": 1, "limit": 10, "total": 31, "totalPages": 4}
            }),
            ListResumesParams::default(),
        )
        .await
        .unwrap();

        assert_eq!(page.pagination.total, 31);
        assert_eq!(page.pagination.total_pages, 4);
    }

    #[tokio::test]
    async fn test_list_accepts_legacy_items_shape() {
        let page = list_with(
            json!({"items": [resume_json("res-1"), resume_json("res-2"), resume_json("res-3")]}),
            ListResumesParams {
                limit: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(page.resumes.len(), 3);
        assert_eq!(page.pagination.limit, 10);
        assert_eq!(page.pagination.total, 3);
    }

    #[tokio::test]
    async fn test_list_unknown_shape_is_error() {
        let err = list_with(json!({"rows": []}), ListResumesParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedShape { .. }));
    }

    #[tokio::test]
    async fn test_list_sends_boolean_filters() {
        let transport = FakeTransport::new(|_| ok(json!([])));
        client(transport.clone())
            .list(&ListResumesParams {
                is_main: Some(false),
                is_featured: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        let call = &transport.calls()[0];
        assert_eq!(call.query_value("isMain"), Some("false"));
        assert_eq!(call.query_value("isFeatured"), Some("true"));
        assert_eq!(call.query_value("page"), None);
    }

    #[tokio::test]
    async fn test_download_returns_raw_bytes() {
        let transport = FakeTransport::new(|_| {
            Reply::Respond(HttpResponse {
                status: 200,
                content_type: Some("application/pdf".to_string()),
                body: Bytes::from_static(b"%PDF-1.7 raw"),
            })
        });

        let bytes = client(transport.clone()).download("res-1").await.unwrap();

        assert_eq!(&bytes[..], b"%PDF-1.7 raw");
        assert_eq!(
            transport.calls()[0].url,
            format!("{JOBS_BASE}/resumes/res-1/download")
        );
    }

    #[tokio::test]
    async fn test_set_as_main_patches_with_empty_object() {
        let transport = FakeTransport::new(|_| ok(resume_json("res-1")));
        client(transport.clone()).set_as_main("res-1").await.unwrap();

        let call = &transport.calls()[0];
        assert_eq!(call.method, Method::PATCH);
        assert_eq!(call.url, format!("{JOBS_BASE}/resumes/res-1/set-main"));
        assert_eq!(call.json_body(), json!({}));
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("en"), "english");
        assert_eq!(normalize_language("PT"), "portuguese");
        assert_eq!(normalize_language("de"), "german");
        assert_eq!(normalize_language("italian"), "italian");
        assert_eq!(normalize_language("Japanese"), "Japanese");
    }

    #[tokio::test]
    async fn test_generate_maps_language_code() {
        let transport = FakeTransport::new(|_| {
            ok(json!({"jobId": "job-1", "status": "pending", "message": "queued"}))
        });

        let response = client(transport.clone())
            .generate(&GenerateResumeRequest {
                job_application_id: Some("app-1".to_string()),
                job_description: None,
                language: Some("es".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(response.job_id, "job-1");
        assert_eq!(response.status, JobStatus::Pending);
        assert_eq!(
            transport.calls()[0].json_body(),
            json!({"jobApplicationId": "app-1", "language": "spanish"})
        );
    }

    #[tokio::test]
    async fn test_get_job_status_route() {
        let transport = FakeTransport::new(|_| {
            ok(json!({
                "id": "job-1",
                "status": "completed",
                "createdAt": "2024-02-01T00:00:00Z",
                "updatedAt": "2024-02-01T00:01:00Z",
                "result": {"resumeId": "res-9", "filePath": "/out/res-9.pdf", "fileSize": 4096}
            }))
        });

        let status = client(transport.clone()).get_job_status("job-1").await.unwrap();

        assert_eq!(status.result.unwrap().resume_id, "res-9");
        assert_eq!(transport.calls()[0].url, format!("{JOBS_BASE}/resumes/jobs/job-1"));
    }
}
