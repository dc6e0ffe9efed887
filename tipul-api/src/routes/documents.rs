/// Consent forms, treatment plans and other uploaded documents
///
/// # Endpoints
///
/// - `GET /v1/documents?client_id`
/// - `POST /v1/documents` (multipart: `file`, `name`, `type`, `client_id?`)
/// - `GET|PUT|DELETE /v1/documents/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::clients::owned_client,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tipul_shared::{
    auth::middleware::AuthContext,
    models::document::{CreateDocument, Document, DocumentListItem, DocumentType, UpdateDocument},
    storage::{document_extension_for, DOCUMENTS},
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub document_type: Option<DocumentType>,
    pub signed: Option<bool>,
}

/// Fields collected from the upload form
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(Option<String>, Vec<u8>)>,
    name: Option<String>,
    document_type: Option<String>,
    client_id: Option<String>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", e))
}

fn document_not_found() -> ApiError {
    ApiError::NotFound("Document not found".to_string())
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((file_name, bytes.to_vec()));
            }
            "name" => form.name = Some(field.text().await.map_err(multipart_error)?),
            "type" => form.document_type = Some(field.text().await.map_err(multipart_error)?),
            "client_id" => form.client_id = Some(field.text().await.map_err(multipart_error)?),
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

pub async fn list_documents(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DocumentQuery>,
) -> ApiResult<Json<Vec<DocumentListItem>>> {
    let documents = Document::list(&state.db, auth.user_id, query.client_id).await?;
    Ok(Json(documents))
}

/// Stores an uploaded document
///
/// The file keeps its original extension, or `pdf` when it has none.
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let form = read_form(multipart).await?;

    let (Some((file_name, bytes)), Some(name), Some(document_type)) =
        (form.file, form.name, form.document_type)
    else {
        return Err(ApiError::BadRequest(
            "File, name and type are required".to_string(),
        ));
    };

    let name = name.trim().to_string();
    if name.is_empty() || bytes.is_empty() {
        return Err(ApiError::BadRequest(
            "File, name and type are required".to_string(),
        ));
    }

    let document_type: DocumentType = document_type
        .parse()
        .map_err(|e: String| ApiError::invalid("type", e))?;

    let client_id = match form.client_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => {
            let id = Uuid::parse_str(raw)
                .map_err(|_| ApiError::invalid("client_id", "Invalid client id"))?;
            Some(owned_client(&state, &auth, id).await?.id)
        }
        None => None,
    };

    let extension = document_extension_for(file_name.as_deref());
    let stored = state.storage.save(DOCUMENTS, &extension, &bytes).await?;

    let document = Document::create(
        &state.db,
        auth.user_id,
        CreateDocument {
            client_id,
            name,
            document_type,
            file_url: stored.url,
        },
    )
    .await?;

    tracing::info!(document_id = %document.id, size = bytes.len(), "Document uploaded");

    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn get_document(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DocumentListItem>> {
    let document = Document::find_owned(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(document_not_found)?;

    Ok(Json(document))
}

/// Renames, retypes or signs a document
pub async fn update_document(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDocumentRequest>,
) -> ApiResult<Json<Document>> {
    let update = UpdateDocument {
        name: req.name,
        document_type: req.document_type,
        signed: req.signed,
    };

    let document = Document::update(&state.db, id, auth.user_id, update)
        .await?
        .ok_or_else(document_not_found)?;

    Ok(Json(document))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let document = Document::delete(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(document_not_found)?;

    if let Err(e) = state.storage.remove(&document.file_url).await {
        tracing::warn!(document_id = %id, error = %e, "Failed to remove document file");
    }

    Ok(StatusCode::NO_CONTENT)
}
