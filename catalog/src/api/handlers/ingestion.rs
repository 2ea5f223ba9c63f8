//! Multipart file upload ingestion: `file` + `supplier_id` + optional
//! `pricelist_id` (§6).

use axum::extract::{Multipart, State};
use axum::response::Response;
use serde::Serialize;

use crate::api::models::processing::ProcessingRequestResponse;
use crate::app_state::AppState;
use crate::errors::{Error, Result};
use crate::ingest::{FileFormat, RowError};

use super::created;

#[derive(Serialize)]
struct IngestionSummary {
    request: ProcessingRequestResponse,
    row_errors: Vec<RowError>,
}

pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response> {
    let mut filename: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;
    let mut supplier_id: Option<String> = None;
    let mut pricelist_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| Error::validation("multipart", err.to_string()))? {
        match field.name().unwrap_or_default() {
            "file" => {
                filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|err| Error::validation("file", err.to_string()))?;
                if data.len() as u64 > state.config.ingest.max_upload_bytes {
                    return Err(Error::PayloadTooLarge {
                        message: format!("upload of {} bytes exceeds limit of {} bytes", data.len(), state.config.ingest.max_upload_bytes),
                    });
                }
                bytes = Some(data.to_vec());
            }
            "supplier_id" => {
                supplier_id = Some(field.text().await.map_err(|err| Error::validation("supplier_id", err.to_string()))?);
            }
            "pricelist_id" => {
                pricelist_id = Some(field.text().await.map_err(|err| Error::validation("pricelist_id", err.to_string()))?);
            }
            _ => {}
        }
    }

    let filename = filename.ok_or_else(|| Error::validation("file", "missing file part"))?;
    let bytes = bytes.ok_or_else(|| Error::validation("file", "missing file part"))?;
    let supplier_id = supplier_id.ok_or_else(|| Error::validation("supplier_id", "missing supplier_id field"))?;

    let format = FileFormat::from_filename(&filename)?;
    let rows = crate::ingest::file_formats::decode_rows(format, &bytes)?;

    let (request, row_errors) = state.ingestion.ingest_decoded_rows(rows, &supplier_id, pricelist_id.as_deref()).await?;

    state.scheduler_tx.send(request.request_id).await.map_err(|err| Error::internal(anyhow::anyhow!(err)))?;

    Ok(created(IngestionSummary {
        request: ProcessingRequestResponse::from(request),
        row_errors,
    }))
}
