// src/routes/diagnosis.rs
use axum::{Json, extract::State};
use tracing::{error, info};

use crate::{
    error::AppError,
    message::DiagnoseRequest,
    services::{
        diagnosis::{CropImage, DIAGNOSIS_FAILED, DiagnosisReport},
        metrics_manager::Feature,
    },
    state::SharedState,
};

pub async fn diagnose_handler(
    State(state): State<SharedState>,
    Json(payload): Json<DiagnoseRequest>,
) -> Result<Json<DiagnosisReport>, AppError> {
    // Rejected input never reaches the model.
    let image = CropImage::parse(payload.image.as_deref(), payload.mime_type.as_deref())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.metrics.record_request(Feature::Diagnosis).await;

    match state.agronomist.diagnose(&image).await {
        Ok(diagnosis) => {
            info!(
                healthy = diagnosis.is_healthy,
                disease = %diagnosis.disease,
                "diagnosis complete"
            );
            Ok(Json(diagnosis.report()))
        }
        Err(err) => {
            error!(error = %err, "Error diagnosing crop");
            state.metrics.record_failure(Feature::Diagnosis).await;
            Err(AppError::Upstream(DIAGNOSIS_FAILED.to_string()))
        }
    }
}
