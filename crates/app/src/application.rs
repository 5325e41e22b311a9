use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use jobportal_core::envelope::{ApplicationList, Envelope};
use jobportal_core::types::{ApplicationStatus, UserRole};
use jobportal_storage::{ApplicationError, NewApplication};

use crate::router::{internal, reject, respond, track, AppState};

const RESOURCE: &str = "application";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/apply/:id", get(apply))
        .route("/get", get(list_applied))
        .route("/:id/applicants", get(list_applicants))
        .route("/status/:id/update", post(update_status))
}

#[derive(Debug, Deserialize)]
struct ApplicantQuery {
    #[serde(default)]
    applicant: Option<String>,
}

// The original API applies via GET; kept for wire compatibility.
async fn apply(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<ApplicantQuery>,
) -> Response {
    track(RESOURCE);
    let Some(applicant) = query.applicant else {
        return reject(
            RESOURCE,
            StatusCode::BAD_REQUEST,
            "applicant query parameter is required",
        );
    };

    match state.storage().users().fetch_by_id(&applicant).await {
        Ok(Some(record)) if record.user.role == UserRole::Candidate => {}
        Ok(Some(_)) => {
            return reject(
                RESOURCE,
                StatusCode::FORBIDDEN,
                "only candidates can apply to jobs",
            )
        }
        Ok(None) => {
            return reject(RESOURCE, StatusCode::NOT_FOUND, "candidate account not found")
        }
        Err(err) => return internal(RESOURCE, err),
    }
    match state.storage().jobs().fetch_by_id(&job_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return reject(RESOURCE, StatusCode::NOT_FOUND, "job not found"),
        Err(err) => return internal(RESOURCE, err),
    }

    let record = NewApplication {
        id: String::new(),
        job_id: &job_id,
        applicant_id: &applicant,
        created_at: state.now(),
    }
    .with_generated_id();

    match state.storage().applications().insert(record).await {
        Ok(()) => respond(
            StatusCode::CREATED,
            Envelope::<ApplicationList>::ok_message("Job applied successfully"),
        ),
        Err(ApplicationError::DuplicateApplication) => reject(
            RESOURCE,
            StatusCode::CONFLICT,
            "you have already applied to this job",
        ),
        Err(err) => internal(RESOURCE, err),
    }
}

async fn list_applied(
    State(state): State<AppState>,
    Query(query): Query<ApplicantQuery>,
) -> Response {
    track(RESOURCE);
    let Some(applicant) = query.applicant else {
        return reject(
            RESOURCE,
            StatusCode::BAD_REQUEST,
            "applicant query parameter is required",
        );
    };

    match state
        .storage()
        .applications()
        .list_for_applicant(&applicant)
        .await
    {
        Ok(applications) => respond(
            StatusCode::OK,
            Envelope::ok(ApplicationList { applications }),
        ),
        Err(err) => internal(RESOURCE, err),
    }
}

async fn list_applicants(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    track(RESOURCE);
    match state.storage().applications().list_for_job(&job_id).await {
        Ok(applications) => respond(
            StatusCode::OK,
            Envelope::ok(ApplicationList { applications }),
        ),
        Err(err) => internal(RESOURCE, err),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateStatusBody {
    status: String,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Response {
    track(RESOURCE);
    let Ok(status) = body.status.parse::<ApplicationStatus>() else {
        return reject(
            RESOURCE,
            StatusCode::BAD_REQUEST,
            "status must be Pending, Accepted, or Rejected",
        );
    };

    match state
        .storage()
        .applications()
        .update_status(&id, status, state.now())
        .await
    {
        Ok(true) => respond(
            StatusCode::OK,
            Envelope::<ApplicationList>::ok_message("Status updated successfully"),
        ),
        Ok(false) => reject(RESOURCE, StatusCode::NOT_FOUND, "application not found"),
        Err(err) => internal(RESOURCE, err),
    }
}
