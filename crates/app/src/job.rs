use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use jobportal_core::envelope::{Envelope, JobBody, JobList};
use jobportal_core::types::{Job, UserRole};
use jobportal_storage::NewJob;

use crate::router::{internal, reject, respond, track, AppState};

const RESOURCE: &str = "job";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post", post(create))
        .route("/get", get(list))
        .route("/get/:id", get(fetch))
        .route("/getadminjobs", get(list_admin))
}

#[derive(Debug, Deserialize)]
struct PostBody {
    title: String,
    description: String,
    #[serde(default)]
    requirements: Vec<String>,
    salary: i64,
    experience_level: i64,
    location: String,
    job_type: String,
    position: i64,
    company_id: String,
    created_by: String,
}

async fn create(State(state): State<AppState>, Json(body): Json<PostBody>) -> Response {
    track(RESOURCE);
    if body.title.trim().is_empty() || body.description.trim().is_empty() {
        return reject(
            RESOURCE,
            StatusCode::BAD_REQUEST,
            "job title and description are required",
        );
    }

    match state.storage().users().fetch_by_id(&body.created_by).await {
        Ok(Some(record)) if record.user.role == UserRole::Recruiter => {}
        Ok(Some(_)) => {
            return reject(
                RESOURCE,
                StatusCode::FORBIDDEN,
                "only recruiters can post jobs",
            )
        }
        Ok(None) => {
            return reject(RESOURCE, StatusCode::NOT_FOUND, "recruiter account not found")
        }
        Err(err) => return internal(RESOURCE, err),
    }
    match state.storage().companies().fetch_by_id(&body.company_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return reject(RESOURCE, StatusCode::NOT_FOUND, "company not found"),
        Err(err) => return internal(RESOURCE, err),
    }

    let created_at = state.now();
    let record = NewJob {
        id: String::new(),
        title: &body.title,
        description: &body.description,
        requirements: &body.requirements,
        salary: body.salary,
        experience_level: body.experience_level,
        location: &body.location,
        job_type: &body.job_type,
        position: body.position,
        company_id: &body.company_id,
        created_by: &body.created_by,
        created_at,
    }
    .with_generated_id();
    let job = Job {
        id: record.id.clone(),
        title: body.title.clone(),
        description: body.description.clone(),
        requirements: body.requirements.clone(),
        salary: body.salary,
        experience_level: body.experience_level,
        location: body.location.clone(),
        job_type: body.job_type.clone(),
        position: body.position,
        company_id: body.company_id.clone(),
        created_by: body.created_by.clone(),
        created_at,
    };

    match state.storage().jobs().insert(record).await {
        Ok(()) => {
            let mut envelope = Envelope::ok(JobBody { job: Some(job) });
            envelope.message = Some("New job created successfully".to_string());
            respond(StatusCode::CREATED, envelope)
        }
        Err(err) => internal(RESOURCE, err),
    }
}

async fn list(State(state): State<AppState>) -> Response {
    track(RESOURCE);
    match state.storage().jobs().list_all().await {
        Ok(jobs) => respond(StatusCode::OK, Envelope::ok(JobList { jobs })),
        Err(err) => internal(RESOURCE, err),
    }
}

async fn fetch(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    track(RESOURCE);
    match state.storage().jobs().fetch_by_id(&id).await {
        Ok(Some(job)) => respond(StatusCode::OK, Envelope::ok(JobBody { job: Some(job) })),
        Ok(None) => reject(RESOURCE, StatusCode::NOT_FOUND, "job not found"),
        Err(err) => internal(RESOURCE, err),
    }
}

#[derive(Debug, Deserialize)]
struct AdminJobsQuery {
    #[serde(default)]
    created_by: Option<String>,
}

async fn list_admin(
    State(state): State<AppState>,
    Query(query): Query<AdminJobsQuery>,
) -> Response {
    track(RESOURCE);
    let Some(created_by) = query.created_by else {
        return reject(
            RESOURCE,
            StatusCode::BAD_REQUEST,
            "created_by query parameter is required",
        );
    };

    match state.storage().jobs().list_by_creator(&created_by).await {
        Ok(jobs) => respond(StatusCode::OK, Envelope::ok(JobList { jobs })),
        Err(err) => internal(RESOURCE, err),
    }
}
