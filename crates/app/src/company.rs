use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use jobportal_core::envelope::{CompanyBody, CompanyList, Envelope};
use jobportal_core::types::{Company, UserRole};
use jobportal_storage::{CompanyError, CompanyUpdate, NewCompany};

use crate::router::{internal, reject, respond, track, AppState};

const RESOURCE: &str = "company";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/get", get(list))
        .route("/get/:id", get(fetch))
        .route("/update/:id", put(update))
}

#[derive(Debug, Deserialize)]
struct RegisterBody {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    logo: Option<String>,
    user_id: String,
}

async fn register(State(state): State<AppState>, Json(body): Json<RegisterBody>) -> Response {
    track(RESOURCE);
    if body.name.trim().is_empty() {
        return reject(RESOURCE, StatusCode::BAD_REQUEST, "company name is required");
    }

    let owner = match state.storage().users().fetch_by_id(&body.user_id).await {
        Ok(Some(record)) => record.user,
        Ok(None) => {
            return reject(RESOURCE, StatusCode::NOT_FOUND, "recruiter account not found")
        }
        Err(err) => return internal(RESOURCE, err),
    };
    if owner.role != UserRole::Recruiter {
        return reject(
            RESOURCE,
            StatusCode::FORBIDDEN,
            "only recruiters can register companies",
        );
    }

    let created_at = state.now();
    let record = NewCompany {
        id: String::new(),
        name: &body.name,
        description: body.description.as_deref(),
        website: body.website.as_deref(),
        location: body.location.as_deref(),
        logo: body.logo.as_deref(),
        user_id: &body.user_id,
        created_at,
    }
    .with_generated_id();
    let company = Company {
        id: record.id.clone(),
        name: body.name.clone(),
        description: body.description.clone(),
        website: body.website.clone(),
        location: body.location.clone(),
        logo: body.logo.clone(),
        user_id: body.user_id.clone(),
        created_at,
    };

    match state.storage().companies().insert(record).await {
        Ok(()) => {
            let mut envelope = Envelope::ok(CompanyBody {
                company: Some(company),
            });
            envelope.message = Some("Company registered successfully".to_string());
            respond(StatusCode::CREATED, envelope)
        }
        Err(CompanyError::DuplicateName) => reject(
            RESOURCE,
            StatusCode::CONFLICT,
            "a company with this name already exists",
        ),
        Err(err) => internal(RESOURCE, err),
    }
}

async fn list(State(state): State<AppState>) -> Response {
    track(RESOURCE);
    match state.storage().companies().list_all().await {
        Ok(companies) => respond(StatusCode::OK, Envelope::ok(CompanyList { companies })),
        Err(err) => internal(RESOURCE, err),
    }
}

async fn fetch(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    track(RESOURCE);
    match state.storage().companies().fetch_by_id(&id).await {
        Ok(Some(company)) => respond(
            StatusCode::OK,
            Envelope::ok(CompanyBody {
                company: Some(company),
            }),
        ),
        Ok(None) => reject(RESOURCE, StatusCode::NOT_FOUND, "company not found"),
        Err(err) => internal(RESOURCE, err),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateBody {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    logo: Option<String>,
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Response {
    track(RESOURCE);
    if body.name.trim().is_empty() {
        return reject(RESOURCE, StatusCode::BAD_REQUEST, "company name is required");
    }

    let update = CompanyUpdate {
        name: &body.name,
        description: body.description.as_deref(),
        website: body.website.as_deref(),
        location: body.location.as_deref(),
        logo: body.logo.as_deref(),
        updated_at: state.now(),
    };

    match state.storage().companies().update(&id, update).await {
        Ok(Some(company)) => {
            let mut envelope = Envelope::ok(CompanyBody {
                company: Some(company),
            });
            envelope.message = Some("Company information updated".to_string());
            respond(StatusCode::OK, envelope)
        }
        Ok(None) => reject(RESOURCE, StatusCode::NOT_FOUND, "company not found"),
        Err(err) => internal(RESOURCE, err),
    }
}
