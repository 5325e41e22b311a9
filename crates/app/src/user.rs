use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use jobportal_core::envelope::{Envelope, UserBody};
use jobportal_core::types::{Profile, UserRole};
use jobportal_storage::{NewUser, ProfileUpdate, UserError};

use crate::router::{internal, reject, respond, track, AppState};

const RESOURCE: &str = "user";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/profile/update", post(update_profile))
}

/// Hex-encoded SHA-256 digest used for password storage and comparison.
pub(crate) fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct RegisterBody {
    fullname: String,
    email: String,
    phone_number: String,
    password: String,
    role: UserRole,
}

async fn register(State(state): State<AppState>, Json(body): Json<RegisterBody>) -> Response {
    track(RESOURCE);
    if body.fullname.trim().is_empty()
        || body.email.trim().is_empty()
        || body.phone_number.trim().is_empty()
        || body.password.is_empty()
    {
        return reject(RESOURCE, StatusCode::BAD_REQUEST, "missing required fields");
    }

    let digest = password_digest(&body.password);
    let record = NewUser {
        id: String::new(),
        fullname: &body.fullname,
        email: &body.email,
        phone_number: &body.phone_number,
        password_digest: &digest,
        role: body.role,
        profile: Profile::default(),
        created_at: state.now(),
    }
    .with_generated_id();

    match state.storage().users().insert(record).await {
        Ok(()) => respond(
            StatusCode::CREATED,
            Envelope::<UserBody>::ok_message("Account created successfully"),
        ),
        Err(UserError::DuplicateEmail) => reject(
            RESOURCE,
            StatusCode::CONFLICT,
            "an account with this email already exists",
        ),
        Err(err) => internal(RESOURCE, err),
    }
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Response {
    track(RESOURCE);
    let record = match state.storage().users().fetch_by_email(&body.email).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return reject(
                RESOURCE,
                StatusCode::UNAUTHORIZED,
                "incorrect email or password",
            )
        }
        Err(err) => return internal(RESOURCE, err),
    };

    if record.password_digest != password_digest(&body.password) {
        return reject(
            RESOURCE,
            StatusCode::UNAUTHORIZED,
            "incorrect email or password",
        );
    }

    let mut envelope = Envelope::ok(UserBody {
        user: Some(record.user.clone()),
    });
    envelope.message = Some(format!("Welcome back {}", record.user.fullname));
    respond(StatusCode::OK, envelope)
}

async fn logout() -> Response {
    track(RESOURCE);
    respond(
        StatusCode::OK,
        Envelope::<UserBody>::ok_message("Logged out successfully"),
    )
}

#[derive(Debug, Deserialize)]
struct UpdateProfileBody {
    user_id: String,
    fullname: String,
    email: String,
    phone_number: String,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    resume: Option<String>,
    #[serde(default)]
    profile_photo: Option<String>,
}

async fn update_profile(
    State(state): State<AppState>,
    Json(body): Json<UpdateProfileBody>,
) -> Response {
    track(RESOURCE);
    let update = ProfileUpdate {
        fullname: &body.fullname,
        email: &body.email,
        phone_number: &body.phone_number,
        profile: Profile {
            bio: body.bio.clone(),
            skills: body.skills.clone(),
            resume: body.resume.clone(),
            profile_photo: body.profile_photo.clone(),
        },
        updated_at: state.now(),
    };

    match state
        .storage()
        .users()
        .update_profile(&body.user_id, update)
        .await
    {
        Ok(Some(record)) => {
            let mut envelope = Envelope::ok(UserBody {
                user: Some(record.user),
            });
            envelope.message = Some("Profile updated successfully".to_string());
            respond(StatusCode::OK, envelope)
        }
        Ok(None) => reject(RESOURCE, StatusCode::NOT_FOUND, "user not found"),
        Err(err) => internal(RESOURCE, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_digest_is_stable_hex() {
        let digest = password_digest("hunter2");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, password_digest("hunter2"));
        assert_ne!(digest, password_digest("hunter3"));
    }
}
