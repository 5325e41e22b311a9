use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use url::Url;

use jobportal_core::envelope::{ApplicationList, CompanyList, Envelope, JobList, UserBody};
use jobportal_core::types::{Application, Company, Job, PublicUser, UserRole};

/// Client for the portal backend API.
///
/// Requests are credentialed through a shared cookie store. Response bodies
/// are parsed as envelopes regardless of the HTTP status code; only the
/// envelope's `success` field decides the outcome.
#[derive(Clone)]
pub struct PortalClient {
    http: Client,
    base_url: Url,
}

impl PortalClient {
    /// Creates a new client with its own cookie store.
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_http(base_url, http))
    }

    /// Creates a client over a pre-configured `reqwest::Client`.
    pub fn with_http(base_url: Url, http: Client) -> Self {
        Self { http, base_url }
    }

    /// Fetches every registered company.
    pub async fn fetch_companies(&self) -> Result<Vec<Company>, ClientError> {
        let url = self.base_url.join("api/company/get")?;
        let envelope: Envelope<CompanyList> = self.get_envelope(url).await?;
        accept(envelope).map(|list| list.companies)
    }

    /// Fetches every job posting.
    pub async fn fetch_jobs(&self) -> Result<Vec<Job>, ClientError> {
        let url = self.base_url.join("api/job/get")?;
        let envelope: Envelope<JobList> = self.get_envelope(url).await?;
        accept(envelope).map(|list| list.jobs)
    }

    /// Fetches the job postings created by the provided recruiter.
    pub async fn fetch_admin_jobs(&self, created_by: &str) -> Result<Vec<Job>, ClientError> {
        let mut url = self.base_url.join("api/job/getadminjobs")?;
        url.query_pairs_mut().append_pair("created_by", created_by);
        let envelope: Envelope<JobList> = self.get_envelope(url).await?;
        accept(envelope).map(|list| list.jobs)
    }

    /// Fetches the applications filed by the provided candidate.
    pub async fn fetch_applications(
        &self,
        applicant: &str,
    ) -> Result<Vec<Application>, ClientError> {
        let mut url = self.base_url.join("api/application/get")?;
        url.query_pairs_mut().append_pair("applicant", applicant);
        let envelope: Envelope<ApplicationList> = self.get_envelope(url).await?;
        accept(envelope).map(|list| list.applications)
    }

    /// Registers a new account.
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<(), ClientError> {
        let url = self.base_url.join("api/user/register")?;
        let response = self.http.post(url).json(request).send().await?;
        let envelope: Envelope<UserBody> = response.json().await?;
        accept(envelope).map(|_| ())
    }

    /// Logs in, returning the authenticated user for the client-side session.
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<PublicUser, ClientError> {
        let url = self.base_url.join("api/user/login")?;
        let response = self.http.post(url).json(request).send().await?;
        let envelope: Envelope<UserBody> = response.json().await?;
        let body = accept(envelope)?;
        body.user
            .ok_or_else(|| ClientError::Rejected("login response carried no user".to_string()))
    }

    /// Logs out of the backend session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let url = self.base_url.join("api/user/logout")?;
        let envelope: Envelope<UserBody> = self.get_envelope(url).await?;
        accept(envelope).map(|_| ())
    }

    async fn get_envelope<T>(&self, url: Url) -> Result<Envelope<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.http.get(url).send().await?;
        Ok(response.json().await?)
    }
}

fn accept<T: Default>(envelope: Envelope<T>) -> Result<T, ClientError> {
    if envelope.success {
        Ok(envelope.payload.unwrap_or_default())
    } else {
        Err(ClientError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "request rejected".to_string()),
        ))
    }
}

/// Body for `POST api/user/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub fullname: &'a str,
    pub email: &'a str,
    pub phone_number: &'a str,
    pub password: &'a str,
    pub role: UserRole,
}

/// Body for `POST api/user/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Errors produced by the portal client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(base_url: &Url) -> PortalClient {
        PortalClient::new(base_url.clone()).expect("client")
    }

    #[tokio::test]
    async fn fetch_companies_parses_envelope() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/")).expect("url");
        let client = client(&base);

        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200).json_body(json!({
                    "success": true,
                    "companies": [{
                        "_id": "c1",
                        "name": "Acme",
                        "user_id": "u1",
                        "created_at": "2024-01-01T00:00:00Z"
                    }]
                }));
            })
            .await;

        let companies = client.fetch_companies().await.expect("fetch companies");
        mock.assert_async().await;

        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].id, "c1");
        assert_eq!(companies[0].name, "Acme");
    }

    #[tokio::test]
    async fn rejected_envelope_surfaces_message() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/")).expect("url");
        let client = client(&base);

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200)
                    .json_body(json!({ "success": false, "message": "err" }));
            })
            .await;

        let err = client.fetch_companies().await.expect_err("should reject");
        match err {
            ClientError::Rejected(message) => assert_eq!(message, "err"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn status_code_is_not_inspected() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/")).expect("url");
        let client = client(&base);

        // A 500 with a well-formed success envelope still counts as success.
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/job/get");
                then.status(500)
                    .json_body(json!({ "success": true, "jobs": [] }));
            })
            .await;

        let jobs = client.fetch_jobs().await.expect("body gates behaviour");
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn admin_jobs_carry_creator_query() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/")).expect("url");
        let client = client(&base);

        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/job/getadminjobs")
                    .query_param("created_by", "u1");
                then.status(200)
                    .json_body(json!({ "success": true, "jobs": [] }));
            })
            .await;

        client.fetch_admin_jobs("u1").await.expect("fetch");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn login_returns_authenticated_user() {
        let server = MockServer::start_async().await;
        let base = Url::parse(&server.url("/")).expect("url");
        let client = client(&base);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/user/login")
                    .json_body(json!({ "email": "rita@example.com", "password": "hunter2" }));
                then.status(200).json_body(json!({
                    "success": true,
                    "user": {
                        "_id": "u1",
                        "fullname": "Rita Recruiter",
                        "email": "rita@example.com",
                        "phone_number": "555-0100",
                        "role": "Recruiter",
                        "profile": {}
                    }
                }));
            })
            .await;

        let user = client
            .login(&LoginRequest {
                email: "rita@example.com",
                password: "hunter2",
            })
            .await
            .expect("login");
        mock.assert_async().await;

        assert_eq!(user.id, "u1");
        assert_eq!(user.role, UserRole::Recruiter);
    }
}
