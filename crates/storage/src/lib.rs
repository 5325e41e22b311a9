use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use jobportal_core::types::{
    Application, ApplicationStatus, Company, Job, Profile, PublicUser, UserRole,
};

const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for interacting with user accounts.
    pub fn users(&self) -> UserRepository {
        UserRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for interacting with companies.
    pub fn companies(&self) -> CompanyRepository {
        CompanyRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for interacting with job postings.
    pub fn jobs(&self) -> JobRepository {
        JobRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for interacting with applications.
    pub fn applications(&self) -> ApplicationRepository {
        ApplicationRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for user accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Inserts a new account, rejecting duplicate email addresses.
    pub async fn insert(&self, record: NewUser<'_>) -> Result<(), UserError> {
        let profile_json = serde_json::to_string(&record.profile)?;
        let created_at = to_rfc3339(record.created_at);
        let result = sqlx::query(
            "INSERT INTO users \
             (id, fullname, email, phone_number, password_digest, role, profile_json, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(record.fullname)
        .bind(record.email)
        .bind(record.phone_number)
        .bind(record.password_digest)
        .bind(record.role.as_str())
        .bind(profile_json)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_UNIQUE) {
                    Err(UserError::DuplicateEmail)
                } else {
                    Err(UserError::Database(sqlx::Error::Database(db_err)))
                }
            }
            Err(err) => Err(UserError::Database(err)),
        }
    }

    /// Loads an account by email, including its password digest.
    pub async fn fetch_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, fullname, email, phone_number, password_digest, role, profile_json \
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_record).transpose()
    }

    /// Loads an account by id.
    pub async fn fetch_by_id(&self, id: &str) -> Result<Option<UserRecord>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, fullname, email, phone_number, password_digest, role, profile_json \
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_record).transpose()
    }

    /// Overwrites the mutable account fields, returning the updated record.
    pub async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate<'_>,
    ) -> Result<Option<UserRecord>, UserError> {
        let profile_json = serde_json::to_string(&update.profile)?;
        let result = sqlx::query(
            "UPDATE users \
             SET fullname = ?, email = ?, phone_number = ?, profile_json = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(update.fullname)
        .bind(update.email)
        .bind(update.phone_number)
        .bind(profile_json)
        .bind(to_rfc3339(update.updated_at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_by_id(id).await
    }
}

/// Data required to create a new user account.
pub struct NewUser<'a> {
    pub id: String,
    pub fullname: &'a str,
    pub email: &'a str,
    pub phone_number: &'a str,
    pub password_digest: &'a str,
    pub role: UserRole,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewUser<'a> {
    pub fn with_generated_id(self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self
        }
    }
}

/// Fields a user may change after registration.
pub struct ProfileUpdate<'a> {
    pub fullname: &'a str,
    pub email: &'a str,
    pub phone_number: &'a str,
    pub profile: Profile,
    pub updated_at: DateTime<Utc>,
}

/// Account row together with its password digest.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: PublicUser,
    pub password_digest: String,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    fullname: String,
    email: String,
    phone_number: String,
    password_digest: String,
    role: String,
    profile_json: String,
}

impl UserRow {
    fn into_record(self) -> Result<UserRecord, UserError> {
        let role = self
            .role
            .parse::<UserRole>()
            .map_err(|err| UserError::CorruptRow(err.to_string()))?;
        let profile: Profile = serde_json::from_str(&self.profile_json)?;
        Ok(UserRecord {
            user: PublicUser {
                id: self.id,
                fullname: self.fullname,
                email: self.email,
                phone_number: self.phone_number,
                role,
                profile,
            },
            password_digest: self.password_digest,
        })
    }
}

/// Errors that can occur while reading or mutating user accounts.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("failed to decode profile json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("corrupt user row: {0}")]
    CorruptRow(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for companies.
#[derive(Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    /// Registers a new company, rejecting duplicate names.
    pub async fn insert(&self, record: NewCompany<'_>) -> Result<(), CompanyError> {
        let created_at = to_rfc3339(record.created_at);
        let result = sqlx::query(
            "INSERT INTO companies \
             (id, name, description, website, location, logo, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(record.name)
        .bind(record.description)
        .bind(record.website)
        .bind(record.location)
        .bind(record.logo)
        .bind(record.user_id)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_UNIQUE) {
                    Err(CompanyError::DuplicateName)
                } else {
                    Err(CompanyError::Database(sqlx::Error::Database(db_err)))
                }
            }
            Err(err) => Err(CompanyError::Database(err)),
        }
    }

    /// Lists every registered company.
    pub async fn list_all(&self) -> Result<Vec<Company>, CompanyError> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, description, website, location, logo, user_id, created_at \
             FROM companies ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CompanyRow::into_domain).collect())
    }

    /// Loads a single company by id.
    pub async fn fetch_by_id(&self, id: &str) -> Result<Option<Company>, CompanyError> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, description, website, location, logo, user_id, created_at \
             FROM companies WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CompanyRow::into_domain))
    }

    /// Overwrites the mutable company fields, returning the updated record.
    pub async fn update(
        &self,
        id: &str,
        update: CompanyUpdate<'_>,
    ) -> Result<Option<Company>, CompanyError> {
        let result = sqlx::query(
            "UPDATE companies \
             SET name = ?, description = ?, website = ?, location = ?, logo = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(update.name)
        .bind(update.description)
        .bind(update.website)
        .bind(update.location)
        .bind(update.logo)
        .bind(to_rfc3339(update.updated_at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_by_id(id).await
    }
}

/// Data required to register a company.
pub struct NewCompany<'a> {
    pub id: String,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub website: Option<&'a str>,
    pub location: Option<&'a str>,
    pub logo: Option<&'a str>,
    pub user_id: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewCompany<'a> {
    pub fn with_generated_id(self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self
        }
    }
}

/// Fields a recruiter may change on a company.
pub struct CompanyUpdate<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub website: Option<&'a str>,
    pub location: Option<&'a str>,
    pub logo: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    id: String,
    name: String,
    description: Option<String>,
    website: Option<String>,
    location: Option<String>,
    logo: Option<String>,
    user_id: String,
    created_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_domain(self) -> Company {
        Company {
            id: self.id,
            name: self.name,
            description: self.description,
            website: self.website,
            location: self.location,
            logo: self.logo,
            user_id: self.user_id,
            created_at: self.created_at,
        }
    }
}

/// Errors that can occur while reading or mutating companies.
#[derive(Debug, Error)]
pub enum CompanyError {
    #[error("a company with this name already exists")]
    DuplicateName,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for job postings.
#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Inserts a new job posting.
    pub async fn insert(&self, record: NewJob<'_>) -> Result<(), JobError> {
        let requirements_json = serde_json::to_string(record.requirements)?;
        sqlx::query(
            "INSERT INTO jobs \
             (id, title, description, requirements_json, salary, experience_level, location, job_type, position, company_id, created_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(record.title)
        .bind(record.description)
        .bind(requirements_json)
        .bind(record.salary)
        .bind(record.experience_level)
        .bind(record.location)
        .bind(record.job_type)
        .bind(record.position)
        .bind(record.company_id)
        .bind(record.created_by)
        .bind(to_rfc3339(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists every job posting, newest first.
    pub async fn list_all(&self) -> Result<Vec<Job>, JobError> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT id, title, description, requirements_json, salary, experience_level, \
                    location, job_type, position, company_id, created_by, created_at \
             FROM jobs ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_domain).collect()
    }

    /// Lists job postings created by the provided recruiter, newest first.
    pub async fn list_by_creator(&self, created_by: &str) -> Result<Vec<Job>, JobError> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT id, title, description, requirements_json, salary, experience_level, \
                    location, job_type, position, company_id, created_by, created_at \
             FROM jobs WHERE created_by = ? ORDER BY created_at DESC",
        )
        .bind(created_by)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_domain).collect()
    }

    /// Loads a single job posting by id.
    pub async fn fetch_by_id(&self, id: &str) -> Result<Option<Job>, JobError> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, title, description, requirements_json, salary, experience_level, \
                    location, job_type, position, company_id, created_by, created_at \
             FROM jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_domain).transpose()
    }
}

/// Data required to post a job.
pub struct NewJob<'a> {
    pub id: String,
    pub title: &'a str,
    pub description: &'a str,
    pub requirements: &'a [String],
    pub salary: i64,
    pub experience_level: i64,
    pub location: &'a str,
    pub job_type: &'a str,
    pub position: i64,
    pub company_id: &'a str,
    pub created_by: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewJob<'a> {
    pub fn with_generated_id(self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    title: String,
    description: String,
    requirements_json: String,
    salary: i64,
    experience_level: i64,
    location: String,
    job_type: String,
    position: i64,
    company_id: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl JobRow {
    fn into_domain(self) -> Result<Job, JobError> {
        let requirements: Vec<String> = serde_json::from_str(&self.requirements_json)?;
        Ok(Job {
            id: self.id,
            title: self.title,
            description: self.description,
            requirements,
            salary: self.salary,
            experience_level: self.experience_level,
            location: self.location,
            job_type: self.job_type,
            position: self.position,
            company_id: self.company_id,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

/// Errors that can occur while reading or mutating job postings.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to decode requirements json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for applications.
#[derive(Clone)]
pub struct ApplicationRepository {
    pool: SqlitePool,
}

impl ApplicationRepository {
    /// Records a new application, rejecting a second application for the
    /// same job by the same candidate.
    pub async fn insert(&self, record: NewApplication<'_>) -> Result<(), ApplicationError> {
        let created_at = to_rfc3339(record.created_at);
        let result = sqlx::query(
            "INSERT INTO applications (id, job_id, applicant_id, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(record.job_id)
        .bind(record.applicant_id)
        .bind(ApplicationStatus::Pending.as_str())
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) => {
                if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_UNIQUE) {
                    Err(ApplicationError::DuplicateApplication)
                } else {
                    Err(ApplicationError::Database(sqlx::Error::Database(db_err)))
                }
            }
            Err(err) => Err(ApplicationError::Database(err)),
        }
    }

    /// Lists the applications filed by a candidate, newest first.
    pub async fn list_for_applicant(
        &self,
        applicant_id: &str,
    ) -> Result<Vec<Application>, ApplicationError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            "SELECT id, job_id, applicant_id, status, created_at \
             FROM applications WHERE applicant_id = ? ORDER BY created_at DESC",
        )
        .bind(applicant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ApplicationRow::into_domain).collect()
    }

    /// Lists the applications filed against a job.
    pub async fn list_for_job(&self, job_id: &str) -> Result<Vec<Application>, ApplicationError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            "SELECT id, job_id, applicant_id, status, created_at \
             FROM applications WHERE job_id = ? ORDER BY created_at",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ApplicationRow::into_domain).collect()
    }

    /// Moves an application to a new status. Returns `false` when the
    /// application does not exist.
    pub async fn update_status(
        &self,
        id: &str,
        status: ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, ApplicationError> {
        let result = sqlx::query("UPDATE applications SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(to_rfc3339(updated_at))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Data required to record an application.
pub struct NewApplication<'a> {
    pub id: String,
    pub job_id: &'a str,
    pub applicant_id: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewApplication<'a> {
    pub fn with_generated_id(self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ..self
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ApplicationRow {
    id: String,
    job_id: String,
    applicant_id: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl ApplicationRow {
    fn into_domain(self) -> Result<Application, ApplicationError> {
        let status = self
            .status
            .parse::<ApplicationStatus>()
            .map_err(|err| ApplicationError::CorruptRow(err.to_string()))?;
        Ok(Application {
            id: self.id,
            job_id: self.job_id,
            applicant_id: self.applicant_id,
            status,
            created_at: self.created_at,
        })
    }
}

/// Errors that can occur while reading or mutating applications.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("candidate has already applied to this job")]
    DuplicateApplication,
    #[error("corrupt application row: {0}")]
    CorruptRow(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
