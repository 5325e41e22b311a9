pub mod envelope;
pub mod types;

pub use envelope::{
    ApplicationBody, ApplicationList, CompanyBody, CompanyList, Envelope, JobBody, JobList,
    UserBody,
};
pub use types::{
    Application, ApplicationStatus, Company, Job, Profile, PublicUser, RoleParseError,
    StatusParseError, UserRole,
};
