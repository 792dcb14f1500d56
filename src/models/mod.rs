pub mod field;
pub mod job;
pub mod loaders;
pub mod profile;
pub mod result;

pub use field::SemanticField;
pub use job::JobPosting;
pub use loaders::{load_jobs, load_profile};
pub use profile::ApplicantProfile;
pub use result::{ApplicationMethod, ApplicationResult, ApplicationStatus};
