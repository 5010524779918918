//! Domain model (IDs, postings, applications, session, criteria, errors, ...).
//!
//! サーバーが正本（source of truth）であり、ここにある型はクライアント側のキャッシュ・入力を表します。

pub mod application;
pub mod attachment;
pub mod criteria;
pub mod errors;
pub mod ids;
pub mod job;
pub mod record;
pub mod session;
pub mod stats;
pub mod status;

pub use application::{Application, ApplicationSubmission, ResumeRef};
pub use attachment::{CandidateFile, FileHandle, StagedAttachment};
pub use criteria::{EffectiveQuery, QueryCriteria};
pub use errors::{AtsError, ErrorKind, ValidationError};
pub use ids::{ApplicationId, JobId};
pub use job::{JobDraft, JobPosting};
pub use record::Record;
pub use session::{Credential, Identity, Session};
pub use stats::DashboardStats;
pub use status::{ApplicationStatus, ParseStatusError, TransitionPolicy};
