//! Attachment Validator - 履歴書ファイルのクライアント側検査
//!
//! UX のためのガードであり、セキュリティ境界ではない（サーバー側でも再検証される）。
//! 検査に失敗したファイルは、既にステージ済みの添付を決して消さない。

use crate::domain::{CandidateFile, StagedAttachment, ValidationError};

pub const PDF: &str = "application/pdf";
pub const DOC: &str = "application/msword";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// 10 MiB
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Allowed types and the size ceiling for resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    allowed: Vec<String>,
    max_bytes: u64,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::new([PDF, DOC, DOCX], DEFAULT_MAX_BYTES)
    }
}

impl AttachmentPolicy {
    pub fn new(allowed: impl IntoIterator<Item = impl Into<String>>, max_bytes: u64) -> Self {
        Self {
            allowed: allowed
                .into_iter()
                .map(|mime| essence(&mime.into()))
                .collect(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Type first, then size. A file exactly at the ceiling is accepted.
    pub fn validate(&self, file: &CandidateFile) -> Result<StagedAttachment, ValidationError> {
        let mime = essence(&file.mime_type);
        if !self.allowed.contains(&mime) {
            return Err(ValidationError::UnsupportedType {
                mime: file.mime_type.clone(),
            });
        }
        if file.size_bytes > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size: file.size_bytes,
                max: self.max_bytes,
            });
        }
        Ok(StagedAttachment::new(
            file.handle.clone(),
            mime,
            file.size_bytes,
        ))
    }
}

/// `Application/PDF; name=x` -> `application/pdf`
fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Holds at most one validated attachment between selection and submit.
#[derive(Debug, Default)]
pub struct AttachmentSlot {
    policy: AttachmentPolicy,
    staged: Option<StagedAttachment>,
}

impl AttachmentSlot {
    pub fn new(policy: AttachmentPolicy) -> Self {
        Self {
            policy,
            staged: None,
        }
    }

    /// Validate `file` and stage it. On rejection the previous attachment stays.
    pub fn select(&mut self, file: &CandidateFile) -> Result<&StagedAttachment, ValidationError> {
        match self.policy.validate(file) {
            Ok(attachment) => {
                tracing::debug!(
                    file = %attachment.file().name,
                    size = attachment.size_bytes(),
                    "attachment staged"
                );
                Ok(self.staged.insert(attachment))
            }
            Err(e) => {
                tracing::debug!(file = %file.handle.name, error = %e, "attachment rejected");
                Err(e)
            }
        }
    }

    pub fn staged(&self) -> Option<&StagedAttachment> {
        self.staged.as_ref()
    }

    pub fn clear(&mut self) {
        self.staged = None;
    }

    pub fn policy(&self) -> &AttachmentPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileHandle;
    use rstest::rstest;

    const MIB: u64 = 1024 * 1024;

    fn file(name: &str, mime: &str, size: u64) -> CandidateFile {
        CandidateFile::new(
            FileHandle {
                name: name.to_string(),
                path: format!("/tmp/{name}").into(),
            },
            mime,
            size,
        )
    }

    #[rstest]
    #[case(PDF)]
    #[case(DOC)]
    #[case(DOCX)]
    #[case("Application/PDF; charset=binary")]
    fn accepts_allowed_types(#[case] mime: &str) {
        let staged = AttachmentPolicy::default()
            .validate(&file("cv", mime, MIB))
            .unwrap();
        assert_eq!(staged.size_bytes(), MIB);
    }

    #[rstest]
    #[case("image/png")]
    #[case("text/plain")]
    #[case("")]
    fn rejects_other_types(#[case] mime: &str) {
        let err = AttachmentPolicy::default()
            .validate(&file("cv", mime, 10))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedType {
                mime: mime.to_string()
            }
        );
    }

    #[test]
    fn ceiling_is_inclusive() {
        let policy = AttachmentPolicy::default();
        assert!(policy.validate(&file("cv.pdf", PDF, 10 * MIB)).is_ok());
        assert_eq!(
            policy.validate(&file("cv.pdf", PDF, 10 * MIB + 1)),
            Err(ValidationError::TooLarge {
                size: 10 * MIB + 1,
                max: 10 * MIB
            })
        );
    }

    #[test]
    fn rejected_file_keeps_the_previous_selection() {
        let mut slot = AttachmentSlot::default();
        let good = file("cv.pdf", PDF, 2 * MIB);
        slot.select(&good).unwrap();

        let err = slot.select(&file("huge.pdf", PDF, 12 * MIB)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
        assert_eq!(slot.staged().map(|a| a.file().name.as_str()), Some("cv.pdf"));

        slot.select(&file("photo.png", "image/png", 1)).unwrap_err();
        assert_eq!(slot.staged().map(|a| a.file().name.as_str()), Some("cv.pdf"));
    }

    #[test]
    fn validating_twice_gives_the_same_attachment() {
        let policy = AttachmentPolicy::default();
        let cv = file("cv.docx", DOCX, 3 * MIB);
        assert_eq!(policy.validate(&cv), policy.validate(&cv));
    }
}
