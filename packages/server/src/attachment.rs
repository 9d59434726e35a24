//! Certificate attachment handling.
//!
//! Converts a decoded upload into a storage-ready certificate value, and
//! owns the byte-store side of the certificate lifecycle: the two-phase
//! write on create/update and the reclamation of referenced payloads on
//! delete/replace.

use common::storage::{ByteStore, ContentHash};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

use crate::config::StorageMode;
use crate::entity::workout;
use crate::error::AppError;

/// Filename extensions accepted for certificate uploads.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];

/// A decoded multipart file: bytes plus the metadata the uploader declared.
pub struct IncomingFile {
    pub data: Vec<u8>,
    pub filename: String,
    pub declared_content_type: Option<String>,
}

/// A certificate as stored inside a workout record. Exactly one storage
/// mode is populated; `content_type` is always set.
#[derive(Clone, Debug, PartialEq)]
pub enum Certificate {
    Embedded {
        data: Vec<u8>,
        content_type: String,
    },
    Referenced {
        /// Content-hash key into the byte store.
        path: String,
        content_type: String,
        filename: Option<String>,
        size: i64,
    },
}

impl Certificate {
    pub fn storage_label(&self) -> &'static str {
        match self {
            Certificate::Embedded { .. } => "embedded",
            Certificate::Referenced { .. } => "referenced",
        }
    }
}

/// A certificate written to storage but not yet committed to a record.
pub struct PreparedCertificate {
    pub certificate: Certificate,
    /// Whether `prepare` created the byte-store payload. Dedup can find
    /// the bytes already present, in which case rollback must not delete
    /// a payload another record owns.
    newly_stored: bool,
}

/// Validate that the original filename carries an allow-listed extension.
/// The declared MIME type is deliberately not consulted.
pub fn validate_extension(filename: &str) -> Result<(), AppError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::InvalidAttachmentFormat(format!(
            "'{filename}' is not a pdf, jpg, jpeg, or png file"
        ))),
    }
}

/// Content type for a certificate: the uploader's declaration wins, then
/// a guess from the filename, then the octet-stream fallback.
fn resolve_content_type(file: &IncomingFile) -> String {
    file.declared_content_type
        .clone()
        .or_else(|| {
            mime_guess::from_path(&file.filename)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Validate an upload and produce a certificate in the configured storage
/// mode. In referenced mode the bytes are durably written to the byte
/// store before this returns; the caller commits the record afterwards
/// and calls [`discard`] if that commit fails.
pub async fn prepare(
    mode: StorageMode,
    store: &dyn ByteStore,
    file: IncomingFile,
) -> Result<PreparedCertificate, AppError> {
    validate_extension(&file.filename)?;
    let content_type = resolve_content_type(&file);

    match mode {
        StorageMode::Embedded => Ok(PreparedCertificate {
            certificate: Certificate::Embedded {
                data: file.data,
                content_type,
            },
            newly_stored: false,
        }),
        StorageMode::Referenced => {
            let size = i64::try_from(file.data.len()).unwrap_or(i64::MAX);
            let already_present = store.exists(&ContentHash::compute(&file.data)).await?;
            let hash = store.put(&file.data).await?;
            Ok(PreparedCertificate {
                certificate: Certificate::Referenced {
                    path: hash.to_hex(),
                    content_type,
                    filename: Some(file.filename),
                    size,
                },
                newly_stored: !already_present,
            })
        }
    }
}

/// Roll back a prepared certificate whose record commit failed. Deletes
/// the byte-store payload only when [`prepare`] created it.
pub async fn discard(store: &dyn ByteStore, prepared: &PreparedCertificate) {
    if !prepared.newly_stored {
        return;
    }
    if let Certificate::Referenced { path, .. } = &prepared.certificate
        && let Ok(hash) = ContentHash::from_hex(path)
        && let Err(e) = store.delete(&hash).await
    {
        tracing::warn!("failed to roll back uncommitted certificate {path}: {e}");
    }
}

/// Release a referenced payload after its record was deleted or its
/// certificate replaced. Content-addressed keys can be shared across
/// workouts, so the payload is only deleted once no remaining record
/// references it.
pub async fn release<C: ConnectionTrait>(
    db: &C,
    store: &dyn ByteStore,
    path: &str,
) -> Result<(), AppError> {
    let remaining = workout::Entity::find()
        .filter(workout::Column::CertificatePath.eq(path))
        .count(db)
        .await?;
    if remaining > 0 {
        return Ok(());
    }

    let hash = ContentHash::from_hex(path)?;
    store.delete(&hash).await?;
    Ok(())
}

/// Read the certificate out of a workout record, if one is attached.
pub fn certificate_of(model: &workout::Model) -> Option<Certificate> {
    let content_type = model.certificate_content_type.clone()?;
    if let Some(path) = &model.certificate_path {
        return Some(Certificate::Referenced {
            path: path.clone(),
            content_type,
            filename: model.certificate_filename.clone(),
            size: model.certificate_size.unwrap_or_default(),
        });
    }
    model.certificate_data.as_ref().map(|data| Certificate::Embedded {
        data: data.clone(),
        content_type,
    })
}

/// Write a certificate into a workout active model, replacing whatever
/// was there. All five columns are assigned so a mode switch never leaves
/// stale values from the other variant.
pub fn apply(active: &mut workout::ActiveModel, certificate: &Certificate) {
    match certificate {
        Certificate::Embedded { data, content_type } => {
            active.certificate_content_type = Set(Some(content_type.clone()));
            active.certificate_data = Set(Some(data.clone()));
            active.certificate_path = Set(None);
            active.certificate_filename = Set(None);
            active.certificate_size = Set(Some(data.len() as i64));
        }
        Certificate::Referenced {
            path,
            content_type,
            filename,
            size,
        } => {
            active.certificate_content_type = Set(Some(content_type.clone()));
            active.certificate_data = Set(None);
            active.certificate_path = Set(Some(path.clone()));
            active.certificate_filename = Set(filename.clone());
            active.certificate_size = Set(Some(*size));
        }
    }
}
