use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use super::draft::PropertyDraft;
use crate::config::SubmissionConfig;

/// A photo attached to the draft. `id` stays stable across reorderings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PhotoFile>,
}

impl Photo {
    pub fn from_url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: Some(url.into()),
            file: None,
        }
    }

    pub fn from_file(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            url: None,
            file: Some(PhotoFile {
                path: path.into(),
                content_type: None,
            }),
        }
    }
}

/// Raw binary handle for a photo that still has to be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoFile {
    pub path: PathBuf,
    #[serde(default, rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl PhotoFile {
    fn mime_type(&self) -> mime::Mime {
        self.content_type
            .as_deref()
            .and_then(|raw| raw.parse::<mime::Mime>().ok())
            .or_else(|| mime_guess::from_path(&self.path).first())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("photo entry {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },
    #[error("photo id '{0}' appears more than once")]
    DuplicateId(String),
    #[error("photo '{0}' has neither a file nor a url")]
    MissingSource(String),
    #[error("photo '{0}' is outside the upload directory")]
    OutsideUploadRoot(String),
    #[error("photo '{id}' is larger than {limit} bytes")]
    TooLarge { id: String, limit: u64 },
    #[error("unable to read photo '{id}': {source}")]
    Read {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl PhotoError {
    pub fn photo_id(&self) -> Option<&str> {
        match self {
            PhotoError::Malformed { .. } => None,
            PhotoError::DuplicateId(id)
            | PhotoError::MissingSource(id)
            | PhotoError::OutsideUploadRoot(id) => Some(id),
            PhotoError::TooLarge { id, .. } | PhotoError::Read { id, .. } => Some(id),
        }
    }

    fn from_read(id: String, error: PhotoReadError) -> Self {
        match error {
            PhotoReadError::Io(source) => PhotoError::Read { id, source },
            PhotoReadError::OutsideRoot => PhotoError::OutsideUploadRoot(id),
            PhotoReadError::TooLarge { limit } => PhotoError::TooLarge { id, limit },
        }
    }
}

/// Failure reported by a [`PhotoReader`]; the pipeline attaches the photo id.
#[derive(Debug, thiserror::Error)]
pub enum PhotoReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("path resolves outside the upload directory")]
    OutsideRoot,
    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Loads the bytes behind a [`PhotoFile`].
#[async_trait]
pub trait PhotoReader: Send + Sync + Debug {
    async fn read(&self, file: &PhotoFile) -> Result<Vec<u8>, PhotoReadError>;
}

/// Reads photo files from beneath an upload directory, up to a byte limit.
///
/// Relative paths resolve against the root. Symlinks and `..` segments are
/// resolved before the containment check.
#[derive(Debug, Clone)]
pub struct FsPhotoReader {
    root: PathBuf,
    max_bytes: u64,
}

impl FsPhotoReader {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &SubmissionConfig) -> Self {
        Self::new(config.photo_root.clone(), config.max_photo_bytes)
    }
}

impl Default for FsPhotoReader {
    fn default() -> Self {
        Self::from_config(&SubmissionConfig::default())
    }
}

#[async_trait]
impl PhotoReader for FsPhotoReader {
    async fn read(&self, file: &PhotoFile) -> Result<Vec<u8>, PhotoReadError> {
        let root = tokio::fs::canonicalize(&self.root).await?;
        let path = tokio::fs::canonicalize(root.join(&file.path)).await?;
        if !path.starts_with(&root) {
            warn!(path = %file.path.display(), "photo path escapes the upload directory");
            return Err(PhotoReadError::OutsideRoot);
        }

        let handle = tokio::fs::File::open(&path).await?;
        let mut bytes = Vec::new();
        handle
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .await?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(PhotoReadError::TooLarge {
                limit: self.max_bytes,
            });
        }

        Ok(bytes)
    }
}

/// Extracts the typed photo list from the draft's loosely typed `photos` field.
pub fn photos_from_draft(draft: &PropertyDraft) -> Result<Vec<Photo>, PhotoError> {
    let entries = match draft.photo_entries() {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(PhotoError::Malformed {
                index: 0,
                reason: "photos must be a list".to_string(),
            })
        }
    };

    let mut seen = HashSet::with_capacity(entries.len());
    let mut photos = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let photo: Photo =
            serde_json::from_value(entry.clone()).map_err(|err| PhotoError::Malformed {
                index,
                reason: err.to_string(),
            })?;
        if !seen.insert(photo.id.clone()) {
            return Err(PhotoError::DuplicateId(photo.id));
        }
        photos.push(photo);
    }

    Ok(photos)
}

/// Arranges `photos` by `order`, or keeps their own order when `order` is empty
/// or does not name exactly the same set of ids.
pub fn apply_order(photos: Vec<Photo>, order: &[String]) -> Vec<Photo> {
    if order.is_empty() || order.len() != photos.len() {
        return photos;
    }

    let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(photos.len());
    for (index, photo) in photos.iter().enumerate() {
        by_id.insert(photo.id.as_str(), index);
    }

    let mut used = HashSet::with_capacity(order.len());
    let mut positions = Vec::with_capacity(order.len());
    for id in order {
        match by_id.get(id.as_str()) {
            Some(&index) if used.insert(index) => positions.push(index),
            _ => {
                debug!(photo_id = %id, "stale photo order, keeping upload order");
                return photos;
            }
        }
    }

    let mut slots: Vec<Option<Photo>> = photos.into_iter().map(Some).collect();
    positions
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

/// Converts photos into transmittable strings, concurrently, in input order.
#[derive(Debug, Clone)]
pub struct PhotoPipeline {
    reader: Arc<dyn PhotoReader>,
    max_concurrent: Option<usize>,
}

impl PhotoPipeline {
    pub fn new(reader: Arc<dyn PhotoReader>) -> Self {
        Self {
            reader,
            max_concurrent: None,
        }
    }

    /// Filesystem-backed pipeline honoring the configured root, size and concurrency limits.
    pub fn from_config(config: &SubmissionConfig) -> Self {
        Self::new(Arc::new(FsPhotoReader::from_config(config)))
            .with_max_concurrent(config.max_concurrent_encodes)
    }

    pub fn with_max_concurrent(mut self, max_concurrent: Option<usize>) -> Self {
        self.max_concurrent = max_concurrent.filter(|cap| *cap > 0);
        self
    }

    /// Encodes the draft's photos ordered by its `photoOrder` field.
    pub async fn encode_draft(&self, draft: &PropertyDraft) -> Result<Vec<String>, PhotoError> {
        let photos = photos_from_draft(draft)?;
        let ordered = apply_order(photos, &draft.photo_order());
        self.encode_all(ordered).await
    }

    /// Fails the whole batch on the first photo that cannot be encoded.
    pub async fn encode_all(&self, photos: Vec<Photo>) -> Result<Vec<String>, PhotoError> {
        if photos.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.max_concurrent.unwrap_or(photos.len()).max(1);
        debug!(count = photos.len(), limit, "encoding listing photos");

        stream::iter(photos)
            .map(|photo| self.encode(photo))
            .buffered(limit)
            .try_collect()
            .await
    }

    async fn encode(&self, photo: Photo) -> Result<String, PhotoError> {
        if let Some(file) = &photo.file {
            let bytes = self
                .reader
                .read(file)
                .await
                .map_err(|err| PhotoError::from_read(photo.id.clone(), err))?;
            return Ok(format!(
                "data:{};base64,{}",
                file.mime_type().essence_str(),
                BASE64.encode(bytes)
            ));
        }

        match photo.url {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(PhotoError::MissingSource(photo.id)),
        }
    }
}

impl Default for PhotoPipeline {
    fn default() -> Self {
        Self::new(Arc::new(FsPhotoReader::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct DelayedReader {
        delays_ms: HashMap<PathBuf, u64>,
        completed: Mutex<Vec<PathBuf>>,
    }

    impl DelayedReader {
        fn new(delays: &[(&str, u64)]) -> Self {
            Self {
                delays_ms: delays
                    .iter()
                    .map(|(path, delay)| (PathBuf::from(path), *delay))
                    .collect(),
                completed: Mutex::new(Vec::new()),
            }
        }

        fn completion_order(&self) -> Vec<PathBuf> {
            self.completed.lock().expect("completion mutex").clone()
        }
    }

    #[async_trait]
    impl PhotoReader for DelayedReader {
        async fn read(&self, file: &PhotoFile) -> Result<Vec<u8>, PhotoReadError> {
            let delay = self.delays_ms.get(&file.path).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if file.path.to_string_lossy().contains("missing") {
                return Err(
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such photo").into(),
                );
            }
            self.completed
                .lock()
                .expect("completion mutex")
                .push(file.path.clone());
            Ok(file.path.to_string_lossy().into_owned().into_bytes())
        }
    }

    fn ids(photos: &[Photo]) -> Vec<&str> {
        photos.iter().map(|photo| photo.id.as_str()).collect()
    }

    fn order(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn data_uri(mime: &str, body: &str) -> String {
        format!("data:{mime};base64,{}", BASE64.encode(body))
    }

    #[test]
    fn apply_order_follows_user_order() {
        let photos = vec![
            Photo::from_url("a", "https://cdn.example.com/a.jpg"),
            Photo::from_url("b", "https://cdn.example.com/b.jpg"),
            Photo::from_url("c", "https://cdn.example.com/c.jpg"),
        ];
        let ordered = apply_order(photos, &order(&["c", "a", "b"]));
        assert_eq!(ids(&ordered), vec!["c", "a", "b"]);
    }

    #[test]
    fn apply_order_falls_back_when_stale() {
        let photos = || {
            vec![
                Photo::from_url("a", "https://cdn.example.com/a.jpg"),
                Photo::from_url("b", "https://cdn.example.com/b.jpg"),
            ]
        };
        assert_eq!(ids(&apply_order(photos(), &[])), vec!["a", "b"]);
        assert_eq!(ids(&apply_order(photos(), &order(&["b"]))), vec!["a", "b"]);
        assert_eq!(
            ids(&apply_order(photos(), &order(&["b", "z"]))),
            vec!["a", "b"]
        );
        assert_eq!(
            ids(&apply_order(photos(), &order(&["b", "b"]))),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn results_follow_input_order_not_completion_order() {
        let reader = Arc::new(DelayedReader::new(&[
            ("a.jpg", 60),
            ("b.jpg", 20),
            ("c.jpg", 0),
        ]));
        let pipeline = PhotoPipeline::new(reader.clone());
        let photos = apply_order(
            vec![
                Photo::from_file("a", "a.jpg"),
                Photo::from_file("b", "b.jpg"),
                Photo::from_file("c", "c.jpg"),
            ],
            &order(&["c", "a", "b"]),
        );

        let encoded = pipeline.encode_all(photos).await.expect("encodes");

        assert_eq!(
            encoded,
            vec![
                data_uri("image/jpeg", "c.jpg"),
                data_uri("image/jpeg", "a.jpg"),
                data_uri("image/jpeg", "b.jpg"),
            ]
        );
        assert_eq!(
            reader.completion_order().last(),
            Some(&PathBuf::from("a.jpg"))
        );
    }

    #[tokio::test]
    async fn capped_pipeline_still_preserves_order() {
        let reader = Arc::new(DelayedReader::new(&[("a.jpg", 30), ("b.jpg", 0)]));
        let pipeline = PhotoPipeline::new(reader).with_max_concurrent(Some(1));
        let encoded = pipeline
            .encode_all(vec![
                Photo::from_file("a", "a.jpg"),
                Photo::from_url("remote", "https://cdn.example.com/r.jpg"),
                Photo::from_file("b", "b.jpg"),
            ])
            .await
            .expect("encodes");

        assert_eq!(encoded[0], data_uri("image/jpeg", "a.jpg"));
        assert_eq!(encoded[1], "https://cdn.example.com/r.jpg");
        assert_eq!(encoded[2], data_uri("image/jpeg", "b.jpg"));
    }

    #[tokio::test]
    async fn one_unreadable_photo_fails_the_batch() {
        let pipeline = PhotoPipeline::new(Arc::new(DelayedReader::default()));
        let error = pipeline
            .encode_all(vec![
                Photo::from_file("a", "a.jpg"),
                Photo::from_file("gone", "missing.jpg"),
            ])
            .await
            .expect_err("batch fails");

        assert!(matches!(error, PhotoError::Read { .. }));
        assert_eq!(error.photo_id(), Some("gone"));
    }

    #[tokio::test]
    async fn photo_without_source_is_rejected() {
        let pipeline = PhotoPipeline::new(Arc::new(DelayedReader::default()));
        let error = pipeline
            .encode_all(vec![Photo::from_url("blank", "  ")])
            .await
            .expect_err("no source");
        assert!(matches!(error, PhotoError::MissingSource(id) if id == "blank"));
    }

    #[tokio::test]
    async fn content_type_overrides_extension_guess() {
        let pipeline = PhotoPipeline::new(Arc::new(DelayedReader::default()));
        let photo = Photo {
            id: "p".to_string(),
            url: None,
            file: Some(PhotoFile {
                path: PathBuf::from("upload.bin"),
                content_type: Some("image/webp".to_string()),
            }),
        };
        let encoded = pipeline.encode_all(vec![photo]).await.expect("encodes");
        assert_eq!(encoded, vec![data_uri("image/webp", "upload.bin")]);
    }

    fn write_photo(dir: &std::path::Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::File::create(&path)
            .and_then(|mut file| file.write_all(bytes))
            .expect("write photo");
        path
    }

    #[tokio::test]
    async fn filesystem_reader_encodes_real_files() {
        let uploads = tempfile::tempdir().expect("upload dir");
        let absolute = write_photo(uploads.path(), "front.png", b"png-bytes");
        write_photo(uploads.path(), "back.jpg", b"jpg-bytes");

        let pipeline = PhotoPipeline::new(Arc::new(FsPhotoReader::new(uploads.path(), 1024)));
        let encoded = pipeline
            .encode_all(vec![
                Photo::from_file("front", absolute),
                Photo::from_file("back", "back.jpg"),
            ])
            .await
            .expect("encodes");
        assert_eq!(
            encoded,
            vec![
                data_uri("image/png", "png-bytes"),
                data_uri("image/jpeg", "jpg-bytes"),
            ]
        );
    }

    #[tokio::test]
    async fn filesystem_reader_refuses_paths_outside_the_upload_dir() {
        let uploads = tempfile::tempdir().expect("upload dir");
        let elsewhere = tempfile::tempdir().expect("other dir");
        let secret = write_photo(elsewhere.path(), "secret.jpg", b"not yours");
        let sibling = PathBuf::from("..")
            .join(elsewhere.path().file_name().expect("dir name"))
            .join("secret.jpg");

        let pipeline = PhotoPipeline::new(Arc::new(FsPhotoReader::new(uploads.path(), 1024)));
        for path in [secret, sibling] {
            let error = pipeline
                .encode_all(vec![Photo::from_file("leak", path)])
                .await
                .expect_err("outside the upload dir");
            assert!(matches!(error, PhotoError::OutsideUploadRoot(ref id) if id == "leak"));
        }
    }

    #[tokio::test]
    async fn filesystem_reader_enforces_the_byte_limit() {
        let uploads = tempfile::tempdir().expect("upload dir");
        write_photo(uploads.path(), "exact.jpg", &[7u8; 16]);
        write_photo(uploads.path(), "huge.jpg", &[7u8; 17]);
        let pipeline = PhotoPipeline::new(Arc::new(FsPhotoReader::new(uploads.path(), 16)));

        let encoded = pipeline
            .encode_all(vec![Photo::from_file("exact", "exact.jpg")])
            .await
            .expect("limit is inclusive");
        assert_eq!(encoded.len(), 1);

        let error = pipeline
            .encode_all(vec![Photo::from_file("huge", "huge.jpg")])
            .await
            .expect_err("over the limit");
        assert!(matches!(
            error,
            PhotoError::TooLarge { ref id, limit: 16 } if id == "huge"
        ));
    }

    #[tokio::test]
    async fn pipeline_from_config_uses_configured_root() {
        let uploads = tempfile::tempdir().expect("upload dir");
        write_photo(uploads.path(), "a.jpg", b"a");
        let config = SubmissionConfig {
            photo_root: uploads.path().to_path_buf(),
            max_photo_bytes: 1,
            ..SubmissionConfig::default()
        };

        let pipeline = PhotoPipeline::from_config(&config);
        let encoded = pipeline
            .encode_all(vec![Photo::from_file("a", "a.jpg")])
            .await
            .expect("encodes");
        assert_eq!(encoded, vec![data_uri("image/jpeg", "a")]);
    }

    #[test]
    fn photos_from_draft_rejects_duplicates_and_garbage() {
        let draft = |photos: Value| {
            PropertyDraft::from_fields(
                json!({ "photos": photos })
                    .as_object()
                    .cloned()
                    .expect("object"),
            )
        };

        let duplicate = draft(json!([
            { "id": "a", "url": "https://cdn.example.com/a.jpg" },
            { "id": "a", "url": "https://cdn.example.com/a2.jpg" },
        ]));
        assert!(matches!(
            photos_from_draft(&duplicate),
            Err(PhotoError::DuplicateId(id)) if id == "a"
        ));

        let garbage = draft(json!([{ "url": "https://cdn.example.com/a.jpg" }]));
        assert!(matches!(
            photos_from_draft(&garbage),
            Err(PhotoError::Malformed { index: 0, .. })
        ));

        let parsed = photos_from_draft(&draft(json!([
            { "id": "a", "file": { "path": "/tmp/a.jpg", "contentType": "image/jpeg" } },
        ])))
        .expect("parses");
        assert_eq!(
            parsed[0].file.as_ref().map(|file| file.path.clone()),
            Some(PathBuf::from("/tmp/a.jpg"))
        );
    }
}
