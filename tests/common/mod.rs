#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgba};
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

use easel::canvas::host::CanvasHost;
use easel::kernel::staging::{ArtifactId, StagedArtifact};
use easel::services::assist::{
    Annotation, AnnotationKind, AssistError, AssistRequestBody, AssistanceBackend,
    AssistanceReply, FeedbackPayload,
};
use easel::services::persist::{DocumentStore, PersistError, SavePayload};

/// What the mock board looks like when rasterized. `Ramp` and
/// `Checkerboard` hash to different fingerprints; uniform fills would
/// not, so they are deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Empty,
    Ramp,
    Checkerboard,
}

pub struct MockCanvas {
    document_id: Option<Uuid>,
    pattern: Mutex<Pattern>,
    pub applied: Mutex<Vec<(Vec<ArtifactId>, bool)>>,
    pub committed: Mutex<Vec<ArtifactId>>,
    pub removed: Mutex<Vec<ArtifactId>>,
    pub replaced: Mutex<Vec<Value>>,
    pub render_excludes: Mutex<Vec<HashSet<ArtifactId>>>,
}

impl MockCanvas {
    pub fn new(document_id: Option<Uuid>, pattern: Pattern) -> Self {
        Self {
            document_id,
            pattern: Mutex::new(pattern),
            applied: Mutex::new(Vec::new()),
            committed: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            replaced: Mutex::new(Vec::new()),
            render_excludes: Mutex::new(Vec::new()),
        }
    }

    pub fn set_pattern(&self, pattern: Pattern) {
        *self.pattern.lock().unwrap() = pattern;
    }
}

impl CanvasHost for MockCanvas {
    fn document_id(&self) -> Option<Uuid> {
        self.document_id
    }

    fn render_viewport(&self, exclude: &HashSet<ArtifactId>) -> Option<DynamicImage> {
        self.render_excludes.lock().unwrap().push(exclude.clone());
        let pattern = *self.pattern.lock().unwrap();
        if pattern == Pattern::Empty {
            return None;
        }
        let image = image::ImageBuffer::from_fn(64, 64, |x, y| match pattern {
            Pattern::Ramp => {
                let value = (x * 255 / 63) as u8;
                Rgba([value, value, value, 255])
            }
            _ => {
                if ((x / 8) + (y / 8)) % 2 == 0 {
                    Rgba([255, 255, 255, 255])
                } else {
                    Rgba([0, 0, 0, 255])
                }
            }
        });
        Some(DynamicImage::ImageRgba8(image))
    }

    fn apply_artifacts(&self, artifacts: &[StagedArtifact], pending: bool) {
        let ids = artifacts.iter().map(|a| a.id).collect();
        self.applied.lock().unwrap().push((ids, pending));
    }

    fn commit_artifact(&self, id: ArtifactId) {
        self.committed.lock().unwrap().push(id);
    }

    fn remove_artifact(&self, id: ArtifactId) {
        self.removed.lock().unwrap().push(id);
    }

    fn replace_document(&self, data: &Value) {
        self.replaced.lock().unwrap().push(data.clone());
    }

    fn export_data(&self) -> Value {
        json!({"shapes": [{"kind": "stroke"}]})
    }
}

pub enum BackendScript {
    Reply(Result<AssistanceReply, AssistError>),
    /// Never resolves; the round stays in flight until cancelled.
    Hang,
}

#[derive(Default)]
pub struct MockBackend {
    pub requests: Mutex<Vec<AssistRequestBody>>,
    script: Mutex<VecDeque<BackendScript>>,
}

impl MockBackend {
    pub fn scripted(script: Vec<BackendScript>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(script.into()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AssistanceBackend for MockBackend {
    async fn request(&self, body: AssistRequestBody) -> Result<AssistanceReply, AssistError> {
        self.requests.lock().unwrap().push(body);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(BackendScript::Reply(result)) => result,
            Some(BackendScript::Hang) | None => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct MockStore {
    pub updates: Mutex<Vec<(Uuid, SavePayload)>>,
    results: Mutex<VecDeque<Result<(), PersistError>>>,
}

impl MockStore {
    pub fn failing_with(results: Vec<Result<(), PersistError>>) -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
            results: Mutex::new(results.into()),
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn update(&self, document_id: Uuid, payload: SavePayload) -> Result<(), PersistError> {
        self.updates.lock().unwrap().push((document_id, payload));
        self.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

pub fn annotation(kind: AnnotationKind, content: &str) -> Annotation {
    Annotation {
        kind,
        content: content.to_string(),
    }
}

pub fn reply_with(annotations: Vec<Annotation>) -> AssistanceReply {
    AssistanceReply {
        feedback: FeedbackPayload {
            annotations,
            summary: None,
        },
        text_content: "worked through the visible steps".to_string(),
        is_premium: false,
        image_url: None,
    }
}

pub fn two_suggestions() -> AssistanceReply {
    reply_with(vec![
        annotation(AnnotationKind::Hint, "check the sign on step two"),
        annotation(AnnotationKind::Step, "isolate x before dividing"),
    ])
}
