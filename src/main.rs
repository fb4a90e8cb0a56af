use async_trait::async_trait;
use image::{DynamicImage, Rgba};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use easel::canvas::host::CanvasHost;
use easel::kernel::session::{Session, SessionConfig};
use easel::kernel::staging::{ArtifactId, StagedArtifact};
use easel::services::assist::{
    Annotation, AnnotationKind, AssistError, AssistRequestBody, AssistanceBackend,
    AssistanceReply, FeedbackPayload, HttpAssistanceBackend,
};
use easel::services::persist::{DocumentStore, HttpDocumentStore, PersistError, SavePayload};

/// Scripted stand-in for the drawing engine. Each stroke shifts the
/// rendered gradient so the fingerprint actually changes between edits.
struct DemoCanvas {
    document_id: Uuid,
    strokes: Mutex<u32>,
    pending: Mutex<Vec<ArtifactId>>,
}

impl DemoCanvas {
    fn new() -> Self {
        Self {
            document_id: Uuid::new_v4(),
            strokes: Mutex::new(0),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn stroke(&self) {
        *self.strokes.lock().unwrap() += 1;
    }

    fn take_pending(&self) -> Vec<ArtifactId> {
        std::mem::take(&mut self.pending.lock().unwrap())
    }
}

impl CanvasHost for DemoCanvas {
    fn document_id(&self) -> Option<Uuid> {
        Some(self.document_id)
    }

    fn render_viewport(&self, _exclude: &HashSet<ArtifactId>) -> Option<DynamicImage> {
        let strokes = *self.strokes.lock().unwrap();
        if strokes == 0 {
            return None;
        }
        let image = image::ImageBuffer::from_fn(128, 128, |x, y| {
            let value = ((x + y * strokes) % 256) as u8;
            Rgba([value, value, value, 255])
        });
        Some(DynamicImage::ImageRgba8(image))
    }

    fn apply_artifacts(&self, artifacts: &[StagedArtifact], pending: bool) {
        for artifact in artifacts {
            println!(
                "[canvas] {} {:?}: {}",
                if pending { "ghost" } else { "commit" },
                artifact.annotation.kind,
                artifact.annotation.content
            );
            if pending {
                self.pending.lock().unwrap().push(artifact.id);
            }
        }
    }

    fn commit_artifact(&self, id: ArtifactId) {
        println!("[canvas] committed {}", id.0);
    }

    fn remove_artifact(&self, id: ArtifactId) {
        println!("[canvas] removed {}", id.0);
    }

    fn replace_document(&self, _data: &Value) {
        println!("[canvas] document replaced by collaborator");
    }

    fn export_data(&self) -> Value {
        json!({"strokes": *self.strokes.lock().unwrap()})
    }
}

/// Offline backend so the demo runs without a server.
struct CannedBackend;

#[async_trait]
impl AssistanceBackend for CannedBackend {
    async fn request(&self, body: AssistRequestBody) -> Result<AssistanceReply, AssistError> {
        tracing::info!(mode = body.mode.as_str(), "canned backend answering");
        tokio::time::sleep(Duration::from_millis(400)).await;
        Ok(AssistanceReply {
            feedback: FeedbackPayload {
                annotations: vec![
                    Annotation {
                        kind: AnnotationKind::Hint,
                        content: "re-check the sign when moving the term across".into(),
                    },
                    Annotation {
                        kind: AnnotationKind::Step,
                        content: "divide both sides by 3 before substituting".into(),
                    },
                ],
                summary: Some("two small corrections".into()),
            },
            text_content: "two small corrections".into(),
            is_premium: false,
            image_url: None,
        })
    }
}

struct NullStore;

#[async_trait]
impl DocumentStore for NullStore {
    async fn update(&self, document_id: Uuid, payload: SavePayload) -> Result<(), PersistError> {
        tracing::info!(%document_id, data = %payload.data, "demo save");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    tracing::info!("easel demo session starting");

    let canvas = Arc::new(DemoCanvas::new());

    let backend: Arc<dyn AssistanceBackend> = match std::env::var("EASEL_BACKEND_URL") {
        Ok(url) => Arc::new(HttpAssistanceBackend::new(url)),
        Err(_) => Arc::new(CannedBackend),
    };
    let store: Arc<dyn DocumentStore> = match std::env::var("EASEL_STORE_URL") {
        Ok(url) => Arc::new(HttpDocumentStore::new(url)),
        Err(_) => Arc::new(NullStore),
    };

    let (session, handle, mut notices) =
        Session::new(SessionConfig::default(), canvas.clone(), backend, store);
    tokio::spawn(session.run());
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("[notice] {notice:?}");
        }
    });

    // The learner draws a few strokes, then pauses.
    for _ in 0..3 {
        canvas.stroke();
        handle.notify_edit(false).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
    }
    tracing::info!("waiting for the board to settle");
    tokio::time::sleep(Duration::from_millis(3500)).await;

    // Review whatever got staged: accept the first, reject the rest.
    let pending = canvas.take_pending();
    for (index, id) in pending.into_iter().enumerate() {
        if index == 0 {
            handle.accept(id).await;
        } else {
            handle.reject(id).await;
        }
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("[status] {:?}", handle.status());
    tracing::info!("easel demo session done");
    Ok(())
}
