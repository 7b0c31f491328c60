//! Product mutation state machine
//!
//! One mutator per admin dialog. Every submit walks the same machine:
//!
//! ```text
//! Idle -> Validating -> (UploadingImage) -> Writing -> Idle(outcome)
//! ```
//!
//! Deletes go straight from Idle to Writing. The machine refuses a second
//! submit while busy, performs at most one upload and exactly one write per
//! operation, and never issues the write when the upload fails. Failures
//! land back in Idle carrying the user-facing message; the caller's draft is
//! untouched so it can be resubmitted as-is.

use chrono::Utc;
use tokio::sync::watch;

use crate::rtdb::RealtimeDb;
use crate::upload::ImageUploader;
use crate::{ClientError, ClientResult};
use shared::{ImageAction, ProductDraft};

/// Terminal result of the last submit
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// Product created under this key
    Created(String),
    Updated,
    Deleted,
    /// Submit failed; message is ready for display
    Failed(String),
}

/// Where the machine currently is
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState {
    /// Ready for a submit; carries the previous outcome if any
    Idle(Option<MutationOutcome>),
    Validating,
    UploadingImage,
    Writing,
}

impl MutationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, MutationState::Idle(_))
    }

    /// Outcome of the last finished submit, if idle
    pub fn last_outcome(&self) -> Option<&MutationOutcome> {
        match self {
            MutationState::Idle(outcome) => outcome.as_ref(),
            _ => None,
        }
    }
}

/// Create, update, and delete products against the remote collection
///
/// Deliberately not `Clone`: one mutator is one state machine.
#[derive(Debug)]
pub struct ProductMutator {
    db: RealtimeDb,
    uploader: ImageUploader,
    path: String,
    state_tx: watch::Sender<MutationState>,
    state_rx: watch::Receiver<MutationState>,
}

impl ProductMutator {
    pub fn new(db: RealtimeDb, uploader: ImageUploader, path: impl Into<String>) -> Self {
        let (state_tx, state_rx) = watch::channel(MutationState::Idle(None));
        Self {
            db,
            uploader,
            path: path.into(),
            state_tx,
            state_rx,
        }
    }

    /// Current machine state
    pub fn state(&self) -> MutationState {
        self.state_rx.borrow().clone()
    }

    /// Receiver for presentation layers that watch the machine
    pub fn receiver(&self) -> watch::Receiver<MutationState> {
        self.state_rx.clone()
    }

    /// Validate the draft, upload its image if one is attached, and append
    /// the new record; returns the generated key
    pub async fn submit_create(&self, draft: &ProductDraft) -> ClientResult<String> {
        self.begin(MutationState::Validating)?;

        let validated = match draft.validate() {
            Ok(validated) => validated,
            Err(e) => return self.fail(ClientError::from(e)),
        };

        let image_url = match self.resolve_image(&validated.image).await {
            Ok(url) => url,
            Err(e) => return self.fail(e),
        };

        self.state_tx.send_replace(MutationState::Writing);
        let record = validated.into_record(image_url, Utc::now());
        let key = match self.db.push(&self.path, &record).await {
            Ok(key) => key,
            Err(e) => return self.fail(e),
        };

        tracing::info!(id = %key, name = %record.name, "Product created");
        self.state_tx
            .send_replace(MutationState::Idle(Some(MutationOutcome::Created(
                key.clone(),
            ))));
        Ok(key)
    }

    /// Validate the draft and partially update the record at `id`
    ///
    /// The creation timestamp is never part of the patch. An explicit image
    /// removal writes an empty URL without uploading anything.
    pub async fn submit_update(&self, id: &str, draft: &ProductDraft) -> ClientResult<()> {
        self.begin(MutationState::Validating)?;

        let validated = match draft.validate() {
            Ok(validated) => validated,
            Err(e) => return self.fail(ClientError::from(e)),
        };

        let image_url = match self.resolve_image(&validated.image).await {
            Ok(url) => url,
            Err(e) => return self.fail(e),
        };

        self.state_tx.send_replace(MutationState::Writing);
        let patch = validated.into_patch(image_url, Utc::now());
        if let Err(e) = self.db.update(&self.node_path(id), &patch).await {
            return self.fail(e);
        }

        tracing::info!(id = %id, "Product updated");
        self.state_tx
            .send_replace(MutationState::Idle(Some(MutationOutcome::Updated)));
        Ok(())
    }

    /// Delete the record at `id`
    ///
    /// The hosted image is left in place; only the record goes.
    pub async fn submit_delete(&self, id: &str) -> ClientResult<()> {
        self.begin(MutationState::Writing)?;

        if let Err(e) = self.db.remove(&self.node_path(id)).await {
            return self.fail(e);
        }

        tracing::info!(id = %id, "Product deleted");
        self.state_tx
            .send_replace(MutationState::Idle(Some(MutationOutcome::Deleted)));
        Ok(())
    }

    /// Atomically leave Idle, or refuse if a submit is already running
    fn begin(&self, next: MutationState) -> ClientResult<()> {
        let started = self.state_tx.send_if_modified(|state| {
            if state.is_idle() {
                *state = next.clone();
                true
            } else {
                false
            }
        });

        if started { Ok(()) } else { Err(ClientError::Busy) }
    }

    async fn resolve_image(&self, action: &ImageAction) -> ClientResult<String> {
        match action {
            ImageAction::Remove => Ok(String::new()),
            ImageAction::Keep(url) => Ok(url.clone()),
            ImageAction::Upload(file) => {
                self.state_tx.send_replace(MutationState::UploadingImage);
                self.uploader.upload(file).await
            }
        }
    }

    fn fail<T>(&self, err: ClientError) -> ClientResult<T> {
        tracing::error!(error = %err, "Product mutation failed");
        self.state_tx
            .send_replace(MutationState::Idle(Some(MutationOutcome::Failed(
                err.user_message(),
            ))));
        Err(err)
    }

    fn node_path(&self, id: &str) -> String {
        format!("{}/{}", self.path, id)
    }
}
