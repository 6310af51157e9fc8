//! Multipart assembly and posting of a finished draft.

use serde::Deserialize;

use crate::draft::Draft;
use crate::error::{ColetaError, Result};
use crate::http::{FilePart, HttpClient, MultipartForm};

/// Fallback text when the backend rejects a submission without a message.
const REJECTED_WITHOUT_MESSAGE: &str = "registration rejected by the server";

/// Error envelope of the point-creation endpoint: absent (or false) on
/// success, `{"error": true, "message": ...}` on rejection.
#[derive(Debug, Deserialize)]
struct ServerReply {
    #[serde(default)]
    error: bool,
    message: Option<String>,
}

/// Assembles the draft into one multipart payload and posts it to the
/// point-creation endpoint.
#[derive(Clone)]
pub struct SubmissionBuilder<H: HttpClient> {
    http: H,
    base_url: String,
}

impl<H: HttpClient> SubmissionBuilder<H> {
    pub fn new(http: H, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Build the multipart payload for a draft.
    ///
    /// Field names are the creation endpoint's contract: `name`, `email`,
    /// `whatsapp`, `uf`, `city`, `latitude`, `longitude`, `items`, plus the
    /// optional `image` file part. The file part exists only when a photo
    /// was attached; unselected dropdowns send the sentinel as-is.
    pub fn payload(draft: &Draft) -> MultipartForm {
        let mut form = MultipartForm::new()
            .text("name", draft.name.clone())
            .text("email", draft.email.clone())
            .text("whatsapp", draft.whatsapp.clone())
            .text("uf", draft.uf.as_str())
            .text("city", draft.city.as_str())
            .text("latitude", draft.position.latitude.to_string())
            .text("longitude", draft.position.longitude.to_string())
            .text("items", draft.items_joined());

        if let Some(photo) = &draft.photo {
            form = form.file(FilePart {
                name: "image".to_string(),
                file_name: photo.file_name.clone(),
                content_type: photo.content_type.clone(),
                bytes: photo.bytes.clone(),
            });
        }

        form
    }

    /// Post the draft once.
    ///
    /// The HTTP status is ignored: the backend signals rejection through the
    /// body's error envelope, and any body without it counts as acceptance.
    ///
    /// # Errors
    ///
    /// `SubmissionRejected` when the reply carries the error indicator,
    /// `Network` when the post never completed. No retries are attempted.
    pub async fn submit(&self, draft: &Draft) -> Result<()> {
        let url = format!("{}/points", self.base_url);
        let form = Self::payload(draft);
        tracing::debug!(
            url = %url,
            uf = %draft.uf,
            item_count = draft.items.len(),
            has_photo = form.has_file(),
            "Posting registration"
        );

        let response = self.http.post_form(&url, form).await?;

        match serde_json::from_str::<ServerReply>(&response.body) {
            Ok(reply) if reply.error => {
                let message = reply
                    .message
                    .unwrap_or_else(|| REJECTED_WITHOUT_MESSAGE.to_string());
                tracing::warn!(status = response.status, message = %message, "Registration rejected");
                Err(ColetaError::SubmissionRejected(message))
            }
            // A body without the error indicator, however shaped, is success.
            _ => {
                tracing::info!(status = response.status, "Registration accepted");
                Ok(())
            }
        }
    }
}
