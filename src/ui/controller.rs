//! User-facing flows: upload, delete, query, search and status refresh.

use crate::client::{ApiError, UploadFile};
use crate::context::AppContext;
use crate::ui::form::{QueryForm, QueryMode, ValidationError, confirm_delete, validate_upload};
use crate::ui::render;
use crate::ui::view::{Control, Panel, Toast, ToastLevel, View};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a user flow, after it has been surfaced to the view.
#[derive(Debug, Error)]
pub enum UiError {
    /// Input was rejected before any request.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A local file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Tabs of the interface; activating one may trigger a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    /// Document upload and collection management.
    Upload,
    /// Question form.
    Query,
    /// System status and collection statistics.
    Status,
}

impl std::str::FromStr for Tab {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upload" | "documents" => Ok(Self::Upload),
            "query" | "ask" => Ok(Self::Query),
            "status" | "system" => Ok(Self::Status),
            _ => Err(()),
        }
    }
}

/// Binds user intents to the API client and renders the outcomes.
pub struct UiController {
    ctx: Arc<AppContext>,
    active_tab: Tab,
}

impl UiController {
    /// Create a controller over a shared context.
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            active_tab: Tab::Query,
        }
    }

    /// Shared context.
    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// Currently active tab.
    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    fn view(&self) -> &dyn View {
        self.ctx.view()
    }

    fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.view().notify(Toast::new(level, message));
    }

    /// Switch tabs, refreshing the data the new tab shows.
    pub async fn activate_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
        match tab {
            Tab::Status => {
                let _ = self.refresh_status().await;
            }
            Tab::Upload => {
                let _ = self.refresh_collection_info().await;
            }
            Tab::Query => {}
        }
    }

    /// Validate and upload a file from disk, then refresh the collection statistics.
    pub async fn upload(&self, path: &Path) -> Result<(), UiError> {
        let file = match self.load_upload(path).await {
            Ok(file) => file,
            Err(error) => {
                self.view()
                    .replace(Panel::UploadResult, render::alert(&error.to_string()));
                let level = match error {
                    UiError::Validation(_) => ToastLevel::Warning,
                    _ => ToastLevel::Error,
                };
                self.toast(level, error.to_string());
                return Err(error);
            }
        };

        let view = self.ctx.view();
        view.set_loading(Control::Upload, true);
        view.replace(Panel::UploadResult, String::new());
        view.replace(Panel::UploadProgress, render::progress_bar(0.0));

        let result = self
            .ctx
            .client()
            .upload_document(&file, |percent| {
                view.replace(Panel::UploadProgress, render::progress_bar(percent));
            })
            .await;

        view.replace(Panel::UploadProgress, String::new());
        view.set_loading(Control::Upload, false);

        match result {
            Ok(response) => {
                tracing::info!(file = %response.filename, "Upload completed");
                view.replace(Panel::UploadResult, render::upload_summary(&response));
                self.toast(
                    ToastLevel::Success,
                    format!("Uploaded {}", response.filename),
                );
                let _ = self.refresh_collection_info().await;
                Ok(())
            }
            Err(error) => {
                view.replace(Panel::UploadResult, render::alert(&error.to_string()));
                self.toast(ToastLevel::Error, format!("Upload failed: {error}"));
                let _ = self.refresh_collection_info().await;
                Err(error.into())
            }
        }
    }

    async fn load_upload(&self, path: &Path) -> Result<UploadFile, UiError> {
        let io_error = |source| UiError::Io {
            path: path.display().to_string(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(io_error)?;
        let rules = &self.ctx.config().upload;
        if metadata.len() > rules.max_bytes {
            return Err(ValidationError::FileTooLarge {
                name: path.display().to_string(),
                size: metadata.len(),
                limit: rules.max_bytes,
            }
            .into());
        }
        let file = UploadFile::from_path(path).await.map_err(io_error)?;
        validate_upload(&file, rules)?;
        Ok(file)
    }

    /// Delete the collection once `confirmation` equals `DELETE`.
    pub async fn delete_collection(&self, confirmation: &str) -> Result<(), UiError> {
        if let Err(error) = confirm_delete(confirmation) {
            self.toast(ToastLevel::Warning, error.to_string());
            return Err(error.into());
        }

        let view = self.view();
        view.set_loading(Control::DeleteCollection, true);
        let result = self.ctx.client().delete_collection().await;
        view.set_loading(Control::DeleteCollection, false);

        match result {
            Ok(_) => {
                tracing::info!("Collection deleted");
                view.replace(Panel::UploadResult, String::new());
                self.toast(ToastLevel::Success, "Collection deleted");
                let _ = self.refresh_collection_info().await;
                Ok(())
            }
            Err(error) => {
                view.replace(Panel::CollectionInfo, render::alert(&error.to_string()));
                self.toast(
                    ToastLevel::Error,
                    format!("Failed to delete collection: {error}"),
                );
                Err(error.into())
            }
        }
    }

    /// Validate the form and run the standard or streaming answer path.
    pub async fn submit_query(&self, form: &QueryForm) -> Result<(), UiError> {
        let mode = match form.validate() {
            Ok(mode) => mode,
            Err(error) => {
                self.view()
                    .replace(Panel::Answer, render::alert(&error.to_string()));
                self.toast(ToastLevel::Warning, error.to_string());
                return Err(error.into());
            }
        };

        let question = form.question().trim();
        self.view().set_loading(Control::Ask, true);
        let outcome = match mode {
            QueryMode::Standard {
                include_sources,
                enable_evaluation,
            } => {
                self.standard_query(question, include_sources, enable_evaluation).await
            }
            QueryMode::Streaming => self.streaming_query(question).await,
        };
        self.view().set_loading(Control::Ask, false);
        outcome
    }

    async fn standard_query(
        &self,
        question: &str,
        include_sources: bool,
        enable_evaluation: bool,
    ) -> Result<(), UiError> {
        let view = self.view();
        view.replace(Panel::Answer, "Thinking...".to_string());
        match self
            .ctx
            .client()
            .query(question, include_sources, enable_evaluation)
            .await
        {
            Ok(response) => {
                view.replace(Panel::Answer, render::answer(&response));
                Ok(())
            }
            Err(error) => {
                view.replace(Panel::Answer, render::alert(&error.to_string()));
                self.toast(ToastLevel::Error, format!("Query failed: {error}"));
                Err(error.into())
            }
        }
    }

    async fn streaming_query(&self, question: &str) -> Result<(), UiError> {
        let view = self.view();
        view.stream_start(Panel::Answer);
        let result = self
            .ctx
            .client()
            .query_stream(question, |chunk| view.stream_append(Panel::Answer, chunk))
            .await;
        view.stream_end(Panel::Answer);

        match result {
            Ok(answer) => {
                tracing::debug!(chars = answer.chars().count(), "Streamed answer rendered");
                Ok(())
            }
            Err(error) => {
                view.replace(Panel::Answer, render::alert(&error.to_string()));
                self.toast(ToastLevel::Error, format!("Streaming failed: {error}"));
                Err(error.into())
            }
        }
    }

    /// Search for passages without generating an answer.
    pub async fn search(&self, question: &str) -> Result<(), UiError> {
        let mut form = QueryForm::default();
        form.set_question(question);
        if let Err(error) = form.validate() {
            self.view()
                .replace(Panel::Answer, render::alert(&error.to_string()));
            self.toast(ToastLevel::Warning, error.to_string());
            return Err(error.into());
        }

        let view = self.view();
        view.set_loading(Control::Search, true);
        let result = self.ctx.client().search_documents(question.trim()).await;
        view.set_loading(Control::Search, false);

        match result {
            Ok(results) => {
                view.replace(Panel::Answer, render::search_results(&results));
                Ok(())
            }
            Err(error) => {
                view.replace(Panel::Answer, render::alert(&error.to_string()));
                self.toast(ToastLevel::Error, format!("Search failed: {error}"));
                Err(error.into())
            }
        }
    }

    /// Re-fetch collection statistics into their panel.
    pub async fn refresh_collection_info(&self) -> Result<(), UiError> {
        match self.ctx.client().get_collection_info().await {
            Ok(info) => {
                self.view()
                    .replace(Panel::CollectionInfo, render::collection_info(&info));
                Ok(())
            }
            Err(error) => {
                self.view()
                    .replace(Panel::CollectionInfo, render::alert(&error.to_string()));
                self.toast(
                    ToastLevel::Error,
                    format!("Failed to load collection info: {error}"),
                );
                Err(error.into())
            }
        }
    }

    /// Re-fetch health, readiness and collection statistics concurrently.
    ///
    /// Each panel reports its own outcome; the first failure (if any) is returned.
    pub async fn refresh_status(&self) -> Result<(), UiError> {
        let view = self.view();
        view.set_loading(Control::Refresh, true);
        let client = self.ctx.client();
        let (health, readiness, collection) = tokio::join!(
            client.health_check(),
            client.readiness_check(),
            self.refresh_collection_info(),
        );
        view.set_loading(Control::Refresh, false);

        let health = match health {
            Ok(status) => {
                view.replace(Panel::Health, render::health(&status));
                Ok(())
            }
            Err(error) => {
                view.replace(Panel::Health, render::alert(&error.to_string()));
                self.toast(ToastLevel::Error, format!("Health check failed: {error}"));
                Err(UiError::from(error))
            }
        };

        let readiness = match readiness {
            Ok(status) => {
                view.replace(Panel::Readiness, render::readiness(&status));
                Ok(())
            }
            Err(error) => {
                view.replace(Panel::Readiness, render::alert(&error.to_string()));
                self.toast(
                    ToastLevel::Error,
                    format!("Readiness check failed: {error}"),
                );
                Err(UiError::from(error))
            }
        };

        health.and(readiness).and(collection)
    }
}
