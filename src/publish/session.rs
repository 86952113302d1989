//! Edit session state

/// Display state of one product image while it is being edited.
///
/// `displayed_src` only ever holds the original URL, a server-confirmed URL,
/// or the preview of a blob that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    original_src: String,
    displayed_src: String,
    preview_src: Option<String>,
    loading: bool,
    editor_open: bool,
}

impl EditSession {
    pub fn new(src: impl Into<String>) -> Self {
        let src = src.into();
        Self {
            original_src: src.clone(),
            displayed_src: src,
            preview_src: None,
            loading: false,
            editor_open: false,
        }
    }

    pub fn original_src(&self) -> &str {
        &self.original_src
    }

    pub fn displayed_src(&self) -> &str {
        &self.displayed_src
    }

    pub fn preview_src(&self) -> Option<&str> {
        self.preview_src.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_editor_open(&self) -> bool {
        self.editor_open
    }

    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.editor_open = true;
        self.preview_src = None;
    }

    /// Record the preview of a blob that passed validation
    pub(crate) fn set_preview(&mut self, src: String) {
        self.preview_src = Some(src);
    }

    /// Show the URL the server confirmed
    pub(crate) fn confirm(&mut self, url: String) {
        self.displayed_src = url;
        self.finish();
    }

    /// Upload failed: show the validated local preview
    pub(crate) fn fall_back_to_preview(&mut self) {
        if let Some(preview) = self.preview_src.clone() {
            self.displayed_src = preview;
        }
        self.finish();
    }

    /// Close without touching the displayed image
    pub(crate) fn abandon(&mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        self.loading = false;
        self.editor_open = false;
    }
}
