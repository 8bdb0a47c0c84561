//! Draft input fields: URL, question, and the selected document

/// Opaque reference to a document chosen through the file picker.
///
/// Only stored and shown; the document itself is never opened or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef(String);

impl FileRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing path segment, used as the label
    pub fn display_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

/// Text the user is composing, plus the optional attachment
#[derive(Debug, Clone, Default)]
pub struct Draft {
    url: String,
    question: String,
    selected_file: Option<FileRef>,
}

impl Draft {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn selected_file(&self) -> Option<&FileRef> {
        self.selected_file.as_ref()
    }

    pub fn set_url(&mut self, url: String) {
        self.url = url;
    }

    pub fn set_question(&mut self, question: String) {
        self.question = question;
    }

    pub fn select_file(&mut self, file: FileRef) {
        self.selected_file = Some(file);
    }

    pub fn clear_file(&mut self) {
        self.selected_file = None;
    }

    /// Empties the question and hands back what it held
    pub(crate) fn take_question(&mut self) -> String {
        std::mem::take(&mut self.question)
    }
}
