mod note;

pub use note::{DeleteOutcome, NoteDraft, NoteEditor};
