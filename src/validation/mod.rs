pub mod artifact_locator;
pub mod input_validator;
pub mod release_notes;

pub use artifact_locator::{ArtifactLocator, LocatedFile};
pub use input_validator::InputValidator;
pub use release_notes::{NotesEntry, ParsedReleaseNotes, ReleaseNotesParser};
