pub mod lesson;
pub mod module;
pub mod profile;
pub mod unlock;

pub use lesson::{CompletionEntry, CompletionLedger, LessonRecord, Score};
pub use module::Module;
pub use profile::UserProfile;
pub use unlock::UnlockRecord;
