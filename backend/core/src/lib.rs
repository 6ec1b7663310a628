pub mod dates;
pub mod editor;
pub mod error;
pub mod event;
pub mod export;
pub mod lookup;
pub mod session;
pub mod traits;
pub mod types;
pub mod viewer;

pub use dates::{normalize_date, normalize_member_dates};
pub use editor::{EditorView, ParentLink, ParentRole, ParentSection, ResultEditor};
pub use error::{
    EditorError, ExportError, ExtractionError, SessionError, EXTRACTION_FAILED_MESSAGE,
};
pub use event::{SessionEvent, SessionEventKind};
pub use export::{sanitize, CopiedFlags, CopyKind, ExportRow, EXPORT_HEADERS};
pub use lookup::{find_member_by_name, MemberMatch};
pub use session::{run_scan, spawn_scan, CsvDownload, ScanSession, ScanStatus, ScanTicket, SessionSnapshot};
pub use traits::Extractor;
pub use types::{FamilyMember, HouseholdField, KartuKeluargaData, MemberField};
pub use viewer::{Point, ViewerAction, ViewerSnapshot, ViewerState};
