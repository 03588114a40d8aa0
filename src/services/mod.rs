pub mod export_service;
pub mod generation_service;
pub mod import_service;
pub mod prompt;
pub mod taxonomy_service;

pub use export_service::{ExportPayload, ExportService};
pub use generation_service::{
    Approval, ApprovalReport, DraftEdits, GenerationOutcome, GenerationService,
};
pub use import_service::{ImportReport, ImportService};
pub use prompt::GenerationRequest;
pub use taxonomy_service::TaxonomyService;
