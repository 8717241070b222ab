pub mod recognition_facade;

pub use recognition_facade::{
    AttendanceMarkRequest, BackgroundStatusView, CreatedApiKey, CurrentSourceView, DailySummary, ExportFormat,
    FacadeError, HealthReport, RecognitionFacade,
};
