pub mod converter;
pub mod sync_run;
pub mod watermark;
pub mod window;

pub use converter::convert;
pub use sync_run::SyncRun;
pub use watermark::resolve_resume_point;
pub use window::plan_window;
