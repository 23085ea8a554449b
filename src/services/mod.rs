pub mod placeholder_writer;
pub mod popup_dismisser;
pub mod renderer;
pub mod run_report;

pub use placeholder_writer::PlaceholderWriter;
pub use popup_dismisser::{DismissStrategy, KeywordStrategy, PopupDismisser};
pub use renderer::{RenderEngine, RendererController, RendererSettings};
pub use run_report::{Outcome, RunReport};
