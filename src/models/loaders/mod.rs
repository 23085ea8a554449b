pub mod mathml_loader;
pub mod preference_loader;

pub use mathml_loader::{extract_math_blocks, load_math_blocks, read_checkpoint, write_checkpoint};
pub use preference_loader::{load_preferences, parse_preferences};
