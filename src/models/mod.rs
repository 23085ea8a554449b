pub mod artifact;
pub mod loaders;
pub mod math_block;
pub mod preference;

pub use artifact::OutputArtifact;
pub use loaders::{
    extract_math_blocks, load_math_blocks, load_preferences, parse_preferences, read_checkpoint,
    write_checkpoint,
};
pub use math_block::MathBlock;
pub use preference::PreferenceMap;
