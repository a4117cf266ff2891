//! Configuration system
//!
//! TOML file -> `Config` (defaults embedded through `config_struct!`) -> global holder.

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{
    get_config_clone, load_config_from_path, read_config_file,
    with_config, CONFIG_FILE_PATH,
};
