//! Configuration: types, default paths, XML loading and validation.
//! The library itself never reads configuration; only the binary does.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{CONFIG_ENV, default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use validate::validate_and_normalize;
pub use xml::{LoadResult, create_template_config, load_config_from_xml_path, load_or_init};

/// Roots written into a fresh template; placeholders for the operator to edit.
pub const OLD_ROOT_DEFAULT: &str = "/srv/storage/old";
pub const NEW_ROOT_DEFAULT: &str = "/srv/storage/new";
