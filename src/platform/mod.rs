//! Platform-specific helpers.
//! Hides OS differences (Unix/Windows) behind a uniform API so the rest of the
//! codebase stays platform-agnostic.

#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    apply_visibility, open_log_file_secure_append, set_dir_mode_0700, visibility_of,
    write_config_secure_new_0600,
};

#[cfg(not(unix))]
pub use windows::{
    apply_visibility, open_log_file_secure_append, set_dir_mode_0700, visibility_of,
    write_config_secure_new_0600,
};
