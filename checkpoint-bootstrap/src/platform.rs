// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! Platform-specific operating-system facts the bootstrap layer needs
//! before the engine starts.
//!
//! ## Architecture Pattern
//!
//! - **Interface**: `Platform` trait defines the contract
//! - **Implementations**:
//!   - `UnixPlatform`: POSIX implementation (Linux + macOS)
//!   - `WindowsPlatform`: Windows API implementation
//! - **Selection**: Compile-time platform selection via `#[cfg]`
//!
//! The bootstrap module sits outside `checkpoint-engine`/`checkpoint-domain`,
//! so it is the one place allowed to reach for platform-specific APIs
//! directly; everything downstream of it stays portable. File operations
//! here are synchronous: the engine itself never awaits (see
//! `checkpoint-engine`'s crate doc), so `sync_file` takes a plain
//! `std::fs::File`.
//!
//! ## Usage
//!
//! ```rust
//! use checkpoint_bootstrap::platform::create_platform;
//!
//! let platform = create_platform();
//! println!("Running on: {}", platform.platform_name());
//! println!("CPU cores: {}", platform.cpu_count());
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;

#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Platform-specific errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not supported on this platform: {0}")]
    NotSupported(String),

    #[error("platform error: {0}")]
    Other(String),
}

/// Platform abstraction trait for OS-specific operations.
///
/// Stateless and thread-safe; every fallible method returns `Result`.
pub trait Platform: Send + Sync {
    /// System page size, used to size mmap-aligned buffers.
    fn page_size(&self) -> usize;

    /// Number of logical CPUs available to this process.
    fn cpu_count(&self) -> usize;

    /// Total physical memory, in bytes.
    fn total_memory(&self) -> Result<u64, PlatformError>;

    /// Available (free) physical memory, in bytes.
    fn available_memory(&self) -> Result<u64, PlatformError>;

    /// Platform-specific line separator: `"\n"` on Unix, `"\r\n"` on Windows.
    fn line_separator(&self) -> &'static str;

    /// Platform-specific `PATH` separator: `':'` on Unix, `';'` on Windows.
    fn path_separator(&self) -> char;

    /// Platform identifier: `"linux"`, `"macos"`, `"windows"`.
    fn platform_name(&self) -> &'static str;

    /// Platform-specific temporary directory.
    fn temp_dir(&self) -> PathBuf;

    /// Whether this process is running with elevated privileges.
    fn is_elevated(&self) -> bool;

    /// Sets file permissions. Unix-only; a no-op on Windows.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError>;

    /// Flushes a checkpoint file's buffers to durable storage. Delegates to
    /// `File::sync_all`, the same call `checkpoint-engine`'s writer makes
    /// after finalizing a header.
    fn sync_file(&self, file: &File) -> Result<(), PlatformError>;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

/// Creates the platform-specific implementation selected at compile time.
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_platform_reports_sane_basics() {
        let platform = create_platform();
        assert!(platform.cpu_count() >= 1);
        let page_size = platform.page_size();
        assert!(page_size >= 512);
        assert!(page_size <= 65536);
        assert!(!platform.platform_name().is_empty());
    }

    #[test]
    fn line_and_path_separators_match_the_running_platform() {
        let platform = create_platform();

        #[cfg(unix)]
        {
            assert_eq!(platform.line_separator(), "\n");
            assert_eq!(platform.path_separator(), ':');
        }
        #[cfg(windows)]
        {
            assert_eq!(platform.line_separator(), "\r\n");
            assert_eq!(platform.path_separator(), ';');
        }
    }
}
