//! Compiled-in defaults. Every value here can be overridden from the command line.

/// Address the server binds to and the client connects to.
pub const DEFAULT_ADDR: &str = "127.0.0.1:65432";

/// Directory the server serves files from.
pub const DEFAULT_STORAGE_DIR: &str = "files";

/// Directory the client writes downloads into.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// SQLite file holding the client's download history.
pub const DEFAULT_HISTORY_DB: &str = "fileserve_history.db";

/// Largest data frame the server emits while streaming a file body.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on any frame's declared length. Anything larger is a protocol violation.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Suffix for in-flight downloads; renamed away once the body is complete.
pub const PARTIAL_SUFFIX: &str = "part";
