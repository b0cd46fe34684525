mod fs;

pub use fs::{TempDir, TempFile, create_file};
pub use scopeguard::defer;
