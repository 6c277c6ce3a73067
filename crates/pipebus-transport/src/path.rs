//! Endpoint name to socket path mapping.
//!
//! Names are logical identifiers like pipe names on other platforms; they
//! map to a socket file in the runtime directory.

use std::path::PathBuf;

use crate::error::{Result, TransportError};

/// Maximum endpoint name length in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Maximum socket path length.
/// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// Resolve an endpoint name to its socket path.
///
/// The socket lives in `$XDG_RUNTIME_DIR` when set, `/tmp` otherwise.
pub fn socket_path(name: &str) -> Result<PathBuf> {
    validate_name(name)?;

    let dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let path = dir.join(format!("pipebus-{name}.sock"));

    let len = path.as_os_str().len();
    if len >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path,
            len,
            max: MAX_PATH_LEN,
        });
    }

    Ok(path)
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| TransportError::NameInvalid {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name exceeds maximum length"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
    {
        return Err(invalid(
            "name may only contain ASCII alphanumerics, '-', '_' and '.'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_name_to_socket_file() {
        let path = socket_path("orders").unwrap();
        let file = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(file, "pipebus-orders.sock");
    }

    #[test]
    fn rejects_empty_name() {
        assert!(matches!(
            socket_path(""),
            Err(TransportError::NameInvalid { .. })
        ));
    }

    #[test]
    fn rejects_path_separators() {
        assert!(matches!(
            socket_path("../escape"),
            Err(TransportError::NameInvalid { .. })
        ));
        assert!(matches!(
            socket_path("a/b"),
            Err(TransportError::NameInvalid { .. })
        ));
    }

    #[test]
    fn rejects_overlong_name() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            socket_path(&name),
            Err(TransportError::NameInvalid { .. })
        ));
    }

    #[test]
    fn accepts_dotted_and_dashed_names() {
        assert!(socket_path("svc.orders-v2_test").is_ok());
    }
}
