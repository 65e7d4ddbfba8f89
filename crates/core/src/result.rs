//! Result type and extension trait for client operations.

use crate::error::Error;

/// The standard Result type for client operations.
///
/// ```ignore
/// fn free_kib(client: &NodeClient) -> Result<u64> {
///     Ok(client.mem_info()?.free)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Helpers for callers that report failures as plain integers.
pub trait ResultExt<T> {
    /// 0 on success, otherwise the positive errno of the failure.
    fn status_code(&self) -> i32;

    /// Convert to an Option, logging the error at debug level.
    fn ok_logged(self) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn status_code(&self) -> i32 {
        match self {
            Ok(_) => 0,
            Err(e) => e.errno() as i32,
        }
    }

    fn ok_logged(self) -> Option<T> {
        self.inspect_err(|e| tracing::debug!(error = %e, "operation failed"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use veinfo_ipc::RpcError;

    use super::*;

    #[test]
    fn test_status_code() {
        let ok: Result<u8> = Ok(1);
        assert_eq!(ok.status_code(), 0);

        let remote: Result<u8> = Err(RpcError::Remote { status: -3 }.into());
        assert_eq!(remote.status_code(), 3);

        let invalid: Result<u8> = Err(Error::invalid_argument("pid"));
        assert_eq!(invalid.status_code(), 22);
    }

    #[test]
    fn test_ok_logged() {
        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.ok_logged(), Some(7));

        let err: Result<u8> = Err(Error::NoOnlineNode);
        assert_eq!(err.ok_logged(), None);
    }
}
