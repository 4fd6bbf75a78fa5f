//! Mapping of AWS SDK errors onto backend errors

use crate::backend::{Backend, BackendError};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::time::Duration;

/// Convert an AWS SDK error into a [`BackendError`] for `backend`.
///
/// Shared by the S3 and DynamoDB clients: both SDKs surface the same smithy
/// `SdkError` type.
pub(crate) fn from_sdk<E>(backend: Backend, error: SdkError<E>, timeout: Duration) -> BackendError
where
    E: std::error::Error + ProvideErrorMetadata + 'static,
{
    match &error {
        SdkError::TimeoutError(_) => BackendError::Timeout {
            backend,
            after: timeout,
        },
        SdkError::DispatchFailure(_) => BackendError::transport(
            backend,
            format!("network dispatch failure: {}", DisplayErrorContext(&error)),
        ),
        SdkError::ResponseError(_) => BackendError::malformed(
            backend,
            format!("unreadable response: {}", DisplayErrorContext(&error)),
        ),
        SdkError::ServiceError(_) => BackendError::UnexpectedResponse {
            backend,
            status: error.code().unwrap_or("Unknown").to_string(),
            body: error
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&error).to_string()),
        },
        _ => BackendError::transport(backend, DisplayErrorContext(&error).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;

    #[test]
    fn test_timeout_maps_to_timeout() {
        let err = SdkError::<ListObjectsV2Error>::timeout_error("operation timed out");
        let mapped = from_sdk(Backend::Dudewhere, err, Duration::from_secs(30));
        assert_eq!(
            mapped,
            BackendError::Timeout {
                backend: Backend::Dudewhere,
                after: Duration::from_secs(30),
            }
        );
    }

    #[test]
    fn test_construction_failure_is_transport() {
        let err = SdkError::<ListObjectsV2Error>::construction_failure("no region");
        let mapped = from_sdk(Backend::Dudewhere, err, Duration::from_secs(30));
        assert!(matches!(mapped, BackendError::Transport { .. }));
        assert!(mapped.to_string().contains("no region"));
    }
}
