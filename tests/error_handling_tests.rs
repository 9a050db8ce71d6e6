use serialterm::domain::error::{
    ConfigValidationError, OpenError, ResetProtocolError, TransportError, TransportErrorKind,
};
use serialterm::{SerialTermError, SerialTermResult};
use std::error::Error;
use tokio_test::{assert_err, assert_ok};

/// Error handling tests
#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let errors: Vec<SerialTermError> = vec![
            SerialTermError::Config { message: "Config error".to_string() },
            ConfigValidationError::new("parity", "bogus", "[none] | mark | even | odd | space").into(),
            OpenError::DeviceNotFound("COM9".to_string()).into(),
            SerialTermError::Terminal("raw mode".to_string()),
            SerialTermError::Output("Output error".to_string()),
            SerialTermError::SelectionAborted,
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }

        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SerialTermError>();
    }

    #[test]
    fn test_validation_error_is_printed_verbatim() {
        let error: SerialTermError = ConfigValidationError::new("handshake", "sometimes", "[none] | rts").into();
        assert_eq!(
            error.to_string(),
            "Invalid handshake value 'sometimes', the correct values are ([none] | rts)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: SerialTermError = io_error.into();
        assert!(matches!(error, SerialTermError::Io(_)));
    }

    #[test]
    fn test_open_error_chain() {
        let root_cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Access denied");
        let error: SerialTermError = OpenError::IoFailure {
            port: "/dev/ttyS0".to_string(),
            source: root_cause,
        }
        .into();

        let mut current: &dyn Error = &error;
        let mut depth = 0;
        while let Some(source) = current.source() {
            current = source;
            depth += 1;
            if depth > 10 {
                break;
            }
        }

        assert!(depth > 0, "Should have at least one source error");
        assert_eq!(current.to_string(), "Access denied");
    }

    #[test]
    fn test_bootloader_error_keeps_cause() {
        let error = ResetProtocolError::Bootloader {
            baud: 1200,
            source: OpenError::DeviceNotFound("/dev/ttyACM0".to_string()),
        };

        assert!(error.to_string().contains("1200"));
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Device '/dev/ttyACM0' not found"));
    }

    #[test]
    fn test_transport_error_notice_format() {
        let error = TransportError {
            port: "COM3".to_string(),
            kind: TransportErrorKind::Frame,
        };
        assert_eq!(error.to_string(), "COM3 Error: Frame");
    }

    #[tokio::test]
    async fn test_async_error_propagation() {
        async fn failing_open() -> Result<(), OpenError> {
            Err(OpenError::AlreadyOpen("COM3".to_string()))
        }

        async fn calling_function() -> SerialTermResult<()> {
            failing_open().await?;
            Ok(())
        }

        let error = assert_err!(calling_function().await);
        assert!(matches!(error, SerialTermError::Open(OpenError::AlreadyOpen(_))));
        assert!(error.to_string().contains("already open"));
    }

    #[test]
    fn test_result_type() {
        fn success_function() -> SerialTermResult<String> {
            Ok("success".to_string())
        }

        assert_eq!(assert_ok!(success_function()), "success");
    }

    #[test]
    fn test_device_missing_classification() {
        assert!(OpenError::DeviceNotFound("COM9".into()).is_device_missing());
        assert!(!OpenError::AlreadyOpen("COM9".into()).is_device_missing());
        assert!(!OpenError::IoFailure {
            port: "COM9".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "busy"),
        }
        .is_device_missing());
    }
}
