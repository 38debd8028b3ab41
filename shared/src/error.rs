use strum_macros::Display;

/// Coarse failure category, used for notices and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    FileTooLarge,
    UnsupportedFileType,
    ResponseParseFailure,
    ServerError,
    NetworkFailure,
}

/// Local rejections. These never reach the network or touch progress.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("File is too large ({} > {})", size_label(.size), size_label(.limit))]
    FileTooLarge { size: u64, limit: u64 },
    #[error("Unsupported file type: {mime}")]
    UnsupportedFileType { mime: String },
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            IntakeError::UnsupportedFileType { .. } => ErrorKind::UnsupportedFileType,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to parse response: {0}")]
    ResponseParseFailure(String),
    #[error("Server error: {status} - {body}")]
    ServerError { status: u16, body: String },
    #[error("Network error: {0}")]
    NetworkFailure(String),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::ResponseParseFailure(_) => ErrorKind::ResponseParseFailure,
            UploadError::ServerError { .. } => ErrorKind::ServerError,
            UploadError::NetworkFailure(_) => ErrorKind::NetworkFailure,
        }
    }
}

fn size_label(bytes: &u64) -> String {
    format_bytes(*bytes)
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    if value.fract() == 0.0 {
        format!("{} {}", value as u64, unit)
    } else {
        format!("{:.1} {}", value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes_are_human_readable() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10 MiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GiB");
        assert_eq!(format_bytes(1536), "1.5 KiB");
    }

    #[test]
    fn messages_name_the_failure() {
        let too_large = IntakeError::FileTooLarge {
            size: 6 * 1024 * 1024 * 1024,
            limit: 5 * 1024 * 1024 * 1024,
        };
        assert_eq!(too_large.to_string(), "File is too large (6 GiB > 5 GiB)");
        assert_eq!(too_large.kind(), ErrorKind::FileTooLarge);

        let server = UploadError::ServerError {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(server.to_string(), "Server error: 502 - bad gateway");
        assert_eq!(server.kind(), ErrorKind::ServerError);
    }
}
