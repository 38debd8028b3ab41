use derive_more::Display;
use std::time::Duration;

use crate::error::{ErrorKind, IntakeError, format_bytes};
use crate::progress::{ProgressState, Timer};

/// 5 GiB, large enough for orthomosaic rasters.
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// How long a rejection notice stays on screen.
pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(3);

/// A file as handed over by the browser: name, declared size and MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size: u64,
    pub mime: String,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, size: u64, mime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime: mime.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakePolicy {
    pub max_bytes: u64,
    /// Reject anything whose MIME type is not `image/*`.
    pub images_only: bool,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_FILE_BYTES,
            images_only: false,
        }
    }
}

impl IntakePolicy {
    pub fn images_only() -> Self {
        Self {
            images_only: true,
            ..Self::default()
        }
    }

    pub fn size_ok(&self, size: u64) -> bool {
        size <= self.max_bytes
    }

    pub fn validate(&self, candidate: &FileCandidate) -> Result<(), IntakeError> {
        if !self.size_ok(candidate.size) {
            return Err(IntakeError::FileTooLarge {
                size: candidate.size,
                limit: self.max_bytes,
            });
        }
        if self.images_only && !candidate.mime.starts_with("image/") {
            return Err(IntakeError::UnsupportedFileType {
                mime: candidate.mime.clone(),
            });
        }
        Ok(())
    }

    pub fn describe(&self) -> String {
        if self.images_only {
            format!("Images up to {}", format_bytes(self.max_bytes))
        } else {
            format!("Images and rasters up to {}", format_bytes(self.max_bytes))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime: String,
    /// Data URL, present once local decoding finished.
    pub preview: Option<String>,
    /// Whether `size` is within the policy limit the file was checked against.
    pub size_ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "decode#{}", _0)]
pub struct DecodeTicket(u64);

/// Accepted selection: the host starts reading the file under `decode` and
/// applies `timer` to its progress slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub decode: DecodeTicket,
    pub timer: Timer,
}

/// Transient, auto-dismissing rejection message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub text: String,
}

impl From<&IntakeError> for Notice {
    fn from(error: &IntakeError) -> Self {
        Self {
            kind: error.kind(),
            text: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileIntake {
    policy: IntakePolicy,
    selected: Option<SelectedFile>,
    generation: u64,
}

impl FileIntake {
    pub fn new(policy: IntakePolicy) -> Self {
        Self {
            policy,
            selected: None,
            generation: 0,
        }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.selected.as_ref().and_then(|file| file.preview.as_deref())
    }

    /// Validates and records a file, then starts the preview phase.
    ///
    /// A rejected file leaves both the intake and `progress` untouched.
    pub fn select_file(
        &mut self,
        candidate: FileCandidate,
        progress: &mut ProgressState,
    ) -> Result<Selection, IntakeError> {
        if let Err(e) = self.policy.validate(&candidate) {
            log::warn!("Rejected {}: {}", candidate.name, e);
            return Err(e);
        }

        self.generation += 1;
        let decode = DecodeTicket(self.generation);
        let timer = progress.enter_preview(&candidate.name);
        log::info!(
            "Selected {} ({}), decoding under {}",
            candidate.name,
            format_bytes(candidate.size),
            decode
        );

        let size_ok = self.policy.size_ok(candidate.size);
        self.selected = Some(SelectedFile {
            name: candidate.name,
            size: candidate.size,
            mime: candidate.mime,
            preview: None,
            size_ok,
        });

        Ok(Selection { decode, timer })
    }

    /// Local decoding finished. `preview` is `None` when the read failed; the
    /// preview phase completes either way.
    ///
    /// Results for a discarded or replaced file are dropped.
    pub fn finish_decode(
        &mut self,
        decode: DecodeTicket,
        preview: Option<String>,
        progress: &mut ProgressState,
    ) -> Option<Timer> {
        if decode != DecodeTicket(self.generation) {
            log::debug!("Dropping stale {}", decode);
            return None;
        }
        let file = self.selected.as_mut()?;
        if preview.is_none() {
            log::warn!("Preview unavailable for {}", file.name);
        }
        file.preview = preview;
        progress.complete_preview()
    }

    /// Forgets the current file. Safe to call repeatedly.
    pub fn clear(&mut self) {
        if let Some(file) = self.selected.take() {
            log::info!("Discarded {}", file.name);
        }
        self.generation += 1;
    }
}
