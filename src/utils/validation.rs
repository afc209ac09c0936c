use anyhow::{Result, anyhow};
use std::path::Path;

/// Magic byte signatures for the audio formats we expect to see
const AUDIO_SIGNATURES: &[(&[u8], &str)] = &[
    (&[0x49, 0x44, 0x33], "audio/mpeg"),       // MP3 with ID3
    (&[0xFF, 0xFB], "audio/mpeg"),             // MP3 without ID3
    (&[0xFF, 0xFA], "audio/mpeg"),             // MP3 variant
    (&[0xFF, 0xF3], "audio/mpeg"),             // MPEG-2 layer 3
    (&[0x52, 0x49, 0x46, 0x46], "audio/wav"),  // WAV (RIFF)
    (&[0x4F, 0x67, 0x67, 0x53], "audio/ogg"),  // OGG
    (&[0x66, 0x4C, 0x61, 0x43], "audio/flac"), // FLAC
];

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Sanitizes an upload filename. The original name is untrusted input and is
/// only kept as metadata; local paths and storage keys are namespaced by a
/// generated request id, so this guards the key suffix and the staged path.
pub fn sanitize_filename(filename: &str) -> Result<String> {
    // Get only the filename component (remove any path)
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if name.is_empty() {
        return Err(anyhow!(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        }));
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    // Replace path separators, reserved characters and control characters;
    // other Unicode is left alone
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > 255 {
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    // Prevent hidden files
    if sanitized.starts_with('.') {
        return Err(anyhow!(ValidationError {
            code: "HIDDEN_FILE",
            message: "Hidden files (starting with '.') are not allowed".to_string(),
        }));
    }

    Ok(sanitized)
}

/// Checks if file content appears to be executable
pub fn is_executable_content(header: &[u8]) -> bool {
    if header.len() < 4 {
        return false;
    }

    // ELF binary (Linux)
    if header.starts_with(&[0x7F, 0x45, 0x4C, 0x46]) {
        return true;
    }

    // PE/COFF (Windows .exe, .dll)
    if header.starts_with(&[0x4D, 0x5A]) {
        return true;
    }

    // Mach-O (macOS)
    if header.starts_with(&[0xFE, 0xED, 0xFA, 0xCE])
        || header.starts_with(&[0xFE, 0xED, 0xFA, 0xCF])
        || header.starts_with(&[0xCE, 0xFA, 0xED, 0xFE])
        || header.starts_with(&[0xCF, 0xFA, 0xED, 0xFE])
    {
        return true;
    }

    // Shebang (shell scripts)
    if header.starts_with(b"#!") {
        return true;
    }

    false
}

/// Validates an uploaded audio file and returns the sanitized filename.
/// Unknown leading bytes are allowed (plenty of containers have no reliable
/// signature) but executable content is rejected outright.
pub fn validate_audio_upload(filename: &str, header: &[u8]) -> Result<String> {
    let sanitized = sanitize_filename(filename)?;

    if header.is_empty() {
        return Err(anyhow!(ValidationError {
            code: "EMPTY_FILE",
            message: "No file selected for upload".to_string(),
        }));
    }

    if is_executable_content(header) {
        return Err(anyhow!(ValidationError {
            code: "EXECUTABLE_CONTENT",
            message: "File contains executable content which is not allowed".to_string(),
        }));
    }

    if !AUDIO_SIGNATURES
        .iter()
        .any(|(sig, _)| header.len() >= sig.len() && header.starts_with(sig))
    {
        tracing::debug!(
            "No known audio signature in upload '{}', allowing anyway",
            sanitized
        );
    }

    Ok(sanitized)
}
