//! Stage failure classification

use crate::error::{Error, ErrorCode};
use crate::submit::Stage;

/// Telemetry code for `error` raised while running `stage`
///
/// Packaging, upload and build failures carry fixed codes. Earlier stages
/// use the typed error when there is one and fall back to the message text
/// otherwise; a config-stage failure nothing recognises is
/// `config_invalid_unknown`.
pub fn classify(stage: Stage, error: &Error) -> ErrorCode {
    match stage {
        Stage::Archiving => ErrorCode::ZipCreationFailed,
        Stage::Uploading => ErrorCode::ZipUploadFailed,
        Stage::CreatingBuild => ErrorCode::BuildFailed,
        Stage::LoadingConfig => match typed_code(error) {
            ErrorCode::UnclassifiedError => ErrorCode::ConfigInvalidUnknown,
            code => code,
        },
        Stage::ValidatingCapabilities
        | Stage::ResolvingManifest
        | Stage::SettingParallelism
        | Stage::Polling => typed_code(error),
    }
}

fn typed_code(error: &Error) -> ErrorCode {
    match error {
        Error::Config(err) => err.code(),
        Error::Validation(err) => err.code(),
        other => ErrorCode::from_message(&other.to_string()),
    }
}
