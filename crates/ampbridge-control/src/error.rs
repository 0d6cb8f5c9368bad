use ampbridge_transport::Flavor;

/// Errors that can occur in control operations.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The operation has no command vocabulary for the transport's variant.
    #[error("operation not supported on the {0} protocol variant")]
    UnsupportedFlavor(Flavor),

    /// The device answered, but the reply did not carry the expected field.
    #[error("could not read {field} from reply {payload:?}")]
    NoMatch { field: &'static str, payload: String },

    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] ampbridge_transport::TransportError),

    /// A JSON reply could not be parsed.
    #[error("malformed JSON reply: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControlError {
    pub(crate) fn no_match(field: &'static str, payload: &[u8]) -> Self {
        ControlError::NoMatch {
            field,
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControlError>;
