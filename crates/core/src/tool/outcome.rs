/// What a tool call produced, split by audience.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Outcome {
    /// Text fed back into the conversation for the model.
    pub for_model: String,
    /// Text surfaced to a human observer or log, if any. Tools whose
    /// effect is delivered elsewhere (e.g. a file sent over the bus)
    /// stay silent here.
    pub for_observer: Option<String>,
    /// Whether this outcome reports a failure the model should react to.
    pub is_error: bool,
}

impl Outcome {
    /// Creates an outcome whose text is shown both to the model and to
    /// the observer.
    #[inline]
    pub fn new<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        Self {
            for_observer: Some(text.clone()),
            for_model: text,
            is_error: false,
        }
    }

    /// Creates an outcome that is only reported to the model.
    #[inline]
    pub fn silent<S: Into<String>>(for_model: S) -> Self {
        Self {
            for_model: for_model.into(),
            for_observer: None,
            is_error: false,
        }
    }

    /// Creates an error outcome.
    #[inline]
    pub fn error<S: Into<String>>(for_model: S) -> Self {
        Self {
            for_model: for_model.into(),
            for_observer: None,
            is_error: true,
        }
    }
}
