use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A pic's UTC offset string does not match `±HH:MM` or is out of range.
    #[error("malformed utc offset: {offset:?}")]
    MalformedOffset { offset: String },

    /// A schedule's time-of-day is not a valid `HH:MM` value.
    #[error("malformed schedule time: {value:?}")]
    MalformedRuleTime { value: String },

    /// A schedule's day flags are not exactly seven `0`/`1` characters.
    #[error("malformed day-of-week flags: {value:?}")]
    MalformedDays { value: String },

    /// The avatar push for one match failed.
    #[error("push failed for pic {pic_id}: {source}")]
    Dispatch {
        pic_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// Loading the tick snapshot failed. The only error that escapes a tick.
    #[error(transparent)]
    Store(#[from] telegpick_store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
