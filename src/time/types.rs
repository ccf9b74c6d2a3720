use serde::Serialize;

/// When the run should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopAt {
    /// Run to the configured end index.
    #[default]
    EndTime,
    /// Stop now, discarding the current step's output.
    NoWriteNow,
    /// Stop now, writing the current step.
    WriteNow,
    /// Stop at the next scheduled write.
    NextWrite,
}
