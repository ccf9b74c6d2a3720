use super::Communicator;

/// Single-process run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

impl Communicator for Serial {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn reduce_or(&self, value: bool) -> bool {
        value
    }

    fn broadcast(&self, value: Option<String>) -> Option<String> {
        value
    }
}
