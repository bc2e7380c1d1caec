use crate::domain::plan::Plan;
use crate::error::{EnrollmentError, Result};
use std::io::Read;

/// Reads the plan catalog from a CSV source with the header
/// `id, name, monthly_fee, enrollment_fee`.
pub struct PlanReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PlanReader<R> {
    /// Creates a new `PlanReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes plans.
    pub fn plans(self) -> impl Iterator<Item = Result<Plan>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EnrollmentError::from))
    }
}
