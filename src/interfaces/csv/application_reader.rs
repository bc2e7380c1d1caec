use crate::domain::application::EnrollmentApplication;
use crate::error::{EnrollmentError, Result};
use std::io::Read;

/// Reads enrollment applications from a CSV source.
///
/// Only `id`, `full_name`, `email` and `plan_id` are mandatory columns; every other
/// application field may be omitted from the header or left empty.
pub struct ApplicationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ApplicationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn applications(self) -> impl Iterator<Item = Result<EnrollmentApplication>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EnrollmentError::from))
    }
}
