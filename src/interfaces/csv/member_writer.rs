use crate::domain::member::{EmploymentSector, MaritalStatus, Member, MemberStatus};
use crate::error::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct MemberRow<'a> {
    id: &'a str,
    membership_number: &'a str,
    full_name: &'a str,
    email: &'a str,
    plan_id: &'a str,
    status: MemberStatus,
    enrolled_on: NaiveDate,
    marital_status: MaritalStatus,
    employment_sector: EmploymentSector,
    nationality: &'a str,
}

impl<'a> From<&'a Member> for MemberRow<'a> {
    fn from(member: &'a Member) -> Self {
        let profile = &member.profile;
        Self {
            id: &member.id.0,
            membership_number: profile.membership_number.as_str(),
            full_name: &profile.full_name,
            email: &profile.email,
            plan_id: profile.plan_id.as_str(),
            status: profile.status,
            enrolled_on: profile.enrolled_on,
            marital_status: profile.marital_status,
            employment_sector: profile.employment_sector,
            nationality: &profile.nationality,
        }
    }
}

/// Writes created members as CSV.
pub struct MemberWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> MemberWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_members<'a>(&mut self, members: impl IntoIterator<Item = &'a Member>) -> Result<()> {
        for member in members {
            self.writer.serialize(MemberRow::from(member))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
