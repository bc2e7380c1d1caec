pub mod application_reader;
pub mod member_writer;
pub mod plan_reader;
