pub mod ical_parser;

pub use ical_parser::IcalendarParser;
