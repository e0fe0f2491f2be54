mod whois_parser;

pub use whois_parser::{WhoisResponseParser, MAX_DESCRIPTION_LEN};
