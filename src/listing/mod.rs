//! Discovery of documents on the paginated remote listing.

mod date;
mod parser;
mod walker;

pub use date::{decoded_file_name, parse_date, parse_period, parse_title_and_url};
pub use parser::{ParsedListing, parse_listing};
pub use walker::{DateFilter, ListingError, ListingPage, ListingWalker};
