pub mod extractor;
pub mod jwt;
pub mod poll;
pub mod test_utils;
