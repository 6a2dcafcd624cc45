/// Bounded reader every decoder goes through
pub mod cursor;
/// Parser for the ILFF chunk container shared by models and archives
pub mod loop_file;
/// Shared winnow record parsers and small geometry types
pub mod parser_utils;
/// Reader for `.res` resource archives
pub mod res;
