// Shop orders
pub mod mail;
pub mod orders;
pub mod sheets;
pub mod tracking;

// Exports
pub mod csv_export;
pub mod labels;
pub mod listings;

// Subtitle translation
pub mod sub_words;
pub mod subtitles;
