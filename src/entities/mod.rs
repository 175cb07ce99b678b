pub mod listing;
pub mod listing_image;
pub mod order_item;
pub mod order_sheet;
pub mod sub_word;
