pub mod colorme;

pub use colorme::{
    Customer, MailKind, MailState, Order, OrderPage, OrderUpdate, PageMeta, SaleDelivery,
    SaleDetail,
};
