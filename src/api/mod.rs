//! Usage: Typed wrappers over the remaining backend surface (cart, orders, contact, admin).

pub(crate) mod admin;
pub(crate) mod cart;
pub(crate) mod contact;
pub(crate) mod orders;
