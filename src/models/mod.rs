mod item;
mod item_change;
mod user;

pub use item::{normalize_tags, Item, SearchParams};
pub use item_change::{ItemChange, NewItemChange, OperationType};
pub use user::User;
